//! Custom error types for the speed test application.
//!
//! This module provides user-friendly error types that wrap underlying
//! errors with clear, actionable messages.

use std::error::Error;
use std::fmt;

/// Exit codes for the application.
pub mod exit_codes {
    /// Successful execution.
    pub const SUCCESS: i32 = 0;
    /// Network error (connection failed, timeout, etc.).
    pub const NETWORK_ERROR: i32 = 1;
    /// The endpoint returned an error response.
    pub const HTTP_ERROR: i32 = 2;
    /// Local I/O error (history file, terminal).
    pub const IO_ERROR: i32 = 3;
    /// Configuration error (invalid arguments, bad endpoint URL).
    pub const CONFIG_ERROR: i32 = 4;
    /// A test run was already in progress.
    pub const BUSY: i32 = 5;
    /// Unknown/unexpected error.
    pub const UNKNOWN_ERROR: i32 = 99;
    /// The test was cancelled by the user.
    pub const CANCELLED: i32 = 130;
}

/// Categories of errors that can occur during speed testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network connectivity issues.
    Network,
    /// Connection or request timeout.
    Timeout,
    /// The endpoint returned an error status.
    Http,
    /// Local I/O failures (history file, terminal handling).
    Io,
    /// Invalid configuration or arguments.
    Config,
    /// The user cancelled the test.
    Cancelled,
    /// A test run was already in progress.
    Busy,
    /// Unknown or unexpected errors.
    Unknown,
}

impl ErrorKind {
    /// Get the exit code for this error kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorKind::Network => exit_codes::NETWORK_ERROR,
            ErrorKind::Timeout => exit_codes::NETWORK_ERROR,
            ErrorKind::Http => exit_codes::HTTP_ERROR,
            ErrorKind::Io => exit_codes::IO_ERROR,
            ErrorKind::Config => exit_codes::CONFIG_ERROR,
            ErrorKind::Cancelled => exit_codes::CANCELLED,
            ErrorKind::Busy => exit_codes::BUSY,
            ErrorKind::Unknown => exit_codes::UNKNOWN_ERROR,
        }
    }

    /// Get a user-friendly description of this error kind.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorKind::Network => "Network error",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::Http => "Endpoint error",
            ErrorKind::Io => "I/O error",
            ErrorKind::Config => "Configuration error",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::Busy => "Busy",
            ErrorKind::Unknown => "Unknown error",
        }
    }
}

/// A user-friendly error type for speed test operations.
#[derive(Debug)]
pub struct SpeedTestError {
    /// The kind of error.
    pub kind: ErrorKind,
    /// User-friendly error message.
    pub message: String,
    /// Optional suggestion for how to resolve the error.
    pub suggestion: Option<String>,
    /// The underlying error, if any.
    pub source: Option<Box<dyn Error + Send + Sync>>,
}

impl SpeedTestError {
    /// Create a new SpeedTestError.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), suggestion: None, source: None }
    }

    /// Add a suggestion for how to resolve the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add the underlying error source.
    pub fn with_source(
        mut self,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        self.kind.exit_code()
    }

    /// True when this error represents a user-initiated cancellation.
    ///
    /// Cancellation is the one failure that must never trigger the
    /// simulated fallback and never persists a result.
    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
            .with_suggestion("Check your internet connection and try again.")
    }

    /// Create a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message).with_suggestion(
            "The server may be slow or unreachable. Try again later.",
        )
    }

    /// Create an endpoint error.
    pub fn http(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Http, message).with_suggestion(
            "The speed test endpoint may be experiencing issues. Try again later.",
        )
    }

    /// Create a local I/O error.
    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    /// Create a cancellation error.
    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "test cancelled")
    }

    /// Create a busy error for a run started while another is active.
    pub fn busy() -> Self {
        Self::new(ErrorKind::Busy, "a test is already running")
            .with_suggestion("Wait for the current test to finish or cancel it first.")
    }

    /// Wrap a reqwest error with context, classifying it by kind.
    pub fn from_reqwest(context: &str, error: reqwest::Error) -> Self {
        let kind = if error.is_timeout() {
            ErrorKind::Timeout
        } else if error.is_connect() {
            ErrorKind::Network
        } else if error.is_status() {
            ErrorKind::Http
        } else {
            classify_error(&error)
        };

        let message = format!("{}: {}", context, error);
        let suggestion = suggestion_for(kind);

        let mut wrapped = Self::new(kind, message).with_source(error);
        wrapped.suggestion = suggestion.map(str::to_string);
        wrapped
    }

    /// Wrap a std::io error with context.
    pub fn from_io(context: &str, error: std::io::Error) -> Self {
        Self::new(ErrorKind::Io, format!("{}: {}", context, error))
            .with_source(error)
    }
}

impl fmt::Display for SpeedTestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.description(), self.message)?;

        if let Some(ref suggestion) = self.suggestion {
            write!(f, "\n  Suggestion: {}", suggestion)?;
        }

        Ok(())
    }
}

impl Error for SpeedTestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

fn suggestion_for(kind: ErrorKind) -> Option<&'static str> {
    match kind {
        ErrorKind::Network => {
            Some("Check your internet connection and try again.")
        }
        ErrorKind::Timeout => {
            Some("The server may be slow or unreachable. Try again later.")
        }
        ErrorKind::Http => Some(
            "The speed test endpoint may be experiencing issues. Try again later.",
        ),
        _ => None,
    }
}

/// Classify an error into an ErrorKind based on its message.
///
/// Used as a fallback when no typed classification is available.
pub fn classify_error(error: &dyn Error) -> ErrorKind {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("timeout")
        || error_str.contains("timed out")
        || error_str.contains("deadline")
    {
        return ErrorKind::Timeout;
    }

    if error_str.contains("connection refused")
        || error_str.contains("connection reset")
        || error_str.contains("network unreachable")
        || error_str.contains("host unreachable")
        || error_str.contains("no such host")
        || error_str.contains("no route")
        || error_str.contains("broken pipe")
        || error_str.contains("dns")
    {
        return ErrorKind::Network;
    }

    if error_str.contains("status: 4")
        || error_str.contains("status: 5")
        || error_str.contains("server error")
    {
        return ErrorKind::Http;
    }

    ErrorKind::Unknown
}

/// Format an error for user display.
///
/// This function creates a user-friendly error message that includes
/// the error description and any available suggestions.
pub fn format_error_for_display(error: &SpeedTestError) -> String {
    let mut output = format!("Error: {}", error.message);

    if let Some(ref suggestion) = error.suggestion {
        output.push_str(&format!("\n\nSuggestion: {}", suggestion));
    }

    output
}
