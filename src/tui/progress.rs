//! Progress event types and callback interface.
//!
//! Defines the events emitted by the test engine to update the TUI
//! and the callback trait for receiving these events.

/// Phases of a speed test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestPhase {
    /// No test running
    Idle,
    /// Measuring latency
    Ping,
    /// Measuring download throughput
    Download,
    /// Measuring upload throughput
    Upload,
    /// Test finished
    Completed,
}

/// Direction of bandwidth measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandwidthDirection {
    /// Download test
    Download,
    /// Upload test
    Upload,
}

/// Progress events emitted during test execution.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Test phase has changed
    PhaseChange(TestPhase),
    /// Latency sample completed
    LatencySample {
        /// Measured latency in milliseconds
        value_ms: f64,
        /// Current sample number (1-indexed)
        current: usize,
        /// Total number of samples
        total: usize,
    },
    /// Bandwidth reading during a throughput phase
    Bandwidth {
        /// Direction of the measurement
        direction: BandwidthDirection,
        /// Current speed in Mbps
        speed_mbps: f64,
        /// Total bytes transferred so far
        bytes: u64,
        /// Phase progress in percent (0 to 100)
        percent: f64,
    },
    /// Phase completed
    PhaseComplete(TestPhase),
    /// Real measurement failed and simulated values follow
    SimulationStarted,
    /// Error occurred
    #[allow(dead_code)]
    Error(String),
}

/// Callback interface for progress updates.
///
/// Implementations must be non-blocking to avoid affecting
/// measurement accuracy.
pub trait ProgressCallback: Send + Sync {
    /// Called when a progress event occurs.
    fn on_progress(&self, event: ProgressEvent);
}

/// Callback that discards every event.
///
/// Used by the non-interactive output modes where progress is not
/// rendered.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn on_progress(&self, _event: ProgressEvent) {}
}
