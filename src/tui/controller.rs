//! TUI controller for managing the display lifecycle.
//!
//! The TuiController owns terminal setup and teardown, renders the
//! shared state, and hands the test engine a progress callback that
//! feeds that state.

use std::io::{self, Stdout};
use std::sync::{Arc, Mutex};

use crossterm::{
    cursor,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use ratatui::{backend::CrosstermBackend, Terminal};

use super::display_mode::DisplayMode;
use super::progress::{ProgressCallback, ProgressEvent, TestPhase};
use super::renderer::render_frame;
use super::state::TuiState;
use crate::errors::SpeedTestError;
use crate::results::{NetworkInfo, ServerInfo, TestResult};

/// Controller for the TUI display.
pub struct TuiController {
    /// Current display mode
    mode: DisplayMode,
    /// Shared state for the TUI
    state: Arc<Mutex<TuiState>>,
    /// Terminal instance (only present in TUI mode)
    terminal: Option<Terminal<CrosstermBackend<Stdout>>>,
    /// Whether the terminal has been initialized
    initialized: bool,
}

impl TuiController {
    pub fn new(mode: DisplayMode) -> Self {
        Self {
            mode,
            state: Arc::new(Mutex::new(TuiState::new())),
            terminal: None,
            initialized: false,
        }
    }

    /// Get current display mode.
    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// Initialize the TUI.
    ///
    /// In TUI mode, this enters the alternate screen and hides the
    /// cursor. In other modes, this is a no-op.
    pub fn init(&mut self) -> Result<(), SpeedTestError> {
        if self.mode != DisplayMode::Tui {
            return Ok(());
        }

        enable_raw_mode()
            .map_err(|e| SpeedTestError::from_io("enabling raw mode", e))?;

        let mut stdout = io::stdout();
        execute!(
            stdout,
            EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide
        )
        .map_err(|e| {
            SpeedTestError::from_io("entering alternate screen", e)
        })?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)
            .map_err(|e| SpeedTestError::from_io("creating terminal", e))?;

        self.terminal = Some(terminal);
        self.initialized = true;

        if let Some(ref terminal) = self.terminal {
            let size = terminal
                .size()
                .map_err(|e| SpeedTestError::from_io("reading size", e))?;
            let mut state =
                self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.terminal_width = size.width;
        }

        Ok(())
    }

    /// Clean up and restore terminal state.
    ///
    /// Leaves the alternate screen, shows the cursor, and disables
    /// raw mode.
    pub fn cleanup(&mut self) -> Result<(), SpeedTestError> {
        if !self.initialized {
            return Ok(());
        }

        if let Some(ref mut terminal) = self.terminal {
            execute!(
                terminal.backend_mut(),
                LeaveAlternateScreen,
                DisableMouseCapture,
                cursor::Show
            )
            .map_err(|e| {
                SpeedTestError::from_io("leaving alternate screen", e)
            })?;
        }

        disable_raw_mode()
            .map_err(|e| SpeedTestError::from_io("disabling raw mode", e))?;

        self.initialized = false;
        self.terminal = None;

        Ok(())
    }

    /// Set server and network metadata for display.
    pub fn set_metadata(&mut self, server: ServerInfo, network: NetworkInfo) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.set_metadata(server, network);
    }

    /// Set an error state for display.
    ///
    /// Partial results collected before the error are preserved.
    pub fn set_error(&mut self, message: String, suggestion: Option<String>) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.set_error(message, suggestion);
    }

    /// Render the current state to the terminal.
    ///
    /// In TUI mode, this renders the full TUI. In other modes, this
    /// is a no-op.
    pub fn render(&mut self) -> Result<(), SpeedTestError> {
        if self.mode != DisplayMode::Tui {
            return Ok(());
        }

        if let Some(ref mut terminal) = self.terminal {
            let size = terminal
                .size()
                .map_err(|e| SpeedTestError::from_io("reading size", e))?;

            // Clone so the lock is not held during draw.
            let state = {
                let mut state =
                    self.state.lock().unwrap_or_else(|e| e.into_inner());
                state.terminal_width = size.width;
                state.clone()
            };

            terminal
                .draw(|frame| {
                    render_frame(frame, &state);
                })
                .map_err(|e| SpeedTestError::from_io("drawing frame", e))?;
        }

        Ok(())
    }

    /// Display a final result.
    ///
    /// Folds the result into the state and renders one last frame.
    pub fn show_result(
        &mut self,
        result: &TestResult,
    ) -> Result<(), SpeedTestError> {
        {
            let mut state =
                self.state.lock().unwrap_or_else(|e| e.into_inner());

            state.latency.mean_ms = Some(result.ping_ms);
            state.latency.jitter_ms = Some(result.jitter_ms);

            state.download.final_speed_mbps = Some(result.download_mbps);
            state.download.percent = 100.0;
            state.download.completed = true;

            state.upload.final_speed_mbps = Some(result.upload_mbps);
            state.upload.percent = 100.0;
            state.upload.completed = true;

            state.simulated = result.simulated;
            state.phase = TestPhase::Completed;
        }

        self.render()
    }

    /// Get a progress callback for the test engine.
    ///
    /// The callback updates the shared TUI state without blocking.
    pub fn progress_callback(&self) -> Arc<dyn ProgressCallback> {
        Arc::new(TuiProgressCallback {
            state: Arc::clone(&self.state),
        })
    }
}

impl Drop for TuiController {
    /// Restore the terminal even when cleanup() was never called.
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// Progress callback that feeds the shared TUI state.
struct TuiProgressCallback {
    state: Arc<Mutex<TuiState>>,
}

impl ProgressCallback for TuiProgressCallback {
    /// Handle a progress event by updating the TUI state.
    ///
    /// Uses try_lock so a render in progress never stalls the
    /// measurement tasks.
    fn on_progress(&self, event: ProgressEvent) {
        if let Ok(mut state) = self.state.try_lock() {
            state.update_from_event(&event);
        }
    }
}
