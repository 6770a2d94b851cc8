//! TUI (Terminal User Interface) module for netscope.
//!
//! Provides real-time visual feedback during speed tests, including
//! phase indicators, live throughput readings, and final results.

pub mod controller;
pub mod display_mode;
pub mod progress;
pub mod renderer;
pub mod state;

pub use controller::TuiController;
pub use display_mode::DisplayMode;
pub use progress::{
    BandwidthDirection, NullProgress, ProgressCallback, ProgressEvent,
    TestPhase,
};
pub use state::TuiState;
