//! TUI state management.
//!
//! Holds all state needed for rendering the TUI, including network
//! metadata, per-phase progress, and results.

use super::progress::{BandwidthDirection, ProgressEvent, TestPhase};
use crate::results::{NetworkInfo, ServerInfo};
use crate::stats::{mean, std_deviation};

/// Error information for display.
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// Error message
    pub message: String,
    /// Optional suggestion for resolution
    pub suggestion: Option<String>,
}

/// Latency measurement state.
#[derive(Debug, Clone, Default)]
pub struct LatencyState {
    /// Individual latency samples in ms
    pub samples: Vec<f64>,
    /// Current sample number
    pub current: usize,
    /// Total number of samples
    pub total: usize,
    /// Mean latency in ms, set when the phase completes
    pub mean_ms: Option<f64>,
    /// Jitter in ms, set when the phase completes
    pub jitter_ms: Option<f64>,
}

/// Throughput phase state.
#[derive(Debug, Clone, Default)]
pub struct BandwidthState {
    /// Most recent speed reading in Mbps
    pub current_speed_mbps: Option<f64>,
    /// Bytes transferred so far
    pub bytes: u64,
    /// Displayed progress in percent
    pub percent: f64,
    /// Final speed in Mbps, set when the phase completes
    pub final_speed_mbps: Option<f64>,
    /// Whether this phase is completed
    pub completed: bool,
}

impl BandwidthState {
    /// Fold in one reading.
    ///
    /// Readings from concurrent streams can arrive slightly out of
    /// order, so the displayed percentage only ever moves forward and
    /// is clamped to 100.
    fn record(&mut self, speed_mbps: f64, bytes: u64, percent: f64) {
        self.current_speed_mbps = Some(speed_mbps);
        self.bytes = self.bytes.max(bytes);
        self.percent = self.percent.max(percent).min(100.0);
    }
}

/// State for the TUI display.
#[derive(Debug, Clone)]
pub struct TuiState {
    /// Current test phase
    pub phase: TestPhase,
    /// Server the test runs against
    pub server: Option<ServerInfo>,
    /// Network metadata
    pub network: Option<NetworkInfo>,
    /// Latency samples and stats
    pub latency: LatencyState,
    /// Download progress and results
    pub download: BandwidthState,
    /// Upload progress and results
    pub upload: BandwidthState,
    /// Whether the run switched to simulated values
    pub simulated: bool,
    /// Error message if any
    pub error: Option<ErrorInfo>,
    /// Terminal width for layout
    pub terminal_width: u16,
}

impl Default for TuiState {
    fn default() -> Self {
        Self {
            phase: TestPhase::Idle,
            server: None,
            network: None,
            latency: LatencyState::default(),
            download: BandwidthState::default(),
            upload: BandwidthState::default(),
            simulated: false,
            error: None,
            terminal_width: 80,
        }
    }
}

impl TuiState {
    /// Create a new TuiState with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set server and network metadata for display.
    pub fn set_metadata(&mut self, server: ServerInfo, network: NetworkInfo) {
        self.server = Some(server);
        self.network = Some(network);
    }

    /// Set an error state with optional suggestion.
    ///
    /// This preserves any partial results collected before the error.
    pub fn set_error(&mut self, message: String, suggestion: Option<String>) {
        self.error = Some(ErrorInfo {
            message,
            suggestion,
        });
    }

    /// Update state from a progress event.
    ///
    /// This method processes progress events emitted by the test
    /// engine and updates the appropriate state fields.
    pub fn update_from_event(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::PhaseChange(phase) => {
                self.phase = *phase;
            }
            ProgressEvent::LatencySample {
                value_ms,
                current,
                total,
            } => {
                self.latency.samples.push(*value_ms);
                self.latency.current = *current;
                self.latency.total = *total;
            }
            ProgressEvent::Bandwidth {
                direction,
                speed_mbps,
                bytes,
                percent,
            } => {
                let state = match direction {
                    BandwidthDirection::Download => &mut self.download,
                    BandwidthDirection::Upload => &mut self.upload,
                };
                state.record(*speed_mbps, *bytes, *percent);
            }
            ProgressEvent::PhaseComplete(phase) => match phase {
                TestPhase::Ping => {
                    self.latency.mean_ms = Some(mean(&self.latency.samples));
                    self.latency.jitter_ms =
                        Some(std_deviation(&self.latency.samples));
                }
                TestPhase::Download => {
                    self.download.completed = true;
                    self.download.percent = 100.0;
                    self.download.final_speed_mbps =
                        self.download.current_speed_mbps;
                }
                TestPhase::Upload => {
                    self.upload.completed = true;
                    self.upload.percent = 100.0;
                    self.upload.final_speed_mbps =
                        self.upload.current_speed_mbps;
                }
                _ => {}
            },
            ProgressEvent::SimulationStarted => {
                self.simulated = true;
            }
            ProgressEvent::Error(message) => {
                self.set_error(message.clone(), None);
            }
        }
    }
}
