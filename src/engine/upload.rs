//! Upload throughput measurement.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use log::{debug, warn};

use crate::cloudflare::requests::upload::Upload;
use crate::cloudflare::Client;
use crate::engine::context::RunContext;
use crate::engine::download::ThroughputResult;
use crate::errors::SpeedTestError;
use crate::stats;
use crate::tui::progress::{
    BandwidthDirection, ProgressCallback, ProgressEvent,
};

/// Measures upload throughput with one burst of concurrent POSTs.
///
/// The total payload is split evenly across the streams, all launched
/// at once. A failed stream contributes nothing to the total; the
/// aggregate speed comes from the bytes that actually made it. Like
/// the download probe, this errors only on cancellation or when no
/// stream succeeded at all.
#[derive(Debug, Clone)]
pub struct UploadProbe {
    streams: usize,
    total_bytes: u64,
}

impl UploadProbe {
    pub fn new(streams: usize, total_bytes: u64) -> Self {
        Self { streams, total_bytes }
    }

    /// Payload size each stream carries.
    pub fn bytes_per_stream(&self) -> u64 {
        self.total_bytes / self.streams.max(1) as u64
    }

    pub async fn run(
        &self,
        client: &Client,
        ctx: &RunContext,
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<ThroughputResult, SpeedTestError> {
        ctx.token().ensure_active()?;

        let per_stream = self.bytes_per_stream();
        let total_bytes = self.total_bytes;
        let started = Instant::now();
        let mut handles = Vec::with_capacity(self.streams);

        for stream in 0..self.streams {
            let client = client.clone();
            let ctx = ctx.clone();
            let progress = Arc::clone(progress);

            handles.push(tokio::spawn(async move {
                if ctx.token().is_cancelled() {
                    return;
                }

                let request = Upload::new(per_stream, ctx.next_tag());
                let payload = request.payload_bytes();

                let outcome = tokio::select! {
                    result = client.execute(&request) => result,
                    _ = ctx.token().cancelled() => return,
                };

                match outcome {
                    Ok(response) => {
                        // Drain the response so the exchange is fully
                        // settled before the bytes are counted.
                        if let Err(error) = response.bytes().await {
                            debug!(
                                "Upload stream {} response read failed: {}",
                                stream, error
                            );
                        }

                        let total = ctx.add_upload_bytes(payload);
                        let elapsed = started.elapsed().as_secs_f64();
                        if elapsed > 0.0 {
                            let speed_mbps = stats::speed_mbps(total, elapsed);
                            let percent = (total as f64 / total_bytes as f64
                                * 100.0)
                                .min(100.0);
                            progress.on_progress(ProgressEvent::Bandwidth {
                                direction: BandwidthDirection::Upload,
                                speed_mbps,
                                bytes: total,
                                percent,
                            });
                        }
                    }
                    Err(error) => {
                        debug!("Upload stream {} failed: {}", stream, error);
                    }
                }
            }));
        }

        for result in join_all(handles).await {
            if let Err(error) = result {
                warn!("Upload stream task failed: {}", error);
            }
        }

        ctx.token().ensure_active()?;

        let elapsed = started.elapsed();
        let bytes = ctx.upload_bytes();
        if bytes == 0 {
            return Err(SpeedTestError::network(
                "no upload data accepted by endpoint",
            ));
        }

        let speed_mbps = stats::speed_mbps(bytes, elapsed.as_secs_f64());

        progress.on_progress(ProgressEvent::Bandwidth {
            direction: BandwidthDirection::Upload,
            speed_mbps,
            bytes,
            percent: 100.0,
        });

        Ok(ThroughputResult { speed_mbps, bytes, elapsed })
    }
}
