//! Download throughput measurement.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use log::{debug, warn};

use crate::cloudflare::requests::chunk::Chunk;
use crate::cloudflare::Client;
use crate::engine::context::RunContext;
use crate::errors::SpeedTestError;
use crate::stats;
use crate::tui::progress::{
    BandwidthDirection, ProgressCallback, ProgressEvent,
};

/// Outcome of a throughput phase.
#[derive(Debug, Clone)]
pub struct ThroughputResult {
    /// Aggregate speed in Mbps over the whole phase.
    pub speed_mbps: f64,
    /// Total bytes transferred across all streams.
    pub bytes: u64,
    /// Wall-clock time the phase actually took.
    pub elapsed: Duration,
}

/// Measures download throughput with concurrent chunked streams.
///
/// Each stream repeatedly requests a chunk and reads its body
/// incrementally into a counter shared across streams. Individual
/// request failures are logged and swallowed so one bad stream never
/// sinks the phase; the probe errors only when cancelled or when not
/// a single byte arrived.
#[derive(Debug, Clone)]
pub struct DownloadProbe {
    streams: usize,
    duration: Duration,
    chunk_bytes: u64,
    pause: Duration,
}

impl DownloadProbe {
    pub fn new(
        streams: usize,
        duration: Duration,
        chunk_bytes: u64,
        pause: Duration,
    ) -> Self {
        Self { streams, duration, chunk_bytes, pause }
    }

    pub async fn run(
        &self,
        client: &Client,
        ctx: &RunContext,
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<ThroughputResult, SpeedTestError> {
        ctx.token().ensure_active()?;

        let started = Instant::now();
        let mut handles = Vec::with_capacity(self.streams);

        for stream in 0..self.streams {
            let client = client.clone();
            let ctx = ctx.clone();
            let progress = Arc::clone(progress);
            let duration = self.duration;
            let chunk_bytes = self.chunk_bytes;
            let pause = self.pause;

            handles.push(tokio::spawn(async move {
                // The stream keeps issuing chunk requests until the
                // shared clock runs out; a chunk already in flight at
                // the deadline is read to completion.
                while started.elapsed() < duration {
                    if ctx.token().is_cancelled() {
                        return;
                    }

                    let request = Chunk::new(chunk_bytes, ctx.next_tag());
                    match client.execute(&request).await {
                        Ok(mut response) => loop {
                            match response.chunk().await {
                                Ok(Some(data)) => {
                                    if ctx.token().is_cancelled() {
                                        return;
                                    }

                                    let total = ctx
                                        .add_download_bytes(data.len() as u64);
                                    let elapsed =
                                        started.elapsed().as_secs_f64();
                                    if elapsed > 0.0 {
                                        let speed_mbps =
                                            stats::speed_mbps(total, elapsed);
                                        let percent = (elapsed
                                            / duration.as_secs_f64()
                                            * 100.0)
                                            .min(100.0);
                                        progress.on_progress(
                                            ProgressEvent::Bandwidth {
                                                direction:
                                                    BandwidthDirection::Download,
                                                speed_mbps,
                                                bytes: total,
                                                percent,
                                            },
                                        );
                                    }
                                }
                                Ok(None) => break,
                                Err(error) => {
                                    debug!(
                                        "Download stream {} body read failed: {}",
                                        stream, error
                                    );
                                    break;
                                }
                            }
                        },
                        Err(error) => {
                            debug!(
                                "Download stream {} request failed: {}",
                                stream, error
                            );
                        }
                    }

                    tokio::time::sleep(pause).await;
                }
            }));
        }

        for result in join_all(handles).await {
            if let Err(error) = result {
                warn!("Download stream task failed: {}", error);
            }
        }

        ctx.token().ensure_active()?;

        let elapsed = started.elapsed();
        let bytes = ctx.download_bytes();
        if bytes == 0 {
            return Err(SpeedTestError::network(
                "no download data received from endpoint",
            ));
        }

        let speed_mbps = stats::speed_mbps(bytes, elapsed.as_secs_f64());

        progress.on_progress(ProgressEvent::Bandwidth {
            direction: BandwidthDirection::Download,
            speed_mbps,
            bytes,
            percent: 100.0,
        });

        Ok(ThroughputResult { speed_mbps, bytes, elapsed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::context::CancelToken;
    use crate::errors::ErrorKind;
    use crate::tui::progress::NullProgress;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Recorder(Mutex<Vec<ProgressEvent>>);

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Self(Mutex::new(Vec::new())))
        }

        fn events(&self) -> Vec<ProgressEvent> {
            self.0.lock().unwrap().clone()
        }
    }

    impl ProgressCallback for Recorder {
        fn on_progress(&self, event: ProgressEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    async fn chunk_server(bytes: usize) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/__down"))
            .respond_with(
                ResponseTemplate::new(200).set_body_bytes(vec![0u8; bytes]),
            )
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_accumulates_bytes_across_streams() {
        let server = chunk_server(4096).await;
        let client = Client::new(&server.uri()).unwrap();
        let ctx = RunContext::new(CancelToken::new());
        let progress: Arc<dyn ProgressCallback> = Arc::new(NullProgress);

        let probe = DownloadProbe::new(
            2,
            Duration::from_millis(200),
            4096,
            Duration::from_millis(10),
        );
        let result = probe.run(&client, &ctx, &progress).await.unwrap();

        assert!(result.bytes >= 4096);
        assert_eq!(result.bytes % 4096, 0);
        assert!(result.speed_mbps > 0.0);
        assert!(result.elapsed >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_speed_matches_bytes_and_elapsed() {
        let server = chunk_server(2048).await;
        let client = Client::new(&server.uri()).unwrap();
        let ctx = RunContext::new(CancelToken::new());
        let progress: Arc<dyn ProgressCallback> = Arc::new(NullProgress);

        let probe = DownloadProbe::new(
            1,
            Duration::from_millis(150),
            2048,
            Duration::from_millis(10),
        );
        let result = probe.run(&client, &ctx, &progress).await.unwrap();

        let expected = (result.bytes as f64 * 8.0)
            / (result.elapsed.as_secs_f64() * 1e6);
        assert!((result.speed_mbps - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_progress_events_are_bounded_and_finish_at_100() {
        let server = chunk_server(1024).await;
        let client = Client::new(&server.uri()).unwrap();
        let ctx = RunContext::new(CancelToken::new());
        let recorder = Recorder::new();
        let progress = Arc::clone(&recorder) as Arc<dyn ProgressCallback>;

        let probe = DownloadProbe::new(
            2,
            Duration::from_millis(150),
            1024,
            Duration::from_millis(10),
        );
        probe.run(&client, &ctx, &progress).await.unwrap();

        let events = recorder.events();
        assert!(!events.is_empty());
        for event in &events {
            if let ProgressEvent::Bandwidth { percent, direction, .. } = event
            {
                assert_eq!(*direction, BandwidthDirection::Download);
                assert!((0.0..=100.0).contains(percent));
            }
        }
        match events.last().unwrap() {
            ProgressEvent::Bandwidth { percent, bytes, .. } => {
                assert_eq!(*percent, 100.0);
                assert_eq!(*bytes, ctx.download_bytes());
            }
            other => panic!("unexpected final event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_total_endpoint_failure_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/__down"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = Client::new(&server.uri()).unwrap();
        let ctx = RunContext::new(CancelToken::new());
        let progress: Arc<dyn ProgressCallback> = Arc::new(NullProgress);

        let probe = DownloadProbe::new(
            2,
            Duration::from_millis(100),
            1024,
            Duration::from_millis(10),
        );
        let error = probe.run(&client, &ctx, &progress).await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::Network);
        assert!(!error.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancellation_wins_over_measurement() {
        let server = chunk_server(1024).await;
        let client = Client::new(&server.uri()).unwrap();
        let token = CancelToken::new();
        let ctx = RunContext::new(token.clone());
        let progress: Arc<dyn ProgressCallback> = Arc::new(NullProgress);

        let probe = DownloadProbe::new(
            2,
            Duration::from_secs(5),
            1024,
            Duration::from_millis(10),
        );

        let run = {
            let client = client.clone();
            let ctx = ctx.clone();
            tokio::spawn(async move {
                probe.run(&client, &ctx, &progress).await
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();

        let result = tokio::time::timeout(Duration::from_secs(2), run)
            .await
            .expect("cancel should end the probe promptly")
            .unwrap();
        assert!(result.unwrap_err().is_cancelled());
    }
}
