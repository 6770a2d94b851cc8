//! Test orchestration.
//!
//! The orchestrator drives one run through its phases: ping, then
//! download, then upload. Cancellation aborts the run and returns the
//! state to idle without persisting anything; any other failure
//! switches to the simulated fallback so the run still completes,
//! with the result marked accordingly.

pub mod context;
pub mod download;
pub mod latency;
pub mod simulation;
pub mod upload;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{info, warn};

use crate::cloudflare::Client;
use crate::engine::context::{CancelToken, RunContext};
use crate::engine::download::DownloadProbe;
use crate::engine::latency::LatencyProbe;
use crate::engine::upload::UploadProbe;
use crate::errors::SpeedTestError;
use crate::history::HistoryStore;
use crate::results::{NetworkInfo, ServerInfo, TestResult};
use crate::tui::progress::{ProgressCallback, ProgressEvent, TestPhase};

/// Tunables for a test run.
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Number of latency samples.
    pub ping_samples: usize,
    /// Pause between latency samples.
    pub ping_pause: Duration,
    /// Concurrent download streams.
    pub download_streams: usize,
    /// Target duration of the download phase.
    pub download_duration: Duration,
    /// Bytes requested per download chunk.
    pub download_chunk_bytes: u64,
    /// Pause between chunk requests on one stream.
    pub download_pause: Duration,
    /// Concurrent upload streams.
    pub upload_streams: usize,
    /// Total upload payload, split across the streams.
    pub upload_total_bytes: u64,
    /// Length of the simulated upload phase in the fallback path.
    pub sim_upload_duration: Duration,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            ping_samples: 5,
            ping_pause: Duration::from_millis(200),
            download_streams: 8,
            download_duration: Duration::from_secs(10),
            download_chunk_bytes: 2 * 1024 * 1024,
            download_pause: Duration::from_millis(50),
            upload_streams: 4,
            upload_total_bytes: 20 * 1024 * 1024,
            sim_upload_duration: simulation::UPLOAD_DURATION,
        }
    }
}

/// Sequences the probes of a complete test run.
pub struct Orchestrator {
    config: TestConfig,
    client: Client,
    state: Mutex<TestPhase>,
    current: Mutex<Option<CancelToken>>,
    history: Mutex<Box<dyn HistoryStore>>,
    progress: Arc<dyn ProgressCallback>,
}

impl Orchestrator {
    pub fn new(
        config: TestConfig,
        client: Client,
        history: Box<dyn HistoryStore>,
        progress: Arc<dyn ProgressCallback>,
    ) -> Self {
        Self {
            config,
            client,
            state: Mutex::new(TestPhase::Idle),
            current: Mutex::new(None),
            history: Mutex::new(history),
            progress,
        }
    }

    /// Current phase of the orchestrator.
    pub fn phase(&self) -> TestPhase {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Cancel the run in progress, if any.
    pub fn cancel(&self) {
        let current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(token) = current.as_ref() {
            token.cancel();
        }
    }

    /// Run one complete test.
    ///
    /// Rejects with a busy error if a run is already in progress. On
    /// cancellation the state returns to idle and nothing is
    /// persisted; on any other failure the simulated fallback takes
    /// over and the run still reaches completion.
    pub async fn run(
        &self,
        network: NetworkInfo,
        server: ServerInfo,
    ) -> Result<TestResult, SpeedTestError> {
        let ctx = self.begin()?;

        let result = match self.measure(&ctx, &network, &server).await {
            Ok(result) => result,
            Err(error) if error.is_cancelled() => {
                info!("Test cancelled");
                self.finish(TestPhase::Idle);
                return Err(error);
            }
            Err(error) => {
                warn!(
                    "Measurement failed, switching to simulated values: {}",
                    error
                );
                match self.simulate(&ctx, &network, &server).await {
                    Ok(result) => result,
                    Err(sim_error) => {
                        self.finish(TestPhase::Idle);
                        return Err(sim_error);
                    }
                }
            }
        };

        {
            let mut history =
                self.history.lock().unwrap_or_else(|e| e.into_inner());
            if let Err(error) = history.append(result.clone()) {
                warn!("Could not persist test result: {}", error);
            }
        }

        self.finish(TestPhase::Completed);
        self.progress
            .on_progress(ProgressEvent::PhaseChange(TestPhase::Completed));

        Ok(result)
    }

    /// Validate the state and mark the start of a new run.
    fn begin(&self) -> Result<RunContext, SpeedTestError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match *state {
            TestPhase::Idle | TestPhase::Completed => {}
            _ => return Err(SpeedTestError::busy()),
        }
        *state = TestPhase::Ping;
        drop(state);

        let token = CancelToken::new();
        let ctx = RunContext::new(token.clone());
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) =
            Some(token);

        self.progress
            .on_progress(ProgressEvent::PhaseChange(TestPhase::Ping));

        Ok(ctx)
    }

    fn set_phase(&self, phase: TestPhase) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = phase;
        self.progress.on_progress(ProgressEvent::PhaseChange(phase));
    }

    fn finish(&self, phase: TestPhase) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = phase;
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    async fn measure(
        &self,
        ctx: &RunContext,
        network: &NetworkInfo,
        server: &ServerInfo,
    ) -> Result<TestResult, SpeedTestError> {
        let latency =
            LatencyProbe::new(self.config.ping_samples, self.config.ping_pause)
                .run(&self.client, ctx, &self.progress)
                .await?;
        self.progress
            .on_progress(ProgressEvent::PhaseComplete(TestPhase::Ping));

        ctx.token().ensure_active()?;
        self.set_phase(TestPhase::Download);
        let download = DownloadProbe::new(
            self.config.download_streams,
            self.config.download_duration,
            self.config.download_chunk_bytes,
            self.config.download_pause,
        )
        .run(&self.client, ctx, &self.progress)
        .await?;
        self.progress
            .on_progress(ProgressEvent::PhaseComplete(TestPhase::Download));

        ctx.token().ensure_active()?;
        self.set_phase(TestPhase::Upload);
        let upload = UploadProbe::new(
            self.config.upload_streams,
            self.config.upload_total_bytes,
        )
        .run(&self.client, ctx, &self.progress)
        .await?;
        self.progress
            .on_progress(ProgressEvent::PhaseComplete(TestPhase::Upload));

        Ok(TestResult::new(
            download.speed_mbps,
            upload.speed_mbps,
            latency.mean_ms,
            latency.jitter_ms,
            self.estimated_duration(upload.speed_mbps),
            network,
            server,
            false,
        ))
    }

    async fn simulate(
        &self,
        ctx: &RunContext,
        network: &NetworkInfo,
        server: &ServerInfo,
    ) -> Result<TestResult, SpeedTestError> {
        self.progress.on_progress(ProgressEvent::SimulationStarted);

        self.set_phase(TestPhase::Download);
        let download_mbps = simulation::download(
            ctx,
            &self.progress,
            self.config.download_duration,
        )
        .await?;
        self.progress
            .on_progress(ProgressEvent::PhaseComplete(TestPhase::Download));

        self.set_phase(TestPhase::Upload);
        let upload_mbps = simulation::upload(
            ctx,
            &self.progress,
            download_mbps,
            self.config.sim_upload_duration,
        )
        .await?;
        self.progress
            .on_progress(ProgressEvent::PhaseComplete(TestPhase::Upload));

        let (ping_ms, jitter_ms) = simulation::latency();
        let duration = self.config.download_duration.as_secs_f64()
            + self.config.sim_upload_duration.as_secs_f64()
            + self.config.ping_samples as f64 * 0.2;

        Ok(TestResult::new(
            download_mbps,
            upload_mbps,
            ping_ms,
            jitter_ms,
            duration,
            network,
            server,
            true,
        ))
    }

    /// Estimated wall-clock cost of a real run.
    ///
    /// The upload term divides the configured payload by the measured
    /// rate; a zero rate falls back to 1 MB/s so the estimate stays
    /// finite.
    fn estimated_duration(&self, upload_mbps: f64) -> f64 {
        let download_secs = self.config.download_duration.as_secs_f64();
        let upload_mb =
            self.config.upload_total_bytes as f64 / 1024.0 / 1024.0;
        let upload_rate =
            if upload_mbps > 0.0 { upload_mbps / 8.0 } else { 1.0 };
        let ping_secs = self.config.ping_samples as f64 * 0.2;

        download_secs + upload_mb / upload_rate + ping_secs
    }
}
