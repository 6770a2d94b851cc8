//! Simulated measurement fallback.
//!
//! When the real measurement pipeline fails for any reason other
//! than cancellation, the run is replayed with synthesized values so
//! the user still gets a complete result. Results produced this way
//! are marked as simulated.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;

use crate::engine::context::RunContext;
use crate::errors::SpeedTestError;
use crate::tui::progress::{
    BandwidthDirection, ProgressCallback, ProgressEvent,
};

/// Fixed length of the simulated upload phase.
pub const UPLOAD_DURATION: Duration = Duration::from_secs(5);

const TICK: Duration = Duration::from_millis(100);

/// Synthesized latency figures: mean in 15..40 ms, jitter in 1..5 ms.
pub fn latency() -> (f64, f64) {
    let mut rng = rand::thread_rng();
    (rng.gen_range(15.0..40.0), rng.gen_range(1.0..5.0))
}

/// Play back a simulated download phase and return its speed.
///
/// The published curve is a constant target speed with a little
/// per-tick noise, matching what a steady transfer of linearly
/// growing byte counts would report. The returned value is the exact
/// target without noise.
pub async fn download(
    ctx: &RunContext,
    progress: &Arc<dyn ProgressCallback>,
    duration: Duration,
) -> Result<f64, SpeedTestError> {
    let target_mbps = {
        let mut rng = rand::thread_rng();
        rng.gen_range(180.0..250.0)
    };

    let total_secs = duration.as_secs_f64();
    let started = Instant::now();

    while started.elapsed() < duration {
        ctx.token().ensure_active()?;

        let elapsed = started.elapsed().as_secs_f64();
        let noise = {
            let mut rng = rand::thread_rng();
            rng.gen_range(-2.5..2.5)
        };
        let bytes = (target_mbps * elapsed * 1e6 / 8.0) as u64;

        progress.on_progress(ProgressEvent::Bandwidth {
            direction: BandwidthDirection::Download,
            speed_mbps: (target_mbps + noise).max(0.0),
            bytes,
            percent: (elapsed / total_secs * 100.0).min(100.0),
        });

        tokio::time::sleep(TICK).await;
    }

    ctx.token().ensure_active()?;
    progress.on_progress(ProgressEvent::Bandwidth {
        direction: BandwidthDirection::Download,
        speed_mbps: target_mbps,
        bytes: (target_mbps * total_secs * 1e6 / 8.0) as u64,
        percent: 100.0,
    });

    Ok(target_mbps)
}

/// Play back a simulated upload phase and return its speed.
///
/// Upload is derived from the download figure (25% to 40% of it) and
/// published as a ramp from zero up to the target, again with a
/// little noise, clamped to stay non-negative.
pub async fn upload(
    ctx: &RunContext,
    progress: &Arc<dyn ProgressCallback>,
    download_mbps: f64,
    duration: Duration,
) -> Result<f64, SpeedTestError> {
    let target_mbps = {
        let mut rng = rand::thread_rng();
        download_mbps * rng.gen_range(0.25..0.40)
    };

    let total_secs = duration.as_secs_f64();
    let started = Instant::now();

    while started.elapsed() < duration {
        ctx.token().ensure_active()?;

        let elapsed = started.elapsed().as_secs_f64();
        let noise = {
            let mut rng = rand::thread_rng();
            rng.gen_range(-1.0..1.0)
        };
        let ramp = target_mbps * (elapsed / total_secs);
        // Ramp integral, so displayed bytes stay consistent with the
        // climbing speed.
        let bytes =
            (target_mbps * elapsed * elapsed / (2.0 * total_secs) * 1e6
                / 8.0) as u64;

        progress.on_progress(ProgressEvent::Bandwidth {
            direction: BandwidthDirection::Upload,
            speed_mbps: (ramp + noise).max(0.0),
            bytes,
            percent: (elapsed / total_secs * 100.0).min(100.0),
        });

        tokio::time::sleep(TICK).await;
    }

    ctx.token().ensure_active()?;
    progress.on_progress(ProgressEvent::Bandwidth {
        direction: BandwidthDirection::Upload,
        speed_mbps: target_mbps,
        bytes: (target_mbps * total_secs * 1e6 / 8.0 / 2.0) as u64,
        percent: 100.0,
    });

    Ok(target_mbps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::context::CancelToken;
    use crate::tui::progress::NullProgress;
    use std::sync::Mutex;

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

    #[test]
    fn test_latency_figures_stay_in_range() {
        for _ in 0..100 {
            let (ping, jitter) = latency();
            assert!((15.0..40.0).contains(&ping));
            assert!((1.0..5.0).contains(&jitter));
        }
    }

    #[tokio::test]
    async fn test_download_returns_target_in_range() {
        let ctx = RunContext::new(CancelToken::new());
        let progress: Arc<dyn ProgressCallback> = Arc::new(NullProgress);

        let speed = download(&ctx, &progress, Duration::from_millis(150))
            .await
            .unwrap();
        assert!((180.0..250.0).contains(&speed));
    }

    #[tokio::test]
    async fn test_download_curve_stays_near_target() {
        let ctx = RunContext::new(CancelToken::new());
        let recorder = Recorder::new();
        let progress = Arc::clone(&recorder) as Arc<dyn ProgressCallback>;

        let target = download(&ctx, &progress, Duration::from_millis(250))
            .await
            .unwrap();

        let events = recorder.events();
        assert!(!events.is_empty());
        for event in &events {
            if let ProgressEvent::Bandwidth { speed_mbps, percent, .. } =
                event
            {
                assert!((target - speed_mbps).abs() <= 2.5 + 1e-9);
                assert!((0.0..=100.0).contains(percent));
            }
        }
        match events.last().unwrap() {
            ProgressEvent::Bandwidth { speed_mbps, percent, .. } => {
                assert!((speed_mbps - target).abs() < 1e-9);
                assert_eq!(*percent, 100.0);
            }
            other => panic!("unexpected final event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upload_ramps_toward_derived_target() {
        let ctx = RunContext::new(CancelToken::new());
        let recorder = Recorder::new();
        let progress = Arc::clone(&recorder) as Arc<dyn ProgressCallback>;

        let target =
            upload(&ctx, &progress, 100.0, Duration::from_millis(250))
                .await
                .unwrap();
        assert!((25.0..40.0).contains(&target));

        for event in recorder.events() {
            if let ProgressEvent::Bandwidth { speed_mbps, .. } = event {
                assert!(speed_mbps >= 0.0);
                assert!(speed_mbps <= target + 1.0 + 1e-9);
            }
        }
    }

    #[tokio::test]
    async fn test_cancellation_stops_playback() {
        let token = CancelToken::new();
        let ctx = RunContext::new(token.clone());
        let progress: Arc<dyn ProgressCallback> = Arc::new(NullProgress);

        let run = {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                download(&ctx, &progress, Duration::from_secs(10)).await
            })
        };

        tokio::time::sleep(Duration::from_millis(120)).await;
        token.cancel();

        let result = tokio::time::timeout(Duration::from_secs(1), run)
            .await
            .expect("cancellation should stop the simulation")
            .unwrap();
        assert!(result.unwrap_err().is_cancelled());
    }
}
