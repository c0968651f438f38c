//! Timed capture scheduler.
//!
//! A [`CaptureScheduler`] owns at most one background capture loop. The
//! loop takes a frame from the shared camera, persists it, then waits
//! until one interval after the start of that capture. Capture mode and
//! the interval can be changed from any thread while the loop runs.

use super::settings::{
    parse_interval, FailurePolicy, IntervalBounds, InvalidArgument, DEFAULT_CAPTURE_INTERVAL,
};
use crate::camera::{CameraController, CameraError};
use crate::metrics::MetricsRegistry;
use crate::storage::{CaptureStore, CapturedImage, StoreError};
use serde::Serialize;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// A single capture that did not make it to storage.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("camera failed: {0}")]
    Camera(#[from] CameraError),
    #[error("failed to persist capture: {0}")]
    Store(#[from] StoreError),
}

/// Errors returned by [`CaptureScheduler`] operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    InvalidArgument(#[from] InvalidArgument),
    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to start capture loop: {0}")]
    Spawn(#[source] io::Error),
}

/// Point-in-time view of the scheduler, as served by the config endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureStatus {
    /// Seconds between capture starts.
    pub interval: u64,
    /// Smallest accepted interval.
    pub min_interval: u64,
    /// Largest accepted interval.
    pub max_interval: u64,
    /// Whether capture mode is on.
    pub capturing: bool,
    /// Whether a capture loop is alive.
    pub running: bool,
    /// Captures currently stored.
    pub total_captures: u64,
    /// Behaviour after a failed capture.
    pub on_failure: FailurePolicy,
}

#[derive(Default)]
struct Worker {
    handle: Option<JoinHandle<()>>,
    retired: Vec<JoinHandle<()>>,
    running: bool,
    generation: u64,
}

struct Shared {
    camera: CameraController,
    store: Arc<CaptureStore>,
    bounds: IntervalBounds,
    on_failure: FailurePolicy,
    metrics: Option<MetricsRegistry>,
    interval: AtomicU64,
    capturing: AtomicBool,
    worker: Mutex<Worker>,
    wake: Condvar,
}

impl Shared {
    fn worker(&self) -> MutexGuard<'_, Worker> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(self.interval.load(Ordering::SeqCst))
    }

    fn capture_once(&self) -> Result<CapturedImage, CaptureError> {
        let result = self
            .camera
            .get_frame()
            .map_err(CaptureError::from)
            .and_then(|frame| self.store.persist(&frame).map_err(CaptureError::from));

        if let Some(metrics) = &self.metrics {
            match &result {
                Ok(_) => metrics.capture_succeeded(),
                Err(_) => metrics.capture_failed(),
            }
        }
        result
    }
}

/// Clears the running marker of a loop that unwinds.
///
/// Normal exits clear it under the worker lock. The generation check keeps
/// a finished loop from touching the marker of the loop that replaced it.
struct RunningGuard<'a> {
    shared: &'a Shared,
    generation: u64,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            error!("Capture loop panicked");
            let mut worker = self.shared.worker();
            if worker.generation == self.generation {
                worker.running = false;
            }
        }
    }
}

fn run_loop(shared: Arc<Shared>, generation: u64) {
    let _guard = RunningGuard {
        shared: &shared,
        generation,
    };
    info!(interval_secs = shared.interval().as_secs(), "Capture loop started");

    loop {
        if !shared.capturing.load(Ordering::SeqCst) {
            // Re-check under the lock so a concurrent restart is not lost.
            let mut worker = shared.worker();
            if !shared.capturing.load(Ordering::SeqCst) {
                worker.running = false;
                break;
            }
            continue;
        }

        let started = Instant::now();
        match shared.capture_once() {
            Ok(image) => {
                debug!(id = image.id, path = %image.relative_path.display(), "Scheduled capture stored");
            }
            Err(e) => match shared.on_failure {
                FailurePolicy::Stop => {
                    error!(error = %e, "Scheduled capture failed, stopping capture mode");
                    let mut worker = shared.worker();
                    shared.capturing.store(false, Ordering::SeqCst);
                    worker.running = false;
                    break;
                }
                FailurePolicy::Continue => {
                    warn!(error = %e, "Scheduled capture failed");
                }
            },
        }

        let mut worker = shared.worker();
        while shared.capturing.load(Ordering::SeqCst) {
            let deadline = started + shared.interval();
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            worker = shared
                .wake
                .wait_timeout(worker, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }
    }

    info!("Capture loop stopped");
}

/// Builder for [`CaptureScheduler`].
pub struct CaptureSchedulerBuilder {
    camera: CameraController,
    store: Arc<CaptureStore>,
    interval: u64,
    bounds: IntervalBounds,
    on_failure: FailurePolicy,
    metrics: Option<MetricsRegistry>,
}

impl CaptureSchedulerBuilder {
    /// Initial interval in seconds.
    pub fn interval(mut self, seconds: u64) -> Self {
        self.interval = seconds;
        self
    }

    /// Accepted interval range.
    pub fn bounds(mut self, bounds: IntervalBounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Behaviour after a failed scheduled capture.
    pub fn on_failure(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }

    /// Registry to count captures in.
    pub fn metrics(mut self, metrics: MetricsRegistry) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Validates the initial interval and builds an idle scheduler.
    pub fn build(self) -> Result<CaptureScheduler, SchedulerError> {
        let interval = self.bounds.check(self.interval)?;
        Ok(CaptureScheduler {
            shared: Arc::new(Shared {
                camera: self.camera,
                store: self.store,
                bounds: self.bounds,
                on_failure: self.on_failure,
                metrics: self.metrics,
                interval: AtomicU64::new(interval),
                capturing: AtomicBool::new(false),
                worker: Mutex::new(Worker::default()),
                wake: Condvar::new(),
            }),
        })
    }
}

/// Handle to the capture scheduler. Clones share the same loop.
#[derive(Clone)]
pub struct CaptureScheduler {
    shared: Arc<Shared>,
}

impl CaptureScheduler {
    /// Starts building a scheduler over the shared camera and store.
    pub fn builder(camera: CameraController, store: Arc<CaptureStore>) -> CaptureSchedulerBuilder {
        CaptureSchedulerBuilder {
            camera,
            store,
            interval: DEFAULT_CAPTURE_INTERVAL,
            bounds: IntervalBounds::default(),
            on_failure: FailurePolicy::default(),
            metrics: None,
        }
    }

    /// Sets the interval from a raw form value.
    ///
    /// Invalid values leave the interval unchanged. A running loop picks
    /// the new value up during its current wait.
    pub fn update_interval(&self, raw: &str) -> Result<u64, SchedulerError> {
        let seconds = parse_interval(raw, self.shared.bounds)?;
        self.store_interval(seconds);
        Ok(seconds)
    }

    /// Sets the interval in seconds, with the same validation as [`update_interval`](Self::update_interval).
    pub fn set_interval(&self, seconds: u64) -> Result<u64, SchedulerError> {
        let seconds = self.shared.bounds.check(seconds)?;
        self.store_interval(seconds);
        Ok(seconds)
    }

    fn store_interval(&self, seconds: u64) {
        let _worker = self.shared.worker();
        self.shared.interval.store(seconds, Ordering::SeqCst);
        self.shared.wake.notify_all();
        info!(interval_secs = seconds, "Capture interval updated");
    }

    /// Current interval in seconds.
    pub fn interval(&self) -> u64 {
        self.shared.interval.load(Ordering::SeqCst)
    }

    /// Turns capture mode on or off.
    ///
    /// Turning it on starts a loop unless one is already running. Turning
    /// it off ends the current wait at once; a capture already in flight
    /// completes first.
    pub fn set_capturing(&self, capturing: bool) -> Result<(), SchedulerError> {
        let mut worker = self.shared.worker();
        self.shared.capturing.store(capturing, Ordering::SeqCst);

        if capturing {
            if worker.running {
                debug!("Capture loop already running");
            } else {
                let shared = Arc::clone(&self.shared);
                let generation = worker.generation + 1;
                let spawned = thread::Builder::new()
                    .name("capture-loop".to_string())
                    .spawn(move || run_loop(shared, generation));
                match spawned {
                    Ok(handle) => {
                        worker.running = true;
                        worker.generation = generation;
                        // The previous loop has cleared its marker but may still be unwinding.
                        worker.retired.retain(|old| !old.is_finished());
                        if let Some(old) = worker.handle.replace(handle) {
                            worker.retired.push(old);
                        }
                    }
                    Err(e) => {
                        self.shared.capturing.store(false, Ordering::SeqCst);
                        return Err(SchedulerError::Spawn(e));
                    }
                }
            }
        } else {
            info!("Capture mode stopping");
        }

        self.shared.wake.notify_all();
        Ok(())
    }

    /// Whether capture mode is on.
    pub fn is_capturing(&self) -> bool {
        self.shared.capturing.load(Ordering::SeqCst)
    }

    /// Whether a capture loop is alive.
    pub fn is_running(&self) -> bool {
        self.shared.worker().running
    }

    /// Takes one frame and persists it, independent of capture mode.
    pub fn capture_once(&self) -> Result<CapturedImage, SchedulerError> {
        let image = self.shared.capture_once()?;
        info!(id = image.id, path = %image.relative_path.display(), "Capture stored");
        Ok(image)
    }

    /// Deletes every stored capture. Returns how many were removed.
    pub fn remove_all_captures(&self) -> Result<usize, SchedulerError> {
        Ok(self.shared.store.remove_all()?)
    }

    /// Current settings and capture count.
    pub fn status(&self) -> Result<CaptureStatus, SchedulerError> {
        let total_captures = self.shared.store.count()?;
        Ok(CaptureStatus {
            interval: self.interval(),
            min_interval: self.shared.bounds.min,
            max_interval: self.shared.bounds.max,
            capturing: self.is_capturing(),
            running: self.is_running(),
            total_captures,
            on_failure: self.shared.on_failure,
        })
    }

    /// Stops capture mode and waits for every loop thread to finish.
    pub fn shutdown(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut worker = self.shared.worker();
            self.shared.capturing.store(false, Ordering::SeqCst);
            self.shared.wake.notify_all();
            let mut handles = std::mem::take(&mut worker.retired);
            handles.extend(worker.handle.take());
            handles
        };

        for handle in handles {
            if handle.join().is_err() {
                error!("Capture loop terminated by panic");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{FrameSource, SyntheticCamera};
    use crate::storage::{FileStore, SqliteCatalog};
    use bytes::Bytes;
    use proptest::prelude::*;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;
    use tempfile::TempDir;

    const JPEG: &[u8] = include_bytes!("../../assets/frames/1.jpg");

    fn store_in(dir: &Path) -> Arc<CaptureStore> {
        Arc::new(CaptureStore::new(
            FileStore::new(dir),
            SqliteCatalog::open_in_memory().unwrap(),
        ))
    }

    fn scheduler_with(
        source: impl FrameSource + 'static,
        interval: u64,
        policy: FailurePolicy,
    ) -> (CaptureScheduler, Arc<CaptureStore>, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let scheduler = CaptureScheduler::builder(CameraController::new(Arc::new(source)), Arc::clone(&store))
            .interval(interval)
            .on_failure(policy)
            .build()
            .unwrap();
        (scheduler, store, dir)
    }

    fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    fn count_files(root: &Path) -> usize {
        let Ok(entries) = std::fs::read_dir(root) else {
            return 0;
        };
        entries
            .flatten()
            .map(|e| {
                let path: PathBuf = e.path();
                if path.is_dir() {
                    count_files(&path)
                } else {
                    1
                }
            })
            .sum()
    }

    /// Serves `limit` frames, then parks the caller until released and fails.
    struct GatedSource {
        served: AtomicUsize,
        limit: usize,
        reached: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl FrameSource for GatedSource {
        fn get_frame(&self) -> Result<Bytes, CameraError> {
            if self.served.fetch_add(1, Ordering::SeqCst) < self.limit {
                return Ok(Bytes::from_static(JPEG));
            }
            let _ = self.reached.lock().unwrap().send(());
            let _ = self.release.lock().unwrap().recv();
            Err(CameraError::Hardware("gate closed".to_string()))
        }

        fn name(&self) -> &'static str {
            "gated"
        }
    }

    /// Fails the first `failures` calls, then serves frames.
    struct FlakySource {
        calls: AtomicUsize,
        failures: usize,
    }

    impl FrameSource for FlakySource {
        fn get_frame(&self) -> Result<Bytes, CameraError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                Err(CameraError::Hardware("sensor timeout".to_string()))
            } else {
                Ok(Bytes::from_static(JPEG))
            }
        }

        fn name(&self) -> &'static str {
            "flaky"
        }
    }

    /// Records how many callers are inside `get_frame` at once.
    #[derive(Default, Clone)]
    struct OverlapSource {
        calls: Arc<AtomicUsize>,
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl FrameSource for OverlapSource {
        fn get_frame(&self) -> Result<Bytes, CameraError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(1));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(Bytes::from_static(JPEG))
        }

        fn name(&self) -> &'static str {
            "overlap"
        }
    }

    struct PanickingSource;

    impl FrameSource for PanickingSource {
        fn get_frame(&self) -> Result<Bytes, CameraError> {
            panic!("sensor driver crashed");
        }

        fn name(&self) -> &'static str {
            "panicking"
        }
    }

    #[test]
    fn test_initial_interval_is_validated() {
        let dir = tempfile::tempdir().unwrap();
        let camera = CameraController::new(Arc::new(SyntheticCamera::builtin()));
        let result = CaptureScheduler::builder(camera, store_in(dir.path()))
            .interval(601)
            .build();
        assert!(matches!(result, Err(SchedulerError::InvalidArgument(_))));
    }

    #[test]
    fn test_invalid_interval_leaves_value_unchanged() {
        let (scheduler, _store, _dir) = scheduler_with(SyntheticCamera::builtin(), 60, FailurePolicy::Stop);

        for raw in ["", "-1", "601", "abc", "5.5"] {
            assert!(matches!(
                scheduler.update_interval(raw),
                Err(SchedulerError::InvalidArgument(_))
            ));
            assert_eq!(scheduler.interval(), 60);
        }
        assert_eq!(scheduler.update_interval("0").unwrap(), 0);
        assert_eq!(scheduler.set_interval(600).unwrap(), 600);
        assert!(scheduler.set_interval(601).is_err());
        assert_eq!(scheduler.interval(), 600);
    }

    #[test]
    fn test_status_reports_settings() {
        let (scheduler, store, _dir) = scheduler_with(SyntheticCamera::builtin(), 30, FailurePolicy::Stop);
        store.persist(JPEG).unwrap();

        let status = scheduler.status().unwrap();
        assert_eq!(
            status,
            CaptureStatus {
                interval: 30,
                min_interval: 0,
                max_interval: 600,
                capturing: false,
                running: false,
                total_captures: 1,
                on_failure: FailurePolicy::Stop,
            }
        );
    }

    #[test]
    fn test_capture_once_persists() {
        let (scheduler, store, dir) = scheduler_with(SyntheticCamera::builtin(), 60, FailurePolicy::Stop);

        let image = scheduler.capture_once().unwrap();

        assert_eq!(store.count().unwrap(), 1);
        let written = std::fs::read(dir.path().join(&image.relative_path)).unwrap();
        assert_eq!(&written[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_capture_once_camera_failure_writes_nothing() {
        let source = FlakySource {
            calls: AtomicUsize::new(0),
            failures: 1,
        };
        let (scheduler, store, dir) = scheduler_with(source, 60, FailurePolicy::Stop);

        assert!(matches!(
            scheduler.capture_once(),
            Err(SchedulerError::Capture(CaptureError::Camera(_)))
        ));
        assert_eq!(store.count().unwrap(), 0);
        assert_eq!(count_files(dir.path()), 0);
    }

    #[test]
    fn test_capture_once_storage_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let blocked = dir.path().join("blocked");
        std::fs::write(&blocked, b"").unwrap();
        let store = store_in(&blocked);
        let scheduler = CaptureScheduler::builder(
            CameraController::new(Arc::new(SyntheticCamera::builtin())),
            Arc::clone(&store),
        )
        .build()
        .unwrap();

        assert!(matches!(
            scheduler.capture_once(),
            Err(SchedulerError::Capture(CaptureError::Store(_)))
        ));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_start_is_idempotent() {
        let (scheduler, store, _dir) = scheduler_with(SyntheticCamera::builtin(), 600, FailurePolicy::Stop);

        scheduler.set_capturing(true).unwrap();
        scheduler.set_capturing(true).unwrap();
        assert!(wait_until(Duration::from_secs(5), || store.count().unwrap() >= 1));
        thread::sleep(Duration::from_millis(100));

        assert_eq!(store.count().unwrap(), 1);
        assert!(scheduler.is_running());
        scheduler.shutdown();
        assert!(!scheduler.is_running());
    }

    #[test]
    fn test_stop_interrupts_wait() {
        let (scheduler, store, _dir) = scheduler_with(SyntheticCamera::builtin(), 600, FailurePolicy::Stop);

        scheduler.set_capturing(true).unwrap();
        assert!(wait_until(Duration::from_secs(5), || store.count().unwrap() == 1));

        scheduler.set_capturing(false).unwrap();
        assert!(wait_until(Duration::from_secs(2), || !scheduler.is_running()));
        assert!(!scheduler.is_capturing());
    }

    #[test]
    fn test_shorter_interval_rearms_wait() {
        let (scheduler, store, _dir) = scheduler_with(SyntheticCamera::builtin(), 600, FailurePolicy::Stop);

        scheduler.set_capturing(true).unwrap();
        assert!(wait_until(Duration::from_secs(5), || store.count().unwrap() == 1));

        scheduler.update_interval("0").unwrap();
        assert!(wait_until(Duration::from_secs(5), || store.count().unwrap() >= 2));
        scheduler.shutdown();
    }

    #[test]
    fn test_session_persists_every_capture_then_remove_all() {
        let (reached_tx, reached_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let source = GatedSource {
            served: AtomicUsize::new(0),
            limit: 3,
            reached: Mutex::new(reached_tx),
            release: Mutex::new(release_rx),
        };
        let (scheduler, store, dir) = scheduler_with(source, 0, FailurePolicy::Stop);

        scheduler.set_capturing(true).unwrap();
        reached_rx.recv_timeout(Duration::from_secs(10)).unwrap();
        scheduler.set_capturing(false).unwrap();
        release_tx.send(()).unwrap();

        assert!(wait_until(Duration::from_secs(5), || !scheduler.is_running()));
        assert_eq!(store.count().unwrap(), 3);
        assert_eq!(count_files(dir.path()), 3);

        assert_eq!(scheduler.remove_all_captures().unwrap(), 3);
        assert_eq!(store.count().unwrap(), 0);
        assert_eq!(count_files(dir.path()), 0);
    }

    #[test]
    fn test_failure_policy_stop_ends_session() {
        let source = FlakySource {
            calls: AtomicUsize::new(0),
            failures: usize::MAX,
        };
        let (scheduler, store, _dir) = scheduler_with(source, 0, FailurePolicy::Stop);

        scheduler.set_capturing(true).unwrap();

        assert!(wait_until(Duration::from_secs(5), || !scheduler.is_running()));
        assert!(!scheduler.is_capturing());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_failure_policy_continue_keeps_going() {
        let source = FlakySource {
            calls: AtomicUsize::new(0),
            failures: 2,
        };
        let (scheduler, store, _dir) = scheduler_with(source, 0, FailurePolicy::Continue);

        scheduler.set_capturing(true).unwrap();

        assert!(wait_until(Duration::from_secs(5), || store.count().unwrap() >= 2));
        assert!(scheduler.is_capturing());
        scheduler.shutdown();
        assert!(!scheduler.is_running());
    }

    #[test]
    fn test_restart_race_never_loses_loop() {
        let (scheduler, _store, _dir) = scheduler_with(SyntheticCamera::builtin(), 600, FailurePolicy::Continue);

        for _ in 0..50 {
            scheduler.set_capturing(true).unwrap();
            scheduler.set_capturing(false).unwrap();
        }
        scheduler.set_capturing(true).unwrap();
        thread::sleep(Duration::from_millis(50));

        assert!(scheduler.is_capturing());
        assert!(scheduler.is_running());
        scheduler.shutdown();
    }

    #[test]
    fn test_restart_after_loop_exit_keeps_single_loop() {
        let source = OverlapSource::default();
        let (calls, peak) = (Arc::clone(&source.calls), Arc::clone(&source.peak));
        let (scheduler, _store, _dir) = scheduler_with(source, 0, FailurePolicy::Continue);

        for _ in 0..20 {
            let before = calls.load(Ordering::SeqCst);
            scheduler.set_capturing(true).unwrap();
            assert!(wait_until(Duration::from_secs(2), || calls.load(Ordering::SeqCst) > before));

            scheduler.set_capturing(false).unwrap();
            assert!(wait_until(Duration::from_secs(2), || !scheduler.is_running()));

            // The old thread may still be winding down here.
            scheduler.set_capturing(true).unwrap();
            assert!(scheduler.is_running());
        }

        thread::sleep(Duration::from_millis(20));
        assert!(scheduler.is_running());
        assert_eq!(peak.load(Ordering::SeqCst), 1);

        scheduler.shutdown();
        assert!(!scheduler.is_running());
        let settled = calls.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(calls.load(Ordering::SeqCst), settled);
    }

    #[test]
    fn test_panicking_loop_clears_running() {
        let (scheduler, _store, _dir) = scheduler_with(PanickingSource, 0, FailurePolicy::Stop);

        scheduler.set_capturing(true).unwrap();
        assert!(wait_until(Duration::from_secs(2), || !scheduler.is_running()));
        assert!(scheduler.is_capturing());

        // A fresh loop can be started after the crash.
        scheduler.set_capturing(true).unwrap();
        assert!(wait_until(Duration::from_secs(2), || !scheduler.is_running()));

        scheduler.shutdown();
        assert!(!scheduler.is_capturing());
    }

    #[test]
    fn test_metrics_count_captures() {
        let dir = tempfile::tempdir().unwrap();
        let metrics = MetricsRegistry::new().unwrap();
        let source = FlakySource {
            calls: AtomicUsize::new(0),
            failures: 1,
        };
        let scheduler = CaptureScheduler::builder(CameraController::new(Arc::new(source)), store_in(dir.path()))
            .metrics(metrics.clone())
            .build()
            .unwrap();

        assert!(scheduler.capture_once().is_err());
        scheduler.capture_once().unwrap();

        let output = metrics.encode().unwrap();
        assert!(output.contains("picamera_captures_total 1"));
        assert!(output.contains("picamera_capture_failures_total 1"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn update_interval_accepts_exactly_the_bounds(v in 0u64..2_000) {
            let (scheduler, _store, _dir) = scheduler_with(SyntheticCamera::builtin(), 60, FailurePolicy::Stop);
            let result = scheduler.update_interval(&v.to_string());
            if v <= 600 {
                prop_assert_eq!(result.unwrap(), v);
                prop_assert_eq!(scheduler.interval(), v);
            } else {
                prop_assert!(result.is_err());
                prop_assert_eq!(scheduler.interval(), 60);
            }
        }
    }
}
