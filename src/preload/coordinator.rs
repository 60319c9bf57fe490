//! Reference-image preloading.
//!
//! One run per path set: `Idle → Loading → Complete`. After an optional start
//! delay every image is requested at once (no throttling). Each load, success
//! or failure, bumps `loaded` by one; once all have settled `is_complete`
//! flips to true. Completion order is unspecified.
//!
//! Tearing a run down cancels the pending start and stops all further state
//! updates. A new path set always gets a fresh run and a fresh state.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::fetcher::{ImageCache, ImageFetcher};
use super::state::{PreloadOutcome, PreloadState};
use super::{image_url, PreloadConfig};

/// Shutdown flag shared by a run and its handle.
///
/// The driver publishes state and cache entries only while holding the lock,
/// so once `shut_down` returns nothing from the run can land.
#[derive(Debug, Clone, Default)]
struct RunGate {
    shutdown: Arc<Mutex<bool>>,
}

impl RunGate {
    fn shut_down(&self) {
        let mut shutdown = self.shutdown.lock().unwrap_or_else(|e| e.into_inner());
        *shutdown = true;
    }

    /// Run `publish` unless the run was shut down. Returns whether it ran.
    fn publish(&self, publish: impl FnOnce()) -> bool {
        let shutdown = self.shutdown.lock().unwrap_or_else(|e| e.into_inner());
        if *shutdown {
            return false;
        }
        publish();
        true
    }
}

/// Live view of one preload run. Dropping it tears the run down.
pub struct PreloadHandle {
    state: watch::Receiver<PreloadState>,
    gate: RunGate,
    task: Option<JoinHandle<PreloadOutcome>>,
    outcome: Option<PreloadOutcome>,
}

impl PreloadHandle {
    /// Handle for a run with nothing to load.
    fn finished_empty() -> Self {
        let (_tx, rx) = watch::channel(PreloadState::finished_empty());
        Self {
            state: rx,
            gate: RunGate::default(),
            task: None,
            outcome: Some(PreloadOutcome {
                success: true,
                failed_images: Vec::new(),
                total_images: 0,
            }),
        }
    }

    /// Current snapshot.
    pub fn state(&self) -> PreloadState {
        *self.state.borrow()
    }

    /// Receiver for progress updates. Closed once the run ends or is torn down.
    pub fn subscribe(&self) -> watch::Receiver<PreloadState> {
        self.state.clone()
    }

    /// Wait for the run to finish. `None` if it was torn down first.
    pub async fn join(&mut self) -> Option<PreloadOutcome> {
        if let Some(task) = self.task.take() {
            match task.await {
                Ok(outcome) => self.outcome = Some(outcome),
                Err(e) if e.is_cancelled() => {}
                Err(e) => warn!(error = %e, "Preload task failed"),
            }
        }
        self.outcome.clone()
    }

    /// Cancel the pending start and any in-flight loads.
    ///
    /// No state update or cache entry from this run is published after this returns,
    /// even if the driver is mid-poll on another worker.
    pub fn teardown(&mut self) {
        if let Some(task) = self.task.take() {
            self.gate.shut_down();
            task.abort();
            debug!("Preload run torn down");
        }
    }
}

impl Drop for PreloadHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Start a preload run for `paths`. Must be called inside a tokio runtime.
pub fn start_preload(
    config: &PreloadConfig,
    fetcher: Arc<dyn ImageFetcher>,
    cache: ImageCache,
    paths: Vec<String>,
) -> PreloadHandle {
    if !config.enabled || paths.is_empty() {
        debug!(enabled = config.enabled, "Nothing to preload");
        return PreloadHandle::finished_empty();
    }

    let (tx, rx) = watch::channel(PreloadState::default());
    let gate = RunGate::default();
    let task = tokio::spawn(drive(
        fetcher,
        cache,
        config.image_base_path.clone(),
        paths,
        config.start_delay,
        tx,
        gate.clone(),
    ));

    PreloadHandle {
        state: rx,
        gate,
        task: Some(task),
        outcome: None,
    }
}

async fn drive(
    fetcher: Arc<dyn ImageFetcher>,
    cache: ImageCache,
    base_path: String,
    paths: Vec<String>,
    start_delay: Duration,
    tx: watch::Sender<PreloadState>,
    gate: RunGate,
) -> PreloadOutcome {
    if !start_delay.is_zero() {
        tokio::time::sleep(start_delay).await;
    }

    let total = paths.len();
    let mut failed = vec![false; total];
    if !gate.publish(|| {
        tx.send_replace(PreloadState::loading(total));
    }) {
        return torn_down(paths, failed);
    }
    info!(total, "Preloading reference images");

    let mut pending: FuturesUnordered<_> = paths
        .iter()
        .enumerate()
        .map(|(index, path)| {
            let fetcher = fetcher.clone();
            let url = image_url(&base_path, path);
            async move { (index, fetcher.fetch(&url).await) }
        })
        .collect();

    while let Some((index, result)) = pending.next().await {
        let path = &paths[index];
        let published = match result {
            Ok(bytes) => {
                debug!(path = %path, size = bytes.len(), "Preloaded image");
                gate.publish(|| {
                    cache.insert(path, bytes);
                    tx.send_modify(PreloadState::record_settled);
                })
            }
            Err(e) => {
                warn!(path = %path, error = %e, "Failed to preload image");
                failed[index] = true;
                gate.publish(|| tx.send_modify(PreloadState::record_settled))
            }
        };
        if !published {
            return torn_down(paths, failed);
        }
    }

    if !gate.publish(|| {
        tx.send_modify(|state| {
            state.mark_complete();
        });
    }) {
        return torn_down(paths, failed);
    }

    let failed_images = failed_paths(paths, failed);
    info!(
        failed = failed_images.len(),
        total,
        "Image preloading completed"
    );

    PreloadOutcome {
        success: failed_images.is_empty(),
        failed_images,
        total_images: total,
    }
}

fn failed_paths(paths: Vec<String>, failed: Vec<bool>) -> Vec<String> {
    paths
        .into_iter()
        .zip(failed)
        .filter_map(|(path, failed)| failed.then_some(path))
        .collect()
}

/// Outcome of a run stopped by teardown. Nobody observes it; the handle
/// has already given up the task.
fn torn_down(paths: Vec<String>, failed: Vec<bool>) -> PreloadOutcome {
    debug!("Preload run stopped after teardown");
    let total_images = paths.len();
    PreloadOutcome {
        success: false,
        failed_images: failed_paths(paths, failed),
        total_images,
    }
}

/// Owns the preload run for one gallery view.
pub struct PreloadCoordinator {
    config: PreloadConfig,
    fetcher: Arc<dyn ImageFetcher>,
    cache: ImageCache,
    active: Option<PreloadHandle>,
}

impl PreloadCoordinator {
    pub fn new(config: PreloadConfig, fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self {
            config,
            fetcher,
            cache: ImageCache::new(),
            active: None,
        }
    }

    /// Share an existing cache, e.g. with the gallery renderer.
    pub fn with_cache(mut self, cache: ImageCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &PreloadConfig {
        &self.config
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    /// Begin a fresh run for `paths`, discarding any previous run.
    pub fn start(&mut self, paths: Vec<String>) -> watch::Receiver<PreloadState> {
        self.teardown();
        let handle = start_preload(&self.config, self.fetcher.clone(), self.cache.clone(), paths);
        let rx = handle.subscribe();
        self.active = Some(handle);
        rx
    }

    /// Snapshot of the active run, or `Idle` if none.
    pub fn state(&self) -> PreloadState {
        self.active
            .as_ref()
            .map(PreloadHandle::state)
            .unwrap_or_default()
    }

    /// Wait for the active run to finish.
    pub async fn join(&mut self) -> Option<PreloadOutcome> {
        match self.active.as_mut() {
            Some(handle) => handle.join().await,
            None => None,
        }
    }

    /// Stop the active run, e.g. when the gallery unmounts.
    pub fn teardown(&mut self) {
        if let Some(mut handle) = self.active.take() {
            handle.teardown();
        }
    }
}
