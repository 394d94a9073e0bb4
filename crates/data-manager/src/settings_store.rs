//! Chart settings with debounced persistence
//!
//! Changes apply locally at once. The durable write waits for a quiet period
//! so a burst of edits (dragging a color picker, typing a title) costs a
//! single backend call carrying the final state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chartnotes_shared::{ChartNotesResult, ChartSettings};
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::backend::Backend;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

pub struct SettingsStore {
    shared: Arc<Shared>,
    delay: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
}

struct Shared {
    backend: Arc<dyn Backend>,
    current: RwLock<ChartSettings>,
    // Set by `update`, claimed under `write_lock` by whichever writer runs first
    dirty: AtomicBool,
    // Held across `save_settings`; writes land in the order they claim `dirty`
    write_lock: tokio::sync::Mutex<()>,
}

impl Shared {
    /// Persist the latest local state if a change is pending
    async fn write_pending(&self) -> ChartNotesResult<Option<ChartSettings>> {
        let _guard = self.write_lock.lock().await;
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(None);
        }
        let snapshot = self.current.read().clone();
        self.backend.save_settings(snapshot).await.map(Some)
    }
}

impl SettingsStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_delay(backend, DEFAULT_DEBOUNCE)
    }

    pub fn with_delay(backend: Arc<dyn Backend>, delay: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                backend,
                current: RwLock::new(ChartSettings::default()),
                dirty: AtomicBool::new(false),
                write_lock: tokio::sync::Mutex::new(()),
            }),
            delay,
            timer: Mutex::new(None),
        }
    }

    pub fn current(&self) -> ChartSettings {
        self.shared.current.read().clone()
    }

    pub fn has_pending_write(&self) -> bool {
        self.shared.dirty.load(Ordering::Acquire)
    }

    /// Fetch stored settings, falling back to defaults when none exist
    pub async fn load(&self) -> ChartNotesResult<ChartSettings> {
        let settings = self.shared.backend.get_settings().await?.unwrap_or_default();
        *self.shared.current.write() = settings.clone();
        Ok(settings)
    }

    /// Apply `settings` locally and (re)start the quiet-period timer.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn update(&self, settings: ChartSettings) {
        *self.shared.current.write() = settings;
        self.shared.dirty.store(true, Ordering::Release);

        let mut timer = self.timer.lock();
        if let Some(previous) = timer.take() {
            previous.abort();
        }

        let shared = Arc::clone(&self.shared);
        let delay = self.delay;
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // A write that has started is never aborted by a later update
            tokio::spawn(async move {
                if let Err(e) = shared.write_pending().await {
                    log::warn!("failed to persist chart settings: {e}");
                }
            });
        }));
    }

    /// Change one field by its wire name and schedule the write
    pub fn set_field(&self, key: &str, value: &str) -> ChartNotesResult<ChartSettings> {
        let mut settings = self.current();
        settings.set_field(key, value)?;
        self.update(settings.clone());
        Ok(settings)
    }

    /// Cancel the timer, wait for any write in flight and write the pending
    /// state now.
    ///
    /// Returns the settings this call persisted, or `None` when nothing was
    /// left pending.
    pub async fn flush(&self) -> ChartNotesResult<Option<ChartSettings>> {
        if let Some(timer) = self.timer.lock().take() {
            timer.abort();
        }
        let saved = self.shared.write_pending().await?;
        if saved.is_some() {
            log::debug!("flushed pending chart settings");
        }
        Ok(saved)
    }
}
