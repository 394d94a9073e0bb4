//! Local embedded store: the whole state in one durable slot

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chartnotes_shared::{
    ChartNotesError, ChartNotesResult, ChartSettings, DataPoint, PointDraft, PointPatch,
};
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::backend::Backend;

/// A single durable key/value slot holding the serialized store
#[async_trait]
pub trait StorageSlot: Send + Sync {
    /// `None` when nothing has been written yet
    async fn read(&self) -> ChartNotesResult<Option<String>>;
    async fn write(&self, contents: &str) -> ChartNotesResult<()>;
}

/// Slot kept in memory, for tests and ephemeral sessions
#[derive(Default)]
pub struct MemorySlot {
    contents: Mutex<Option<String>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Mutex::new(Some(contents.into())),
        }
    }
}

#[async_trait]
impl StorageSlot for MemorySlot {
    async fn read(&self) -> ChartNotesResult<Option<String>> {
        Ok(self.contents.lock().clone())
    }

    async fn write(&self, contents: &str) -> ChartNotesResult<()> {
        *self.contents.lock() = Some(contents.to_string());
        Ok(())
    }
}

/// Slot backed by a JSON file, replaced atomically on every write
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StorageSlot for FileSlot {
    async fn read(&self) -> ChartNotesResult<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, contents: &str) -> ChartNotesResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// Persisted layout: `{ "points": [...], "nextId": n, "settings": {...} }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreState {
    #[serde(default)]
    pub points: Vec<DataPoint>,
    #[serde(default = "first_id")]
    pub next_id: i64,
    #[serde(default)]
    pub settings: Option<ChartSettings>,
}

fn first_id() -> i64 {
    1
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            next_id: first_id(),
            settings: None,
        }
    }
}

impl StoreState {
    fn position(&self, id: i64) -> ChartNotesResult<usize> {
        self.points
            .iter()
            .position(|p| p.id == id)
            .ok_or(ChartNotesError::NotFound { id })
    }
}

/// Backend keeping points, the id counter and settings in one slot.
///
/// The id counter only moves forward: clearing the points leaves it where
/// it is, so an id is never issued twice.
pub struct LocalStore<S> {
    slot: S,
    // Serializes read-modify-write cycles on the slot
    write_lock: tokio::sync::Mutex<()>,
}

impl<S: StorageSlot> LocalStore<S> {
    pub fn new(slot: S) -> Self {
        Self {
            slot,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn slot(&self) -> &S {
        &self.slot
    }

    /// Current persisted state (defaults when the slot is empty)
    pub async fn state(&self) -> ChartNotesResult<StoreState> {
        let _guard = self.write_lock.lock().await;
        self.load().await
    }

    async fn load(&self) -> ChartNotesResult<StoreState> {
        let Some(contents) = self.slot.read().await? else {
            return Ok(StoreState::default());
        };
        let mut state: StoreState = serde_json::from_str(&contents)?;
        // A hand-edited file must not make the counter reissue an existing id
        let floor = state.points.iter().map(|p| p.id + 1).max().unwrap_or(1);
        state.next_id = state.next_id.max(floor);
        Ok(state)
    }

    async fn transact<T: Send>(
        &self,
        f: impl FnOnce(&mut StoreState) -> ChartNotesResult<T> + Send,
    ) -> ChartNotesResult<T> {
        let _guard = self.write_lock.lock().await;
        let mut state = self.load().await?;
        let out = f(&mut state)?;
        self.slot.write(&serde_json::to_string_pretty(&state)?).await?;
        Ok(out)
    }
}

#[async_trait]
impl<S: StorageSlot + 'static> Backend for LocalStore<S> {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn get_points(&self) -> ChartNotesResult<Vec<DataPoint>> {
        Ok(self.state().await?.points)
    }

    async fn create_point(&self, draft: PointDraft) -> ChartNotesResult<DataPoint> {
        self.transact(|state| {
            let point = DataPoint::from_draft(state.next_id, draft, Utc::now());
            state.next_id += 1;
            state.points.push(point.clone());
            Ok(point)
        })
        .await
    }

    async fn update_point(&self, id: i64, patch: PointPatch) -> ChartNotesResult<DataPoint> {
        self.transact(|state| {
            let idx = state.position(id)?;
            state.points[idx].apply(&patch);
            Ok(state.points[idx].clone())
        })
        .await
    }

    async fn delete_point(&self, id: i64) -> ChartNotesResult<()> {
        self.transact(|state| {
            let idx = state.position(id)?;
            state.points.remove(idx);
            Ok(())
        })
        .await
    }

    async fn clear_all_points(&self) -> ChartNotesResult<()> {
        self.transact(|state| {
            state.points.clear();
            Ok(())
        })
        .await
    }

    async fn get_settings(&self) -> ChartNotesResult<Option<ChartSettings>> {
        Ok(self.state().await?.settings)
    }

    async fn save_settings(&self, settings: ChartSettings) -> ChartNotesResult<ChartSettings> {
        self.transact(|state| {
            state.settings = Some(settings.clone());
            Ok(settings)
        })
        .await
    }
}
