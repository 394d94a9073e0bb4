//! Durable storage contract shared by every backend

use std::sync::Arc;

use async_trait::async_trait;
use chartnotes_config::BackendKind;
use chartnotes_shared::{ChartNotesResult, ChartSettings, DataPoint, PointDraft, PointPatch};

use crate::local_store::{FileSlot, LocalStore};
use crate::remote_store::RemoteStore;

/// CRUD + settings persistence. Every implementation must behave the same:
/// ids are assigned by the backend and never reused, `get_points` returns
/// creation order, and update/delete of an unknown id fail with `NotFound`.
#[async_trait]
pub trait Backend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get_points(&self) -> ChartNotesResult<Vec<DataPoint>>;
    async fn create_point(&self, draft: PointDraft) -> ChartNotesResult<DataPoint>;
    async fn update_point(&self, id: i64, patch: PointPatch) -> ChartNotesResult<DataPoint>;
    async fn delete_point(&self, id: i64) -> ChartNotesResult<()>;
    async fn clear_all_points(&self) -> ChartNotesResult<()>;

    async fn get_settings(&self) -> ChartNotesResult<Option<ChartSettings>>;
    /// Upsert the singleton settings row
    async fn save_settings(&self, settings: ChartSettings) -> ChartNotesResult<ChartSettings>;
}

/// Open the backend selected by configuration
pub fn open_backend(kind: &BackendKind) -> ChartNotesResult<Arc<dyn Backend>> {
    match kind {
        BackendKind::Local { data_file } => {
            log::info!("Using local store at {}", data_file.display());
            Ok(Arc::new(LocalStore::new(FileSlot::new(data_file))))
        }
        BackendKind::Remote(remote) => {
            log::info!("Using remote store at {}", remote.url);
            Ok(Arc::new(RemoteStore::new(remote)?))
        }
    }
}
