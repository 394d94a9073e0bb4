//! In-memory point collection kept in step with a backend
//!
//! Every mutator applies its change locally first, then makes the durable
//! call and swaps in the backend's canonical row. A failed call is returned
//! to the caller and the local state is left as it stands; `reload` brings it
//! back in line with the backend.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chartnotes_renderer::{ChartLayout, LayoutOptions};
use chartnotes_shared::{
    ChartNotesError, ChartNotesResult, ChartSettings, DataPoint, PointDraft, PointPatch,
};
use chrono::Utc;
use parking_lot::RwLock;

use crate::backend::Backend;
use crate::import::parse_paste;

/// Outcome of a bulk paste import
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkReport {
    pub created: Vec<DataPoint>,
    pub skipped_rows: Vec<usize>,
}

/// Ordered points for one client session.
///
/// Clones share the same collection and backend.
#[derive(Clone)]
pub struct PointStore {
    backend: Arc<dyn Backend>,
    points: Arc<RwLock<Vec<DataPoint>>>,
    // Placeholders count down from -1 so they never collide with backend ids
    next_placeholder: Arc<AtomicI64>,
}

impl PointStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            points: Arc::new(RwLock::new(Vec::new())),
            next_placeholder: Arc::new(AtomicI64::new(-1)),
        }
    }

    /// Create a store already filled from the backend
    pub async fn open(backend: Arc<dyn Backend>) -> ChartNotesResult<Self> {
        let store = Self::new(backend);
        store.reload().await?;
        Ok(store)
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Snapshot of the points in series order
    pub fn list(&self) -> Vec<DataPoint> {
        self.points.read().clone()
    }

    pub fn get(&self, id: i64) -> Option<DataPoint> {
        self.points.read().iter().find(|p| p.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.points.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.read().is_empty()
    }

    /// Replace local state with the backend's view
    pub async fn reload(&self) -> ChartNotesResult<Vec<DataPoint>> {
        let points = self.backend.get_points().await?;
        log::debug!("loaded {} points from {} store", points.len(), self.backend.name());
        *self.points.write() = points.clone();
        Ok(points)
    }

    pub async fn add(&self, draft: PointDraft) -> ChartNotesResult<DataPoint> {
        let draft = PointDraft::new(&draft.month, draft.value, draft.note.as_deref())?;

        let placeholder_id = self.next_placeholder.fetch_sub(1, Ordering::Relaxed);
        self.points
            .write()
            .push(DataPoint::from_draft(placeholder_id, draft.clone(), Utc::now()));

        let created = self
            .backend
            .create_point(draft)
            .await
            .inspect_err(|e| log::warn!("failed to create point: {e}"))?;
        self.replace(placeholder_id, created.clone());
        Ok(created)
    }

    pub async fn update(&self, id: i64, patch: PointPatch) -> ChartNotesResult<DataPoint> {
        let patch = patch.validated()?;
        {
            let mut points = self.points.write();
            let point = points
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or(ChartNotesError::NotFound { id })?;
            point.apply(&patch);
        }

        let updated = self
            .backend
            .update_point(id, patch)
            .await
            .inspect_err(|e| log::warn!("failed to update point {id}: {e}"))?;
        self.replace(id, updated.clone());
        Ok(updated)
    }

    pub async fn remove(&self, id: i64) -> ChartNotesResult<()> {
        self.points.write().retain(|p| p.id != id);
        self.backend
            .delete_point(id)
            .await
            .inspect_err(|e| log::warn!("failed to delete point {id}: {e}"))
    }

    /// Import a pasted block row by row.
    ///
    /// Malformed rows are skipped. The first backend failure stops the import
    /// and is returned; rows created before it stay.
    pub async fn bulk_add(&self, text: &str) -> ChartNotesResult<BulkReport> {
        let import = parse_paste(text);
        let mut report = BulkReport {
            created: Vec::with_capacity(import.drafts.len()),
            skipped_rows: import.skipped_rows,
        };

        for draft in import.drafts {
            report.created.push(self.add(draft).await?);
        }

        log::info!(
            "imported {} points, skipped {} rows",
            report.created.len(),
            report.skipped_rows.len()
        );
        Ok(report)
    }

    /// Delete every point once `confirm` agrees. Returns whether anything was
    /// issued.
    pub async fn clear_all(&self, confirm: impl FnOnce() -> bool) -> ChartNotesResult<bool> {
        if !confirm() {
            log::debug!("clear all declined");
            return Ok(false);
        }
        self.points.write().clear();
        self.backend.clear_all_points().await?;
        Ok(true)
    }

    /// Lay out the current points
    pub fn layout(
        &self,
        settings: &ChartSettings,
        options: LayoutOptions,
    ) -> ChartNotesResult<ChartLayout> {
        ChartLayout::compute(&self.points.read(), settings, options)
    }

    /// The point a click at (`px`, `py`) targets, for the edit flow
    pub fn select_at(&self, layout: &ChartLayout, px: f64, py: f64) -> Option<DataPoint> {
        layout.hit_test(px, py).and_then(|id| self.get(id))
    }

    fn replace(&self, id: i64, point: DataPoint) {
        let mut points = self.points.write();
        match points.iter_mut().find(|p| p.id == id) {
            Some(slot) => *slot = point,
            // Removed locally while the call was in flight
            None => log::debug!("point {id} no longer held locally"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_store::{LocalStore, MemorySlot};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    fn local() -> PointStore {
        PointStore::new(Arc::new(LocalStore::new(MemorySlot::new())))
    }

    /// Backend that accepts `ok_creates` inserts and then fails every call
    struct FlakyBackend {
        inner: LocalStore<MemorySlot>,
        ok_creates: Mutex<usize>,
        calls: Mutex<usize>,
    }

    impl FlakyBackend {
        fn new(ok_creates: usize) -> Self {
            Self {
                inner: LocalStore::new(MemorySlot::new()),
                ok_creates: Mutex::new(ok_creates),
                calls: Mutex::new(0),
            }
        }

        fn fail<T>(&self) -> ChartNotesResult<T> {
            *self.calls.lock() += 1;
            Err(ChartNotesError::transport("connection refused"))
        }
    }

    #[async_trait]
    impl Backend for FlakyBackend {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn get_points(&self) -> ChartNotesResult<Vec<DataPoint>> {
            self.inner.get_points().await
        }

        async fn create_point(&self, draft: PointDraft) -> ChartNotesResult<DataPoint> {
            *self.calls.lock() += 1;
            let allowed = {
                let mut left = self.ok_creates.lock();
                let allowed = *left > 0;
                *left = left.saturating_sub(1);
                allowed
            };
            if !allowed {
                return Err(ChartNotesError::transport("connection refused"));
            }
            self.inner.create_point(draft).await
        }

        async fn update_point(&self, _id: i64, _patch: PointPatch) -> ChartNotesResult<DataPoint> {
            self.fail()
        }

        async fn delete_point(&self, _id: i64) -> ChartNotesResult<()> {
            self.fail()
        }

        async fn clear_all_points(&self) -> ChartNotesResult<()> {
            self.fail()
        }

        async fn get_settings(&self) -> ChartNotesResult<Option<ChartSettings>> {
            Ok(None)
        }

        async fn save_settings(&self, settings: ChartSettings) -> ChartNotesResult<ChartSettings> {
            Ok(settings)
        }
    }

    #[tokio::test]
    async fn test_add_replaces_placeholder_with_canonical_point() {
        let store = local();
        let created = store
            .add(PointDraft::new("Jan", 100.0, None).unwrap())
            .await
            .unwrap();

        assert_eq!(created.id, 1);
        assert_eq!(store.list(), vec![created.clone()]);
        assert_eq!(store.get(1), Some(created));
    }

    #[tokio::test]
    async fn test_invalid_draft_never_reaches_backend() {
        let backend = Arc::new(FlakyBackend::new(0));
        let store = PointStore::new(backend.clone());
        let draft = PointDraft {
            month: "   ".into(),
            value: 1.0,
            note: None,
        };

        let err = store.add(draft).await.unwrap_err();
        assert!(matches!(err, ChartNotesError::Validation { .. }));
        assert_eq!(*backend.calls.lock(), 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_failed_add_leaves_local_state() {
        let store = PointStore::new(Arc::new(FlakyBackend::new(0)));
        let err = store
            .add(PointDraft::new("Jan", 1.0, None).unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, ChartNotesError::Transport { .. }));
        let points = store.list();
        assert_eq!(points.len(), 1);
        assert!(points[0].id < 0);

        store.reload().await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_update_unknown_id_fails_before_backend() {
        let backend = Arc::new(FlakyBackend::new(0));
        let store = PointStore::new(backend.clone());
        let err = store.update(42, PointPatch::default()).await.unwrap_err();
        assert_eq!(err, ChartNotesError::NotFound { id: 42 });
        assert_eq!(*backend.calls.lock(), 0);
    }

    #[tokio::test]
    async fn test_update_and_remove() {
        let store = local();
        let a = store
            .add(PointDraft::new("Jan", 1.0, Some("hello")).unwrap())
            .await
            .unwrap();
        let b = store
            .add(PointDraft::new("Feb", 2.0, None).unwrap())
            .await
            .unwrap();

        let patch = PointPatch {
            value: Some(10.0),
            note: Some(String::new()),
            ..Default::default()
        };
        let updated = store.update(a.id, patch).await.unwrap();
        assert_eq!(updated.value, 10.0);
        assert_eq!(updated.note, None);
        assert_eq!(store.get(a.id), Some(updated));

        store.remove(b.id).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.remove(b.id).await.unwrap_err(),
            ChartNotesError::NotFound { id: b.id }
        );
    }

    #[tokio::test]
    async fn test_bulk_add_skips_malformed_rows() {
        let store = local();
        let report = store
            .bulk_add("Jan\t100\tgood start\nFeb\tnotanumber\nMar\t150")
            .await
            .unwrap();

        let months: Vec<_> = store.list().into_iter().map(|p| p.month).collect();
        assert_eq!(months, ["Jan", "Mar"]);
        assert_eq!(report.created.len(), 2);
        assert_eq!(report.skipped_rows, vec![2]);
        assert_eq!(store.backend().get_points().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_bulk_add_stops_at_first_backend_failure() {
        let store = PointStore::new(Arc::new(FlakyBackend::new(2)));
        let err = store
            .bulk_add("A\t1\nB\t2\nC\t3\nD\t4")
            .await
            .unwrap_err();
        assert!(matches!(err, ChartNotesError::Transport { .. }));

        let durable: Vec<_> = store
            .backend()
            .get_points()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.month)
            .collect();
        assert_eq!(durable, ["A", "B"]);
    }

    #[tokio::test]
    async fn test_clear_all_requires_confirmation() {
        let store = local();
        store.bulk_add("Jan\t1\nFeb\t2").await.unwrap();

        assert!(!store.clear_all(|| false).await.unwrap());
        assert_eq!(store.reload().await.unwrap().len(), 2);

        assert!(store.clear_all(|| true).await.unwrap());
        assert!(store.is_empty());
        assert!(store.reload().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_select_at_returns_clicked_point() {
        let store = local();
        store.bulk_add("Jan\t10\nFeb\t20\nMar\t30").await.unwrap();

        let layout = store
            .layout(&ChartSettings::default(), LayoutOptions::default())
            .unwrap();
        let feb = store.list()[1].clone();
        let anchor = *layout.anchor(feb.id).unwrap();

        assert_eq!(store.select_at(&layout, anchor.x, anchor.y), Some(feb));
        assert_eq!(store.select_at(&layout, 0.0, anchor.y), None);
    }

    #[tokio::test]
    async fn test_layout_of_empty_store() {
        let store = local();
        assert_eq!(
            store
                .layout(&ChartSettings::default(), LayoutOptions::default())
                .unwrap_err(),
            ChartNotesError::EmptyDomain
        );
    }
}
