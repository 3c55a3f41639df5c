use std::sync::Arc;

use foundation::PointId;
use tracing::error;

use crate::error::StoreError;
use crate::point::{MapPoint, PointDraft, PointPatch};
use crate::store::PointStore;

/// Pass-through access to the point table.
///
/// Input is validated before the round trip; store failures are logged and
/// returned to the caller unchanged.
#[derive(Clone)]
pub struct PointsService {
    store: Arc<dyn PointStore>,
}

impl PointsService {
    pub fn new(store: Arc<dyn PointStore>) -> Self {
        Self { store }
    }

    /// All points, newest first.
    pub async fn list(&self) -> Result<Vec<MapPoint>, StoreError> {
        self.store
            .list()
            .await
            .inspect_err(|e| error!("failed to fetch map points: {e}"))
    }

    pub async fn get(&self, id: &PointId) -> Result<MapPoint, StoreError> {
        self.store
            .get(id)
            .await
            .inspect_err(|e| error!("failed to fetch map point {id}: {e}"))
    }

    pub async fn create(&self, draft: &PointDraft) -> Result<MapPoint, StoreError> {
        draft.validate()?;
        self.store
            .insert(draft)
            .await
            .inspect_err(|e| error!("failed to create map point: {e}"))
    }

    pub async fn update(&self, id: &PointId, patch: &PointPatch) -> Result<MapPoint, StoreError> {
        patch.validate()?;
        self.store
            .update(id, patch)
            .await
            .inspect_err(|e| error!("failed to update map point {id}: {e}"))
    }

    pub async fn delete(&self, id: &PointId) -> Result<(), StoreError> {
        self.store
            .delete(id)
            .await
            .inspect_err(|e| error!("failed to delete map point {id}: {e}"))
    }
}
