//! Remote table seams.
//!
//! Implementations must be `Send + Sync` for use across async tasks.
//! Methods return boxed futures for dyn-compatibility.

use foundation::{BoxFuture, PointId, UserId};

use crate::error::StoreError;
use crate::point::{MapPoint, PointDraft, PointPatch};
use crate::settings::{SettingsDefaults, SettingsPatch, UserSettings};

/// Table of map points.
pub trait PointStore: Send + Sync {
    /// All points, newest `created_at` first.
    fn list(&self) -> BoxFuture<'_, Result<Vec<MapPoint>, StoreError>>;

    /// Fails with `NotFound` when no row has `id`.
    fn get<'a>(&'a self, id: &'a PointId) -> BoxFuture<'a, Result<MapPoint, StoreError>>;

    /// Inserts a row; the store assigns `id` and `created_at`.
    fn insert<'a>(&'a self, draft: &'a PointDraft)
    -> BoxFuture<'a, Result<MapPoint, StoreError>>;

    fn update<'a>(
        &'a self,
        id: &'a PointId,
        patch: &'a PointPatch,
    ) -> BoxFuture<'a, Result<MapPoint, StoreError>>;

    /// Fails with `NotFound` when no row has `id`, so a repeated delete fails.
    fn delete<'a>(&'a self, id: &'a PointId) -> BoxFuture<'a, Result<(), StoreError>>;
}

/// Table of per-user settings, keyed by user id.
pub trait SettingsStore: Send + Sync {
    /// Returns `Ok(None)` when the user has no row yet.
    fn find<'a>(
        &'a self,
        user: &'a UserId,
    ) -> BoxFuture<'a, Result<Option<UserSettings>, StoreError>>;

    fn insert<'a>(
        &'a self,
        user: &'a UserId,
        preferences: &'a SettingsDefaults,
    ) -> BoxFuture<'a, Result<UserSettings, StoreError>>;

    fn update<'a>(
        &'a self,
        user: &'a UserId,
        patch: &'a SettingsPatch,
    ) -> BoxFuture<'a, Result<UserSettings, StoreError>>;
}
