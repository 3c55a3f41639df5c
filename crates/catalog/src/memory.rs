//! In-memory table stores for tests and offline runs.
//!
//! Both stores enforce the same contract as the remote tables: schema
//! validation on write, store-assigned ids and timestamps, `NotFound` on a
//! missing key, and optional row-level write restriction to signed-in users.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use foundation::{BoxFuture, PointId, SettingsId, UserId};
use parking_lot::Mutex;
use runtime::SessionContext;
use tokio::sync::{Notify, RwLock};

use crate::error::StoreError;
use crate::point::{MapPoint, PointDraft, PointPatch};
use crate::settings::{SettingsDefaults, SettingsPatch, UserSettings};
use crate::store::{PointStore, SettingsStore};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StoreOp {
    List,
    Get,
    Insert,
    Update,
    Delete,
    Find,
}

/// Scripted failures and pauses shared by the in-memory stores.
#[derive(Debug, Default)]
struct Faults {
    failures: Mutex<Vec<(StoreOp, StoreError)>>,
    holds: Mutex<Vec<(StoreOp, Arc<Notify>)>>,
}

impl Faults {
    fn take_failure(&self, op: StoreOp) -> Option<StoreError> {
        let mut failures = self.failures.lock();
        let idx = failures.iter().position(|(o, _)| *o == op)?;
        Some(failures.remove(idx).1)
    }

    fn take_hold(&self, op: StoreOp) -> Option<Arc<Notify>> {
        let mut holds = self.holds.lock();
        let idx = holds.iter().position(|(o, _)| *o == op)?;
        Some(holds.remove(idx).1)
    }

    /// Waits on a pending hold, then reports a scripted failure if any.
    async fn enter(&self, op: StoreOp) -> Result<(), StoreError> {
        if let Some(gate) = self.take_hold(op) {
            gate.notified().await;
        }
        match self.take_failure(op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn check_write_access(session: Option<&SessionContext>) -> Result<(), StoreError> {
    match session {
        Some(ctx) if !ctx.is_authenticated() => Err(StoreError::Auth(
            "new row violates row-level security policy".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Keeps store-assigned timestamps strictly increasing so newest-first order
/// is total even for back-to-back inserts.
#[derive(Debug, Default)]
struct Clock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl Clock {
    fn now(&self) -> DateTime<Utc> {
        let mut last = self.last.lock();
        let mut now = Utc::now();
        if let Some(prev) = *last {
            if now <= prev {
                now = prev + Duration::microseconds(1);
            }
        }
        *last = Some(now);
        now
    }
}

#[derive(Debug, Default)]
pub struct InMemoryPointStore {
    rows: RwLock<HashMap<PointId, MapPoint>>,
    faults: Faults,
    clock: Clock,
    write_session: Option<SessionContext>,
}

impl InMemoryPointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes fail with `Auth` unless `session` has a signed-in user.
    pub fn restricted_to(session: SessionContext) -> Self {
        Self {
            write_session: Some(session),
            ..Self::default()
        }
    }

    /// Seeds a row as-is, bypassing id and timestamp assignment.
    pub async fn seed(&self, point: MapPoint) {
        self.rows.write().await.insert(point.id.clone(), point);
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// The next call of `op` fails with `err` instead of touching the table.
    pub fn fail_next(&self, op: StoreOp, err: StoreError) {
        self.faults.failures.lock().push((op, err));
    }

    /// The next call of `op` suspends until the returned handle is notified.
    pub fn hold_next(&self, op: StoreOp) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.faults.holds.lock().push((op, gate.clone()));
        gate
    }
}

impl PointStore for InMemoryPointStore {
    fn list(&self) -> BoxFuture<'_, Result<Vec<MapPoint>, StoreError>> {
        Box::pin(async move {
            self.faults.enter(StoreOp::List).await?;
            let mut out: Vec<MapPoint> = self.rows.read().await.values().cloned().collect();
            // Most recent first, then id.
            out.sort_by(|a, b| {
                b.created_at
                    .cmp(&a.created_at)
                    .then_with(|| a.id.cmp(&b.id))
            });
            Ok(out)
        })
    }

    fn get<'a>(&'a self, id: &'a PointId) -> BoxFuture<'a, Result<MapPoint, StoreError>> {
        Box::pin(async move {
            self.faults.enter(StoreOp::Get).await?;
            self.rows
                .read()
                .await
                .get(id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(format!("map point {id}")))
        })
    }

    fn insert<'a>(
        &'a self,
        draft: &'a PointDraft,
    ) -> BoxFuture<'a, Result<MapPoint, StoreError>> {
        Box::pin(async move {
            self.faults.enter(StoreOp::Insert).await?;
            check_write_access(self.write_session.as_ref())?;
            draft.validate()?;
            let id = PointId::new(uuid::Uuid::new_v4().to_string());
            let point = MapPoint::from_draft(id.clone(), draft, self.clock.now());
            self.rows.write().await.insert(id, point.clone());
            Ok(point)
        })
    }

    fn update<'a>(
        &'a self,
        id: &'a PointId,
        patch: &'a PointPatch,
    ) -> BoxFuture<'a, Result<MapPoint, StoreError>> {
        Box::pin(async move {
            self.faults.enter(StoreOp::Update).await?;
            check_write_access(self.write_session.as_ref())?;
            patch.validate()?;
            let mut rows = self.rows.write().await;
            let row = rows
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(format!("map point {id}")))?;
            *row = row.patched(patch, self.clock.now());
            Ok(row.clone())
        })
    }

    fn delete<'a>(&'a self, id: &'a PointId) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            self.faults.enter(StoreOp::Delete).await?;
            check_write_access(self.write_session.as_ref())?;
            match self.rows.write().await.remove(id) {
                Some(_) => Ok(()),
                None => Err(StoreError::NotFound(format!("map point {id}"))),
            }
        })
    }
}

#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    rows: RwLock<HashMap<UserId, UserSettings>>,
    faults: Faults,
    clock: Clock,
    write_session: Option<SessionContext>,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn restricted_to(session: SessionContext) -> Self {
        Self {
            write_session: Some(session),
            ..Self::default()
        }
    }

    pub async fn seed(&self, row: UserSettings) {
        self.rows.write().await.insert(row.user_id.clone(), row);
    }

    pub async fn row(&self, user: &UserId) -> Option<UserSettings> {
        self.rows.read().await.get(user).cloned()
    }

    pub fn fail_next(&self, op: StoreOp, err: StoreError) {
        self.faults.failures.lock().push((op, err));
    }

    pub fn hold_next(&self, op: StoreOp) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.faults.holds.lock().push((op, gate.clone()));
        gate
    }
}

impl SettingsStore for InMemorySettingsStore {
    fn find<'a>(
        &'a self,
        user: &'a UserId,
    ) -> BoxFuture<'a, Result<Option<UserSettings>, StoreError>> {
        Box::pin(async move {
            self.faults.enter(StoreOp::Find).await?;
            Ok(self.rows.read().await.get(user).cloned())
        })
    }

    fn insert<'a>(
        &'a self,
        user: &'a UserId,
        preferences: &'a SettingsDefaults,
    ) -> BoxFuture<'a, Result<UserSettings, StoreError>> {
        Box::pin(async move {
            self.faults.enter(StoreOp::Insert).await?;
            check_write_access(self.write_session.as_ref())?;
            let mut rows = self.rows.write().await;
            if rows.contains_key(user) {
                return Err(StoreError::Store {
                    code: Some("23505".to_string()),
                    message: format!("settings for user {user} already exist"),
                });
            }
            let row = UserSettings {
                id: SettingsId::new(uuid::Uuid::new_v4().to_string()),
                user_id: user.clone(),
                default_latitude: preferences.default_latitude,
                default_longitude: preferences.default_longitude,
                default_zoom: preferences.default_zoom,
                map_style: preferences.map_style.clone(),
                created_at: self.clock.now(),
                updated_at: None,
            };
            rows.insert(user.clone(), row.clone());
            Ok(row)
        })
    }

    fn update<'a>(
        &'a self,
        user: &'a UserId,
        patch: &'a SettingsPatch,
    ) -> BoxFuture<'a, Result<UserSettings, StoreError>> {
        Box::pin(async move {
            self.faults.enter(StoreOp::Update).await?;
            check_write_access(self.write_session.as_ref())?;
            patch.validate()?;
            let mut rows = self.rows.write().await;
            let row = rows
                .get_mut(user)
                .ok_or_else(|| StoreError::NotFound(format!("settings for user {user}")))?;
            *row = row.patched(patch, self.clock.now());
            Ok(row.clone())
        })
    }
}
