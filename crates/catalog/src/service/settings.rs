use std::sync::Arc;

use foundation::UserId;
use runtime::SessionContext;
use tracing::{debug, error, warn};

use crate::error::StoreError;
use crate::settings::{FallbackReason, SettingsDefaults, SettingsPatch, SettingsRecord, UserSettings};
use crate::store::SettingsStore;

/// Access to the per-user settings table.
///
/// Reads degrade to static defaults so view bootstrap never blocks on settings;
/// writes are strict and require a signed-in session.
#[derive(Clone)]
pub struct SettingsService {
    store: Arc<dyn SettingsStore>,
    session: SessionContext,
}

impl SettingsService {
    pub fn new(store: Arc<dyn SettingsStore>, session: SessionContext) -> Self {
        Self { store, session }
    }

    pub fn defaults(&self) -> SettingsDefaults {
        SettingsDefaults::default()
    }

    /// Reads the user's row, creating it on first access.
    ///
    /// Never fails: any problem other than a missing row yields a fallback
    /// record tagged with the reason.
    pub async fn get(&self, user: &UserId) -> SettingsRecord {
        match self.session.user_id() {
            None => {
                debug!("no session, using default settings");
                return SettingsRecord::fallback(FallbackReason::SignedOut);
            }
            Some(current) if current != *user => {
                // Identity moved on mid-load; the caller's result is about to be superseded.
                debug!("settings requested for {user} while signed in as {current}");
                return SettingsRecord::fallback(FallbackReason::Unavailable);
            }
            Some(_) => {}
        }

        let found = match self.store.find(user).await {
            Ok(found) => found,
            Err(err) => return degrade(user, &err),
        };
        if let Some(row) = found {
            return SettingsRecord::Persisted(row);
        }

        debug!("no settings row for {user}, creating one");
        match self.create(user).await {
            Ok(row) => SettingsRecord::Persisted(row),
            Err(err) => degrade(user, &err),
        }
    }

    /// Inserts a row seeded with the static defaults.
    pub async fn create(&self, user: &UserId) -> Result<UserSettings, StoreError> {
        if !self.session.is_authenticated() {
            return Err(StoreError::Auth(
                "creating settings requires a signed-in user".to_string(),
            ));
        }
        self.store
            .insert(user, &self.defaults())
            .await
            .inspect_err(|e| error!("failed to create settings for {user}: {e}"))
    }

    pub async fn update(
        &self,
        user: &UserId,
        patch: &SettingsPatch,
    ) -> Result<UserSettings, StoreError> {
        patch.validate()?;
        self.store
            .update(user, patch)
            .await
            .inspect_err(|e| error!("failed to update settings for {user}: {e}"))
    }
}

fn degrade(user: &UserId, err: &StoreError) -> SettingsRecord {
    warn!("could not load settings for {user}, using defaults: {err}");
    let reason = if err.is_auth() {
        FallbackReason::Unauthorized
    } else {
        FallbackReason::Unavailable
    };
    SettingsRecord::fallback(reason)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use foundation::{LngLat, UserId};
    use runtime::{EventBus, MemoryAuth, SessionContext};

    use super::SettingsService;
    use crate::error::StoreError;
    use crate::memory::{InMemorySettingsStore, StoreOp};
    use crate::settings::{FallbackReason, SettingsPatch, SettingsRecord};

    async fn signed_in() -> SessionContext {
        let ctx = SessionContext::new(
            Arc::new(MemoryAuth::new().with_account("a@b.c", "pw1234", "u-1")),
            EventBus::new(),
        );
        ctx.sign_in("a@b.c", "pw1234").await.unwrap();
        ctx
    }

    #[tokio::test]
    async fn first_read_creates_the_row() {
        let store = Arc::new(InMemorySettingsStore::new());
        let svc = SettingsService::new(store.clone(), signed_in().await);
        let user = UserId::new("u-1");

        let record = svc.get(&user).await;
        let row = record.persisted().expect("row created").clone();
        assert_eq!(store.row(&user).await, Some(row.clone()));

        // Second read finds the same row instead of creating another.
        assert_eq!(svc.get(&user).await, SettingsRecord::Persisted(row));
    }

    #[tokio::test]
    async fn read_failure_degrades_to_defaults() {
        let store = Arc::new(InMemorySettingsStore::new());
        store.fail_next(StoreOp::Find, StoreError::store("timeout"));
        let svc = SettingsService::new(store, signed_in().await);

        let record = svc.get(&UserId::new("u-1")).await;
        assert_eq!(record.fallback_reason(), Some(FallbackReason::Unavailable));
        assert!(record.persisted().is_none());
    }

    #[tokio::test]
    async fn request_for_another_user_is_unavailable() {
        let store = Arc::new(InMemorySettingsStore::new());
        let svc = SettingsService::new(store.clone(), signed_in().await);
        let other = UserId::new("u-2");

        let record = svc.get(&other).await;
        assert_eq!(record.fallback_reason(), Some(FallbackReason::Unavailable));
        assert_eq!(store.row(&other).await, None);
    }

    #[tokio::test]
    async fn auth_failure_is_tagged() {
        let store = Arc::new(InMemorySettingsStore::new());
        store.fail_next(StoreOp::Find, StoreError::Auth("JWT expired".into()));
        let svc = SettingsService::new(store, signed_in().await);
        let record = svc.get(&UserId::new("u-1")).await;
        assert_eq!(record.fallback_reason(), Some(FallbackReason::Unauthorized));
    }

    #[tokio::test]
    async fn anonymous_read_degrades_and_create_fails() {
        let session = SessionContext::new(Arc::new(MemoryAuth::new()), EventBus::new());
        let svc = SettingsService::new(Arc::new(InMemorySettingsStore::new()), session);
        let user = UserId::new("u-1");

        assert_eq!(
            svc.get(&user).await.fallback_reason(),
            Some(FallbackReason::SignedOut)
        );
        assert!(matches!(svc.create(&user).await, Err(StoreError::Auth(_))));
    }

    #[tokio::test]
    async fn update_is_strict() {
        let store = Arc::new(InMemorySettingsStore::new());
        let svc = SettingsService::new(store.clone(), signed_in().await);
        let user = UserId::new("u-1");

        // No row yet: the write path does not degrade.
        let patch = SettingsPatch::default().center(LngLat::new(10.0, 20.0), 11.0);
        assert!(svc.update(&user, &patch).await.unwrap_err().is_not_found());

        svc.create(&user).await.unwrap();
        let row = svc.update(&user, &patch).await.unwrap();
        assert_eq!(row.default_zoom, 11.0);
        assert_eq!(row.default_latitude, 20.0);
    }
}
