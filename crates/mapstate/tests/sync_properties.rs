use std::sync::Arc;
use std::time::Duration;

use catalog::{
    FallbackReason, InMemoryPointStore, InMemorySettingsStore, MapPoint, PointDraft, PointKind,
    PointPatch, PointsService, SettingsService, StoreError, StoreOp,
};
use chrono::{TimeZone, Utc};
use foundation::{LngLat, PointId, UserId};
use mapstate::{AddPointForm, LoadPhase, MapSync, SubmitError};
use pretty_assertions::assert_eq;
use runtime::{EventBus, MemoryAuth, SessionContext};
use scene::{FOCUS_ZOOM, ViewState};

struct Harness {
    points: Arc<InMemoryPointStore>,
    settings: Arc<InMemorySettingsStore>,
    session: SessionContext,
    service: PointsService,
    sync: MapSync,
}

fn harness() -> Harness {
    let session = SessionContext::new(
        Arc::new(
            MemoryAuth::new()
                .with_account("ana@example.com", "hunter22", "user-a")
                .with_account("ben@example.com", "hunter22", "user-b"),
        ),
        EventBus::new(),
    );
    let points = Arc::new(InMemoryPointStore::restricted_to(session.clone()));
    let settings = Arc::new(InMemorySettingsStore::restricted_to(session.clone()));
    let service = PointsService::new(points.clone());
    let sync = MapSync::new(
        service.clone(),
        SettingsService::new(settings.clone(), session.clone()),
        session.clone(),
    );
    Harness {
        points,
        settings,
        session,
        service,
        sync,
    }
}

async fn signed_in() -> Harness {
    let h = harness();
    h.session
        .sign_in("ana@example.com", "hunter22")
        .await
        .unwrap();
    h.sync.bootstrap().await;
    h
}

fn lakeside() -> PointDraft {
    PointDraft::new("Lakeside", PointKind::Campsite, LngLat::new(-105.0, 40.0))
}

fn seeded(id: &str, secs: i64) -> MapPoint {
    let draft = PointDraft::new(id, PointKind::Cabin, LngLat::new(146.0, -36.0));
    let created = Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap();
    MapPoint::from_draft(PointId::new(id), &draft, created)
}

#[tokio::test]
async fn added_point_lands_at_the_head_of_the_list() {
    let h = signed_in().await;
    h.sync
        .add_point(&PointDraft::new(
            "Ridge",
            PointKind::Viewpoint,
            LngLat::new(-104.0, 39.0),
        ))
        .await
        .unwrap();

    let drafts = [
        lakeside(),
        PointDraft::new("Pines", PointKind::Glamping, LngLat::new(12.5, 47.1))
            .with_amenities(["showers", "wifi"])
            .with_rating(4.5),
        PointDraft::new("Old Mill", PointKind::Other("hut".into()), LngLat::new(0.0, 0.0))
            .with_description("stone hut by the river"),
    ];
    for draft in drafts {
        let before = h.service.list().await.unwrap();
        let created = h.sync.add_point(&draft).await.unwrap();
        let after = h.service.list().await.unwrap();

        assert_eq!(after.len(), before.len() + 1);
        assert_eq!(after[0], created);
        assert_eq!(after[1..].to_vec(), before);
        assert_eq!(created.name, draft.name);
        assert_eq!(created.kind, draft.kind);
        assert_eq!(created.amenities, draft.amenities);
        assert_eq!(created.rating, draft.rating);
        assert_eq!(created.description, draft.description);

        // Local list mirrors the store without a reload.
        assert_eq!(h.sync.points(), after);
    }
}

#[tokio::test]
async fn update_changes_only_patched_fields() {
    let h = signed_in().await;
    let original = h
        .sync
        .add_point(&lakeside().with_description("by the water").with_rating(3.0))
        .await
        .unwrap();
    let other = h.sync.add_point(&PointDraft::new(
        "Ridge",
        PointKind::Viewpoint,
        LngLat::new(-104.0, 39.0),
    ))
    .await
    .unwrap();

    let patch = PointPatch::new().rating(Some(4.5)).amenities(vec!["water".into()]);
    let updated = h.sync.update_point(&original.id, &patch).await.unwrap();

    assert_eq!(updated.rating, Some(4.5));
    assert_eq!(updated.amenities, vec!["water".to_string()]);
    assert_eq!(updated.id, original.id);
    assert_eq!(updated.name, original.name);
    assert_eq!(updated.description, original.description);
    assert_eq!(updated.kind, original.kind);
    assert_eq!(updated.latitude, original.latitude);
    assert_eq!(updated.longitude, original.longitude);
    assert_eq!(updated.created_at, original.created_at);
    assert!(updated.updated_at.is_some());

    // Replaced in place: order is untouched.
    assert_eq!(h.sync.points(), vec![other, updated]);
}

#[tokio::test]
async fn second_delete_fails_and_leaves_the_list_alone() {
    let h = signed_in().await;
    let a = h.sync.add_point(&lakeside()).await.unwrap();
    let b = h.sync.add_point(&lakeside()).await.unwrap();

    h.sync.delete_point(&a.id).await.unwrap();
    assert_eq!(h.sync.points(), vec![b.clone()]);

    let err = h.sync.delete_point(&a.id).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(h.sync.points(), vec![b]);
}

#[tokio::test]
async fn selecting_a_point_focuses_the_camera() {
    let h = signed_in().await;
    let p = h.sync.add_point(&lakeside()).await.unwrap();
    h.sync.set_view_state(ViewState::new(0.0, 0.0, 4.0));

    h.sync.select(Some(p.clone()));
    let snap = h.sync.snapshot();
    assert_eq!(snap.view, ViewState::new(p.longitude, p.latitude, FOCUS_ZOOM));
    assert_eq!(snap.selected(), Some(&p));
    assert_eq!(snap.popup().map(|c| c.title), Some("Lakeside".to_string()));

    h.sync.select(None);
    let snap = h.sync.snapshot();
    assert!(snap.popup().is_none());
    assert_eq!(snap.view, ViewState::new(p.longitude, p.latitude, FOCUS_ZOOM));
}

#[tokio::test]
async fn settings_failure_falls_back_to_default_view() {
    let h = harness();
    h.session
        .sign_in("ana@example.com", "hunter22")
        .await
        .unwrap();
    h.settings
        .fail_next(StoreOp::Find, StoreError::store("upstream timeout"));

    h.sync.bootstrap().await;
    let snap = h.sync.snapshot();
    assert_eq!(snap.phase, LoadPhase::Ready);
    assert_eq!(snap.view, ViewState::default());
    assert_eq!(
        snap.settings.fallback_reason(),
        Some(FallbackReason::Unavailable)
    );
    assert!(snap.has_error());
    assert!(snap.points_error.is_none());
}

#[tokio::test]
async fn points_failure_empties_the_list() {
    let h = signed_in().await;
    h.sync.add_point(&lakeside()).await.unwrap();
    assert_eq!(h.sync.points().len(), 1);

    h.points
        .fail_next(StoreOp::List, StoreError::store("connection refused"));
    h.sync.bootstrap().await;

    let snap = h.sync.snapshot();
    assert_eq!(snap.phase, LoadPhase::Ready);
    assert!(snap.has_error());
    assert!(snap.points.is_empty());
    assert!(snap.settings.persisted().is_some());
}

#[tokio::test]
async fn auth_failure_on_points_requests_login() {
    let h = signed_in().await;
    let before = h.sync.events().login_requests();
    h.points.fail_next(
        StoreOp::List,
        StoreError::Store {
            code: Some("PGRST301".into()),
            message: "JWT expired".into(),
        },
    );
    h.sync.bootstrap().await;
    assert!(h.sync.has_error());
    assert_eq!(h.sync.events().login_requests(), before + 1);
}

#[tokio::test]
async fn anonymous_submit_requests_login_without_writing() {
    let h = harness();
    h.sync.bootstrap().await;
    let prompts = h.sync.events().login_requests();

    let form = AddPointForm {
        name: "Lakeside".into(),
        kind: PointKind::Campsite,
        ..AddPointForm::at(LngLat::new(-105.0, 40.0))
    };
    let err = h.sync.submit(&form).await.unwrap_err();

    assert_eq!(err, SubmitError::LoginRequired);
    assert_eq!(h.sync.events().login_requests(), prompts + 1);
    assert!(h.points.is_empty().await);
    assert!(h.sync.points().is_empty());
}

#[tokio::test]
async fn signed_in_submit_adds_the_point() {
    let h = signed_in().await;
    let form = AddPointForm {
        name: "Lakeside".into(),
        amenities: "water, toilets".into(),
        ..h.sync.new_point_form()
    };
    let created = h.sync.submit(&form).await.unwrap();
    assert_eq!(created.position(), ViewState::default().center());
    assert_eq!(h.sync.points(), vec![created]);
}

#[tokio::test]
async fn list_is_newest_first() {
    let h = harness();
    h.points.seed(seeded("a", 1)).await;
    h.points.seed(seeded("b", 2)).await;

    let ids: Vec<String> = h
        .service
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id.into_inner())
        .collect();
    assert_eq!(ids, vec!["b".to_string(), "a".to_string()]);

    h.sync.bootstrap().await;
    let local: Vec<PointId> = h.sync.points().into_iter().map(|p| p.id).collect();
    assert_eq!(local, vec![PointId::new("b"), PointId::new("a")]);
}

#[tokio::test]
async fn anonymous_bootstrap_lists_points_and_asks_for_login() {
    let h = harness();
    h.points.seed(seeded("a", 1)).await;

    h.sync.bootstrap().await;
    let snap = h.sync.snapshot();
    assert_eq!(snap.phase, LoadPhase::Ready);
    assert_eq!(snap.points.len(), 1);
    assert_eq!(
        snap.settings.fallback_reason(),
        Some(FallbackReason::SignedOut)
    );
    assert!(!snap.has_error());
    assert_eq!(h.sync.events().login_requests(), 1);
}

#[tokio::test]
async fn superseded_bootstrap_is_discarded() {
    let h = signed_in().await;
    let gate = h.points.hold_next(StoreOp::List);

    let first = {
        let sync = h.sync.clone();
        tokio::spawn(async move { sync.bootstrap().await })
    };
    tokio::task::yield_now().await;

    h.points.seed(seeded("fresh", 5)).await;
    let second = h.sync.bootstrap().await;
    assert_eq!(h.sync.points().len(), 1);

    // The held fetch now fails, but it belongs to an older generation.
    h.points
        .fail_next(StoreOp::List, StoreError::store("late failure"));
    gate.notify_one();
    let stale = first.await.unwrap();

    assert!(stale < second);
    assert_eq!(h.sync.generation(), second);
    assert_eq!(h.sync.points().len(), 1);
    assert!(!h.sync.has_error());
}

#[tokio::test]
async fn delete_confirmed_during_same_user_reload_still_applies() {
    let h = signed_in().await;
    let p = h.sync.add_point(&lakeside()).await.unwrap();
    let gate = h.points.hold_next(StoreOp::Delete);

    let pending = {
        let sync = h.sync.clone();
        let id = p.id.clone();
        tokio::spawn(async move { sync.delete_point(&id).await })
    };
    tokio::task::yield_now().await;

    // Reads the list while the delete is still held.
    h.sync.bootstrap().await;
    assert_eq!(h.sync.points(), vec![p.clone()]);

    gate.notify_one();
    pending.await.unwrap().unwrap();

    assert!(h.points.is_empty().await);
    assert!(h.sync.points().is_empty());
    assert!(!h.sync.select_by_id(&p.id));
}

#[tokio::test]
async fn add_confirmed_during_same_user_reload_still_applies() {
    let h = signed_in().await;
    let gate = h.points.hold_next(StoreOp::Insert);

    let pending = {
        let sync = h.sync.clone();
        tokio::spawn(async move { sync.add_point(&lakeside()).await })
    };
    tokio::task::yield_now().await;

    h.sync.bootstrap().await;
    assert!(h.sync.points().is_empty());

    gate.notify_one();
    let created = pending.await.unwrap().unwrap();
    assert_eq!(h.sync.points(), vec![created]);
}

#[tokio::test]
async fn failed_load_for_new_user_does_not_show_previous_list() {
    let h = signed_in().await;
    h.sync.add_point(&lakeside()).await.unwrap();
    assert_eq!(h.sync.points().len(), 1);

    h.session
        .sign_in("ben@example.com", "hunter22")
        .await
        .unwrap();
    h.points
        .fail_next(StoreOp::List, StoreError::store("connection refused"));
    h.sync.bootstrap().await;

    let snap = h.sync.snapshot();
    assert_eq!(snap.user, Some(UserId::new("user-b")));
    assert_eq!(snap.phase, LoadPhase::Ready);
    assert!(snap.points.is_empty());
    assert!(snap.selected().is_none());
    assert!(snap.has_error());
}

#[tokio::test]
async fn refresh_replaces_the_list() {
    let h = signed_in().await;
    h.points.seed(seeded("external", 100)).await;
    assert!(h.sync.points().is_empty());

    assert_eq!(h.sync.refresh().await.unwrap(), 1);
    assert_eq!(h.sync.points()[0].id, PointId::new("external"));

    h.points
        .fail_next(StoreOp::List, StoreError::store("offline"));
    assert!(h.sync.refresh().await.is_err());
    assert!(h.sync.points().is_empty());
    assert!(h.sync.has_error());
}

#[tokio::test]
async fn blocked_write_posts_a_dismissible_notice() {
    let h = harness();
    h.sync.bootstrap().await;

    // Store-level row security rejects the anonymous write.
    let err = h.sync.add_point(&lakeside()).await.unwrap_err();
    assert!(err.is_auth());

    let notices = h.sync.events().notices();
    assert_eq!(notices.len(), 1);
    assert!(h.sync.events().dismiss(notices[0].seq));
    assert!(h.sync.events().notices().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn identity_change_reloads_settings() {
    let h = harness();
    h.sync.bootstrap().await;
    assert!(h.sync.snapshot().settings.persisted().is_none());

    let looping = {
        let sync = h.sync.clone();
        tokio::spawn(async move { sync.run_identity_loop().await })
    };

    h.session
        .sign_in("ben@example.com", "hunter22")
        .await
        .unwrap();
    let user = UserId::new("user-b");
    let row = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(row) = h.sync.snapshot().settings.persisted().cloned() {
                return row;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("identity change should reload settings");
    assert_eq!(row.user_id, user);
    assert_eq!(h.settings.row(&user).await, Some(row));

    h.sync.close();
    tokio::time::timeout(Duration::from_secs(5), looping)
        .await
        .expect("loop stops after close")
        .unwrap();
}
