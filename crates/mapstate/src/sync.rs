use std::sync::Arc;

use catalog::{
    FallbackReason, MapPoint, PointDraft, PointPatch, PointsService, SettingsPatch,
    SettingsRecord, SettingsService, StoreError, UserSettings,
};
use foundation::{CoordError, LngLat, PointId, UserId};
use parking_lot::Mutex;
use runtime::{EventBus, Generation, GenerationCounter, SessionContext, Severity};
use scene::{ClickAction, MapStyle, SurfaceEvent, ViewState, route_map_click};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::MapSyncConfig;
use crate::form::AddPointForm;
use crate::state::{ConfirmedWrite, LoadPhase, MapState};

/// Result of feeding one surface event into the core.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceOutcome {
    ViewUpdated(ViewState),
    Selected(PointId),
    OpenCreateForm(AddPointForm),
    LoginRequested,
    Ignored,
}

struct Inner {
    points: PointsService,
    settings: SettingsService,
    session: SessionContext,
    config: MapSyncConfig,
    generation: GenerationCounter,
    state: Mutex<MapState>,
    shutdown: watch::Sender<bool>,
}

/// Handle to the map core. Clones share the same state.
///
/// The state lock is never held across an `.await`: every operation reads
/// what it needs, releases, suspends on the store, then re-locks to apply.
#[derive(Clone)]
pub struct MapSync {
    inner: Arc<Inner>,
}

impl MapSync {
    pub fn new(points: PointsService, settings: SettingsService, session: SessionContext) -> Self {
        Self::with_config(points, settings, session, MapSyncConfig::default())
    }

    pub fn with_config(
        points: PointsService,
        settings: SettingsService,
        session: SessionContext,
        config: MapSyncConfig,
    ) -> Self {
        let view = ViewState::default().clamped(config.zoom_limits);
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                points,
                settings,
                session,
                config,
                generation: GenerationCounter::new(),
                state: Mutex::new(MapState::new(view)),
                shutdown,
            }),
        }
    }

    pub fn config(&self) -> &MapSyncConfig {
        &self.inner.config
    }

    pub fn session(&self) -> &SessionContext {
        &self.inner.session
    }

    pub fn events(&self) -> &EventBus {
        self.inner.session.events()
    }

    pub fn generation(&self) -> Generation {
        self.inner.generation.current()
    }

    pub fn snapshot(&self) -> MapState {
        self.inner.state.lock().clone()
    }

    pub fn phase(&self) -> LoadPhase {
        self.inner.state.lock().phase
    }

    pub fn view(&self) -> ViewState {
        self.inner.state.lock().view
    }

    pub fn points(&self) -> Vec<MapPoint> {
        self.inner.state.lock().points.clone()
    }

    pub fn selected(&self) -> Option<MapPoint> {
        self.inner.state.lock().selection.get().cloned()
    }

    pub fn has_error(&self) -> bool {
        self.inner.state.lock().has_error()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Loads settings and points for the current identity.
    ///
    /// Both fetches run concurrently and fail independently. The phase always
    /// ends in `Ready` unless a newer bootstrap or [`MapSync::close`]
    /// superseded this one, in which case its results are dropped.
    pub async fn bootstrap(&self) -> Generation {
        let generation = self.inner.generation.advance();
        let user = self.inner.session.user_id();
        {
            let mut st = self.inner.state.lock();
            if st.closed {
                return generation;
            }
            if st.user != user {
                st.confirmed.clear();
            }
            st.phase = LoadPhase::Loading;
            st.user = user.clone();
            st.begin_load();
        }

        info!(
            generation = generation.value(),
            user = user.as_ref().map(UserId::as_str),
            "loading map state"
        );

        let settings_branch = async {
            match &user {
                Some(user) => self.inner.settings.get(user).await,
                None => SettingsRecord::fallback(FallbackReason::SignedOut),
            }
        };
        let (settings, points) = tokio::join!(settings_branch, self.inner.points.list());

        let mut login_reason = None;
        {
            let mut st = self.inner.state.lock();
            if st.closed || !self.inner.generation.is_current(generation) {
                debug!(generation = generation.value(), "discarding superseded load");
                st.end_load();
                return generation;
            }

            st.view = ViewState::from_preferences(&settings.preferences())
                .clamped(self.inner.config.zoom_limits);
            st.style = match &settings {
                SettingsRecord::Persisted(row) => {
                    MapStyle::from_url(&row.map_style).unwrap_or_default()
                }
                SettingsRecord::Fallback { .. } => MapStyle::default(),
            };
            if settings.fallback_reason().is_some_and(FallbackReason::is_auth) {
                login_reason = Some("Sign in to use your saved map settings");
            }
            st.settings = settings;

            match points {
                Ok(list) => st.replace_points(list),
                Err(err) => {
                    if err.is_auth() {
                        login_reason = Some("Sign in to view map points");
                    }
                    apply_list_failure(&mut st, err);
                }
            }
            st.phase = LoadPhase::Ready;
            st.end_load();
        }

        if let Some(reason) = login_reason {
            self.inner.session.request_login(reason);
        }
        generation
    }

    /// Re-reads the point list and replaces it wholesale. Settings are untouched.
    ///
    /// A failure empties the list instead of leaving it stale.
    pub async fn refresh(&self) -> Result<usize, StoreError> {
        let generation = self.inner.generation.current();
        self.inner.state.lock().begin_load();
        let result = self.inner.points.list().await;

        let mut st = self.inner.state.lock();
        let live = !st.closed && self.inner.generation.is_current(generation);
        match result {
            Ok(list) => {
                let count = list.len();
                if live {
                    st.replace_points(list);
                }
                st.end_load();
                Ok(count)
            }
            Err(err) => {
                if live {
                    apply_list_failure(&mut st, err.clone());
                }
                st.end_load();
                drop(st);
                if live && err.is_auth() {
                    self.inner.session.request_login("Sign in to view map points");
                }
                Err(err)
            }
        }
    }

    /// Overwrites the camera. No remote effect.
    pub fn set_view_state(&self, view: ViewState) {
        self.inner.state.lock().view = view;
    }

    /// Selects `point` and centers the camera on it at the focus zoom, or
    /// clears the selection.
    pub fn select(&self, point: Option<MapPoint>) {
        let mut st = self.inner.state.lock();
        match point {
            Some(point) => {
                st.view = ViewState::centered_on(point.position(), self.inner.config.focus_zoom);
                st.selection.select(point);
            }
            None => {
                st.selection.clear();
            }
        }
    }

    /// Selects a point from the loaded list. Returns `false` if it is not there.
    pub fn select_by_id(&self, id: &PointId) -> bool {
        let point = self.inner.state.lock().point(id).cloned();
        match point {
            Some(point) => {
                self.select(Some(point));
                true
            }
            None => false,
        }
    }

    /// Programmatic camera move. Zoom defaults to the fly-to zoom and is clamped.
    pub fn fly_to(&self, at: LngLat, zoom: Option<f64>) -> Result<ViewState, CoordError> {
        at.validate()?;
        let zoom = zoom.unwrap_or(self.inner.config.fly_to_zoom);
        let view = ViewState::centered_on(at, zoom).clamped(self.inner.config.zoom_limits);
        self.set_view_state(view);
        Ok(view)
    }

    /// Changes the base style for this session only.
    pub fn show_style(&self, style: MapStyle) {
        self.inner.state.lock().style = style;
    }

    /// Creates a point and prepends it to the local list once the store confirms.
    pub async fn add_point(&self, draft: &PointDraft) -> Result<MapPoint, StoreError> {
        let issued_for = self.loaded_for();
        let point = match self.inner.points.create(draft).await {
            Ok(point) => point,
            Err(err) => return Err(self.write_failed("Could not add point", err)),
        };

        let mut st = self.inner.state.lock();
        if accepts_write(&st, &issued_for) {
            st.apply_write(ConfirmedWrite::Created(point.clone()));
        } else {
            debug!(id = %point.id, "point created after the map state moved on");
        }
        Ok(point)
    }

    /// Applies a partial update and replaces the local entry in place.
    pub async fn update_point(
        &self,
        id: &PointId,
        patch: &PointPatch,
    ) -> Result<MapPoint, StoreError> {
        let issued_for = self.loaded_for();
        let point = match self.inner.points.update(id, patch).await {
            Ok(point) => point,
            Err(err) => return Err(self.write_failed("Could not update point", err)),
        };

        let mut st = self.inner.state.lock();
        if accepts_write(&st, &issued_for) {
            st.apply_write(ConfirmedWrite::Updated(point.clone()));
        }
        Ok(point)
    }

    /// Deletes a point and drops it locally, clearing the selection if it was
    /// selected. Deleting an id the store no longer has fails with `NotFound`.
    pub async fn delete_point(&self, id: &PointId) -> Result<(), StoreError> {
        let issued_for = self.loaded_for();
        if let Err(err) = self.inner.points.delete(id).await {
            return Err(self.write_failed("Could not delete point", err));
        }

        let mut st = self.inner.state.lock();
        if accepts_write(&st, &issued_for) {
            st.apply_write(ConfirmedWrite::Removed(id.clone()));
        }
        Ok(())
    }

    /// Persists the current camera as the signed-in user's default view.
    pub async fn save_view_as_default(&self) -> Result<UserSettings, StoreError> {
        let view = self.view();
        let patch = SettingsPatch::default().center(view.center(), view.zoom);
        self.write_settings(&patch).await
    }

    /// Switches the base style and persists it for the signed-in user.
    pub async fn set_map_style(&self, style: MapStyle) -> Result<UserSettings, StoreError> {
        let patch = SettingsPatch::default().map_style(style.url());
        let row = self.write_settings(&patch).await?;
        self.inner.state.lock().style = style;
        Ok(row)
    }

    async fn write_settings(&self, patch: &SettingsPatch) -> Result<UserSettings, StoreError> {
        let Some(user) = self.inner.session.user_id() else {
            self.inner.session.request_login("Sign in to save map settings");
            return Err(StoreError::Auth(
                "saving settings requires a signed-in user".to_string(),
            ));
        };

        let issued_for = self.loaded_for();
        let row = match self.inner.settings.update(&user, patch).await {
            Ok(row) => row,
            Err(err) => return Err(self.write_failed("Could not save settings", err)),
        };

        let mut st = self.inner.state.lock();
        if accepts_write(&st, &issued_for) {
            st.settings = SettingsRecord::Persisted(row.clone());
        }
        Ok(row)
    }

    /// Routes one surface event.
    pub fn handle_surface_event(&self, event: SurfaceEvent) -> SurfaceOutcome {
        match event {
            SurfaceEvent::Moved(view) => {
                let view = view.clamped(self.inner.config.zoom_limits);
                self.set_view_state(view);
                SurfaceOutcome::ViewUpdated(view)
            }
            SurfaceEvent::MarkerClicked(id) => {
                if self.select_by_id(&id) {
                    SurfaceOutcome::Selected(id)
                } else {
                    debug!(%id, "click on a marker that is no longer loaded");
                    SurfaceOutcome::Ignored
                }
            }
            SurfaceEvent::MapClicked { at, modifiers } => {
                let authenticated = self.inner.session.is_authenticated();
                match route_map_click(at, modifiers, authenticated) {
                    ClickAction::OpenCreateForm(at) => {
                        SurfaceOutcome::OpenCreateForm(AddPointForm::at(at))
                    }
                    ClickAction::RequestLogin => {
                        self.inner.session.request_login("Sign in to add map points");
                        SurfaceOutcome::LoginRequested
                    }
                    ClickAction::Ignore => SurfaceOutcome::Ignored,
                }
            }
        }
    }

    /// A blank add-point form centered on the current camera.
    pub fn new_point_form(&self) -> AddPointForm {
        AddPointForm::at(self.view().center())
    }

    /// Keeps the state loaded for whoever is signed in: bootstraps on start
    /// if nothing is loaded yet, then again on every identity change. Returns
    /// after [`MapSync::close`].
    pub async fn run_identity_loop(&self) {
        let mut sessions = self.inner.session.subscribe();
        let mut shutdown = self.inner.shutdown.subscribe();

        loop {
            if *shutdown.borrow_and_update() || self.is_closed() {
                break;
            }
            let user = sessions
                .borrow_and_update()
                .as_ref()
                .map(|s| s.user_id.clone());
            let (phase, loaded_for) = {
                let st = self.inner.state.lock();
                (st.phase, st.user.clone())
            };
            if phase == LoadPhase::Uninitialized || user != loaded_for {
                info!(
                    from = loaded_for.as_ref().map(UserId::as_str),
                    to = user.as_ref().map(UserId::as_str),
                    "identity changed, reloading map state"
                );
                self.bootstrap().await;
                continue;
            }

            tokio::select! {
                changed = sessions.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = shutdown.changed() => {}
            }
        }
        debug!("identity loop stopped");
    }

    /// Tears down the scope. In-flight results arriving afterwards are dropped.
    pub fn close(&self) {
        {
            let mut st = self.inner.state.lock();
            if st.closed {
                return;
            }
            st.closed = true;
        }
        self.inner.generation.advance();
        self.inner.shutdown.send_replace(true);
        debug!("map state closed");
    }

    fn loaded_for(&self) -> Option<UserId> {
        self.inner.state.lock().user.clone()
    }

    /// Surfaces a failed user write as a dismissible notice, plus a login
    /// prompt when the store rejected the session.
    fn write_failed(&self, action: &str, err: StoreError) -> StoreError {
        warn!("{action}: {err}");
        self.events().notify(Severity::Error, format!("{action}: {err}"));
        if err.is_auth() {
            self.inner.session.request_login(action.to_string());
        }
        err
    }
}

/// Confirmed writes land unless the scope closed or the state now belongs to
/// another identity. A reload for the same user does not discard them.
fn accepts_write(st: &MapState, issued_for: &Option<UserId>) -> bool {
    !st.closed && st.user == *issued_for
}

fn apply_list_failure(st: &mut MapState, err: StoreError) {
    st.points.clear();
    st.selection.clear();
    st.points_error = Some(err);
}
