use catalog::{FallbackReason, MapPoint, SettingsRecord, StoreError};
use foundation::{PointId, UserId};
use scene::{MapStyle, Marker, PopupContent, Selection, ViewState, project_markers};

/// A store-confirmed write, kept while a list fetch is in flight so it can be
/// replayed over a list that was read before the write committed.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ConfirmedWrite {
    Created(MapPoint),
    Updated(MapPoint),
    Removed(PointId),
}

impl ConfirmedWrite {
    /// Idempotent: applying a write the list already reflects changes nothing.
    pub(crate) fn apply_to(&self, points: &mut Vec<MapPoint>) {
        match self {
            ConfirmedWrite::Created(point) => {
                if !points.iter().any(|p| p.id == point.id) {
                    points.insert(0, point.clone());
                }
            }
            ConfirmedWrite::Updated(point) => {
                if let Some(slot) = points.iter_mut().find(|p| p.id == point.id) {
                    if slot.updated_at <= point.updated_at {
                        *slot = point.clone();
                    }
                }
            }
            ConfirmedWrite::Removed(id) => points.retain(|p| p.id != *id),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum LoadPhase {
    #[default]
    Uninitialized,
    Loading,
    Ready,
}

/// Everything the map core owns. [`crate::MapSync::snapshot`] hands out copies.
#[derive(Debug, Clone, PartialEq)]
pub struct MapState {
    pub phase: LoadPhase,
    /// Identity the current load was issued for.
    pub user: Option<UserId>,
    /// Newest first.
    pub points: Vec<MapPoint>,
    /// Set when the last point fetch failed; the list is empty in that case.
    pub points_error: Option<StoreError>,
    pub view: ViewState,
    pub selection: Selection,
    pub settings: SettingsRecord,
    pub style: MapStyle,
    pub closed: bool,
    pub(crate) loads_in_flight: usize,
    pub(crate) confirmed: Vec<ConfirmedWrite>,
}

impl MapState {
    pub fn new(view: ViewState) -> Self {
        Self {
            phase: LoadPhase::Uninitialized,
            user: None,
            points: Vec::new(),
            points_error: None,
            view,
            selection: Selection::new(),
            settings: SettingsRecord::fallback(FallbackReason::SignedOut),
            style: MapStyle::default(),
            closed: false,
            loads_in_flight: 0,
            confirmed: Vec::new(),
        }
    }

    pub(crate) fn begin_load(&mut self) {
        self.loads_in_flight += 1;
    }

    pub(crate) fn end_load(&mut self) {
        self.loads_in_flight = self.loads_in_flight.saturating_sub(1);
        if self.loads_in_flight == 0 {
            self.confirmed.clear();
        }
    }

    /// Applies a confirmed write locally, remembering it while any fetch that
    /// may predate it is still outstanding.
    pub(crate) fn apply_write(&mut self, write: ConfirmedWrite) {
        write.apply_to(&mut self.points);
        match &write {
            ConfirmedWrite::Created(_) => {}
            ConfirmedWrite::Updated(point) => {
                self.selection.refresh(point);
            }
            ConfirmedWrite::Removed(id) => {
                self.selection.clear_if(id);
            }
        }
        if self.loads_in_flight > 0 {
            self.confirmed.push(write);
        }
    }

    /// Installs a freshly fetched list, with confirmed writes replayed on top.
    pub(crate) fn replace_points(&mut self, list: Vec<MapPoint>) {
        self.points = list;
        for write in &self.confirmed {
            write.apply_to(&mut self.points);
        }
        self.points_error = None;
        self.selection.reconcile(&self.points);
    }

    pub fn is_ready(&self) -> bool {
        self.phase == LoadPhase::Ready
    }

    /// Partial failure: the point fetch failed, or settings degraded for a
    /// reason other than being signed out.
    pub fn has_error(&self) -> bool {
        self.points_error.is_some()
            || matches!(
                self.settings.fallback_reason(),
                Some(FallbackReason::Unauthorized | FallbackReason::Unavailable)
            )
    }

    pub fn point(&self, id: &PointId) -> Option<&MapPoint> {
        self.points.iter().find(|p| p.id == *id)
    }

    pub fn selected(&self) -> Option<&MapPoint> {
        self.selection.get()
    }

    pub fn markers(&self) -> Vec<Marker> {
        project_markers(&self.points, &self.selection)
    }

    pub fn popup(&self) -> Option<PopupContent> {
        PopupContent::for_selection(&self.selection)
    }
}
