use catalog::MapPoint;
use foundation::PointId;

/// The single focused point, if any.
///
/// Holds a copy of the record so the popup can render without a list lookup;
/// callers keep it fresh with [`Selection::refresh`] and [`Selection::reconcile`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    point: Option<MapPoint>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&MapPoint> {
        self.point.as_ref()
    }

    pub fn id(&self) -> Option<&PointId> {
        self.point.as_ref().map(|p| &p.id)
    }

    pub fn is_selected(&self, id: &PointId) -> bool {
        self.id() == Some(id)
    }

    pub fn is_empty(&self) -> bool {
        self.point.is_none()
    }

    /// Returns the previously selected point.
    pub fn select(&mut self, point: MapPoint) -> Option<MapPoint> {
        self.point.replace(point)
    }

    pub fn clear(&mut self) -> Option<MapPoint> {
        self.point.take()
    }

    /// Replaces the held copy if `point` is the selected record.
    ///
    /// Returns `true` if the selection changed.
    pub fn refresh(&mut self, point: &MapPoint) -> bool {
        match &mut self.point {
            Some(current) if current.id == point.id => {
                *current = point.clone();
                true
            }
            _ => false,
        }
    }

    /// Clears the selection if it holds `id`.
    pub fn clear_if(&mut self, id: &PointId) -> bool {
        if self.is_selected(id) {
            self.point = None;
            true
        } else {
            false
        }
    }

    /// Re-points the selection at the matching entry of a freshly loaded list,
    /// or clears it when the record is gone.
    pub fn reconcile(&mut self, points: &[MapPoint]) {
        let Some(id) = self.id().cloned() else {
            return;
        };
        self.point = points.iter().find(|p| p.id == id).cloned();
    }
}
