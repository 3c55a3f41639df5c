use catalog::{MapPoint, PointKind};
use foundation::{LngLat, PointId};

use crate::selection::Selection;

pub const CAMPSITE_COLOR: &str = "#FF5733";
pub const HIKING_TRAIL_COLOR: &str = "#33FF57";
pub const DEFAULT_MARKER_COLOR: &str = "#3357FF";

pub const SELECTED_MARKER_SCALE: f32 = 1.2;
pub const MARKER_SCALE: f32 = 0.8;

pub const MAX_STARS: u8 = 5;

pub fn marker_color(kind: &PointKind) -> &'static str {
    match kind {
        PointKind::Campsite => CAMPSITE_COLOR,
        PointKind::HikingTrail => HIKING_TRAIL_COLOR,
        _ => DEFAULT_MARKER_COLOR,
    }
}

/// What the surface draws for one point.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub id: PointId,
    pub position: LngLat,
    pub color: &'static str,
    pub scale: f32,
}

/// One marker per point, in list order.
pub fn project_markers(points: &[MapPoint], selection: &Selection) -> Vec<Marker> {
    points
        .iter()
        .map(|p| Marker {
            id: p.id.clone(),
            position: p.position(),
            color: marker_color(&p.kind),
            scale: if selection.is_selected(&p.id) {
                SELECTED_MARKER_SCALE
            } else {
                MARKER_SCALE
            },
        })
        .collect()
}

/// Popup body for the selected point.
#[derive(Debug, Clone, PartialEq)]
pub struct PopupContent {
    pub id: PointId,
    pub anchor: LngLat,
    pub title: String,
    pub description: Option<String>,
    pub kind_label: String,
    pub amenities: Vec<String>,
    /// `None` hides the rating row (no rating, or a rating of zero).
    pub stars_filled: Option<u8>,
}

impl PopupContent {
    pub fn for_point(point: &MapPoint) -> Self {
        let stars_filled = point
            .rating
            .filter(|r| *r > 0.0)
            .map(|r| r.ceil().min(f64::from(MAX_STARS)) as u8);
        Self {
            id: point.id.clone(),
            anchor: point.position(),
            title: point.name.clone(),
            description: point.description.clone().filter(|d| !d.is_empty()),
            kind_label: point.kind.label().to_string(),
            amenities: point.amenities.clone(),
            stars_filled,
        }
    }

    pub fn for_selection(selection: &Selection) -> Option<Self> {
        selection.get().map(Self::for_point)
    }

    /// Filled/empty flags for the five-star row.
    pub fn stars(&self) -> Option<[bool; MAX_STARS as usize]> {
        let filled = self.stars_filled?;
        let mut row = [false; MAX_STARS as usize];
        for (i, star) in row.iter_mut().enumerate() {
            *star = (i as u8) < filled;
        }
        Some(row)
    }
}
