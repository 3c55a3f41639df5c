use scene::{FLY_TO_ZOOM, FOCUS_ZOOM, ZoomLimits};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MapSyncConfig {
    pub zoom_limits: ZoomLimits,
    /// Zoom the camera jumps to when a point is selected.
    pub focus_zoom: f64,
    pub fly_to_zoom: f64,
}

impl Default for MapSyncConfig {
    fn default() -> Self {
        Self {
            zoom_limits: ZoomLimits::default(),
            focus_zoom: FOCUS_ZOOM,
            fly_to_zoom: FLY_TO_ZOOM,
        }
    }
}
