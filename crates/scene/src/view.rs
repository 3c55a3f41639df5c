use std::fmt;

use catalog::{DEFAULT_LATITUDE, DEFAULT_LONGITUDE, DEFAULT_ZOOM, SettingsDefaults};
use foundation::LngLat;

pub const MIN_ZOOM: f64 = 3.0;
pub const MAX_ZOOM: f64 = 18.0;

/// Zoom applied when the camera is retargeted onto a selected point.
pub const FOCUS_ZOOM: f64 = 12.0;

/// Default zoom for a programmatic fly-to.
pub const FLY_TO_ZOOM: f64 = 14.0;

/// The map camera: center and zoom.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewState {
    pub longitude: f64,
    pub latitude: f64,
    pub zoom: f64,
}

impl ViewState {
    pub fn new(longitude: f64, latitude: f64, zoom: f64) -> Self {
        Self {
            longitude,
            latitude,
            zoom,
        }
    }

    pub fn centered_on(at: LngLat, zoom: f64) -> Self {
        Self::new(at.longitude, at.latitude, zoom)
    }

    /// Initial camera taken from a user's stored preferences.
    pub fn from_preferences(prefs: &SettingsDefaults) -> Self {
        Self::new(prefs.default_longitude, prefs.default_latitude, prefs.default_zoom)
    }

    pub fn center(&self) -> LngLat {
        LngLat::new(self.longitude, self.latitude)
    }

    pub fn clamped(self, limits: ZoomLimits) -> Self {
        Self {
            zoom: limits.clamp(self.zoom),
            ..self
        }
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(DEFAULT_LONGITUDE, DEFAULT_LATITUDE, DEFAULT_ZOOM)
    }
}

impl fmt::Display for ViewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.5}, {:.5} @ z{:.2}",
            self.longitude, self.latitude, self.zoom
        )
    }
}

/// Zoom range the surface allows.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ZoomLimits {
    pub min: f64,
    pub max: f64,
}

impl ZoomLimits {
    /// Bounds are reordered if given backwards.
    pub fn new(a: f64, b: f64) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }

    /// NaN zoom falls back to `min`.
    pub fn clamp(&self, zoom: f64) -> f64 {
        if zoom.is_nan() {
            return self.min;
        }
        zoom.clamp(self.min, self.max)
    }
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min: MIN_ZOOM,
            max: MAX_ZOOM,
        }
    }
}

#[cfg(test)]
mod tests {
    use catalog::SettingsDefaults;
    use foundation::LngLat;

    use super::*;

    #[test]
    fn default_view_matches_default_preferences() {
        assert_eq!(
            ViewState::default(),
            ViewState::from_preferences(&SettingsDefaults::default())
        );
    }

    #[test]
    fn zoom_is_clamped_to_limits() {
        let limits = ZoomLimits::default();
        assert_eq!(limits.clamp(1.0), 3.0);
        assert_eq!(limits.clamp(22.0), 18.0);
        assert_eq!(limits.clamp(9.5), 9.5);
        assert_eq!(limits.clamp(f64::NAN), 3.0);
        assert_eq!(limits.clamp(f64::INFINITY), 18.0);
    }

    #[test]
    fn reversed_limits_are_reordered() {
        let limits = ZoomLimits::new(16.0, 4.0);
        assert_eq!(limits.min, 4.0);
        assert_eq!(limits.max, 16.0);
    }

    #[test]
    fn clamped_keeps_center() {
        let v = ViewState::centered_on(LngLat::new(-105.0, 40.0), 30.0).clamped(ZoomLimits::default());
        assert_eq!(v, ViewState::new(-105.0, 40.0, 18.0));
    }
}
