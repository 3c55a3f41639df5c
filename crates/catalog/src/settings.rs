use chrono::{DateTime, Utc};
use foundation::{LngLat, SettingsId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub const DEFAULT_LATITUDE: f64 = -36.114858138524454;
pub const DEFAULT_LONGITUDE: f64 = 146.8884086608887;
pub const DEFAULT_ZOOM: f64 = 8.0;
pub const DEFAULT_MAP_STYLE: &str = "mapbox://styles/mapbox/streets-v12";

/// The user-adjustable part of a settings row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsDefaults {
    pub default_latitude: f64,
    pub default_longitude: f64,
    pub default_zoom: f64,
    pub map_style: String,
}

impl Default for SettingsDefaults {
    fn default() -> Self {
        Self {
            default_latitude: DEFAULT_LATITUDE,
            default_longitude: DEFAULT_LONGITUDE,
            default_zoom: DEFAULT_ZOOM,
            map_style: DEFAULT_MAP_STYLE.to_string(),
        }
    }
}

impl SettingsDefaults {
    pub fn center(&self) -> LngLat {
        LngLat::new(self.default_longitude, self.default_latitude)
    }
}

/// A persisted settings row. At most one exists per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    pub id: SettingsId,
    pub user_id: UserId,
    pub default_latitude: f64,
    pub default_longitude: f64,
    pub default_zoom: f64,
    pub map_style: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserSettings {
    pub fn preferences(&self) -> SettingsDefaults {
        SettingsDefaults {
            default_latitude: self.default_latitude,
            default_longitude: self.default_longitude,
            default_zoom: self.default_zoom,
            map_style: self.map_style.clone(),
        }
    }

    pub fn patched(&self, patch: &SettingsPatch, updated_at: DateTime<Utc>) -> Self {
        let mut out = self.clone();
        if let Some(v) = patch.default_latitude {
            out.default_latitude = v;
        }
        if let Some(v) = patch.default_longitude {
            out.default_longitude = v;
        }
        if let Some(v) = patch.default_zoom {
            out.default_zoom = v;
        }
        if let Some(v) = &patch.map_style {
            out.map_style = v.clone();
        }
        out.updated_at = Some(updated_at);
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_zoom: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_style: Option<String>,
}

impl SettingsPatch {
    pub fn center(mut self, at: LngLat, zoom: f64) -> Self {
        self.default_latitude = Some(at.latitude);
        self.default_longitude = Some(at.longitude);
        self.default_zoom = Some(zoom);
        self
    }

    pub fn map_style(mut self, style: impl Into<String>) -> Self {
        self.map_style = Some(style.into());
        self
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if let Some(v) = self.default_latitude {
            foundation::validate_latitude(v)?;
        }
        if let Some(v) = self.default_longitude {
            foundation::validate_longitude(v)?;
        }
        if let Some(zoom) = self.default_zoom {
            if !zoom.is_finite() || zoom < 0.0 {
                return Err(StoreError::Validation(format!("invalid zoom {zoom}")));
            }
        }
        if self.map_style.as_deref().is_some_and(|s| s.trim().is_empty()) {
            return Err(StoreError::Validation("map style must not be empty".into()));
        }
        Ok(())
    }
}

/// Why a settings read fell back to static defaults.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// Nobody is signed in.
    SignedOut,
    /// The store (or the session check) rejected the caller.
    Unauthorized,
    /// Any other read or create failure.
    Unavailable,
}

impl FallbackReason {
    pub fn is_auth(self) -> bool {
        matches!(self, FallbackReason::SignedOut | FallbackReason::Unauthorized)
    }
}

/// Result of a settings read: either a real row, or synthesized defaults that
/// were never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsRecord {
    Persisted(UserSettings),
    Fallback {
        preferences: SettingsDefaults,
        reason: FallbackReason,
    },
}

impl SettingsRecord {
    pub fn fallback(reason: FallbackReason) -> Self {
        SettingsRecord::Fallback {
            preferences: SettingsDefaults::default(),
            reason,
        }
    }

    pub fn preferences(&self) -> SettingsDefaults {
        match self {
            SettingsRecord::Persisted(row) => row.preferences(),
            SettingsRecord::Fallback { preferences, .. } => preferences.clone(),
        }
    }

    pub fn persisted(&self) -> Option<&UserSettings> {
        match self {
            SettingsRecord::Persisted(row) => Some(row),
            SettingsRecord::Fallback { .. } => None,
        }
    }

    pub fn fallback_reason(&self) -> Option<FallbackReason> {
        match self {
            SettingsRecord::Persisted(_) => None,
            SettingsRecord::Fallback { reason, .. } => Some(*reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use foundation::LngLat;

    use super::{
        DEFAULT_MAP_STYLE, FallbackReason, SettingsDefaults, SettingsPatch, SettingsRecord,
        UserSettings,
    };

    #[test]
    fn fallback_is_never_persisted() {
        let record = SettingsRecord::fallback(FallbackReason::Unavailable);
        assert!(record.persisted().is_none());
        assert_eq!(record.preferences(), SettingsDefaults::default());
        assert_eq!(record.preferences().map_style, DEFAULT_MAP_STYLE);
        assert!(!FallbackReason::Unavailable.is_auth());
        assert!(FallbackReason::SignedOut.is_auth());
    }

    #[test]
    fn patch_validation() {
        assert!(
            SettingsPatch::default()
                .center(LngLat::new(10.0, 10.0), 9.0)
                .validate()
                .is_ok()
        );
        assert!(
            SettingsPatch::default()
                .center(LngLat::new(10.0, 100.0), 9.0)
                .validate()
                .is_err()
        );
        assert!(SettingsPatch::default().map_style(" ").validate().is_err());
    }

    #[test]
    fn patched_row_keeps_identity() {
        let row = UserSettings {
            id: "s-1".into(),
            user_id: "u-1".into(),
            default_latitude: 1.0,
            default_longitude: 2.0,
            default_zoom: 8.0,
            map_style: DEFAULT_MAP_STYLE.into(),
            created_at: Utc::now(),
            updated_at: None,
        };
        let out = row.patched(&SettingsPatch::default().map_style("dark"), Utc::now());
        assert_eq!(out.id, row.id);
        assert_eq!(out.created_at, row.created_at);
        assert_eq!(out.map_style, "dark");
        assert_eq!(out.default_zoom, 8.0);
        assert!(out.updated_at.is_some());
    }
}
