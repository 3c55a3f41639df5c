use std::fmt;

use chrono::{DateTime, Utc};
use foundation::{LngLat, PointId};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::StoreError;

pub const MIN_RATING: f64 = 0.0;
pub const MAX_RATING: f64 = 5.0;

/// Category tag of a point. The set is open: unknown tags survive a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PointKind {
    Campsite,
    RvPark,
    Cabin,
    Glamping,
    HikingTrail,
    Viewpoint,
    Other(String),
}

impl PointKind {
    pub const KNOWN: [PointKind; 6] = [
        PointKind::Campsite,
        PointKind::RvPark,
        PointKind::Cabin,
        PointKind::Glamping,
        PointKind::HikingTrail,
        PointKind::Viewpoint,
    ];

    /// Parses a stored tag. Display labels ("Hiking Trail") are accepted too.
    pub fn from_tag(tag: &str) -> Self {
        let normalized: String = tag
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        match normalized.as_str() {
            "campsite" => PointKind::Campsite,
            "rv_park" => PointKind::RvPark,
            "cabin" => PointKind::Cabin,
            "glamping" => PointKind::Glamping,
            "hiking_trail" => PointKind::HikingTrail,
            "viewpoint" => PointKind::Viewpoint,
            _ => PointKind::Other(tag.trim().to_string()),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            PointKind::Campsite => "campsite",
            PointKind::RvPark => "rv_park",
            PointKind::Cabin => "cabin",
            PointKind::Glamping => "glamping",
            PointKind::HikingTrail => "hiking_trail",
            PointKind::Viewpoint => "viewpoint",
            PointKind::Other(tag) => tag,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            PointKind::Campsite => "Campsite",
            PointKind::RvPark => "RV Park",
            PointKind::Cabin => "Cabin",
            PointKind::Glamping => "Glamping",
            PointKind::HikingTrail => "Hiking Trail",
            PointKind::Viewpoint => "Viewpoint",
            PointKind::Other(tag) => tag,
        }
    }
}

impl Default for PointKind {
    fn default() -> Self {
        PointKind::Campsite
    }
}

impl fmt::Display for PointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<String> for PointKind {
    fn from(tag: String) -> Self {
        PointKind::from_tag(&tag)
    }
}

impl From<PointKind> for String {
    fn from(kind: PointKind) -> Self {
        kind.tag().to_string()
    }
}

/// A persisted point of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapPoint {
    pub id: PointId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "type")]
    pub kind: PointKind,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub amenities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl MapPoint {
    pub fn position(&self) -> LngLat {
        LngLat::new(self.longitude, self.latitude)
    }

    /// Builds the stored record for a draft. Used by stores that assign ids locally.
    pub fn from_draft(id: PointId, draft: &PointDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name.clone(),
            description: draft.description.clone(),
            latitude: draft.latitude,
            longitude: draft.longitude,
            kind: draft.kind.clone(),
            amenities: draft.amenities.clone(),
            rating: draft.rating,
            created_at,
            updated_at: None,
        }
    }

    /// Returns a copy with the fields present in `patch` replaced.
    ///
    /// `id` and `created_at` never change.
    pub fn patched(&self, patch: &PointPatch, updated_at: DateTime<Utc>) -> Self {
        let mut out = self.clone();
        if let Some(name) = &patch.name {
            out.name = name.clone();
        }
        if let Some(description) = &patch.description {
            out.description = description.clone();
        }
        if let Some(latitude) = patch.latitude {
            out.latitude = latitude;
        }
        if let Some(longitude) = patch.longitude {
            out.longitude = longitude;
        }
        if let Some(kind) = &patch.kind {
            out.kind = kind.clone();
        }
        if let Some(amenities) = &patch.amenities {
            out.amenities = amenities.clone();
        }
        if let Some(rating) = patch.rating {
            out.rating = rating;
        }
        out.updated_at = Some(updated_at);
        out
    }
}

/// A point as submitted by a user: no identifier, no timestamps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointDraft {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "type")]
    pub kind: PointKind,
    pub amenities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

impl PointDraft {
    pub fn new(name: impl Into<String>, kind: PointKind, at: LngLat) -> Self {
        Self {
            name: name.into(),
            description: None,
            latitude: at.latitude,
            longitude: at.longitude,
            kind,
            amenities: Vec::new(),
            rating: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_amenities<I, S>(mut self, amenities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.amenities = amenities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        validate_name(&self.name)?;
        validate_kind(&self.kind)?;
        LngLat::new(self.longitude, self.latitude).validate()?;
        if let Some(rating) = self.rating {
            validate_rating(rating)?;
        }
        Ok(())
    }
}

/// Partial update. Only `Some` fields are sent; `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PointPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<PointKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amenities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<Option<f64>>,
}

impl PointPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    pub fn position(mut self, at: LngLat) -> Self {
        self.latitude = Some(at.latitude);
        self.longitude = Some(at.longitude);
        self
    }

    pub fn kind(mut self, kind: PointKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn amenities(mut self, amenities: Vec<String>) -> Self {
        self.amenities = Some(amenities);
        self
    }

    pub fn rating(mut self, rating: Option<f64>) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(kind) = &self.kind {
            validate_kind(kind)?;
        }
        if let Some(latitude) = self.latitude {
            foundation::validate_latitude(latitude)?;
        }
        if let Some(longitude) = self.longitude {
            foundation::validate_longitude(longitude)?;
        }
        if let Some(Some(rating)) = self.rating {
            validate_rating(rating)?;
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), StoreError> {
    if name.trim().is_empty() {
        return Err(StoreError::Validation("name is required".to_string()));
    }
    Ok(())
}

fn validate_kind(kind: &PointKind) -> Result<(), StoreError> {
    if kind.tag().trim().is_empty() {
        return Err(StoreError::Validation("type is required".to_string()));
    }
    Ok(())
}

fn validate_rating(rating: f64) -> Result<(), StoreError> {
    if !rating.is_finite() || !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(StoreError::Validation(format!(
            "rating {rating} outside [{MIN_RATING}, {MAX_RATING}]"
        )));
    }
    Ok(())
}
