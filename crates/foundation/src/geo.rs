//! Geographic coordinates in WGS84 degrees.

use std::fmt;

pub const MIN_LATITUDE: f64 = -90.0;
pub const MAX_LATITUDE: f64 = 90.0;
pub const MIN_LONGITUDE: f64 = -180.0;
pub const MAX_LONGITUDE: f64 = 180.0;

/// A longitude/latitude pair in degrees.
///
/// Construction does not validate; call [`LngLat::validate`] at trust boundaries
/// (user input, store responses).
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LngLat {
    pub longitude: f64,
    pub latitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoordError {
    NonFiniteLatitude,
    NonFiniteLongitude,
    LatitudeOutOfRange(f64),
    LongitudeOutOfRange(f64),
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::NonFiniteLatitude => write!(f, "latitude must be a finite number"),
            CoordError::NonFiniteLongitude => write!(f, "longitude must be a finite number"),
            CoordError::LatitudeOutOfRange(v) => {
                write!(f, "latitude {v} outside [{MIN_LATITUDE}, {MAX_LATITUDE}]")
            }
            CoordError::LongitudeOutOfRange(v) => {
                write!(f, "longitude {v} outside [{MIN_LONGITUDE}, {MAX_LONGITUDE}]")
            }
        }
    }
}

impl std::error::Error for CoordError {}

impl LngLat {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    pub fn validate(&self) -> Result<(), CoordError> {
        validate_latitude(self.latitude)?;
        validate_longitude(self.longitude)
    }
}

pub fn validate_latitude(latitude: f64) -> Result<(), CoordError> {
    if !latitude.is_finite() {
        return Err(CoordError::NonFiniteLatitude);
    }
    if !(MIN_LATITUDE..=MAX_LATITUDE).contains(&latitude) {
        return Err(CoordError::LatitudeOutOfRange(latitude));
    }
    Ok(())
}

pub fn validate_longitude(longitude: f64) -> Result<(), CoordError> {
    if !longitude.is_finite() {
        return Err(CoordError::NonFiniteLongitude);
    }
    if !(MIN_LONGITUDE..=MAX_LONGITUDE).contains(&longitude) {
        return Err(CoordError::LongitudeOutOfRange(longitude));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{CoordError, LngLat};

    #[test]
    fn accepts_bounds_inclusive() {
        assert!(LngLat::new(-180.0, -90.0).validate().is_ok());
        assert!(LngLat::new(180.0, 90.0).validate().is_ok());
        assert!(LngLat::new(-105.0, 40.0).validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_and_non_finite() {
        assert_eq!(
            LngLat::new(0.0, 90.5).validate(),
            Err(CoordError::LatitudeOutOfRange(90.5))
        );
        assert_eq!(
            LngLat::new(-181.0, 0.0).validate(),
            Err(CoordError::LongitudeOutOfRange(-181.0))
        );
        assert_eq!(
            LngLat::new(0.0, f64::NAN).validate(),
            Err(CoordError::NonFiniteLatitude)
        );
        assert_eq!(
            LngLat::new(f64::INFINITY, 0.0).validate(),
            Err(CoordError::NonFiniteLongitude)
        );
    }
}
