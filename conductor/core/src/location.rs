//! Location Bias
//!
//! An optional device location that biases maps grounding toward the user.
//! The terminal has no device geolocation, so the shipped provider reports a
//! fixed, configured coordinate. Failures are never fatal: the conductor turns
//! them into a one-time advisory and carries on without a bias.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A WGS84 coordinate
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Degrees north, -90..=90
    pub latitude: f64,
    /// Degrees east, -180..=180
    pub longitude: f64,
}

impl LatLng {
    /// Validate and build a coordinate
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, LocationError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(LocationError::Unavailable(format!(
                "coordinate out of range: {latitude},{longitude}"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

impl FromStr for LatLng {
    type Err = LocationError;

    /// Parse `"lat,lng"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LocationError::Unavailable(format!("invalid coordinate: {s:?}"));
        let (lat, lng) = s.split_once(',').ok_or_else(invalid)?;
        let lat = lat.trim().parse::<f64>().map_err(|_| invalid())?;
        let lng = lng.trim().parse::<f64>().map_err(|_| invalid())?;
        Self::new(lat, lng)
    }
}

/// Why a location could not be obtained
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LocationError {
    /// The user refused access
    #[error("permission denied")]
    PermissionDenied,
    /// No position could be determined
    #[error("position unavailable: {0}")]
    Unavailable(String),
    /// The lookup took too long
    #[error("timed out")]
    Timeout,
    /// Anything else
    #[error("unknown location error: {0}")]
    Unknown(String),
}

impl LocationError {
    /// Prefix of the advisory message
    pub const ADVISORY_PREFIX: &'static str = "Location access issue: ";

    /// Text shown to the user
    #[must_use]
    pub fn friendly_message(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "You have denied permission to access your location. To get better results, please enable location services in your settings.",
            Self::Unavailable(_) => "Your location is currently unavailable. Map results may be less accurate. Please check your device's location services and network connection.",
            Self::Timeout => "The request to get your location timed out.",
            Self::Unknown(_) => "An unknown error occurred while trying to get your location.",
        }
    }

    /// Full advisory message
    #[must_use]
    pub fn advisory(&self) -> String {
        format!("{}{}", Self::ADVISORY_PREFIX, self.friendly_message())
    }
}

/// Source of the device location
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Current position
    async fn current_location(&self) -> Result<LatLng, LocationError>;
}

/// Reports a coordinate taken from configuration
#[derive(Clone, Debug, Default)]
pub struct ConfiguredLocation {
    coords: Option<LatLng>,
}

impl ConfiguredLocation {
    /// Provider for an optional coordinate; `None` reports unavailable
    #[must_use]
    pub fn new(coords: Option<LatLng>) -> Self {
        Self { coords }
    }
}

#[async_trait]
impl LocationProvider for ConfiguredLocation {
    async fn current_location(&self) -> Result<LatLng, LocationError> {
        self.coords
            .ok_or_else(|| LocationError::Unavailable("no coordinates configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_lat_lng() {
        let paris: LatLng = "48.8584, 2.2945".parse().unwrap();
        assert_eq!(paris, LatLng::new(48.8584, 2.2945).unwrap());
        assert_eq!(paris.to_string(), "48.8584,2.2945");

        assert!("91,0".parse::<LatLng>().is_err());
        assert!("0,181".parse::<LatLng>().is_err());
        assert!("paris".parse::<LatLng>().is_err());
        assert!("1,x".parse::<LatLng>().is_err());
    }

    #[test]
    fn test_advisory_text() {
        assert_eq!(
            LocationError::Timeout.advisory(),
            "Location access issue: The request to get your location timed out."
        );
        assert!(LocationError::PermissionDenied
            .advisory()
            .starts_with(LocationError::ADVISORY_PREFIX));
    }

    #[tokio::test]
    async fn test_configured_location() {
        let coords = LatLng::new(1.0, 2.0).unwrap();
        assert_eq!(
            ConfiguredLocation::new(Some(coords)).current_location().await,
            Ok(coords)
        );
        assert!(matches!(
            ConfiguredLocation::new(None).current_location().await,
            Err(LocationError::Unavailable(_))
        ));
    }
}
