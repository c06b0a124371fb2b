//! Domain types shared by the intake pipeline, the geocoder and the backend.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Geocode result
// ---------------------------------------------------------------------------

/// A resolved address: coordinates plus the geocoder's display string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Human-readable address as formatted by the geocoder.
    #[serde(alias = "formattedAddress", alias = "address")]
    pub formatted_address: String,
}

impl GeoLocation {
    /// Whether both coordinates are finite and inside WGS84 bounds.
    pub fn has_valid_coordinates(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

// ---------------------------------------------------------------------------
// Urgency
// ---------------------------------------------------------------------------

/// Urgency level on a 1 (can wait) to 5 (immediate) scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Urgency(u8);

impl Urgency {
    /// Lowest level.
    pub const MIN: u8 = 1;
    /// Highest level.
    pub const MAX: u8 = 5;
    /// Level used when nothing better is known.
    pub const DEFAULT: Urgency = Urgency(3);

    /// Build from an in-range level.
    pub fn new(level: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&level).then_some(Self(level))
    }

    /// Build from an arbitrary integer, clamping into `1..=5`.
    pub fn clamped(level: i64) -> Self {
        let bounded = level.clamp(i64::from(Self::MIN), i64::from(Self::MAX));
        u8::try_from(bounded).map(Self).unwrap_or(Self::DEFAULT)
    }

    /// The numeric level.
    pub fn level(self) -> u8 {
        self.0
    }
}

impl Default for Urgency {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<Urgency> for u8 {
    fn from(value: Urgency) -> Self {
        value.0
    }
}

impl TryFrom<u8> for Urgency {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("urgency {value} outside 1..=5"))
    }
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.0, Self::MAX)
    }
}
