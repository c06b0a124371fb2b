//! Geocoding collaborator: free-text address to coordinates.
//!
//! The [`Geocoder`] trait is the seam used by the intake field validator.
//! [`google::GoogleGeocoder`] implements it against the Google Geocoding API.

use async_trait::async_trait;

use crate::providers::ProviderError;
use crate::types::GeoLocation;

pub mod google;

/// Errors returned by a geocoder.
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    /// HTTP transport failure or non-success status.
    #[error("geocoder request failed: {0}")]
    Transport(#[from] ProviderError),
    /// Response body did not match the expected schema.
    #[error("geocoder response parse error: {0}")]
    Parse(String),
    /// The API answered with an error status (quota, denied key, ...).
    #[error("geocoder returned status {status}: {message}")]
    Status {
        /// API status string.
        status: String,
        /// Optional explanation from the API.
        message: String,
    },
}

impl From<reqwest::Error> for GeocodeError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(ProviderError::from(value))
    }
}

/// Resolves a free-text address into a single best match.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Look up `address`. `Ok(None)` means the geocoder found no match.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] on transport failure or an API error status.
    async fn geocode(&self, address: &str) -> Result<Option<GeoLocation>, GeocodeError>;
}
