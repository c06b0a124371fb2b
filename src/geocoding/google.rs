//! Google Geocoding API client.

use serde::Deserialize;

use crate::config::GeocodingConfig;
use crate::credentials::ApiKey;
use crate::providers::check_http_response;
use crate::types::GeoLocation;

use super::{GeocodeError, Geocoder};

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// Geocoding API response body.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct GeocodeResponse {
    /// `OK`, `ZERO_RESULTS`, or an error status.
    pub status: String,
    /// Candidate matches, best first.
    #[serde(default)]
    pub results: Vec<GeocodeCandidate>,
    /// Explanation for error statuses.
    pub error_message: Option<String>,
}

/// A single candidate match.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct GeocodeCandidate {
    /// Display address.
    pub formatted_address: String,
    /// Geometry block.
    pub geometry: GeocodeGeometry,
}

/// Candidate geometry.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct GeocodeGeometry {
    /// Point location.
    pub location: GeocodePoint,
}

/// Latitude/longitude pair.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct GeocodePoint {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
}

/// Parse a Geocoding API body. The first candidate wins.
///
/// # Errors
///
/// Returns `GeocodeError::Parse` for malformed bodies and
/// `GeocodeError::Status` for statuses other than `OK` / `ZERO_RESULTS`.
#[doc(hidden)]
pub fn parse_response(body: &str) -> Result<Option<GeoLocation>, GeocodeError> {
    let resp: GeocodeResponse =
        serde_json::from_str(body).map_err(|e| GeocodeError::Parse(e.to_string()))?;

    match resp.status.as_str() {
        "OK" => Ok(resp.results.into_iter().next().map(|c| GeoLocation {
            latitude: c.geometry.location.lat,
            longitude: c.geometry.location.lng,
            formatted_address: c.formatted_address,
        })),
        "ZERO_RESULTS" => Ok(None),
        _ => Err(GeocodeError::Status {
            status: resp.status,
            message: resp.error_message.unwrap_or_default(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Google Geocoding API client.
#[derive(Debug, Clone)]
pub struct GoogleGeocoder {
    endpoint: String,
    region: String,
    language: String,
    api_key: ApiKey,
    client: reqwest::Client,
}

impl GoogleGeocoder {
    /// Create a client from configuration and an API key.
    pub fn new(config: &GeocodingConfig, api_key: ApiKey) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            region: config.region.clone(),
            language: config.language.clone(),
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl Geocoder for GoogleGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeoLocation>, GeocodeError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("address", address),
                ("region", self.region.as_str()),
                ("language", self.language.as_str()),
                ("key", self.api_key.expose()),
            ])
            .send()
            .await?;

        let body = check_http_response(response).await?;
        parse_response(&body)
    }
}
