//! Location validation: one geocoder lookup per location-tagged turn.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::geocoding::Geocoder;
use crate::types::GeoLocation;

/// Reply sent when an address cannot be resolved.
pub const LOCATION_RETRY: &str = "Je n'ai pas pu localiser cette adresse. Pouvez-vous préciser \
le nom de la rue, le numéro et la ville ?";

/// Outcome of resolving free-text into coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationResolution {
    /// The geocoder returned a usable match.
    Resolved(GeoLocation),
    /// No match, invalid coordinates, or the geocoder was unavailable.
    Unresolvable,
}

/// Resolves `location` answers through the geocoding collaborator.
#[derive(Clone)]
pub struct FieldValidator {
    geocoder: Option<Arc<dyn Geocoder>>,
}

impl std::fmt::Debug for FieldValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldValidator")
            .field("configured", &self.geocoder.is_some())
            .finish()
    }
}

impl FieldValidator {
    /// Create a validator. `None` means no geocoding credentials.
    pub fn new(geocoder: Option<Arc<dyn Geocoder>>) -> Self {
        Self { geocoder }
    }

    /// Resolve `raw_text` with exactly one lookup and no retry.
    ///
    /// Ambiguous addresses resolve to the geocoder's first match.
    pub async fn resolve_location(&self, raw_text: &str) -> LocationResolution {
        let address = raw_text.trim();
        if address.is_empty() {
            return LocationResolution::Unresolvable;
        }

        let Some(geocoder) = &self.geocoder else {
            warn!("no geocoding credentials configured, cannot resolve address");
            return LocationResolution::Unresolvable;
        };

        match geocoder.geocode(address).await {
            Ok(Some(location)) if location.has_valid_coordinates() => {
                debug!(address = %location.formatted_address, "address resolved");
                LocationResolution::Resolved(location)
            }
            Ok(Some(location)) => {
                warn!(
                    latitude = location.latitude,
                    longitude = location.longitude,
                    "geocoder returned unusable coordinates"
                );
                LocationResolution::Unresolvable
            }
            Ok(None) => {
                debug!("geocoder found no match");
                LocationResolution::Unresolvable
            }
            Err(e) => {
                warn!(error = %e, "geocoding request failed");
                LocationResolution::Unresolvable
            }
        }
    }
}
