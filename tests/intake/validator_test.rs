//! Location resolution through the geocoding collaborator.

use std::sync::Arc;

use artisan::geocoding::Geocoder;
use artisan::intake::{FieldValidator, LocationResolution};
use artisan::types::GeoLocation;

use crate::support::{paris, ScriptedGeocoder};

fn validator(geocoder: &Arc<ScriptedGeocoder>) -> FieldValidator {
    FieldValidator::new(Some(Arc::clone(geocoder) as Arc<dyn Geocoder>))
}

#[tokio::test]
async fn known_address_resolves_with_one_lookup() {
    let geocoder = ScriptedGeocoder::with(vec![("12 rue de Rivoli, Paris", paris())]);
    let result = validator(&geocoder)
        .resolve_location("  12 rue de Rivoli, Paris ")
        .await;
    assert_eq!(result, LocationResolution::Resolved(paris()));
    assert_eq!(geocoder.calls(), 1);
}

#[tokio::test]
async fn no_match_is_unresolvable_without_retry() {
    let geocoder = ScriptedGeocoder::with(vec![]);
    let result = validator(&geocoder).resolve_location("zzz qqq").await;
    assert_eq!(result, LocationResolution::Unresolvable);
    assert_eq!(geocoder.calls(), 1);
}

#[tokio::test]
async fn geocoder_error_is_unresolvable() {
    let geocoder = ScriptedGeocoder::failing();
    let result = validator(&geocoder).resolve_location("Lyon").await;
    assert_eq!(result, LocationResolution::Unresolvable);
}

#[tokio::test]
async fn out_of_range_coordinates_are_unresolvable() {
    let bogus = GeoLocation {
        latitude: 123.0,
        longitude: 2.0,
        formatted_address: "ailleurs".to_owned(),
    };
    let geocoder = ScriptedGeocoder::with(vec![("ailleurs", bogus)]);
    let result = validator(&geocoder).resolve_location("ailleurs").await;
    assert_eq!(result, LocationResolution::Unresolvable);
}

#[tokio::test]
async fn blank_text_and_missing_geocoder_skip_lookup() {
    let geocoder = ScriptedGeocoder::with(vec![]);
    assert_eq!(
        validator(&geocoder).resolve_location("   ").await,
        LocationResolution::Unresolvable
    );
    assert_eq!(geocoder.calls(), 0);

    assert_eq!(
        FieldValidator::new(None).resolve_location("Paris").await,
        LocationResolution::Unresolvable
    );
}
