//! End-to-end intake conversations.

use artisan::intake::classifier::CLASSIFIER_APOLOGY;
use artisan::intake::generator::GENERATOR_APOLOGY;
use artisan::intake::validator::LOCATION_RETRY;
use artisan::intake::Stage;
use artisan::types::Urgency;
use uuid::Uuid;

use crate::support::{paris, session, MemoryBackend, ScriptedGeocoder, ScriptedProvider};

#[tokio::test]
async fn service_request_sets_service_and_asks_for_address() {
    let provider = ScriptedProvider::ok(&[
        r#"{"type":"service_request","content":"menuiserie"}"#,
        "Très bien, un menuisier ! À quelle adresse doit-il intervenir ?",
    ]);
    let mut session = session(
        Some(provider.clone()),
        None,
        MemoryBackend::with_services(&["menuiserie"]),
    );

    let reply = session.handle_message("J'ai besoin d'un menuisier").await;

    assert_eq!(session.form().service(), Some("menuiserie"));
    assert_eq!(reply.stage, Stage::ServiceSet);
    assert!(!reply.complete);
    assert!(reply.text.contains("adresse"));

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1]
        .system
        .as_deref()
        .is_some_and(|s| s.contains("adresse exacte")));
    assert_eq!(session.transcript().len(), 2);
}

#[tokio::test]
async fn unresolvable_address_asks_again_and_leaves_form() {
    let provider = ScriptedProvider::ok(&[r#"{"type":"location","content":"blablabla 999"}"#]);
    let geocoder = ScriptedGeocoder::with(vec![]);
    let mut session = session(
        Some(provider.clone()),
        Some(geocoder.clone()),
        MemoryBackend::with_services(&[]),
    );

    let reply = session.handle_message("blablabla 999").await;

    assert_eq!(reply.text, LOCATION_RETRY);
    assert!(session.form().location().is_none());
    assert_eq!(geocoder.calls(), 1);
    // No generation call when the address is rejected.
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn complete_form_is_submitted_on_confirm() {
    let provider = ScriptedProvider::ok(&[
        r#"{"type":"service_request","content":"plombier"}"#,
        "D'accord. Votre adresse ?",
        r#"{"type":"location","content":"12 rue de Rivoli, Paris"}"#,
        "Adresse notée. Quelle urgence ?",
        r#"{"type":"urgency","content":"très urgent","data":{"level":5}}"#,
        "C'est noté.",
    ]);
    let geocoder = ScriptedGeocoder::with(vec![("12 rue de Rivoli, Paris", paris())]);
    let backend = MemoryBackend::with_services(&["plomberie"]);
    let mut session = session(Some(provider), Some(geocoder), backend.clone());

    session.handle_message("Il me faut un plombier").await;
    let located = session.handle_message("12 rue de Rivoli, Paris").await;
    assert_eq!(located.stage, Stage::LocationSet);
    let last = session.handle_message("très urgent").await;
    assert!(last.complete);
    assert_eq!(last.stage, Stage::Complete);

    let client_id = Uuid::new_v4();
    let confirmed = session.confirm(client_id).await;

    assert!(confirmed.text.contains("bien été envoyée"));
    assert_eq!(confirmed.stage, Stage::Empty);
    let created = backend.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].client_id, client_id);
    assert_eq!(created[0].urgency.level(), 5);
    assert_eq!(created[0].location, paris());
    assert!(session.form().service().is_none());
}

#[tokio::test]
async fn plain_urgent_maps_to_four() {
    let provider = ScriptedProvider::ok(&[
        r#"{"type":"urgency","content":"c'est urgent"}"#,
        "Compris.",
    ]);
    let mut session = session(Some(provider), None, MemoryBackend::with_services(&[]));

    session.handle_message("c'est urgent").await;

    assert_eq!(session.form().urgency().map(Urgency::level), Some(4));
}

#[tokio::test]
async fn confirm_incomplete_form_lists_missing_fields() {
    let backend = MemoryBackend::with_services(&["menuiserie"]);
    let mut session = session(None, None, backend.clone());

    let reply = session.confirm(Uuid::new_v4()).await;

    assert!(reply.text.contains("le service"));
    assert!(reply.text.contains("l'adresse"));
    assert!(backend.created().is_empty());
}

#[tokio::test]
async fn failed_submission_keeps_form() {
    let provider = ScriptedProvider::ok(&[
        r#"{"type":"service_request","content":"menuiserie"}"#,
        "Votre adresse ?",
        r#"{"type":"location","content":"Rivoli"}"#,
        "Quelle urgence ?",
        r#"{"type":"urgency","content":"peut attendre"}"#,
        "Noté.",
    ]);
    let geocoder = ScriptedGeocoder::with(vec![("Rivoli", paris())]);
    let mut session = session(
        Some(provider),
        Some(geocoder),
        MemoryBackend::failing(&["menuiserie"]),
    );
    session.handle_message("un menuisier").await;
    session.handle_message("Rivoli").await;
    session.handle_message("ça peut attendre").await;
    assert_eq!(session.form().urgency().map(Urgency::level), Some(1));

    let reply = session.confirm(Uuid::new_v4()).await;

    assert!(reply.text.contains("réessayer"));
    assert!(reply.complete);
    assert_eq!(session.form().service(), Some("menuiserie"));
}

#[tokio::test]
async fn without_credentials_turn_still_completes() {
    let mut session = session(None, None, MemoryBackend::with_services(&[]));

    let reply = session.handle_message("Bonjour").await;

    assert_eq!(reply.text, GENERATOR_APOLOGY);
    assert_eq!(reply.stage, Stage::Empty);
    assert_eq!(session.transcript().len(), 2);
    assert_ne!(reply.text, CLASSIFIER_APOLOGY);
}

#[tokio::test]
async fn blank_message_is_not_recorded() {
    let provider = ScriptedProvider::ok(&[]);
    let mut session = session(Some(provider.clone()), None, MemoryBackend::with_services(&[]));

    let reply = session.handle_message("   ").await;

    assert!(!reply.text.is_empty());
    assert!(session.transcript().is_empty());
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn reset_clears_transcript_and_form() {
    let provider = ScriptedProvider::ok(&[
        r#"{"type":"service_request","content":"peinture"}"#,
        "Votre adresse ?",
    ]);
    let mut session = session(Some(provider), None, MemoryBackend::with_services(&[]));
    session.handle_message("un peintre").await;
    assert_eq!(session.form().service(), Some("peinture"));

    session.reset();

    assert!(session.transcript().is_empty());
    assert!(session.form().service().is_none());
}
