//! Submission of confirmed forms.

use artisan::intake::{IntakeForm, RequestSubmitter, SubmitError};
use artisan::types::{GeoLocation, Urgency};
use uuid::Uuid;

use crate::support::{paris, MemoryBackend};

fn complete_form() -> IntakeForm {
    let mut form = IntakeForm::new();
    form.set_service("menuiserie");
    form.set_location(paris());
    form.set_urgency(Urgency::new(4).unwrap_or_default());
    form.append_notes("porte d'entrée");
    form
}

#[tokio::test]
async fn successful_submit_persists_and_resets() {
    let backend = MemoryBackend::with_services(&["menuiserie"]);
    let submitter = RequestSubmitter::new(backend.clone());
    let client_id = Uuid::new_v4();
    let mut form = complete_form();

    let record = submitter.submit(client_id, &mut form).await.expect("submit should succeed");

    assert_eq!(record.client_id, client_id);
    assert_eq!(Some(record.service_id), backend.service_id("menuiserie"));
    assert_eq!(record.urgency.level(), 4);
    assert_eq!(record.notes.as_deref(), Some("porte d'entrée"));
    assert_eq!(backend.created().len(), 1);
    assert_eq!(form, IntakeForm::new());
}

#[tokio::test]
async fn missing_urgency_defaults_to_three() {
    let backend = MemoryBackend::with_services(&["menuiserie"]);
    let mut form = IntakeForm::new();
    form.set_service("menuiserie");
    form.set_location(paris());

    let record = RequestSubmitter::new(backend)
        .submit(Uuid::new_v4(), &mut form)
        .await
        .expect("submit should succeed");
    assert_eq!(record.urgency, Urgency::DEFAULT);
    assert_eq!(record.urgency.level(), 3);
}

#[tokio::test]
async fn refuses_without_location() {
    let backend = MemoryBackend::with_services(&["menuiserie"]);
    let mut form = IntakeForm::new();
    form.set_service("menuiserie");
    let before = form.clone();

    let err = RequestSubmitter::new(backend.clone())
        .submit(Uuid::new_v4(), &mut form)
        .await
        .expect_err("submit should fail");
    assert!(matches!(err, SubmitError::InvalidLocation));
    assert!(err.user_message().contains("rue"));
    assert_eq!(form, before);
    assert!(backend.created().is_empty());
}

#[tokio::test]
async fn refuses_without_service() {
    let backend = MemoryBackend::with_services(&["menuiserie"]);
    let mut form = IntakeForm::new();
    form.set_location(GeoLocation {
        latitude: 45.76,
        longitude: 4.83,
        formatted_address: "Lyon, France".to_owned(),
    });
    let err = RequestSubmitter::new(backend)
        .submit(Uuid::new_v4(), &mut form)
        .await
        .expect_err("submit should fail");
    assert!(matches!(err, SubmitError::MissingService));
}

#[tokio::test]
async fn unknown_service_keeps_form() {
    let backend = MemoryBackend::with_services(&["plomberie"]);
    let mut form = complete_form();
    let before = form.clone();

    let err = RequestSubmitter::new(backend)
        .submit(Uuid::new_v4(), &mut form)
        .await
        .expect_err("submit should fail");
    assert!(matches!(err, SubmitError::UnknownService(ref s) if s == "menuiserie"));
    assert_eq!(form, before);
}

#[tokio::test]
async fn backend_failure_keeps_form_for_retry() {
    let backend = MemoryBackend::failing(&["menuiserie"]);
    let mut form = complete_form();
    let before = form.clone();

    let err = RequestSubmitter::new(backend)
        .submit(Uuid::new_v4(), &mut form)
        .await
        .expect_err("submit should fail");
    assert!(matches!(err, SubmitError::Backend(_)));
    assert!(err.user_message().contains("réessayer"));
    assert_eq!(form, before);
}
