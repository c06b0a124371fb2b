//! Reply generation tests.

use std::sync::Arc;

use artisan::intake::generator::{instruction_for, GENERATOR_APOLOGY, SERVICE_CATALOG};
use artisan::intake::{Classification, IntakeForm, ResponseGenerator, Transcript};
use artisan::providers::{LlmProvider, Role};

use crate::support::{paris, ScriptedProvider};

fn generator(provider: &Arc<ScriptedProvider>) -> ResponseGenerator {
    ResponseGenerator::new(Some(Arc::clone(provider) as Arc<dyn LlmProvider>))
}

#[test]
fn service_instruction_asks_for_address() {
    let instruction = instruction_for(
        &Classification::ServiceRequest {
            service: "menuiserie".to_owned(),
        },
        &IntakeForm::new(),
    );
    assert!(instruction.contains("menuiserie"));
    assert!(instruction.contains("adresse"));
}

#[test]
fn location_instruction_echoes_validated_address() {
    let mut form = IntakeForm::new();
    form.set_location(paris());
    let instruction = instruction_for(
        &Classification::Location {
            raw_text: "rivoli".to_owned(),
        },
        &form,
    );
    assert!(instruction.contains("12 Rue de Rivoli, 75004 Paris, France"));
    assert!(instruction.contains("urgence"));
}

#[test]
fn general_instruction_lists_catalog() {
    let instruction = instruction_for(
        &Classification::General {
            raw_text: "bonjour".to_owned(),
        },
        &IntakeForm::new(),
    );
    for service in SERVICE_CATALOG {
        assert!(instruction.contains(service), "missing {service}");
    }
}

#[test]
fn request_uses_transcript_and_instruction() {
    let generator = ResponseGenerator::new(None).with_sampling(0.5, 120);
    let mut transcript = Transcript::new();
    transcript.push_user("Bonjour");
    transcript.push_assistant("Bonjour !");
    transcript.push_user("un peintre");

    let request = generator.build_request(
        &Classification::ServiceRequest {
            service: "peinture".to_owned(),
        },
        &transcript,
        &IntakeForm::new(),
    );
    assert_eq!(request.messages.len(), 3);
    assert_eq!(request.messages[1].role, Role::Assistant);
    assert_eq!(request.temperature, Some(0.5));
    assert_eq!(request.max_tokens, Some(120));
    assert!(request.system.as_deref().is_some_and(|s| s.contains("peinture")));
}

#[tokio::test]
async fn reply_is_trimmed() {
    let provider = ScriptedProvider::ok(&["  Quelle est votre adresse ?  "]);
    let reply = generator(&provider)
        .generate(
            &Classification::ServiceRequest {
                service: "plomberie".to_owned(),
            },
            &Transcript::new(),
            &IntakeForm::new(),
        )
        .await;
    assert_eq!(reply, "Quelle est votre adresse ?");
}

#[tokio::test]
async fn failures_return_apology() {
    let general = Classification::General {
        raw_text: "?".to_owned(),
    };
    let provider = ScriptedProvider::new(vec![Err("500".to_owned()), Ok("   ".to_owned())]);
    let generator = generator(&provider);

    let errored = generator
        .generate(&general, &Transcript::new(), &IntakeForm::new())
        .await;
    let empty = generator
        .generate(&general, &Transcript::new(), &IntakeForm::new())
        .await;
    let unconfigured = ResponseGenerator::new(None)
        .generate(&general, &Transcript::new(), &IntakeForm::new())
        .await;

    assert_eq!(errored, GENERATOR_APOLOGY);
    assert_eq!(empty, GENERATOR_APOLOGY);
    assert_eq!(unconfigured, GENERATOR_APOLOGY);
}
