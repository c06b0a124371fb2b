//! Session-scoped intake controller.
//!
//! [`IntakeSession`] owns the transcript and the form for one chat session.
//! Every operation takes `&mut self`, so turns never overlap, and every
//! failure is turned into a conversational reply.

use serde::Serialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::validator::LOCATION_RETRY;
use super::{
    Classification, Classifier, FieldValidator, IntakeForm, LocationResolution, RequestSubmitter,
    ResponseGenerator, Stage, Transcript,
};

const EMPTY_MESSAGE_PROMPT: &str = "Pouvez-vous décrire le service dont vous avez besoin ?";

/// Result of one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnReply {
    /// Assistant reply to show.
    pub text: String,
    /// Form stage after the turn.
    pub stage: Stage,
    /// Whether the form is ready for confirmation.
    pub complete: bool,
}

/// One intake conversation.
#[derive(Debug)]
pub struct IntakeSession {
    classifier: Classifier,
    validator: FieldValidator,
    generator: ResponseGenerator,
    submitter: RequestSubmitter,
    transcript: Transcript,
    form: IntakeForm,
}

impl IntakeSession {
    /// Start a session with an empty transcript and form.
    pub fn new(
        classifier: Classifier,
        validator: FieldValidator,
        generator: ResponseGenerator,
        submitter: RequestSubmitter,
    ) -> Self {
        Self {
            classifier,
            validator,
            generator,
            submitter,
            transcript: Transcript::new(),
            form: IntakeForm::new(),
        }
    }

    /// Conversation so far.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Form so far.
    pub fn form(&self) -> &IntakeForm {
        &self.form
    }

    /// Confirmation summary of the current form.
    pub fn summary(&self) -> String {
        self.form.summary()
    }

    /// Discard transcript and form, as when the chat screen regains focus.
    pub fn reset(&mut self) {
        self.transcript.clear();
        self.form.reset();
        debug!("intake session reset");
    }

    fn reply(&mut self, text: String) -> TurnReply {
        self.transcript.push_assistant(text.clone());
        TurnReply {
            text,
            stage: self.form.stage(),
            complete: self.form.is_complete(),
        }
    }

    /// Run one full turn for a client message.
    #[instrument(skip_all, fields(turn = self.transcript.len()))]
    pub async fn handle_message(&mut self, text: &str) -> TurnReply {
        let message = text.trim();
        if message.is_empty() {
            return TurnReply {
                text: EMPTY_MESSAGE_PROMPT.to_owned(),
                stage: self.form.stage(),
                complete: self.form.is_complete(),
            };
        }

        let classification = self.classifier.classify(message, &self.transcript).await;
        self.transcript.push_user(message);

        let resolved = match &classification {
            Classification::Location { raw_text } => {
                match self.validator.resolve_location(raw_text).await {
                    LocationResolution::Resolved(location) => Some(location),
                    LocationResolution::Unresolvable => {
                        return self.reply(LOCATION_RETRY.to_owned());
                    }
                }
            }
            _ => None,
        };

        let changed = self.form.apply(&classification, resolved);
        debug!(
            tag = classification.tag(),
            changed,
            stage = ?self.form.stage(),
            "form updated"
        );

        let text = self
            .generator
            .generate(&classification, &self.transcript, &self.form)
            .await;
        self.reply(text)
    }

    /// Submit the form after the client confirmed it.
    #[instrument(skip(self))]
    pub async fn confirm(&mut self, client_id: Uuid) -> TurnReply {
        if !self.form.is_complete() {
            let text = format!(
                "Votre demande n'est pas encore complète. Il manque : {}.",
                self.form.missing_fields().join(", ")
            );
            return self.reply(text);
        }

        let text = match self.submitter.submit(client_id, &mut self.form).await {
            Ok(record) => {
                info!(request_id = %record.id, "request confirmed by client");
                format!(
                    "Votre demande a bien été envoyée (référence {}). \
                     Les artisans disponibles vont vous contacter rapidement.",
                    record.id
                )
            }
            Err(e) => e.user_message(),
        };
        self.reply(text)
    }
}
