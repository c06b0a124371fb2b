//! Reply generation.
//!
//! Each classification tag selects a canned instruction; the model only
//! rephrases it in conversational French using the transcript as context.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::providers::{CompletionRequest, LlmProvider};

use super::{Classification, IntakeForm, Transcript};

/// Returned when the model cannot produce a reply.
pub const GENERATOR_APOLOGY: &str =
    "Désolé, une erreur s'est produite. Pouvez-vous renvoyer votre message ?";

/// Service categories offered to a client who has not named one yet.
pub const SERVICE_CATALOG: &[&str] = &[
    "menuiserie",
    "électricité",
    "plomberie",
    "carrelage",
    "peinture",
    "jardinage",
];

const PERSONA: &str = "Tu es l'assistant d'une application qui met en relation des clients \
avec des artisans. Tu aides le client à décrire sa demande. Réponds en français, \
de façon chaleureuse et concise (deux phrases au plus).";

/// The instruction the model must follow for this turn.
pub fn instruction_for(classification: &Classification, form: &IntakeForm) -> String {
    match classification {
        Classification::ServiceRequest { service } => format!(
            "Le client a besoin d'un service de {service}. Confirme le service et demande \
             l'adresse exacte où l'intervention doit avoir lieu."
        ),
        Classification::Location { .. } => {
            let address = form
                .location()
                .map_or("l'adresse indiquée", |l| l.formatted_address.as_str());
            format!(
                "L'adresse a été validée : {address}. Confirme cette adresse au client puis \
                 demande le niveau d'urgence, de 1 (peut attendre) à 5 (très urgent)."
            )
        }
        Classification::Urgency { .. } => {
            let level = form
                .urgency()
                .map_or_else(|| "non précisée".to_owned(), |u| u.to_string());
            format!(
                "L'urgence enregistrée est {level}. Demande au client s'il souhaite ajouter \
                 des précisions sur son besoin (facultatif)."
            )
        }
        Classification::AdditionalInfo { .. } => format!(
            "Résume la demande au client et demande-lui de la confirmer pour l'envoyer aux \
             artisans :\n{}",
            form.summary()
        ),
        Classification::General { .. } => format!(
            "Demande au client quel type de service il recherche, par exemple : {}.",
            SERVICE_CATALOG.join(", ")
        ),
    }
}

/// Produces the assistant's next utterance.
#[derive(Clone)]
pub struct ResponseGenerator {
    provider: Option<Arc<dyn LlmProvider>>,
    temperature: f32,
    max_tokens: u32,
}

impl std::fmt::Debug for ResponseGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseGenerator")
            .field("configured", &self.provider.is_some())
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl ResponseGenerator {
    /// Create a generator. `None` means no usable credentials.
    pub fn new(provider: Option<Arc<dyn LlmProvider>>) -> Self {
        Self {
            provider,
            temperature: 0.7,
            max_tokens: 500,
        }
    }

    /// Override sampling settings.
    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    /// Build the request for this turn.
    pub fn build_request(
        &self,
        classification: &Classification,
        transcript: &Transcript,
        form: &IntakeForm,
    ) -> CompletionRequest {
        let instruction = instruction_for(classification, form);
        CompletionRequest {
            messages: transcript.to_messages(),
            system: Some(format!("{PERSONA}\n\nConsigne pour ta réponse : {instruction}")),
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
        }
    }

    /// Generate the next reply. Never fails.
    pub async fn generate(
        &self,
        classification: &Classification,
        transcript: &Transcript,
        form: &IntakeForm,
    ) -> String {
        let Some(provider) = &self.provider else {
            warn!("no language model credentials configured, cannot generate reply");
            return GENERATOR_APOLOGY.to_owned();
        };

        let request = self.build_request(classification, transcript, form);
        match provider.complete(request).await {
            Ok(response) if !response.text.trim().is_empty() => {
                debug!(tag = classification.tag(), "reply generated");
                response.text.trim().to_owned()
            }
            Ok(_) => {
                warn!("model returned an empty reply");
                GENERATOR_APOLOGY.to_owned()
            }
            Err(e) => {
                warn!(error = %e, "reply generation failed");
                GENERATOR_APOLOGY.to_owned()
            }
        }
    }
}
