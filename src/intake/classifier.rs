//! Message classification through the hosted language model.
//!
//! The model is asked for `{"type", "content", "data"}`. Its answer is never
//! trusted: anything that does not parse degrades to
//! [`Classification::General`] carrying the raw model output, and transport
//! or credential problems degrade to a fixed apology.

use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::providers::{CompletionRequest, LlmProvider, Message};
use crate::types::Urgency;

use super::Transcript;

/// Returned as `general` content when the model cannot be reached.
pub const CLASSIFIER_APOLOGY: &str =
    "Désolé, je ne peux pas analyser votre message pour le moment. Pouvez-vous réessayer ?";

const CLASSIFIER_PROMPT: &str = r#"Tu es l'assistant d'une application qui met en relation des clients avec des artisans.
Analyse le DERNIER message du client, en tenant compte de la conversation, et classe-le dans exactement une catégorie :

- "service_request" : le client indique le service dont il a besoin. "content" = la catégorie de service normalisée.
- "location" : le client donne une adresse ou un lieu d'intervention. "content" = l'adresse telle qu'écrite.
- "urgency" : le client indique l'urgence. "content" = le texte du client, "data" = {"level": 1 à 5} si le niveau est identifiable.
- "additional_info" : le client ajoute des précisions sur le problème. "content" = ces précisions.
- "general" : tout le reste. "content" = le message du client.

Normalise toujours le nom du métier vers la catégorie de service :
menuisier -> menuiserie, électricien -> électricité, plombier -> plomberie,
carreleur -> carrelage, peintre -> peinture, jardinier -> jardinage.

Réponds UNIQUEMENT avec un objet JSON de la forme :
{"type": "...", "content": "...", "data": {...}}"#;

/// Profession nouns and their canonical service category.
const SERVICE_ALIASES: &[(&str, &str)] = &[
    ("menuisier", "menuiserie"),
    ("électricien", "électricité"),
    ("electricien", "électricité"),
    ("electricite", "électricité"),
    ("plombier", "plomberie"),
    ("carreleur", "carrelage"),
    ("peintre", "peinture"),
    ("jardinier", "jardinage"),
];

// ---------------------------------------------------------------------------
// Classification result
// ---------------------------------------------------------------------------

/// Tagged interpretation of one client message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Classification {
    /// The client named the service they need.
    ServiceRequest {
        /// Canonical service category (e.g. `menuiserie`).
        service: String,
    },
    /// The client gave an address.
    Location {
        /// Address as written.
        raw_text: String,
    },
    /// The client described how urgent the job is.
    Urgency {
        /// Client wording.
        raw_text: String,
        /// Level supplied by the model, already clamped.
        level: Option<Urgency>,
    },
    /// Extra details about the job.
    AdditionalInfo {
        /// Client wording.
        raw_text: String,
    },
    /// Anything else, including degraded parses.
    General {
        /// Client wording or raw model output.
        raw_text: String,
    },
}

impl Classification {
    /// Wire tag, for logs.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::ServiceRequest { .. } => "service_request",
            Self::Location { .. } => "location",
            Self::Urgency { .. } => "urgency",
            Self::AdditionalInfo { .. } => "additional_info",
            Self::General { .. } => "general",
        }
    }

    fn apology() -> Self {
        Self::General {
            raw_text: CLASSIFIER_APOLOGY.to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawClassification {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Option<Value>,
    #[serde(default)]
    data: Option<Value>,
}

/// Map a profession noun to its service category; unknown names pass through
/// lowercased.
pub fn canonical_service(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    SERVICE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map(|(_, canonical)| (*canonical).to_owned())
        .unwrap_or(lowered)
}

/// Parse a model reply. Never fails: unusable output becomes
/// `General { raw_text: <raw> }`.
pub fn parse_classification(raw: &str) -> Classification {
    let fallback = || Classification::General {
        raw_text: raw.trim().to_owned(),
    };

    let Some(parsed) = extract_json_object(raw) else {
        debug!("classification reply is not JSON");
        return fallback();
    };

    let content = parsed
        .content
        .as_ref()
        .and_then(value_as_text)
        .unwrap_or_default();

    match parsed.kind.trim().to_lowercase().as_str() {
        "service_request" if !content.is_empty() => Classification::ServiceRequest {
            service: canonical_service(&content),
        },
        "location" if !content.is_empty() => Classification::Location { raw_text: content },
        "urgency" => {
            let level = parsed
                .data
                .as_ref()
                .and_then(|d| d.get("level"))
                .and_then(value_as_level)
                .map(Urgency::clamped);
            if content.is_empty() && level.is_none() {
                return fallback();
            }
            Classification::Urgency {
                raw_text: content,
                level,
            }
        }
        "additional_info" if !content.is_empty() => {
            Classification::AdditionalInfo { raw_text: content }
        }
        "general" if !content.is_empty() => Classification::General { raw_text: content },
        other => {
            debug!(kind = other, "unusable classification reply");
            fallback()
        }
    }
}

/// Parse the whole reply, then a fenced block, then the outermost braces.
fn extract_json_object(raw: &str) -> Option<RawClassification> {
    if let Ok(parsed) = serde_json::from_str::<RawClassification>(raw.trim()) {
        return Some(parsed);
    }
    for pattern in [r"(?s)```(?:json)?\s*(\{.*?\})\s*```", r"(?s)(\{.*\})"] {
        let Ok(regex) = Regex::new(pattern) else {
            continue;
        };
        if let Some(candidate) = regex.captures(raw).and_then(|c| c.get(1)) {
            if let Ok(parsed) = serde_json::from_str::<RawClassification>(candidate.as_str()) {
                return Some(parsed);
            }
        }
    }
    None
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_as_level(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(float_level)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Round a fractional level. Values past either end collapse to 0 or 6,
/// which [`Urgency::clamped`] then folds into range.
fn float_level(value: f64) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    let rounded = value.round().clamp(0.0, 6.0);
    (0_i32..=6)
        .find(|level| f64::from(*level) >= rounded)
        .map(i64::from)
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Sends the transcript to the language model and tags the latest message.
#[derive(Clone)]
pub struct Classifier {
    provider: Option<Arc<dyn LlmProvider>>,
    temperature: f32,
    max_tokens: u32,
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("configured", &self.provider.is_some())
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl Classifier {
    /// Create a classifier. `None` means no usable credentials.
    pub fn new(provider: Option<Arc<dyn LlmProvider>>) -> Self {
        Self {
            provider,
            temperature: 0.3,
            max_tokens: 500,
        }
    }

    /// Override sampling settings.
    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    /// Build the single-instruction request for `message`.
    pub fn build_request(&self, message: &str, transcript: &Transcript) -> CompletionRequest {
        let history = if transcript.is_empty() {
            "(aucun échange précédent)".to_owned()
        } else {
            transcript.render()
        };
        let prompt = format!(
            "Conversation jusqu'ici :\n{history}\n\nDernier message du client :\n{message}"
        );
        CompletionRequest {
            messages: vec![Message::user(prompt)],
            system: Some(CLASSIFIER_PROMPT.to_owned()),
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
        }
    }

    /// Classify the latest client message. Never fails.
    pub async fn classify(&self, message: &str, transcript: &Transcript) -> Classification {
        let Some(provider) = &self.provider else {
            warn!("no language model credentials configured, skipping classification");
            return Classification::apology();
        };

        let request = self.build_request(message, transcript);
        match provider.complete(request).await {
            Ok(response) => {
                let classification = parse_classification(&response.text);
                debug!(tag = classification.tag(), "message classified");
                classification
            }
            Err(e) => {
                warn!(error = %e, "classification request failed");
                Classification::apology()
            }
        }
    }
}
