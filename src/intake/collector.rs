//! The intake form and its update rules.
//!
//! Fields may arrive in any order; the form is complete as soon as service,
//! location and urgency are all present. A stored location always has valid
//! coordinates because [`IntakeForm::set_location`] refuses anything else.

use serde::Serialize;

use crate::types::{GeoLocation, Urgency};

use super::Classification;

/// Phrases meaning the job can wait, checked first so that "pas urgent" is
/// not read as "urgent".
const LOW_URGENCY: &[&str] = &["pas urgent", "pas très urgent", "pas tres urgent", "peut attendre"];
const HIGH_URGENCY: &[&str] = &["très urgent", "tres urgent", "immédiat", "immediat"];
const URGENT: &str = "urgent";

/// Derive an urgency level from free text.
pub fn urgency_from_text(text: &str) -> Urgency {
    let lowered = text.to_lowercase();
    let level = if LOW_URGENCY.iter().any(|p| lowered.contains(p)) {
        1
    } else if HIGH_URGENCY.iter().any(|p| lowered.contains(p)) {
        5
    } else if lowered.contains(URGENT) {
        4
    } else {
        3
    };
    Urgency::new(level).unwrap_or_default()
}

/// Progress through the required fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Nothing collected.
    Empty,
    /// Service known.
    ServiceSet,
    /// Location known.
    LocationSet,
    /// Urgency known.
    UrgencySet,
    /// All required fields present.
    Complete,
}

/// A service request under construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IntakeForm {
    service: Option<String>,
    location: Option<GeoLocation>,
    urgency: Option<Urgency>,
    notes: Option<String>,
}

impl IntakeForm {
    /// Empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requested service category.
    pub fn service(&self) -> Option<&str> {
        self.service.as_deref()
    }

    /// Validated intervention address.
    pub fn location(&self) -> Option<&GeoLocation> {
        self.location.as_ref()
    }

    /// Urgency level.
    pub fn urgency(&self) -> Option<Urgency> {
        self.urgency
    }

    /// Free-text details.
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Set the service category.
    pub fn set_service(&mut self, service: impl Into<String>) {
        self.service = Some(service.into());
    }

    /// Store a location. Returns `false`, leaving the form untouched, when the
    /// coordinates are unusable.
    pub fn set_location(&mut self, location: GeoLocation) -> bool {
        if !location.has_valid_coordinates() {
            return false;
        }
        self.location = Some(location);
        true
    }

    /// Set the urgency level.
    pub fn set_urgency(&mut self, urgency: Urgency) {
        self.urgency = Some(urgency);
    }

    /// Append details, one paragraph per call.
    pub fn append_notes(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        self.notes = Some(match self.notes.take() {
            Some(existing) => format!("{existing}\n{text}"),
            None => text.to_owned(),
        });
    }

    /// Apply one classified turn.
    ///
    /// `resolved` is the validator's result for this turn; a `location` tag
    /// without it changes nothing. Returns whether the form changed.
    pub fn apply(&mut self, classification: &Classification, resolved: Option<GeoLocation>) -> bool {
        match classification {
            Classification::ServiceRequest { service } => {
                self.set_service(service.clone());
                true
            }
            Classification::Location { .. } => match resolved {
                Some(location) => self.set_location(location),
                None => false,
            },
            Classification::Urgency { raw_text, level } => {
                self.set_urgency(level.unwrap_or_else(|| urgency_from_text(raw_text)));
                true
            }
            Classification::AdditionalInfo { raw_text } => {
                let before = self.notes.clone();
                self.append_notes(raw_text);
                before != self.notes
            }
            Classification::General { .. } => false,
        }
    }

    /// Whether service, location and urgency are all set.
    pub fn is_complete(&self) -> bool {
        self.service.is_some() && self.location.is_some() && self.urgency.is_some()
    }

    /// Furthest required field reached, in service → location → urgency order.
    pub fn stage(&self) -> Stage {
        if self.is_complete() {
            Stage::Complete
        } else if self.urgency.is_some() {
            Stage::UrgencySet
        } else if self.location.is_some() {
            Stage::LocationSet
        } else if self.service.is_some() {
            Stage::ServiceSet
        } else {
            Stage::Empty
        }
    }

    /// Labels of the required fields still missing.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.service.is_none() {
            missing.push("le service");
        }
        if self.location.is_none() {
            missing.push("l'adresse");
        }
        if self.urgency.is_none() {
            missing.push("l'urgence");
        }
        missing
    }

    /// Confirmation summary shown before submission.
    pub fn summary(&self) -> String {
        let unset = "non renseigné";
        let mut lines = vec![
            "Récapitulatif de votre demande :".to_owned(),
            format!("- Service : {}", self.service.as_deref().unwrap_or(unset)),
            format!(
                "- Adresse : {}",
                self.location
                    .as_ref()
                    .map_or(unset, |l| l.formatted_address.as_str())
            ),
            format!(
                "- Urgence : {}",
                self.urgency.map_or_else(|| unset.to_owned(), |u| u.to_string())
            ),
        ];
        if let Some(notes) = &self.notes {
            lines.push(format!("- Précisions : {notes}"));
        }
        lines.join("\n")
    }

    /// Clear every field.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
