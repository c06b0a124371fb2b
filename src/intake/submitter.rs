//! Turns a confirmed intake form into a persisted service request.

use std::sync::Arc;

use tracing::{error, info};
use uuid::Uuid;

use crate::backend::{Backend, BackendError, NewServiceRequest, ServiceRequestRecord};
use crate::types::Urgency;

use super::IntakeForm;

/// Why a submission was refused or failed. The form is left untouched in
/// every case.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// No service category on the form.
    #[error("form has no service")]
    MissingService,
    /// No location, or its coordinates are unusable.
    #[error("form has no valid location coordinates")]
    InvalidLocation,
    /// The backend does not know this service category.
    #[error("unknown service category {0:?}")]
    UnknownService(String),
    /// The backend call failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl SubmitError {
    /// Conversational message shown to the client.
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingService => {
                "Il me manque le type de service dont vous avez besoin. Pouvez-vous me l'indiquer ?"
                    .to_owned()
            }
            Self::InvalidLocation => "L'adresse de votre demande n'a pas pu être validée. \
                 Pouvez-vous indiquer le nom de la rue, le numéro et la ville ?"
                .to_owned(),
            Self::UnknownService(service) => format!(
                "Le service « {service} » n'est pas encore proposé sur la plateforme. \
                 Pouvez-vous choisir une autre catégorie ?"
            ),
            Self::Backend(_) => "Désolé, votre demande n'a pas pu être envoyée. \
                 Vos informations sont conservées, vous pouvez réessayer."
                .to_owned(),
        }
    }
}

/// Persists confirmed forms through the backend.
#[derive(Clone)]
pub struct RequestSubmitter {
    backend: Arc<dyn Backend>,
}

impl std::fmt::Debug for RequestSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSubmitter").finish_non_exhaustive()
    }
}

impl RequestSubmitter {
    /// Create a submitter over `backend`.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Persist `form` for `client_id`. On success the form is reset; on any
    /// error it is left as it was.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError`] when the form is not submittable or the
    /// backend fails.
    pub async fn submit(
        &self,
        client_id: Uuid,
        form: &mut IntakeForm,
    ) -> Result<ServiceRequestRecord, SubmitError> {
        let service = form.service().ok_or(SubmitError::MissingService)?.to_owned();
        let location = form
            .location()
            .filter(|l| l.has_valid_coordinates())
            .cloned()
            .ok_or(SubmitError::InvalidLocation)?;

        let service_id = self
            .backend
            .service_id_by_name(&service)
            .await
            .inspect_err(|e| error!(error = %e, service = %service, "service lookup failed"))?
            .ok_or_else(|| SubmitError::UnknownService(service.clone()))?;

        let request = NewServiceRequest {
            client_id,
            service_id,
            location,
            urgency: form.urgency().unwrap_or(Urgency::DEFAULT),
            notes: form.notes().map(str::to_owned),
        };

        let record = self
            .backend
            .create_request(&request)
            .await
            .inspect_err(|e| error!(error = %e, "request creation failed"))?;

        info!(request_id = %record.id, service = %service, "intake submitted");
        form.reset();
        Ok(record)
    }
}
