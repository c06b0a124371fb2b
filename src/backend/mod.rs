//! Backend persistence collaborator.
//!
//! The intake submitter only needs two operations: resolve a service name to
//! its canonical id, and create a request record in one atomic call.
//!
//! - [`rest::RestBackend`]: hosted PostgREST API.
//! - [`sqlite::SqliteBackend`]: local SQLite database for development.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::providers::ProviderError;
use crate::types::{GeoLocation, Urgency};

pub mod rest;
pub mod sqlite;

// ---------------------------------------------------------------------------
// Domain types
// ---------------------------------------------------------------------------

/// Lifecycle status of a persisted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Waiting for a provider.
    Pending,
    /// A provider accepted the job.
    Accepted,
    /// Job finished.
    Completed,
    /// Withdrawn by the client.
    Cancelled,
}

impl RequestStatus {
    /// Returns the string representation stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse from a stored text value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a recognised status.
    pub fn parse(s: &str) -> Result<Self, BackendError> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(BackendError::InvalidValue {
                field: "status",
                value: other.to_owned(),
            }),
        }
    }
}

/// A request ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewServiceRequest {
    /// Client who owns the request.
    pub client_id: Uuid,
    /// Canonical service id.
    pub service_id: Uuid,
    /// Validated intervention address.
    pub location: GeoLocation,
    /// Urgency level.
    pub urgency: Urgency,
    /// Optional free-text details.
    pub notes: Option<String>,
}

/// A persisted request as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequestRecord {
    /// Request id.
    pub id: Uuid,
    /// Client who owns the request.
    pub client_id: Uuid,
    /// Canonical service id.
    pub service_id: Uuid,
    /// Intervention address.
    pub location: GeoLocation,
    /// Urgency level.
    pub urgency: Urgency,
    /// Optional details.
    pub notes: Option<String>,
    /// Lifecycle status.
    pub status: RequestStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from backend operations.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP transport failure or non-success status.
    #[error("backend request failed: {0}")]
    Http(#[from] ProviderError),

    /// Response body did not match the expected schema.
    #[error("backend response parse error: {0}")]
    Parse(String),

    /// Base URL could not be used.
    #[error("invalid backend url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A stored value could not be decoded.
    #[error("invalid {field} value: {value:?}")]
    InvalidValue {
        /// Which field contained the bad value.
        field: &'static str,
        /// The unexpected value.
        value: String,
    },
}

impl From<reqwest::Error> for BackendError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(ProviderError::from(value))
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Persistence operations used by the intake pipeline.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Look up the canonical id of a service category by display name.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the lookup itself fails; an unknown
    /// name is `Ok(None)`.
    async fn service_id_by_name(&self, name: &str) -> Result<Option<Uuid>, BackendError>;

    /// Persist a new request in one atomic call.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if nothing was persisted.
    async fn create_request(
        &self,
        request: &NewServiceRequest,
    ) -> Result<ServiceRequestRecord, BackendError>;
}
