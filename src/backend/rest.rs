//! PostgREST backend (hosted backend-as-a-service).

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::credentials::ApiKey;
use crate::providers::check_http_response;
use crate::types::{GeoLocation, Urgency};

use super::{Backend, BackendError, NewServiceRequest, RequestStatus, ServiceRequestRecord};

const SERVICES_PATH: &str = "rest/v1/services";
const REQUESTS_PATH: &str = "rest/v1/requests";

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// Row body for `POST /rest/v1/requests`.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct RequestRow<'a> {
    /// Client id.
    pub client_id: Uuid,
    /// Service id.
    pub service_id: Uuid,
    /// Location object.
    pub location: &'a GeoLocation,
    /// Urgency level.
    pub urgency: Urgency,
    /// Optional details.
    pub notes: Option<&'a str>,
    /// Initial status.
    pub status: RequestStatus,
}

#[derive(Debug, Deserialize)]
struct ServiceRow {
    id: Uuid,
}

/// Build the insert row for a new request.
#[doc(hidden)]
pub fn build_request_row(request: &NewServiceRequest) -> RequestRow<'_> {
    RequestRow {
        client_id: request.client_id,
        service_id: request.service_id,
        location: &request.location,
        urgency: request.urgency,
        notes: request.notes.as_deref(),
        status: RequestStatus::Pending,
    }
}

/// Parse a `select=id` service lookup.
///
/// # Errors
///
/// Returns `BackendError::Parse` if the body is not an array of rows.
#[doc(hidden)]
pub fn parse_service_rows(body: &str) -> Result<Option<Uuid>, BackendError> {
    let rows: Vec<ServiceRow> =
        serde_json::from_str(body).map_err(|e| BackendError::Parse(e.to_string()))?;
    Ok(rows.into_iter().next().map(|row| row.id))
}

/// Parse the representation returned by an insert.
///
/// # Errors
///
/// Returns `BackendError::Parse` if the body is malformed or empty.
#[doc(hidden)]
pub fn parse_request_rows(body: &str) -> Result<ServiceRequestRecord, BackendError> {
    let rows: Vec<ServiceRequestRecord> =
        serde_json::from_str(body).map_err(|e| BackendError::Parse(e.to_string()))?;
    rows.into_iter()
        .next()
        .ok_or_else(|| BackendError::Parse("insert returned no rows".to_owned()))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// PostgREST client authenticated with the project API key.
#[derive(Debug, Clone)]
pub struct RestBackend {
    base: Url,
    api_key: ApiKey,
    client: reqwest::Client,
}

impl RestBackend {
    /// Create a client for the project at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::InvalidUrl` if `base_url` does not parse.
    pub fn new(base_url: &str, api_key: ApiKey) -> Result<Self, BackendError> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_owned()
        } else {
            format!("{base_url}/")
        };
        Ok(Self {
            base: Url::parse(&normalized)?,
            api_key,
            client: reqwest::Client::new(),
        })
    }

    /// Absolute URL of a table endpoint.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::InvalidUrl` if the path cannot be joined.
    pub fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        Ok(self.base.join(path)?)
    }

    /// Build the `GET services` lookup for `name`.
    ///
    /// Names match exactly after lowercasing, as in the SQLite backend. No
    /// pattern operators: `*`, `%` and `_` are literal.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::InvalidUrl` or a request-building error.
    #[doc(hidden)]
    pub fn service_lookup(&self, name: &str) -> Result<reqwest::Request, BackendError> {
        let url = self.endpoint(SERVICES_PATH)?;
        let filter = format!("eq.{}", name.trim().to_lowercase());
        Ok(self
            .authorized(self.client.get(url))
            .query(&[("select", "id"), ("name", filter.as_str()), ("limit", "1")])
            .build()?)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", self.api_key.expose())
            .header("authorization", format!("Bearer {}", self.api_key.expose()))
    }
}

#[async_trait::async_trait]
impl Backend for RestBackend {
    async fn service_id_by_name(&self, name: &str) -> Result<Option<Uuid>, BackendError> {
        let request = self.service_lookup(name)?;
        let response = self.client.execute(request).await?;

        let body = check_http_response(response).await?;
        let id = parse_service_rows(&body)?;
        debug!(service = name, found = id.is_some(), "service lookup");
        Ok(id)
    }

    async fn create_request(
        &self,
        request: &NewServiceRequest,
    ) -> Result<ServiceRequestRecord, BackendError> {
        let url = self.endpoint(REQUESTS_PATH)?;
        let response = self
            .authorized(self.client.post(url))
            .header("content-type", "application/json")
            .header("prefer", "return=representation")
            .json(&build_request_row(request))
            .send()
            .await?;

        let body = check_http_response(response).await?;
        parse_request_rows(&body)
    }
}
