//! Scripted collaborators shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use artisan::backend::{
    Backend, BackendError, NewServiceRequest, RequestStatus, ServiceRequestRecord,
};
use artisan::geocoding::{GeocodeError, Geocoder};
use artisan::intake::{
    Classifier, FieldValidator, IntakeSession, RequestSubmitter, ResponseGenerator,
};
use artisan::providers::{
    CompletionRequest, CompletionResponse, LlmProvider, ProviderError, StopReason, UsageStats,
};
use artisan::types::GeoLocation;

// ---------------------------------------------------------------------------
// Language model
// ---------------------------------------------------------------------------

/// Replays canned replies in order and records every request.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    calls: AtomicU32,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Result<String, String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
        })
    }

    pub fn ok(replies: &[&str]) -> Arc<Self> {
        Self::new(replies.iter().map(|r| Ok((*r).to_owned())).collect())
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        match self.requests.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut log) = self.requests.lock() {
            log.push(request);
        }
        let next = self
            .replies
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or_else(|| Err("script exhausted".to_owned()));
        match next {
            Ok(text) => Ok(CompletionResponse {
                text,
                stop_reason: StopReason::EndTurn,
                usage: UsageStats::default(),
                model: "scripted".to_owned(),
            }),
            Err(reason) => Err(ProviderError::Unavailable(reason)),
        }
    }

    fn model_id(&self) -> &str {
        "scripted"
    }
}

// ---------------------------------------------------------------------------
// Geocoder
// ---------------------------------------------------------------------------

/// Resolves only the addresses it was given; counts lookups.
pub struct ScriptedGeocoder {
    known: Vec<(String, GeoLocation)>,
    fail: bool,
    calls: AtomicU32,
}

impl ScriptedGeocoder {
    pub fn with(known: Vec<(&str, GeoLocation)>) -> Arc<Self> {
        Arc::new(Self {
            known: known
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v))
                .collect(),
            fail: false,
            calls: AtomicU32::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            known: Vec::new(),
            fail: true,
            calls: AtomicU32::new(0),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Geocoder for ScriptedGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeoLocation>, GeocodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(GeocodeError::Status {
                status: "OVER_QUERY_LIMIT".to_owned(),
                message: "quota".to_owned(),
            });
        }
        Ok(self
            .known
            .iter()
            .find(|(k, _)| k == address)
            .map(|(_, v)| v.clone()))
    }
}

pub fn paris() -> GeoLocation {
    GeoLocation {
        latitude: 48.8566,
        longitude: 2.3522,
        formatted_address: "12 Rue de Rivoli, 75004 Paris, France".to_owned(),
    }
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// In-memory backend with a fixed service catalog.
pub struct MemoryBackend {
    services: Vec<(String, Uuid)>,
    fail_create: bool,
    created: Mutex<Vec<ServiceRequestRecord>>,
}

impl MemoryBackend {
    pub fn with_services(names: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            services: names.iter().map(|n| ((*n).to_owned(), Uuid::new_v4())).collect(),
            fail_create: false,
            created: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(names: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            services: names.iter().map(|n| ((*n).to_owned(), Uuid::new_v4())).collect(),
            fail_create: true,
            created: Mutex::new(Vec::new()),
        })
    }

    pub fn service_id(&self, name: &str) -> Option<Uuid> {
        self.services.iter().find(|(n, _)| n == name).map(|(_, id)| *id)
    }

    pub fn created(&self) -> Vec<ServiceRequestRecord> {
        match self.created.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn service_id_by_name(&self, name: &str) -> Result<Option<Uuid>, BackendError> {
        Ok(self.service_id(name))
    }

    async fn create_request(
        &self,
        request: &NewServiceRequest,
    ) -> Result<ServiceRequestRecord, BackendError> {
        if self.fail_create {
            return Err(BackendError::Parse("backend offline".to_owned()));
        }
        let record = ServiceRequestRecord {
            id: Uuid::new_v4(),
            client_id: request.client_id,
            service_id: request.service_id,
            location: request.location.clone(),
            urgency: request.urgency,
            notes: request.notes.clone(),
            status: RequestStatus::Pending,
            created_at: Utc::now(),
        };
        if let Ok(mut created) = self.created.lock() {
            created.push(record.clone());
        }
        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// Session wiring
// ---------------------------------------------------------------------------

pub fn session(
    provider: Option<Arc<ScriptedProvider>>,
    geocoder: Option<Arc<ScriptedGeocoder>>,
    backend: Arc<MemoryBackend>,
) -> IntakeSession {
    let provider: Option<Arc<dyn LlmProvider>> = provider.map(|p| p as Arc<dyn LlmProvider>);
    let geocoder: Option<Arc<dyn Geocoder>> = geocoder.map(|g| g as Arc<dyn Geocoder>);
    IntakeSession::new(
        Classifier::new(provider.clone()),
        FieldValidator::new(geocoder),
        ResponseGenerator::new(provider),
        RequestSubmitter::new(backend),
    )
}
