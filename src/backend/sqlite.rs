//! SQLite backend for local development.
//!
//! Ids and timestamps are stored as text (UUID / RFC 3339) so the schema
//! needs no extra `sqlx` type features.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info};
use uuid::Uuid;

use crate::types::{GeoLocation, Urgency};

use super::{Backend, BackendError, NewServiceRequest, RequestStatus, ServiceRequestRecord};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS services (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    )",
    "CREATE TABLE IF NOT EXISTS requests (
        id TEXT PRIMARY KEY,
        client_id TEXT NOT NULL,
        service_id TEXT NOT NULL REFERENCES services(id),
        latitude REAL NOT NULL,
        longitude REAL NOT NULL,
        address TEXT NOT NULL,
        urgency INTEGER NOT NULL CHECK (urgency BETWEEN 1 AND 5),
        notes TEXT,
        status TEXT NOT NULL DEFAULT 'pending',
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_requests_client ON requests(client_id)",
];

/// Local SQLite persistence.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    db: SqlitePool,
}

impl SqliteBackend {
    /// Wrap an existing pool.
    pub fn from_pool(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Connect to `url` (e.g. `sqlite://artisan.db?mode=rwc`).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub async fn connect(url: &str) -> Result<Self, BackendError> {
        let db = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(url)
            .await?;
        Ok(Self { db })
    }

    /// The underlying pool, shared with the chat store.
    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }

    /// Create tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if a DDL statement fails.
    pub async fn init_schema(&self) -> Result<(), BackendError> {
        for sql in SCHEMA {
            sqlx::query(sql).execute(&self.db).await?;
        }
        debug!("backend schema ready");
        Ok(())
    }

    /// Insert service categories that are not present yet. Returns how many
    /// were added.
    ///
    /// # Errors
    ///
    /// Returns an error if an insert fails.
    pub async fn seed_services(&self, names: &[&str]) -> Result<u64, BackendError> {
        let mut added: u64 = 0;
        for name in names {
            let result = sqlx::query("INSERT OR IGNORE INTO services (id, name) VALUES (?1, ?2)")
                .bind(Uuid::new_v4().to_string())
                .bind(name.trim().to_lowercase())
                .execute(&self.db)
                .await?;
            added = added.saturating_add(result.rows_affected());
        }
        info!(added, "service catalog seeded");
        Ok(added)
    }

    /// Fetch one request by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored value is corrupt.
    pub async fn get_request(&self, id: Uuid) -> Result<Option<ServiceRequestRecord>, BackendError> {
        let row = sqlx::query(
            "SELECT id, client_id, service_id, latitude, longitude, address, urgency, notes, \
             status, created_at FROM requests WHERE id = ?1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.db)
        .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    /// All requests of one client, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored value is corrupt.
    pub async fn requests_for_client(
        &self,
        client_id: Uuid,
    ) -> Result<Vec<ServiceRequestRecord>, BackendError> {
        let rows = sqlx::query(
            "SELECT id, client_id, service_id, latitude, longitude, address, urgency, notes, \
             status, created_at FROM requests WHERE client_id = ?1 ORDER BY created_at DESC",
        )
        .bind(client_id.to_string())
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(record_from_row).collect()
    }
}

fn parse_uuid(field: &'static str, value: &str) -> Result<Uuid, BackendError> {
    Uuid::parse_str(value).map_err(|_| BackendError::InvalidValue {
        field,
        value: value.to_owned(),
    })
}

fn record_from_row(row: &SqliteRow) -> Result<ServiceRequestRecord, BackendError> {
    let id: String = row.try_get("id")?;
    let client_id: String = row.try_get("client_id")?;
    let service_id: String = row.try_get("service_id")?;
    let urgency: i64 = row.try_get("urgency")?;
    let status: String = row.try_get("status")?;
    let created_at: String = row.try_get("created_at")?;

    let urgency = u8::try_from(urgency)
        .ok()
        .and_then(Urgency::new)
        .ok_or_else(|| BackendError::InvalidValue {
            field: "urgency",
            value: urgency.to_string(),
        })?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|_| BackendError::InvalidValue {
            field: "created_at",
            value: created_at.clone(),
        })?
        .with_timezone(&Utc);

    Ok(ServiceRequestRecord {
        id: parse_uuid("id", &id)?,
        client_id: parse_uuid("client_id", &client_id)?,
        service_id: parse_uuid("service_id", &service_id)?,
        location: GeoLocation {
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
            formatted_address: row.try_get("address")?,
        },
        urgency,
        notes: row.try_get("notes")?,
        status: RequestStatus::parse(&status)?,
        created_at,
    })
}

#[async_trait::async_trait]
impl Backend for SqliteBackend {
    async fn service_id_by_name(&self, name: &str) -> Result<Option<Uuid>, BackendError> {
        let id: Option<String> = sqlx::query_scalar("SELECT id FROM services WHERE name = ?1")
            .bind(name.trim().to_lowercase())
            .fetch_optional(&self.db)
            .await?;
        id.as_deref().map(|v| parse_uuid("id", v)).transpose()
    }

    async fn create_request(
        &self,
        request: &NewServiceRequest,
    ) -> Result<ServiceRequestRecord, BackendError> {
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

        sqlx::query(
            "INSERT INTO requests (id, client_id, service_id, latitude, longitude, address, \
             urgency, notes, status, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(record.id.to_string())
        .bind(record.client_id.to_string())
        .bind(record.service_id.to_string())
        .bind(record.location.latitude)
        .bind(record.location.longitude)
        .bind(&record.location.formatted_address)
        .bind(i64::from(record.urgency.level()))
        .bind(record.notes.as_deref())
        .bind(record.status.as_str())
        .bind(record.created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .execute(&self.db)
        .await?;

        info!(request_id = %record.id, client_id = %record.client_id, "service request stored");
        Ok(record)
    }
}
