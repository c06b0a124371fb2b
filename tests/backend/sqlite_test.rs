//! SQLite backend: schema, catalog lookup and request persistence.

use artisan::backend::sqlite::SqliteBackend;
use artisan::backend::{Backend, NewServiceRequest, RequestStatus};
use artisan::types::{GeoLocation, Urgency};
use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

async fn fresh_backend() -> SqliteBackend {
    // In-memory databases are per-connection, so keep a single one.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool should connect");
    let backend = SqliteBackend::from_pool(pool);
    backend.init_schema().await.expect("schema should apply");
    backend
}

fn lyon() -> GeoLocation {
    GeoLocation {
        latitude: 45.764,
        longitude: 4.8357,
        formatted_address: "Place Bellecour, 69002 Lyon, France".to_owned(),
    }
}

#[tokio::test]
async fn seeding_is_idempotent() {
    let backend = fresh_backend().await;
    let first = backend
        .seed_services(&["Plomberie", "peinture"])
        .await
        .expect("seed");
    let second = backend
        .seed_services(&["plomberie", "peinture", "jardinage"])
        .await
        .expect("seed");
    assert_eq!(first, 2);
    assert_eq!(second, 1);
}

#[tokio::test]
async fn service_lookup_is_case_insensitive() {
    let backend = fresh_backend().await;
    backend.seed_services(&["électricité"]).await.expect("seed");

    let found = backend
        .service_id_by_name(" Électricité ")
        .await
        .expect("lookup");
    let missing = backend.service_id_by_name("serrurerie").await.expect("lookup");

    assert!(found.is_some());
    assert!(missing.is_none());
}

#[tokio::test]
async fn created_request_can_be_read_back() {
    let backend = fresh_backend().await;
    backend.seed_services(&["plomberie"]).await.expect("seed");
    let service_id = backend
        .service_id_by_name("plomberie")
        .await
        .expect("lookup")
        .expect("service should exist");
    let client_id = Uuid::new_v4();

    let created = backend
        .create_request(&NewServiceRequest {
            client_id,
            service_id,
            location: lyon(),
            urgency: Urgency::new(5).unwrap_or_default(),
            notes: Some("fuite sous l'évier".to_owned()),
        })
        .await
        .expect("insert");

    assert_eq!(created.status, RequestStatus::Pending);

    let stored = backend
        .get_request(created.id)
        .await
        .expect("query")
        .expect("request should exist");
    assert_eq!(stored.client_id, client_id);
    assert_eq!(stored.service_id, service_id);
    assert_eq!(stored.location, lyon());
    assert_eq!(stored.urgency.level(), 5);
    assert_eq!(stored.notes.as_deref(), Some("fuite sous l'évier"));
    assert_eq!(stored.status, RequestStatus::Pending);

    let listed = backend.requests_for_client(client_id).await.expect("query");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, created.id);
    assert!(backend
        .requests_for_client(Uuid::new_v4())
        .await
        .expect("query")
        .is_empty());
}

#[tokio::test]
async fn unknown_request_id_is_none() {
    let backend = fresh_backend().await;
    assert!(backend
        .get_request(Uuid::new_v4())
        .await
        .expect("query")
        .is_none());
}

#[test]
fn status_text_round_trips() {
    for status in [
        RequestStatus::Pending,
        RequestStatus::Accepted,
        RequestStatus::Completed,
        RequestStatus::Cancelled,
    ] {
        assert_eq!(
            RequestStatus::parse(status.as_str()).expect("known status"),
            status
        );
    }
    assert!(RequestStatus::parse("archived").is_err());
}
