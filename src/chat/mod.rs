//! Client / provider chat attached to a job.
//!
//! The [`ChatTransport`] trait is the narrow interface over the backend's
//! message table and realtime feed. [`sqlite::SqliteChatStore`] implements it
//! locally with a broadcast channel standing in for realtime push, and
//! [`thread::ChatThread`] is the per-screen view with optimistic sends.
//!
//! Chat is a library surface for the marketplace front end; the `artisan`
//! binary only runs intake. Callers sharing the backend pool create the
//! table with [`sqlite::SqliteChatStore::init_schema`].

use std::pin::Pin;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_stream::Stream;
use uuid::Uuid;

pub mod sqlite;
pub mod thread;

/// A message in a job conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message id.
    pub id: Uuid,
    /// Job the conversation belongs to.
    pub job_id: Uuid,
    /// Author.
    pub sender_id: Uuid,
    /// Text body (may be empty when an image is attached).
    pub content: String,
    /// Optional image as a `data:` URL.
    pub image: Option<String>,
    /// Whether the recipient has read it.
    pub is_read: bool,
    /// Server timestamp.
    pub created_at: DateTime<Utc>,
}

/// A message about to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Target job.
    pub job_id: Uuid,
    /// Author.
    pub sender_id: Uuid,
    /// Text body.
    pub content: String,
    /// Optional image as a `data:` URL.
    pub image: Option<String>,
}

/// Errors from chat operations.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Neither text nor image.
    #[error("message has no content")]
    EmptyMessage,

    /// A stored value could not be decoded.
    #[error("invalid {field} value: {value:?}")]
    InvalidValue {
        /// Which field contained the bad value.
        field: &'static str,
        /// The unexpected value.
        value: String,
    },
}

/// Realtime feed of new messages for one job.
pub type MessageStream = Pin<Box<dyn Stream<Item = ChatMessage> + Send>>;

/// Chat persistence and realtime delivery.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Persist and broadcast a message.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::EmptyMessage`] for blank messages, or a storage error.
    async fn send_message(&self, message: OutgoingMessage) -> Result<ChatMessage, ChatError>;

    /// All messages of a job, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    async fn messages_by_job(&self, job_id: Uuid) -> Result<Vec<ChatMessage>, ChatError>;

    /// Mark every message of `job_id` not authored by `reader_id` as read.
    /// Returns how many messages changed.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    async fn mark_read(&self, job_id: Uuid, reader_id: Uuid) -> Result<u64, ChatError>;

    /// Subscribe to new messages of `job_id`.
    fn subscribe(&self, job_id: Uuid) -> MessageStream;
}

// ---------------------------------------------------------------------------
// Attachments
// ---------------------------------------------------------------------------

/// Encode image bytes as a `data:` URL suitable for [`ChatMessage::image`].
pub fn encode_image_attachment(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Decode a `data:` URL produced by [`encode_image_attachment`] into its MIME
/// type and bytes.
pub fn decode_image_attachment(data_url: &str) -> Option<(String, Vec<u8>)> {
    let rest = data_url.strip_prefix("data:")?;
    let (mime, payload) = rest.split_once(";base64,")?;
    if !mime.starts_with("image/") {
        return None;
    }
    let bytes = STANDARD.decode(payload).ok()?;
    Some((mime.to_owned(), bytes))
}
