//! SQLite chat store with in-process realtime fan-out.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{ChatError, ChatMessage, ChatTransport, MessageStream, OutgoingMessage};

/// Buffered events per subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 256;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY,
        job_id TEXT NOT NULL,
        sender_id TEXT NOT NULL,
        content TEXT NOT NULL,
        image TEXT,
        is_read INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_messages_job ON messages(job_id, created_at)",
];

/// Chat store backed by the local database.
#[derive(Debug, Clone)]
pub struct SqliteChatStore {
    db: SqlitePool,
    events: broadcast::Sender<ChatMessage>,
}

impl SqliteChatStore {
    /// Create a store on `db`.
    pub fn new(db: SqlitePool) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { db, events }
    }

    /// Create the messages table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if a DDL statement fails.
    pub async fn init_schema(&self) -> Result<(), ChatError> {
        for sql in SCHEMA {
            sqlx::query(sql).execute(&self.db).await?;
        }
        Ok(())
    }
}

fn parse_uuid(field: &'static str, value: &str) -> Result<Uuid, ChatError> {
    Uuid::parse_str(value).map_err(|_| ChatError::InvalidValue {
        field,
        value: value.to_owned(),
    })
}

fn message_from_row(row: &SqliteRow) -> Result<ChatMessage, ChatError> {
    let id: String = row.try_get("id")?;
    let job_id: String = row.try_get("job_id")?;
    let sender_id: String = row.try_get("sender_id")?;
    let created_at: String = row.try_get("created_at")?;

    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|_| ChatError::InvalidValue {
            field: "created_at",
            value: created_at.clone(),
        })?
        .with_timezone(&Utc);

    Ok(ChatMessage {
        id: parse_uuid("id", &id)?,
        job_id: parse_uuid("job_id", &job_id)?,
        sender_id: parse_uuid("sender_id", &sender_id)?,
        content: row.try_get("content")?,
        image: row.try_get("image")?,
        is_read: row.try_get("is_read")?,
        created_at,
    })
}

#[async_trait::async_trait]
impl ChatTransport for SqliteChatStore {
    async fn send_message(&self, message: OutgoingMessage) -> Result<ChatMessage, ChatError> {
        let content = message.content.trim().to_owned();
        if content.is_empty() && message.image.is_none() {
            return Err(ChatError::EmptyMessage);
        }

        let stored = ChatMessage {
            id: Uuid::new_v4(),
            job_id: message.job_id,
            sender_id: message.sender_id,
            content,
            image: message.image,
            is_read: false,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO messages (id, job_id, sender_id, content, image, is_read, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
        )
        .bind(stored.id.to_string())
        .bind(stored.job_id.to_string())
        .bind(stored.sender_id.to_string())
        .bind(&stored.content)
        .bind(stored.image.as_deref())
        .bind(stored.created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
        .execute(&self.db)
        .await?;

        // No subscribers is fine.
        let _ = self.events.send(stored.clone());
        debug!(message_id = %stored.id, job_id = %stored.job_id, "chat message sent");
        Ok(stored)
    }

    async fn messages_by_job(&self, job_id: Uuid) -> Result<Vec<ChatMessage>, ChatError> {
        let rows = sqlx::query(
            "SELECT id, job_id, sender_id, content, image, is_read, created_at \
             FROM messages WHERE job_id = ?1 ORDER BY created_at ASC",
        )
        .bind(job_id.to_string())
        .fetch_all(&self.db)
        .await?;

        let mut messages = rows
            .iter()
            .map(message_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    async fn mark_read(&self, job_id: Uuid, reader_id: Uuid) -> Result<u64, ChatError> {
        let result = sqlx::query(
            "UPDATE messages SET is_read = 1 \
             WHERE job_id = ?1 AND sender_id != ?2 AND is_read = 0",
        )
        .bind(job_id.to_string())
        .bind(reader_id.to_string())
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected())
    }

    fn subscribe(&self, job_id: Uuid) -> MessageStream {
        let stream = BroadcastStream::new(self.events.subscribe()).filter_map(move |event| {
            match event {
                Ok(message) if message.job_id == job_id => Some(message),
                Ok(_) => None,
                Err(e) => {
                    warn!(job_id = %job_id, error = %e, "chat subscriber lagged");
                    None
                }
            }
        });
        Box::pin(stream)
    }
}
