//! Local view of one job conversation.
//!
//! Sent messages appear immediately as `Pending` entries and are swapped for
//! the server copy once the transport answers. Realtime echoes of our own
//! messages are matched against pending entries so nothing shows twice.
//! Entries are always kept ordered by timestamp.

use chrono::Utc;
use uuid::Uuid;

use super::{ChatError, ChatMessage, ChatTransport, OutgoingMessage};

/// Delivery state of a thread entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    /// Shown locally, not yet acknowledged.
    Pending,
    /// Stored by the backend.
    Sent,
    /// The transport rejected it.
    Failed,
}

/// One displayed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadEntry {
    /// Message (a local placeholder id while pending).
    pub message: ChatMessage,
    /// Delivery state.
    pub state: DeliveryState,
}

/// Messages of one job as seen by one participant.
#[derive(Debug, Clone)]
pub struct ChatThread {
    job_id: Uuid,
    viewer_id: Uuid,
    entries: Vec<ThreadEntry>,
}

impl ChatThread {
    /// Empty thread for `viewer_id` on `job_id`.
    pub fn new(job_id: Uuid, viewer_id: Uuid) -> Self {
        Self {
            job_id,
            viewer_id,
            entries: Vec::new(),
        }
    }

    /// Displayed entries, oldest first.
    pub fn entries(&self) -> &[ThreadEntry] {
        &self.entries
    }

    /// Replace the thread with server history, keeping local pending entries.
    pub fn load(&mut self, history: Vec<ChatMessage>) {
        self.entries.retain(|e| e.state != DeliveryState::Sent);
        self.entries.extend(
            history
                .into_iter()
                .filter(|m| m.job_id == self.job_id)
                .map(|message| ThreadEntry {
                    message,
                    state: DeliveryState::Sent,
                }),
        );
        self.sort();
    }

    /// Show a message before the transport confirms it. Returns its local id.
    pub fn push_optimistic(&mut self, content: &str, image: Option<String>) -> Uuid {
        let local_id = Uuid::new_v4();
        self.entries.push(ThreadEntry {
            message: ChatMessage {
                id: local_id,
                job_id: self.job_id,
                sender_id: self.viewer_id,
                content: content.trim().to_owned(),
                image,
                is_read: false,
                created_at: Utc::now(),
            },
            state: DeliveryState::Pending,
        });
        self.sort();
        local_id
    }

    /// Swap a pending entry for the server copy.
    pub fn confirm(&mut self, local_id: Uuid, stored: ChatMessage) {
        self.entries.retain(|e| e.message.id != local_id);
        self.upsert_sent(stored);
    }

    /// Mark a pending entry as failed.
    pub fn fail(&mut self, local_id: Uuid) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.message.id == local_id) {
            entry.state = DeliveryState::Failed;
        }
    }

    /// Apply a realtime event. Returns whether the thread changed.
    pub fn receive(&mut self, message: ChatMessage) -> bool {
        if message.job_id != self.job_id {
            return false;
        }
        if self.entries.iter().any(|e| e.message.id == message.id) {
            return false;
        }
        if message.sender_id == self.viewer_id {
            // Echo of our own send: drop the oldest matching placeholder.
            if let Some(pos) = self.entries.iter().position(|e| {
                e.state == DeliveryState::Pending
                    && e.message.content == message.content
                    && e.message.image == message.image
            }) {
                self.entries.remove(pos);
            }
        }
        self.upsert_sent(message);
        true
    }

    /// Messages from the other participant not yet read.
    pub fn unread_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.message.sender_id != self.viewer_id && !e.message.is_read)
            .count()
    }

    /// Mark everything from the other participant as read locally.
    pub fn mark_all_read(&mut self) {
        for entry in &mut self.entries {
            if entry.message.sender_id != self.viewer_id {
                entry.message.is_read = true;
            }
        }
    }

    /// Send through `transport`, updating the thread optimistically.
    ///
    /// # Errors
    ///
    /// Returns the transport error; the entry stays visible as `Failed`.
    pub async fn send(
        &mut self,
        transport: &dyn ChatTransport,
        content: &str,
        image: Option<String>,
    ) -> Result<ChatMessage, ChatError> {
        let local_id = self.push_optimistic(content, image.clone());
        let outgoing = OutgoingMessage {
            job_id: self.job_id,
            sender_id: self.viewer_id,
            content: content.to_owned(),
            image,
        };
        match transport.send_message(outgoing).await {
            Ok(stored) => {
                self.confirm(local_id, stored.clone());
                Ok(stored)
            }
            Err(e) => {
                self.fail(local_id);
                Err(e)
            }
        }
    }

    fn upsert_sent(&mut self, message: ChatMessage) {
        match self.entries.iter_mut().find(|e| e.message.id == message.id) {
            Some(existing) => {
                existing.message = message;
                existing.state = DeliveryState::Sent;
            }
            None => self.entries.push(ThreadEntry {
                message,
                state: DeliveryState::Sent,
            }),
        }
        self.sort();
    }

    fn sort(&mut self) {
        self.entries.sort_by_key(|e| e.message.created_at);
    }
}
