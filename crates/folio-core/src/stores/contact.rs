use std::sync::{Arc, Mutex, MutexGuard};

use super::errors::ErrorStore;
use super::state::{ActionResult, StoreState};
use crate::api::{ApiClient, ApiError};
use crate::models::{ContactMessage, MessageStatusUpdate, NewContactMessage};

const MESSAGES_ENDPOINT: &str = "/blog/messages";

/// Public contact form plus the admin inbox.
#[derive(Debug)]
pub struct ContactStore {
    api: ApiClient,
    state: StoreState,
    messages: Mutex<Vec<ContactMessage>>,
}

impl ContactStore {
    pub fn new(api: ApiClient, errors: Arc<ErrorStore>) -> Self {
        Self {
            api,
            state: StoreState::new("contact", errors),
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    fn messages_mut(&self) -> MutexGuard<'_, Vec<ContactMessage>> {
        self.messages.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn messages(&self) -> Vec<ContactMessage> {
        self.messages_mut().clone()
    }

    pub fn unread_count(&self) -> usize {
        self.messages_mut().iter().filter(|m| !m.is_read).count()
    }

    /// Validate locally, then send. Invalid forms never reach the network.
    pub async fn submit(&self, message: &NewContactMessage) -> ActionResult<ContactMessage> {
        self.state
            .run("submit", async {
                message.validate().map_err(ApiError::Validation)?;
                self.api.post(MESSAGES_ENDPOINT, message).await
            })
            .await
    }

    /// Always fetched fresh; the inbox is never served from cache.
    pub async fn fetch_messages(&self) -> ActionResult<Vec<ContactMessage>> {
        self.state
            .run("fetch_messages", async {
                let messages: Vec<ContactMessage> = self.api.get_fresh(MESSAGES_ENDPOINT).await?;
                *self.messages_mut() = messages.clone();
                Ok(messages)
            })
            .await
    }

    pub async fn mark_read(&self, id: i64, is_read: bool) -> ActionResult<ContactMessage> {
        self.state
            .run("mark_read", async {
                let updated: ContactMessage = self
                    .api
                    .patch(&format!("{}/{}", MESSAGES_ENDPOINT, id), &MessageStatusUpdate { is_read })
                    .await?;
                if let Some(existing) = self.messages_mut().iter_mut().find(|m| m.id == id) {
                    *existing = updated.clone();
                }
                Ok(updated)
            })
            .await
    }

    pub async fn delete_message(&self, id: i64) -> ActionResult<()> {
        self.state
            .run("delete_message", async {
                self.api.delete(&format!("{}/{}", MESSAGES_ENDPOINT, id)).await?;
                self.messages_mut().retain(|m| m.id != id);
                Ok(())
            })
            .await
    }
}
