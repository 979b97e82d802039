use std::convert::Infallible;

use url::Url;

use crate::error::WidgetError;
use crate::identity::{IdentitySnapshot, IdentityStore};
use crate::models::{AssistantReply, ChatHistory};
use crate::storage::KeyValueStore;
use crate::transport::ChatTransport;

/// The send / reset / history surface the UI layer talks to.
///
/// Nothing here retries. A failed send leaves the stored identifiers as they were.
pub struct ChatSession<S: KeyValueStore, T: ChatTransport> {
    identities: IdentityStore<S>,
    transport: T,
    endpoint: Url,
}

impl<S: KeyValueStore, T: ChatTransport> ChatSession<S, T> {
    pub fn new(store: S, transport: T, endpoint: Url) -> Self {
        Self { identities: IdentityStore::new(store), transport, endpoint }
    }

    /// Ensures the long-lived session id exists and returns it.
    pub async fn init(&self) -> Result<String, WidgetError> {
        Ok(self.identities.init().await?)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn send(&self, message: &str) -> Result<AssistantReply, WidgetError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(WidgetError::EmptyMessage);
        }
        let creds = self.identities.chat_credentials().await?;
        let reply = self
            .transport
            .send_message(message, &self.endpoint, &creds.chat_id, &creds.hash_key)
            .await?;
        tracing::debug!(chat_id = %creds.chat_id, products = reply.products.len(), "assistant replied");
        Ok(reply)
    }

    /// Starts a fresh chat on the next send. The session id is kept.
    pub async fn reset(&self) -> Result<(), WidgetError> {
        Ok(self.identities.reset().await?)
    }

    /// Prior turns of the current chat, or an empty history when there is no
    /// chat yet or anything goes wrong.
    pub async fn load_history(&self) -> Result<ChatHistory, Infallible> {
        let creds = match self.identities.existing_credentials().await {
            Ok(Some(creds)) => creds,
            Ok(None) => return Ok(ChatHistory::default()),
            Err(err) => {
                tracing::warn!(error = %err, "could not read chat credentials for history");
                return Ok(ChatHistory::default());
            }
        };
        self.transport
            .get_chat_history(&self.endpoint, &creds.chat_id, &creds.hash_key)
            .await
    }

    pub async fn identities(&self) -> Result<IdentitySnapshot, WidgetError> {
        Ok(self.identities.snapshot().await?)
    }
}
