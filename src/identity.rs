use chrono::Utc;
use rand::Rng;
use serde::Serialize;

use crate::storage::KeyValueStore;

pub const SESSION_KEY: &str = "assistant-widget-session";
pub const CHAT_ID_KEY: &str = "assistant-widget-chat-id";
pub const HASH_KEY_KEY: &str = "assistant-widget-hash-key";

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentityKind {
    Session,
    Chat,
    HashKey,
}

impl IdentityKind {
    pub fn storage_key(self) -> &'static str {
        match self {
            IdentityKind::Session => SESSION_KEY,
            IdentityKind::Chat => CHAT_ID_KEY,
            IdentityKind::HashKey => HASH_KEY_KEY,
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            IdentityKind::Session => "session",
            IdentityKind::Chat => "chat",
            IdentityKind::HashKey => "key",
        }
    }

    /// (random run length, number of runs)
    fn shape(self) -> (usize, usize) {
        match self {
            IdentityKind::Session => (9, 1),
            IdentityKind::Chat => (9, 2),
            IdentityKind::HashKey => (12, 2),
        }
    }
}

/// Builds `<prefix>_<epoch millis>_<base36>[_<base36>]`. No uniqueness check.
pub fn generate_identifier(kind: IdentityKind) -> String {
    let (len, runs) = kind.shape();
    let mut id = format!("{}_{}", kind.prefix(), Utc::now().timestamp_millis());
    for _ in 0..runs {
        id.push('_');
        id.push_str(&random_base36(len));
    }
    id
}

fn random_base36(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatCredentials {
    pub chat_id: String,
    pub hash_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySnapshot {
    pub session_id: Option<String>,
    pub chat_id: Option<String>,
    pub hash_key: Option<String>,
}

/// Session id, chat id and hash key persisted through a [`KeyValueStore`].
///
/// Chat id and hash key only ever exist as a pair: asking for either one
/// resolves both, and a half-present pair is regenerated as a whole.
pub struct IdentityStore<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> IdentityStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Makes sure a session id exists and returns it.
    pub async fn init(&self) -> anyhow::Result<String> {
        self.get_or_create(IdentityKind::Session).await
    }

    pub async fn get_or_create(&self, kind: IdentityKind) -> anyhow::Result<String> {
        match kind {
            IdentityKind::Session => {
                if let Some(id) = self.store.get(SESSION_KEY).await? {
                    return Ok(id);
                }
                let id = generate_identifier(IdentityKind::Session);
                self.store.set(SESSION_KEY, &id).await?;
                tracing::debug!(session_id = %id, "generated session id");
                Ok(id)
            }
            IdentityKind::Chat => Ok(self.chat_credentials().await?.chat_id),
            IdentityKind::HashKey => Ok(self.chat_credentials().await?.hash_key),
        }
    }

    pub async fn chat_credentials(&self) -> anyhow::Result<ChatCredentials> {
        if let Some(creds) = self.existing_credentials().await? {
            return Ok(creds);
        }
        let creds = ChatCredentials {
            chat_id: generate_identifier(IdentityKind::Chat),
            hash_key: generate_identifier(IdentityKind::HashKey),
        };
        self.store
            .set_many(&[(CHAT_ID_KEY, creds.chat_id.as_str()), (HASH_KEY_KEY, creds.hash_key.as_str())])
            .await?;
        tracing::debug!(chat_id = %creds.chat_id, "generated chat credentials");
        Ok(creds)
    }

    /// The stored pair, or `None` when either half is absent.
    pub async fn existing_credentials(&self) -> anyhow::Result<Option<ChatCredentials>> {
        let chat_id = self.store.get(CHAT_ID_KEY).await?;
        let hash_key = self.store.get(HASH_KEY_KEY).await?;
        Ok(match (chat_id, hash_key) {
            (Some(chat_id), Some(hash_key)) => Some(ChatCredentials { chat_id, hash_key }),
            _ => None,
        })
    }

    pub async fn peek(&self, kind: IdentityKind) -> anyhow::Result<Option<String>> {
        self.store.get(kind.storage_key()).await
    }

    pub async fn snapshot(&self) -> anyhow::Result<IdentitySnapshot> {
        Ok(IdentitySnapshot {
            session_id: self.peek(IdentityKind::Session).await?,
            chat_id: self.peek(IdentityKind::Chat).await?,
            hash_key: self.peek(IdentityKind::HashKey).await?,
        })
    }

    /// Drops the chat id and hash key together. The session id stays.
    pub async fn reset(&self) -> anyhow::Result<()> {
        self.store.remove_many(&[CHAT_ID_KEY, HASH_KEY_KEY]).await?;
        tracing::info!("chat credentials cleared");
        Ok(())
    }
}
