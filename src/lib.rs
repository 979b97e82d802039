pub mod error;
pub mod identity;
pub mod models;
pub mod session;
pub mod settings;
pub mod storage;
pub mod transport;

pub use error::{SettingsError, TransportError, WidgetError};
pub use identity::{IdentityKind, IdentityStore};
pub use models::{AssistantReply, ChatHistory, Product};
pub use session::ChatSession;
pub use transport::{ChatTransport, HttpChatTransport};
