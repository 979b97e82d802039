use std::convert::Infallible;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use url::Url;

use crate::error::TransportError;
use crate::models::{AssistantReply, ChatHistory, ChatMessage, HistoryRequest, ServerReply};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(
        &self,
        message: &str,
        endpoint: &Url,
        chat_id: &str,
        hash_key: &str,
    ) -> Result<AssistantReply, TransportError>;

    async fn fetch_history(
        &self,
        endpoint: &Url,
        chat_id: &str,
        hash_key: &str,
    ) -> Result<ChatHistory, TransportError>;

    /// History is best-effort: failures are logged and read as an empty history.
    async fn get_chat_history(
        &self,
        endpoint: &Url,
        chat_id: &str,
        hash_key: &str,
    ) -> Result<ChatHistory, Infallible> {
        match self.fetch_history(endpoint, chat_id, hash_key).await {
            Ok(history) => Ok(history),
            Err(err) => {
                tracing::warn!(error = %err, %endpoint, "chat history unavailable");
                Ok(ChatHistory::default())
            }
        }
    }
}

/// JSON-over-HTTP transport. Sends no cookies or auth headers.
#[derive(Clone)]
pub struct HttpChatTransport {
    client: reqwest::Client,
}

impl HttpChatTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| TransportError::Network(format!("failed to build http client: {}", err)))?;
        Ok(Self { client })
    }

    async fn post_json<B, T>(&self, endpoint: &Url, body: &B) -> Result<T, TransportError>
    where
        B: serde::Serialize + Sync,
        T: serde::de::DeserializeOwned,
    {
        let resp = self
            .client
            .post(endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(body)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            let detail = detail.trim();
            return Err(TransportError::Server(if detail.is_empty() {
                format!("request failed with status {}", status)
            } else {
                format!("request failed with status {}: {}", status, detail)
            }));
        }

        let bytes = resp.bytes().await.map_err(TransportError::from_reqwest)?;
        serde_json::from_slice(&bytes)
            .map_err(|err| TransportError::Server(format!("malformed response body: {}", err)))
    }
}

impl Default for HttpChatTransport {
    fn default() -> Self {
        Self { client: reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build().unwrap_or_default() }
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn send_message(
        &self,
        message: &str,
        endpoint: &Url,
        chat_id: &str,
        hash_key: &str,
    ) -> Result<AssistantReply, TransportError> {
        tracing::debug!(%endpoint, chat_id, "sending chat message");
        let body = ChatMessage { message, chat_id, hash_key };
        let reply: ServerReply = self.post_json(endpoint, &body).await?;
        Ok(reply.into())
    }

    async fn fetch_history(
        &self,
        endpoint: &Url,
        chat_id: &str,
        hash_key: &str,
    ) -> Result<ChatHistory, TransportError> {
        tracing::debug!(%endpoint, chat_id, "fetching chat history");
        let body = HistoryRequest { chat_id, hash_key };
        self.post_json(endpoint, &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::{HeaderMap, StatusCode}, routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn spawn_endpoint(app: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Url::parse(&format!("http://{}/chat", addr)).unwrap()
    }

    async fn closed_endpoint() -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        Url::parse(&format!("http://{}/chat", addr)).unwrap()
    }

    #[tokio::test]
    async fn send_message_posts_body_and_normalizes_reply() {
        let app = Router::new().route("/chat", post(|headers: HeaderMap, Json(body): Json<Value>| async move {
            assert_eq!(headers.get("content-type").unwrap(), "application/json");
            assert_eq!(headers.get("accept").unwrap(), "application/json");
            assert!(headers.get("cookie").is_none());
            assert!(headers.get("authorization").is_none());
            assert_eq!(body, json!({"message": "shoes?", "chatId": "chat_1", "hashKey": "key_1"}));
            Json(json!({
                "assistantMessage": "hi",
                "recommendedProducts": [{
                    "id": 1,
                    "name": "Vans Old Skool",
                    "description": "Skate shoes",
                    "price": 60.0,
                    "image": "https://images.example.com/vans.jpg"
                }]
            }))
        }));
        let endpoint = spawn_endpoint(app).await;
        let transport = HttpChatTransport::default();

        let reply = transport.send_message("shoes?", &endpoint, "chat_1", "key_1").await.unwrap();
        assert_eq!(reply.message, "hi");
        assert_eq!(reply.products.len(), 1);
        assert_eq!(reply.products[0].id.to_string(), "1");
    }

    #[tokio::test]
    async fn send_message_without_products_yields_empty_list() {
        let app = Router::new().route("/chat", post(|| async { Json(json!({"assistantMessage": "no picks"})) }));
        let endpoint = spawn_endpoint(app).await;
        let reply = HttpChatTransport::default().send_message("x", &endpoint, "c", "k").await.unwrap();
        assert_eq!(reply.message, "no picks");
        assert!(reply.products.is_empty());
    }

    #[tokio::test]
    async fn non_success_status_is_server_error() {
        let app = Router::new().route("/chat", post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }));
        let endpoint = spawn_endpoint(app).await;
        let err = HttpChatTransport::default().send_message("x", &endpoint, "c", "k").await.unwrap_err();
        assert!(matches!(err, TransportError::Server(_)));
        let msg = err.to_string();
        assert!(msg.contains("502"), "{}", msg);
        assert!(msg.contains("upstream down"), "{}", msg);
    }

    #[tokio::test]
    async fn malformed_payload_is_server_error() {
        let app = Router::new().route("/chat", post(|| async { Json(json!({"reply": "wrong shape"})) }));
        let endpoint = spawn_endpoint(app).await;
        let err = HttpChatTransport::default().send_message("x", &endpoint, "c", "k").await.unwrap_err();
        assert!(matches!(err, TransportError::Server(_)));
        assert!(err.to_string().contains("assistantMessage"), "{}", err);
    }

    #[tokio::test]
    async fn connection_refused_is_network_error() {
        let endpoint = closed_endpoint().await;
        let err = HttpChatTransport::default().send_message("x", &endpoint, "c", "k").await.unwrap_err();
        assert!(matches!(err, TransportError::Network(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn slow_endpoint_times_out_as_network_error() {
        let app = Router::new().route("/chat", post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({"assistantMessage": "late"}))
        }));
        let endpoint = spawn_endpoint(app).await;
        let transport = HttpChatTransport::new(Duration::from_millis(100)).unwrap();
        let err = transport.send_message("x", &endpoint, "c", "k").await.unwrap_err();
        assert!(matches!(err, TransportError::Network(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn history_returns_server_payload() {
        let app = Router::new().route("/chat", post(|Json(body): Json<Value>| async move {
            assert_eq!(body, json!({"chatId": "c", "hashKey": "k"}));
            Json(json!({"messages": [{"role": "user", "content": "hi"}], "recommendedProducts": []}))
        }));
        let endpoint = spawn_endpoint(app).await;
        let Ok(history) = HttpChatTransport::default().get_chat_history(&endpoint, "c", "k").await;
        assert_eq!(history.messages.len(), 1);
        assert!(history.recommended_products.is_empty());
    }

    #[tokio::test]
    async fn history_failure_degrades_to_empty() {
        let endpoint = closed_endpoint().await;
        let Ok(history) = HttpChatTransport::default().get_chat_history(&endpoint, "c", "k").await;
        assert_eq!(history, ChatHistory::default());

        let app = Router::new().route("/chat", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
        let endpoint = spawn_endpoint(app).await;
        let Ok(history) = HttpChatTransport::default().get_chat_history(&endpoint, "c", "k").await;
        assert!(history.is_empty());
    }
}
