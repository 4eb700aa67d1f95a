//! API client layer for REST and WebSocket connections.
//!
//! [`ListApi`] is the seam the reconciliation store talks through. The HTTP
//! implementation maps each [`UrlOperation`] onto its route and decodes the
//! server's error envelope into [`ClientError::Api`].

use async_trait::async_trait;
use linkdeck_api::{
    ApiError, CollaboratorRoleRequest, MutationResponse, UrlListResponse, ACTOR_HEADER,
    SESSION_HEADER,
};
use linkdeck_core::{List, SessionId, UrlOperation, UserId};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::WebSocketStream;

use crate::config::{ClientConfig, ReconnectConfig};
use crate::error::{ClientError, ClientResult};

/// Remote operations the reconciliation store needs.
#[async_trait]
pub trait ListApi: Send + Sync {
    /// Fetch the canonical list record.
    async fn fetch_list(&self, list_key: &str) -> ClientResult<List>;

    /// Send one mutation and return the persisted result.
    async fn mutate(&self, list_key: &str, operation: &UrlOperation) -> ClientResult<MutationResponse>;
}

#[derive(Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    headers: HeaderMap,
}

impl RestClient {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            headers: actor_headers(config.actor_id)?,
        })
    }

    /// Tag every request with `session_id` so the server can attribute
    /// changes to this client session.
    pub fn with_session(mut self, session_id: SessionId) -> ClientResult<Self> {
        self.headers
            .insert(HeaderName::from_static(SESSION_HEADER), uuid_value(session_id)?);
        Ok(self)
    }

    /// URLs with resolved metadata from the bundle read path.
    pub async fn list_urls(&self, list_key: &str) -> ClientResult<UrlListResponse> {
        let path = format!("/api/v1/lists/{}/urls", list_key);
        self.send::<UrlListResponse, ()>(Method::GET, &path, None).await
    }

    async fn send<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> ClientResult<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .client
            .request(method, url)
            .headers(self.headers.clone());
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        self.parse_response(response).await
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> ClientResult<T> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json::<T>().await?)
        } else {
            let text = response.text().await?;
            if let Ok(api_error) = serde_json::from_str::<ApiError>(&text) {
                return Err(api_error.into());
            }
            Err(ClientError::InvalidResponse(format!(
                "HTTP {}: {}",
                status.as_u16(),
                text
            )))
        }
    }
}

#[async_trait]
impl ListApi for RestClient {
    async fn fetch_list(&self, list_key: &str) -> ClientResult<List> {
        let path = format!("/api/v1/lists/{}", list_key);
        self.send::<List, ()>(Method::GET, &path, None).await
    }

    async fn mutate(&self, list_key: &str, operation: &UrlOperation) -> ClientResult<MutationResponse> {
        let base = format!("/api/v1/lists/{}", list_key);
        match operation {
            UrlOperation::Add { new_url } => {
                self.send(Method::POST, &format!("{}/urls", base), Some(new_url))
                    .await
            }
            UrlOperation::Update { url_id, patch } => {
                self.send(Method::PATCH, &format!("{}/urls/{}", base, url_id), Some(patch))
                    .await
            }
            UrlOperation::Delete { url_id } => {
                self.send::<_, ()>(Method::DELETE, &format!("{}/urls/{}", base, url_id), None)
                    .await
            }
            UrlOperation::Reorder { input } => {
                self.send(Method::POST, &format!("{}/urls/reorder", base), Some(input))
                    .await
            }
            UrlOperation::Archive { url_id } => {
                self.send::<_, ()>(Method::POST, &format!("{}/urls/{}/archive", base, url_id), None)
                    .await
            }
            UrlOperation::Restore { url_id } => {
                self.send::<_, ()>(Method::POST, &format!("{}/urls/{}/restore", base, url_id), None)
                    .await
            }
            UrlOperation::UpdateList { patch } => {
                self.send(Method::PATCH, &base, Some(patch)).await
            }
            UrlOperation::UpdateCollaboratorRole { user_id, role } => {
                let body = CollaboratorRoleRequest { role: *role };
                self.send(Method::PUT, &collaborator_path(&base, *user_id), Some(&body))
                    .await
            }
        }
    }
}

fn collaborator_path(base: &str, user_id: UserId) -> String {
    format!("{}/collaborators/{}", base, user_id)
}

#[derive(Clone)]
pub struct WsClient {
    base_url: String,
    actor_header: HeaderValue,
    reconnect: ReconnectConfig,
}

pub type WsStream = WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

impl WsClient {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        Ok(Self {
            base_url: config.ws_base_url.trim_end_matches('/').to_string(),
            actor_header: actor_value(config.actor_id)?,
            reconnect: config.reconnect.clone(),
        })
    }

    pub fn endpoint(&self, list_key: &str) -> String {
        format!("{}/api/v1/lists/{}/ws", self.base_url, list_key)
    }

    pub async fn connect(&self, list_key: &str) -> ClientResult<WsStream> {
        let mut request = self.endpoint(list_key).into_client_request()?;
        request
            .headers_mut()
            .insert(HeaderName::from_static(ACTOR_HEADER), self.actor_header.clone());
        let (stream, _) = tokio_tungstenite::connect_async(request).await?;
        Ok(stream)
    }

    pub fn reconnect_config(&self) -> &ReconnectConfig {
        &self.reconnect
    }
}

fn uuid_value(id: uuid::Uuid) -> ClientResult<HeaderValue> {
    HeaderValue::from_str(&id.to_string())
        .map_err(|e| ClientError::InvalidResponse(format!("Invalid id header: {}", e)))
}

fn actor_value(actor_id: UserId) -> ClientResult<HeaderValue> {
    uuid_value(actor_id)
}

fn actor_headers(actor_id: UserId) -> ClientResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(HeaderName::from_static(ACTOR_HEADER), actor_value(actor_id)?);
    Ok(headers)
}
