//! Caller identity extractor.
//!
//! Session handling lives in front of this service; by the time a request
//! arrives the caller's user id is carried in the `X-Actor-Id` header.
//! Clients may add `X-Session-Id` so their own changes can be recognised
//! when they come back over the change stream.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use linkdeck_core::Actor;
use uuid::Uuid;

use crate::error::ApiError;

pub const ACTOR_HEADER: &str = "x-actor-id";
pub const SESSION_HEADER: &str = "x-session-id";

/// The actor a request is made on behalf of.
///
/// ```rust,ignore
/// async fn add_url(RequestActor(actor): RequestActor, ...) -> ApiResult<...> {
///     gateway.add_url(&key, new_url, actor).await?;
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequestActor(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for RequestActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(ACTOR_HEADER)
            .ok_or_else(|| ApiError::unauthorized("Missing X-Actor-Id header"))?;
        let raw = raw
            .to_str()
            .map_err(|_| ApiError::invalid_format("X-Actor-Id", "a UUID"))?;
        let user_id = Uuid::parse_str(raw.trim())
            .map_err(|_| ApiError::invalid_format("X-Actor-Id", "a UUID"))?;
        let mut actor = Actor::new(user_id);

        if let Some(raw) = parts.headers.get(SESSION_HEADER) {
            let session_id = raw
                .to_str()
                .ok()
                .and_then(|s| Uuid::parse_str(s.trim()).ok())
                .ok_or_else(|| ApiError::invalid_format("X-Session-Id", "a UUID"))?;
            actor = actor.in_session(session_id);
        }
        Ok(RequestActor(actor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<RequestActor, ApiError> {
        extract_with_session(header, None).await
    }

    async fn extract_with_session(
        header: Option<&str>,
        session: Option<&str>,
    ) -> Result<RequestActor, ApiError> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(ACTOR_HEADER, value);
        }
        if let Some(value) = session {
            builder = builder.header(SESSION_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        RequestActor::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_valid_header() {
        let id = Uuid::now_v7();
        let RequestActor(actor) = extract(Some(&id.to_string())).await.unwrap();
        assert_eq!(actor.user_id, id);
        assert_eq!(actor.session_id, None);
    }

    #[tokio::test]
    async fn test_session_header() {
        let id = Uuid::now_v7();
        let session = Uuid::now_v7();
        let RequestActor(actor) =
            extract_with_session(Some(&id.to_string()), Some(&session.to_string()))
                .await
                .unwrap();
        assert_eq!(actor.session_id, Some(session));

        let err = extract_with_session(Some(&id.to_string()), Some("laptop"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFormat);
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthorized() {
        let err = extract(None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn test_malformed_header() {
        let err = extract(Some("not-a-uuid")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFormat);
    }
}
