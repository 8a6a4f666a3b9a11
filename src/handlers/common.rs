use std::str::FromStr;

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::{Actor, Role};
use crate::errors::ServiceError;
use crate::{ApiResponse, AppState, PageRequest};

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::success(data))).into_response()
}

/// Page selection from optional query parameters, defaulting to the configured page size.
pub fn page_request(state: &AppState, page: Option<u64>, per_page: Option<u64>) -> PageRequest {
    PageRequest::new(
        page.unwrap_or(1),
        per_page.unwrap_or(state.config.default_page_size),
    )
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, ServiceError> {
    parts
        .headers
        .get(name)
        .ok_or_else(|| ServiceError::Unauthorized(format!("missing {} header", name)))?
        .to_str()
        .map_err(|_| ServiceError::Unauthorized(format!("malformed {} header", name)))
}

/// The acting user as asserted by the identity layer in front of this service.
#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = Uuid::parse_str(header(parts, ACTOR_ID_HEADER)?.trim())
            .map_err(|_| ServiceError::Unauthorized(format!("malformed {} header", ACTOR_ID_HEADER)))?;
        let role = Role::from_str(header(parts, ACTOR_ROLE_HEADER)?.trim()).map_err(|_| {
            ServiceError::Unauthorized(format!("unknown role in {} header", ACTOR_ROLE_HEADER))
        })?;
        Ok(Actor::new(user_id, role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<Actor, ServiceError> {
        let (mut parts, _) = request.into_parts();
        Actor::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn actor_is_read_from_headers() {
        let user_id = Uuid::new_v4();
        let request = Request::builder()
            .header(ACTOR_ID_HEADER, user_id.to_string())
            .header(ACTOR_ROLE_HEADER, "keeper")
            .body(())
            .unwrap();
        let actor = extract(request).await.unwrap();
        assert_eq!(actor, Actor::new(user_id, Role::Keeper));
    }

    #[tokio::test]
    async fn missing_or_bad_headers_are_unauthorized() {
        let missing = Request::builder().body(()).unwrap();
        assert_matches!(extract(missing).await, Err(ServiceError::Unauthorized(_)));

        let bad_role = Request::builder()
            .header(ACTOR_ID_HEADER, Uuid::new_v4().to_string())
            .header(ACTOR_ROLE_HEADER, "overlord")
            .body(())
            .unwrap();
        assert_matches!(extract(bad_role).await, Err(ServiceError::Unauthorized(_)));
    }
}
