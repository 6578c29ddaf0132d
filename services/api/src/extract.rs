//! Request extractors that report rejections in the API error envelope

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use common::pagination::{InvalidLimit, PageRequest};

use crate::error::{ApiError, ApiResult};

/// Query string extractor; malformed parameters are a 400
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| ApiQuery(value))
            .map_err(|rejection| ApiError::Validation(rejection.body_text()))
    }
}

/// JSON body extractor; malformed or mistyped bodies are a 400
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| ApiJson(value))
            .map_err(|rejection| ApiError::Validation(rejection.body_text()))
    }
}

/// Parse a path id. An id that cannot exist is reported like a missing record.
pub fn parse_id(raw: &str, not_found: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(not_found.to_string()))
}

/// Parse raw `page`/`limit` parameters
pub fn page_request(page: Option<i64>, limit: Option<i64>) -> ApiResult<PageRequest> {
    PageRequest::from_raw(page, limit).map_err(|InvalidLimit(raw)| {
        ApiError::Validation(format!(
            "Invalid limit {}: expected -1 or a non-negative integer",
            raw
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::pagination::Limit;

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "Album not found.").unwrap(), id);
        assert!(matches!(
            parse_id("not-a-uuid", "Album not found."),
            Err(ApiError::NotFound(message)) if message == "Album not found."
        ));
    }

    #[test]
    fn test_page_request() {
        assert_eq!(page_request(None, Some(-1)).unwrap().limit, Limit::Unlimited);
        assert!(matches!(
            page_request(Some(1), Some(-5)),
            Err(ApiError::Validation(_))
        ));
    }
}
