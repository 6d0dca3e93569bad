//! Extractors that reject with the API error envelope instead of axum's
//! plain-text rejections.

use axum::{
    Json, async_trait,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Numeric `:id` path parameter converted into a typed id
#[derive(Debug, Clone, Copy)]
pub struct Id<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for Id<T>
where
    S: Send + Sync,
    T: From<u64> + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<u64>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::invalid_request(e.body_text()))?;
        Ok(Self(T::from(raw)))
    }
}

/// JSON request body
#[derive(Debug, Clone)]
pub struct Body<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Body<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::invalid_request(e.body_text()))?;
        Ok(Self(value))
    }
}
