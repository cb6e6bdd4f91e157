use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;

/// Header carrying the viewer id resolved by the upstream session layer
pub const USER_ID_HEADER: &str = "x-user-id";

fn parse_user_id(parts: &Parts) -> Option<Result<i64, AppError>> {
    let raw = parts.headers.get(USER_ID_HEADER)?;
    let parsed = raw
        .to_str()
        .ok()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|id| *id > 0)
        .ok_or(AppError::Unauthorized);
    Some(parsed)
}

/// The identified viewer; rejects the request with 401 when absent or malformed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub i64);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parse_user_id(parts) {
            Some(Ok(id)) => Ok(CurrentUser(id)),
            Some(Err(e)) => {
                tracing::debug!("Malformed {} header", USER_ID_HEADER);
                Err(e)
            }
            None => Err(AppError::Unauthorized),
        }
    }
}

/// An optional viewer. A present but malformed header is still rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaybeUser(pub Option<i64>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parse_user_id(parts).transpose().map(MaybeUser)
    }
}
