use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use super::{ApiError, AppState};
use crate::core::OwnerId;

/// Owner resolved from the request's bearer token.
#[derive(Debug, Clone)]
pub struct AuthenticatedOwner(pub OwnerId);

impl FromRequestParts<AppState> for AuthenticatedOwner {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let owner = state.tokens.verify_header(header)?;
        Ok(Self(owner))
    }
}
