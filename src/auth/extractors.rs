use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::{dto::PublicUser, services::authenticate};
use crate::{error::AppError, state::AppState};

/// Caller identity resolved from the bearer token. Handlers that take this
/// extractor never run for unauthenticated requests.
pub struct AuthUser(pub PublicUser);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let user = authenticate(state.users.as_ref(), &state.jwt, header).await?;
        Ok(AuthUser(user))
    }
}
