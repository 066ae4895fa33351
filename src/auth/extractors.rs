use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::auth::repo;
use crate::error::ApiError;
use crate::state::AppState;

/// Resolves `Authorization: Token <key>` to the owning user's id.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| {
                ApiError::Unauthenticated("Authentication credentials were not provided.".into())
            })?;

        let key = auth
            .strip_prefix("Token ")
            .ok_or_else(|| ApiError::Unauthenticated("Invalid token header.".into()))?
            .trim();
        if key.is_empty() {
            return Err(ApiError::Unauthenticated("Invalid token header.".into()));
        }

        match repo::find_user_id_by_token(&state.db, key).await? {
            Some(user_id) => Ok(AuthUser(user_id)),
            None => Err(ApiError::Unauthenticated("Invalid token.".into())),
        }
    }
}
