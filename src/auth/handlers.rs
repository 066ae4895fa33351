use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            LoginRequest, MessageResponse, Profile, ProfileUpdateRequest, RegisterRequest,
            TokenResponse,
        },
        extractors::AuthUser,
        password::{hash_password, verify_password},
        repo::{self, User},
        token,
    },
    error::{ApiError, FieldErrors},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register/", post(register))
        .route("/login/", post(login))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/profile/", get(get_profile).put(update_profile))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Minimum length plus the entirely-numeric rejection.
pub(crate) fn password_error(password: &str) -> Option<&'static str> {
    if password.len() < 8 {
        return Some("This password is too short. It must contain at least 8 characters.");
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Some("This password is entirely numeric.");
    }
    None
}

fn push_error(errors: &mut FieldErrors, field: &str, message: impl Into<String>) {
    errors.entry(field.to_string()).or_default().push(message.into());
}

fn map_unique_username(e: sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return ApiError::field("username", "A user with that username already exists.");
        }
    }
    e.into()
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let username = payload.username.trim();
    let email = payload.email.trim();

    let mut errors = FieldErrors::new();
    if username.is_empty() {
        push_error(&mut errors, "username", "This field may not be blank.");
    }
    if email.is_empty() {
        push_error(&mut errors, "email", "This field may not be blank.");
    } else if !is_valid_email(email) {
        push_error(&mut errors, "email", "Enter a valid email address.");
    }
    if payload.password.is_empty() {
        push_error(&mut errors, "password", "This field may not be blank.");
    } else if let Some(msg) = password_error(&payload.password) {
        push_error(&mut errors, "password", msg);
    }
    if !errors.is_empty() {
        warn!(%username, "registration rejected");
        return Err(ApiError::Validation(errors));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, username, email, &hash)
        .await
        .map_err(map_unique_username)?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User registered successfully",
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let mut errors = FieldErrors::new();
    if payload.username.is_empty() {
        push_error(&mut errors, "username", "This field is required.");
    }
    if payload.password.is_empty() {
        push_error(&mut errors, "password", "This field is required.");
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    // Unknown user and wrong password collapse into the same response.
    let user = match User::find_by_username(&state.db, &payload.username).await? {
        Some(u) => u,
        None => {
            warn!(username = %payload.username, "login unknown username");
            return Err(ApiError::InvalidCredentials);
        }
    };
    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let key = repo::get_or_create_token(&state.db, user.id, &token::generate_key()).await?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(TokenResponse { token: key }))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Profile>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthenticated("Invalid token.".into()))?;
    Ok(Json(Profile {
        id: user.id,
        username: user.username,
        email: user.email,
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ProfileUpdateRequest>,
) -> Result<Json<Profile>, ApiError> {
    let username = payload.username.as_deref().map(str::trim);
    let email = payload.email.as_deref().map(str::trim);

    let mut errors = FieldErrors::new();
    if let Some(u) = username {
        if u.is_empty() {
            push_error(&mut errors, "username", "This field may not be blank.");
        }
    }
    if let Some(e) = email {
        if e.is_empty() {
            push_error(&mut errors, "email", "This field may not be blank.");
        } else if !is_valid_email(e) {
            push_error(&mut errors, "email", "Enter a valid email address.");
        }
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let user = User::update_profile(&state.db, user_id, username, email)
        .await
        .map_err(map_unique_username)?;

    info!(user_id = %user.id, "profile updated");
    Ok(Json(Profile {
        id: user.id,
        username: user.username,
        email: user.email,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("alice@example.com"));
        assert!(!is_valid_email("alice"));
        assert!(!is_valid_email("alice@nodot"));
        assert!(!is_valid_email("a b@example.com"));
    }

    #[test]
    fn short_password_rejected() {
        assert!(password_error("abc1234").is_some());
        assert!(password_error("abcd1234").is_none());
    }

    #[test]
    fn numeric_password_rejected() {
        assert_eq!(
            password_error("123456789"),
            Some("This password is entirely numeric.")
        );
    }

    #[test]
    fn profile_never_serializes_password() {
        let user = User {
            id: uuid::Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "secret-hash".into(),
            created_at: time::OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("password"));
    }
}
