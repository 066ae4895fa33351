use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Partial profile update; absent fields are left untouched.
#[derive(Debug, Deserialize)]
pub struct ProfileUpdateRequest {
    pub username: Option<String>,
    pub email: Option<String>,
}

/// Response returned after a successful login.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Public part of the user returned to the client. Never carries the hash.
#[derive(Debug, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}
