//! Sign-up and login

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, Uri};
use chrono::{DateTime, Utc};
use expensegate_auth::Role;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::{ApiError, messages};
use crate::store::AccountError;

/// Scheme reported alongside issued tokens
pub const TOKEN_TYPE: &str = "Bearer";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
}

fn require(errors: &mut BTreeMap<String, String>, field: &str, value: &str, message: &str) {
    if value.trim().is_empty() {
        errors.insert(field.to_string(), message.to_string());
    }
}

fn require_email(errors: &mut BTreeMap<String, String>, email: &str) {
    require(errors, "email", email, "Email cannot be blank");
    if !errors.contains_key("email") && !email.contains('@') {
        errors.insert(
            "email".to_string(),
            "must be a well-formed email address".to_string(),
        );
    }
}

impl SignUpRequest {
    fn validate(&self) -> BTreeMap<String, String> {
        let mut errors = BTreeMap::new();
        require(&mut errors, "username", &self.username, "Username cannot be blank");
        require_email(&mut errors, &self.email);
        require(&mut errors, "password", &self.password, "Password cannot be blank");
        errors
    }
}

impl LoginRequest {
    fn validate(&self) -> BTreeMap<String, String> {
        let mut errors = BTreeMap::new();
        require_email(&mut errors, &self.email);
        require(&mut errors, "password", &self.password, "Password cannot be blank");
        errors
    }
}

/// `POST /api/auth/signup`
pub async fn sign_up(
    State(state): State<AppState>,
    uri: Uri,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SignUpResponse>), ApiError> {
    let Json(request) = payload.map_err(|e| {
        warn!(error = %e, "Malformed JSON request");
        ApiError::malformed_json(uri.path())
    })?;

    let errors = request.validate();
    if !errors.is_empty() {
        warn!(?errors, "Validation failed");
        return Err(ApiError::validation(errors, uri.path()));
    }

    info!(email = %request.email, "Attempting to register a new user");
    let account = state
        .accounts
        .sign_up(&request.username, &request.email, &request.password)
        .await
        .map_err(|e| match e {
            AccountError::EmailTaken => {
                ApiError::conflict(messages::EMAIL_ALREADY_EXISTS, uri.path())
            }
            AccountError::UsernameTaken => {
                ApiError::conflict(messages::USERNAME_ALREADY_EXISTS, uri.path())
            }
            AccountError::Hashing(_) => ApiError::internal(e, uri.path()),
        })?;

    let principal = &account.principal;
    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            id: principal.id,
            username: principal.username.clone(),
            email: principal.email.clone(),
            role: principal.role,
            created_at: account.created_at,
            message: "User registered successfully. Please login.".to_string(),
        }),
    ))
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    uri: Uri,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| {
        warn!(error = %e, "Malformed JSON request");
        ApiError::malformed_json(uri.path())
    })?;

    let errors = request.validate();
    if !errors.is_empty() {
        return Err(ApiError::validation(errors, uri.path()));
    }

    info!(email = %request.email, "Attempting to authenticate user");
    let Some(principal) = state
        .accounts
        .verify_password(&request.email, &request.password)
        .await
    else {
        warn!(email = %request.email, "Authentication failed for user");
        return Err(ApiError::invalid_credentials(uri.path()));
    };

    let access_token = state
        .codec
        .generate_token(&principal)
        .map_err(|e| ApiError::internal(e, uri.path()))?;

    info!(user_id = %principal.id, "User authenticated successfully");
    Ok(Json(LoginResponse {
        access_token,
        token_type: TOKEN_TYPE.to_string(),
        expires_in: state.codec.expires_in_secs(),
        id: principal.id,
        username: principal.username.clone(),
        email: principal.email.clone(),
        role: principal.role,
    }))
}
