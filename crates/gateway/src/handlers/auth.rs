//! Signup and login handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use newsroom_common::{
    auth::{hash_password, verify_password, MIN_PASSWORD_LEN},
    db::models::User,
    errors::{AppError, Result},
};

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(email)]
    pub email: String,

    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token plus the authenticated profile
#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Register a new account with the configured signup role
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    request.validate()?;
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(
            "password",
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }

    let password_hash = hash_password(&request.password)?;
    let user = state
        .repo
        .create_user(
            request.name.trim().to_string(),
            request.email.trim().to_lowercase(),
            password_hash,
            state.config.auth.signup_role(),
            None,
        )
        .await?;

    let token = state.jwt.generate_token(&user)?;
    tracing::info!(user_id = user.id, role = %user.role, "User registered");

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let email = request.email.trim().to_lowercase();
    let user = state
        .repo
        .find_user_by_email(&email)
        .await?
        .filter(|user| verify_password(&request.password, &user.password_hash))
        .ok_or(AppError::InvalidCredentials)?;

    let token = state.jwt.generate_token(&user)?;
    tracing::info!(user_id = user.id, role = %user.role, "User logged in");

    Ok(Json(AuthResponse { token, user }))
}
