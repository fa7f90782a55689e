//! Auth Service
//!
//! Username/password accounts and opaque bearer sessions.

use crate::config::session_expiry;
use crate::db::sqlite::models::User;
use crate::error::{AppError, Result};
use crate::security::{generate_token, token_digest};
use crate::state::AppState;
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

const MIN_PASSWORD_LEN: usize = 8;

/// Issued bearer token
#[derive(Debug, Clone, Serialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: &'static str,
}

/// Auth service for business logic
pub struct AuthService;

impl AuthService {
    /// Create a user account
    pub fn register(state: &AppState, username: &str, password: &str) -> Result<User> {
        let username = username.trim();
        info!("Registration attempt for user: {}", username);

        if username.is_empty() {
            return Err(AppError::Validation("Username is required".to_string()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let user = state.sqlite.create_user(username, password, &state.security)?;
        info!("User {} registered", user.username);

        Ok(user)
    }

    /// Verify credentials and open a session
    pub fn login(state: &AppState, username: &str, password: &str) -> Result<AccessToken> {
        info!("Login attempt for user: {}", username);

        let user = state
            .sqlite
            .verify_user(username.trim(), password, &state.security)?
            .ok_or_else(|| {
                warn!("Failed login for user: {}", username);
                AppError::Auth("Invalid username or password".to_string())
            })?;

        let token = generate_token();
        let now = Utc::now();
        let expires_at = session_expiry(now, state.config.access_token_expire_minutes)
            .ok_or_else(|| {
                AppError::Config(format!(
                    "Invalid ACCESS_TOKEN_EXPIRE_MINUTES: {}",
                    state.config.access_token_expire_minutes
                ))
            })?;

        state.sqlite.create_session(
            &token_digest(&token),
            user.id,
            expires_at.timestamp(),
            now.timestamp(),
        )?;

        info!("User {} logged in successfully", user.username);

        Ok(AccessToken {
            access_token: token,
            token_type: "bearer",
        })
    }

    /// Resolve a bearer token to its user
    pub fn authenticate(state: &AppState, token: &str) -> Result<User> {
        state
            .sqlite
            .get_session_user(&token_digest(token), Utc::now().timestamp())?
            .ok_or_else(|| AppError::Auth("Invalid or expired token".to_string()))
    }

    /// Close every session of the user
    pub fn logout(state: &AppState, user: &User) -> Result<()> {
        let removed = state.sqlite.delete_user_sessions(user.id)?;
        info!("User {} logged out ({} sessions closed)", user.username, removed);
        Ok(())
    }
}
