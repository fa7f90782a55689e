//! REST API endpoint handlers
//!
//! Handlers extract the request, call into the services layer and serialize
//! the result. Every error goes out through `AppError`'s `IntoResponse`.

use crate::api::types::*;
use crate::db::sqlite::models::User;
use crate::error::{AppError, Result};
use crate::services::{
    AccessToken, AccountService, AccountSummary, AuthService, InstitutionService,
};
use crate::state::AppState;
use axum::{
    async_trait,
    extract::{FromRequestParts, Json, Path, Query, State},
    http::{header::AUTHORIZATION, request::Parts},
};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

type ApiState = State<Arc<AppState>>;

// ============================================================================
// Bearer Authentication
// ============================================================================

/// User resolved from the `Authorization: Bearer <token>` header
pub struct AuthUser(pub User);

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Auth("Missing bearer token".to_string()))?;

        AuthService::authenticate(state, token).map(AuthUser)
    }
}

// ============================================================================
// Health & Auth
// ============================================================================

/// GET /health
pub async fn health_check() -> Json<StatusResponse> {
    Json(StatusResponse { status: "ok" })
}

/// POST /register
pub async fn register(
    State(state): ApiState,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<User>> {
    let user = AuthService::register(&state, &request.username, &request.password)?;
    Ok(Json(user))
}

/// POST /login
pub async fn login(
    State(state): ApiState,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AccessToken>> {
    let token = AuthService::login(&state, &request.username, &request.password)?;
    Ok(Json(token))
}

/// POST /logout
pub async fn logout(
    State(state): ApiState,
    AuthUser(user): AuthUser,
) -> Result<Json<MessageResponse>> {
    AuthService::logout(&state, &user)?;
    Ok(Json(MessageResponse::new("Logout successful")))
}

// ============================================================================
// Institutions & Accounts
// ============================================================================

/// GET /banks?page=N
pub async fn list_banks(
    State(state): ApiState,
    AuthUser(user): AuthUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>> {
    info!("User {} listing banks (page {})", user.username, query.page());
    let payload = InstitutionService::list_institutions(&state, query.page()).await?;
    Ok(Json(payload))
}

/// GET /institutions/:institution_id
pub async fn get_institution(
    State(state): ApiState,
    AuthUser(_): AuthUser,
    Path(institution_id): Path<String>,
) -> Result<Json<Value>> {
    let payload = InstitutionService::sync_institution(&state, &institution_id).await?;
    Ok(Json(payload))
}

/// GET /bank/:bank_id/accounts
pub async fn bank_accounts(
    State(state): ApiState,
    AuthUser(user): AuthUser,
    Path(bank_id): Path<String>,
) -> Result<Json<Value>> {
    info!("User {} listing accounts of {}", user.username, bank_id);
    let payload = AccountService::accounts_for_institution(&state, &bank_id).await?;
    Ok(Json(payload))
}

/// GET /account/:account_id/kpis/:bank_name
pub async fn account_kpis(
    State(state): ApiState,
    AuthUser(_): AuthUser,
    Path((account_id, bank_name)): Path<(String, String)>,
) -> Result<Json<AccountSummary>> {
    let summary = AccountService::account_kpis(&state, &account_id, &bank_name).await?;
    Ok(Json(summary))
}
