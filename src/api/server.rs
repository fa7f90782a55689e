//! HTTP server for the REST API

use crate::api::handlers;
use crate::error::{AppError, Result};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// REST API server
pub struct ApiServer;

impl ApiServer {
    /// Build the router with all routes
    pub fn router(state: Arc<AppState>) -> Router {
        Router::new()
            // ================================================================
            // Health check
            // ================================================================
            .route("/health", get(handlers::health_check))

            // ================================================================
            // Users
            // ================================================================
            .route("/register", post(handlers::register))
            .route("/login", post(handlers::login))
            .route("/logout", post(handlers::logout))

            // ================================================================
            // Institutions, accounts, KPIs (bearer token required)
            // ================================================================
            .route("/banks", get(handlers::list_banks))
            .route("/institutions/:institution_id", get(handlers::get_institution))
            .route("/bank/:bank_id/accounts", get(handlers::bank_accounts))
            .route(
                "/account/:account_id/kpis/:bank_name",
                get(handlers::account_kpis),
            )

            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Serve until `shutdown` resolves
    pub async fn serve<F>(state: Arc<AppState>, addr: SocketAddr, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = Self::router(state);

        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            AppError::Config(format!("Failed to bind to {}: {}", addr, e))
        })?;

        info!("Open-banking gateway listening on http://{}", addr);
        info!("  GET  /health");
        info!("  POST /register, /login, /logout");
        info!("  GET  /banks?page=N, /institutions/{{id}}");
        info!("  GET  /bank/{{bank_id}}/accounts");
        info!("  GET  /account/{{account_id}}/kpis/{{bank_name}}");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("API server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::mock::MockAggregator;
    use crate::db::sqlite::models::InstitutionRecord;
    use crate::state::testing::test_state;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(mock: MockAggregator) -> (Router, Arc<AppState>) {
        let state = Arc::new(test_state(Arc::new(mock)));
        (ApiServer::router(state.clone()), state)
    }

    async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_with_token(uri: &str, token: &str) -> Request<Body> {
        Request::get(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    }

    async fn login(app: &Router) -> String {
        let creds = json!({"username": "alice", "password": "password123"});
        let (status, _) = call(app, post_json("/register", creds.clone())).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(app, post_json("/login", creds)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "bearer");
        body["access_token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app(MockAggregator::new());
        let request = Request::get("/health").body(Body::empty()).unwrap();

        let (status, body) = call(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_register_duplicate_is_bad_request() {
        let (app, _) = app(MockAggregator::new());
        let creds = json!({"username": "bob", "password": "password123"});

        let (status, body) = call(&app, post_json("/register", creds.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "bob");

        let (status, body) = call(&app, post_json("/register", creds)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Username already registered");
    }

    #[tokio::test]
    async fn test_protected_routes_need_token() {
        let (app, _) = app(MockAggregator::new());

        let request = Request::get("/banks").body(Body::empty()).unwrap();
        let (status, _) = call(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(&app, get_with_token("/banks", "not-a-token")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_banks_pass_payload_through() {
        let payload = json!({"count": 1, "results": [{"id": "inst-1", "name": "erebor_mx_retail"}]});
        let (app, state) = app(MockAggregator::new().with_institutions(payload.clone()));
        let token = login(&app).await;

        let (status, body) = call(&app, get_with_token("/banks?page=2", &token)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, payload);
        assert!(state
            .sqlite
            .get_institution_by_name("erebor_mx_retail")
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_upstream_status_and_body_are_forwarded() {
        let mock = MockAggregator::new()
            .with_link_error(400, json!([{"code": "invalid", "message": "bad credentials"}]));
        let (app, state) = app(mock);
        state
            .sqlite
            .upsert_institutions(&[InstitutionRecord {
                id: "inst-1".into(),
                name: "erebor_mx_retail".into(),
                ..Default::default()
            }])
            .unwrap();
        let token = login(&app).await;

        let (status, body) =
            call(&app, get_with_token("/bank/erebor_mx_retail/accounts", &token)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!([{"code": "invalid", "message": "bad credentials"}]));
    }

    #[tokio::test]
    async fn test_kpis_for_unlinked_bank_is_not_found() {
        let (app, _) = app(MockAggregator::new());
        let token = login(&app).await;

        let (status, body) =
            call(&app, get_with_token("/account/acc-1/kpis/erebor_mx_retail", &token)).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_logout_revokes_token() {
        let (app, _) = app(MockAggregator::new());
        let token = login(&app).await;

        let request = Request::post("/logout")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Logout successful");

        let (status, _) = call(&app, get_with_token("/banks", &token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
