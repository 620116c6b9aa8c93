use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    http::HeaderMap,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::warn;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub success: bool,
    pub message: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub environment: &'static str,
    pub database: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityResponse {
    pub success: bool,
    pub message: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
}

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/test", get(connectivity))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.users.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            warn!(error = %e, "user store ping failed");
            "disconnected"
        }
    };
    Json(HealthResponse {
        success: true,
        message: "Smart Herbal Sprinkler API is running",
        timestamp: OffsetDateTime::now_utc(),
        environment: state.config.environment.as_str(),
        database,
    })
}

/// Lets the mobile client confirm it can reach the API.
pub async fn connectivity(
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Json<ConnectivityResponse> {
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    Json(ConnectivityResponse {
        success: true,
        message: "API connection successful!",
        timestamp: OffsetDateTime::now_utc(),
        user_agent,
        ip: peer.map(|ConnectInfo(addr)| addr.ip().to_string()),
    })
}
