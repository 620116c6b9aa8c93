use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{AuthData, LoginRequest, ProfileData, SignupRequest},
        jwt::AuthUser,
        services,
    },
    error::AppError,
    response::ApiResponse,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/profile", get(profile))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload.map(|Json(v)| v).map_err(|e| {
        warn!(error = %e, "rejected request body");
        AppError::validation("Invalid request body", vec![e.body_text()])
    })
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<AuthData>>), AppError> {
    let data = services::signup(state.users.as_ref(), &state.keys, body(payload)?).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(data).with_message("User registered successfully")),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<AuthData>>, AppError> {
    let data = services::login(state.users.as_ref(), &state.keys, body(payload)?).await?;
    Ok(Json(ApiResponse::ok(data).with_message("Login successful")))
}

#[instrument(skip(state))]
pub async fn profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ApiResponse<ProfileData>>, AppError> {
    let user = services::profile(state.users.as_ref(), user_id).await?;
    Ok(Json(ApiResponse::ok(ProfileData { user })))
}
