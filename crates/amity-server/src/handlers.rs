//! HTTP request handlers for the relationship API.
//!
//! Each handler validates its body, resolves emails to user ids, and makes
//! one engine call. Every failure is rendered as
//! `{ "success": false, "message": ... }`.

use crate::mentions::{extract_mentions, is_valid_email};
use amity_domain::{EdgeStore, UserDirectory, UserId};
use amity_engine::{RelationshipEngine, RelationshipError};
use amity_store::SqliteStore;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Engine over the shared store connection
    pub engine: Arc<Mutex<RelationshipEngine<SqliteStore>>>,
}

impl AppState {
    /// Wrap an engine for sharing across requests
    pub fn new(engine: RelationshipEngine<SqliteStore>) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
        }
    }
}

/// Body carrying a single email
#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    /// User email
    pub email: String,
}

/// Body naming two users
#[derive(Debug, Deserialize)]
pub struct FriendsRequest {
    /// Exactly two emails
    pub friends: Vec<String>,
}

/// Body for one-way actions
#[derive(Debug, Deserialize)]
pub struct UserActionRequest {
    /// Acting user
    pub requestor: String,
    /// User acted upon
    pub target: String,
}

/// Body for recipient resolution
#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    /// Author of the update
    pub sender: String,
    /// Update text, may mention other users by email
    pub text: String,
}

/// Plain success response
#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    /// Always true
    pub success: bool,
}

/// Friend list response
#[derive(Debug, Serialize, Deserialize)]
pub struct FriendsResponse {
    /// Always true
    pub success: bool,
    /// Friend emails
    pub friends: Vec<String>,
    /// Number of friends
    pub count: usize,
}

/// Update recipients response
#[derive(Debug, Serialize, Deserialize)]
pub struct RecipientsResponse {
    /// Always true
    pub success: bool,
    /// Emails that receive the update
    pub recipients: Vec<String>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Overall health status
    pub status: String,
    /// Number of registered users
    pub users: usize,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,
    /// What went wrong
    pub message: String,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Malformed body or invalid field
    InvalidRequest,
    /// Email not registered
    UnknownEmail(String),
    /// Rejected or failed engine call
    Relationship(RelationshipError),
    /// Internal server error
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InvalidRequest => (
                StatusCode::BAD_REQUEST,
                "Invalid request: incorrect info".to_string(),
            ),
            AppError::UnknownEmail(email) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid request: User {} is not found", email),
            ),
            AppError::Relationship(e) if e.is_conflict() => {
                (StatusCode::BAD_REQUEST, format!("Invalid request: {}", e))
            }
            AppError::Relationship(e) => internal(e.to_string()),
            AppError::InternalError(msg) => internal(msg),
        };

        let body = Json(ErrorResponse {
            success: false,
            message,
        });
        (status, body).into_response()
    }
}

fn internal(detail: String) -> (StatusCode, String) {
    error!("Request failed: {}", detail);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Oops! There is an error, please try again.".to_string(),
    )
}

impl From<RelationshipError> for AppError {
    fn from(e: RelationshipError) -> Self {
        AppError::Relationship(e)
    }
}

impl From<JsonRejection> for AppError {
    fn from(_: JsonRejection) -> Self {
        AppError::InvalidRequest
    }
}

type Engine = RelationshipEngine<SqliteStore>;

/// Run `f` with exclusive access to the engine on the blocking pool
///
/// Store calls can sit in SQLite's busy timeout, and waiting for the
/// engine lock blocks too; neither may happen on a runtime worker.
async fn with_engine<T, F>(state: &AppState, f: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&mut Engine) -> Result<T, AppError> + Send + 'static,
{
    let engine = Arc::clone(&state.engine);
    tokio::task::spawn_blocking(move || {
        let mut engine = engine
            .lock()
            .map_err(|_| AppError::InternalError("engine lock poisoned".to_string()))?;
        f(&mut *engine)
    })
    .await
    .map_err(|e| AppError::InternalError(format!("engine task failed: {}", e)))?
}

fn resolve(engine: &Engine, email: &str) -> Result<UserId, AppError> {
    engine
        .store()
        .resolve_id(email)
        .map_err(|e| AppError::InternalError(e.to_string()))?
        .ok_or_else(|| AppError::UnknownEmail(email.to_string()))
}

/// Two valid, distinct emails
fn validate_pair(first: &str, second: &str) -> Result<(), AppError> {
    if !is_valid_email(first) || !is_valid_email(second) || first == second {
        return Err(AppError::InvalidRequest);
    }
    Ok(())
}

fn pair_from(request: FriendsRequest) -> Result<(String, String), AppError> {
    match <[String; 2]>::try_from(request.friends) {
        Ok([first, second]) => {
            validate_pair(&first, &second)?;
            Ok((first, second))
        }
        Err(_) => Err(AppError::InvalidRequest),
    }
}

fn success() -> Json<SuccessResponse> {
    Json(SuccessResponse { success: true })
}

fn friends_response(friends: Vec<String>) -> Json<FriendsResponse> {
    Json(FriendsResponse {
        success: true,
        count: friends.len(),
        friends,
    })
}

/// GET /health - Liveness and user count
async fn health_check(State(state): State<AppState>) -> Result<Json<HealthCheckResponse>, AppError> {
    let users = with_engine(&state, |engine| Ok(engine.all_users()?.len())).await?;

    Ok(Json(HealthCheckResponse {
        status: "healthy".to_string(),
        users,
    }))
}

/// GET /api/users - All registered emails
async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    let users = with_engine(&state, |engine| Ok(engine.all_users()?)).await?;
    Ok(Json(users))
}

/// POST /api/users - Register a user
async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<EmailRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, AppError> {
    let Json(request) = payload?;
    if !is_valid_email(&request.email) {
        return Err(AppError::InvalidRequest);
    }

    with_engine(&state, move |engine| Ok(engine.register_user(&request.email)?)).await?;
    Ok(success())
}

/// POST /api/friends/add - Connect two users
async fn add_friend(
    State(state): State<AppState>,
    payload: Result<Json<FriendsRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, AppError> {
    let Json(request) = payload?;
    let (first, second) = pair_from(request)?;

    with_engine(&state, move |engine| {
        let requester = resolve(engine, &first)?;
        let target = resolve(engine, &second)?;
        engine.create_connection(requester, target)?;
        info!("{} and {} are now friends", first, second);
        Ok(())
    })
    .await?;

    Ok(success())
}

/// POST /api/friends - Friend list of one user
async fn friend_list(
    State(state): State<AppState>,
    payload: Result<Json<EmailRequest>, JsonRejection>,
) -> Result<Json<FriendsResponse>, AppError> {
    let Json(request) = payload?;
    if !is_valid_email(&request.email) {
        return Err(AppError::InvalidRequest);
    }

    let friends = with_engine(&state, move |engine| {
        let user = resolve(engine, &request.email)?;
        Ok(engine.friend_list(user)?)
    })
    .await?;

    Ok(friends_response(friends))
}

/// POST /api/friends/common-friends - Friends shared by two users
async fn common_friends(
    State(state): State<AppState>,
    payload: Result<Json<FriendsRequest>, JsonRejection>,
) -> Result<Json<FriendsResponse>, AppError> {
    let Json(request) = payload?;
    let (first, second) = pair_from(request)?;

    let friends = with_engine(&state, move |engine| {
        let a = resolve(engine, &first)?;
        let b = resolve(engine, &second)?;
        Ok(engine.common_friends(a, b)?)
    })
    .await?;

    Ok(friends_response(friends))
}

/// POST /api/friends/subscribe - Follow another user's updates
async fn subscribe(
    State(state): State<AppState>,
    payload: Result<Json<UserActionRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, AppError> {
    let Json(request) = payload?;
    validate_pair(&request.requestor, &request.target)?;

    with_engine(&state, move |engine| {
        let requester = resolve(engine, &request.requestor)?;
        let target = resolve(engine, &request.target)?;
        engine.create_subscription(requester, target)?;
        Ok(())
    })
    .await?;

    Ok(success())
}

/// POST /api/friends/block - Block another user
async fn block(
    State(state): State<AppState>,
    payload: Result<Json<UserActionRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, AppError> {
    let Json(request) = payload?;
    validate_pair(&request.requestor, &request.target)?;

    with_engine(&state, move |engine| {
        let requester = resolve(engine, &request.requestor)?;
        let target = resolve(engine, &request.target)?;
        engine.create_block(requester, target)?;
        info!("{} blocked {}", request.requestor, request.target);
        Ok(())
    })
    .await?;

    Ok(success())
}

/// POST /api/friends/receive-updates - Who receives an update
async fn receive_updates(
    State(state): State<AppState>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<RecipientsResponse>, AppError> {
    let Json(request) = payload?;
    if !is_valid_email(&request.sender) || request.text.is_empty() {
        return Err(AppError::InvalidRequest);
    }

    let mentions: Vec<String> = extract_mentions(&request.text)
        .into_iter()
        .filter(|email| *email != request.sender)
        .collect();

    let recipients = with_engine(&state, move |engine| {
        let sender = resolve(engine, &request.sender)?;
        let mentioned = engine
            .store()
            .users_with_emails(&mentions)
            .map_err(|e| AppError::InternalError(e.to_string()))?;
        Ok(engine.broadcast_recipients(sender, &mentioned)?)
    })
    .await?;

    Ok(Json(RecipientsResponse {
        success: true,
        recipients,
    }))
}

/// Create the axum router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/friends", post(friend_list))
        .route("/api/friends/add", post(add_friend))
        .route("/api/friends/common-friends", post(common_friends))
        .route("/api/friends/subscribe", post(subscribe))
        // Path spelled as earlier clients of this API send it
        .route("/api/friends/subcribe", post(subscribe))
        .route("/api/friends/block", post(block))
        .route("/api/friends/receive-updates", post(receive_updates))
        .with_state(state)
}
