//! Dev server route handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::db::{AttendanceBody, DbError, MarkBody};
use super::jwt::{create_token, Claims};
use super::middleware::AuthUser;
use super::server::SharedState;
use crate::session::Role;

/// Error response: `{ "message": "..." }` with a status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        let status = match err {
            DbError::NotFound(_) => StatusCode::NOT_FOUND,
            DbError::Conflict(_) | DbError::Invalid(_) => StatusCode::BAD_REQUEST,
            DbError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

// Request types

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
}

// Health check

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

// Auth routes

pub async fn login(
    State(state): State<SharedState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<Value>> {
    let state = state.read().await;
    let account = state.db.authenticate(&req.email, &req.password)?;
    let token = issue_token(&Claims::for_account(&account), &state.jwt_secret)?;

    tracing::info!("{} logged in", account.email);
    Ok(Json(with_token(account.identity(), token)))
}

pub async fn register(
    State(state): State<SharedState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let role = match req.role.as_deref() {
        Some(role) => role
            .parse::<Role>()
            .map_err(|e| ApiError::bad_request(e.to_string()))?,
        None => Role::Student,
    };

    let mut state = state.write().await;
    let account = state.db.register(&req.name, &req.email, &req.password, role)?;
    let token = issue_token(&Claims::for_account(&account), &state.jwt_secret)?;

    tracing::info!("Registered {} as {}", account.email, account.role);
    Ok((
        StatusCode::CREATED,
        Json(with_token(account.identity(), token)),
    ))
}

/// Current identity, enriched with the student profile when there is one
pub async fn my_student_profile(
    State(state): State<SharedState>,
    user: AuthUser,
) -> ApiResult<Json<Value>> {
    let state = state.read().await;
    let account = state
        .db
        .account(user.id())
        .ok_or_else(|| ApiError::unauthorized("Not authorized, account not found"))?;

    let mut body = match account.role {
        Role::Student => state.db.get("students", user.id()).unwrap_or_else(|_| json!({})),
        _ => json!({}),
    };
    if let (Value::Object(body), Value::Object(identity)) = (&mut body, account.identity()) {
        body.extend(identity);
    }
    Ok(Json(body))
}

pub async fn update_my_student_profile(
    State(state): State<SharedState>,
    user: AuthUser,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    if user.role() != Role::Student {
        return Err(ApiError::forbidden("Only students have a student profile"));
    }
    let mut state = state.write().await;
    Ok(Json(state.db.update("students", user.id(), strip_role(body))?))
}

pub async fn my_faculty_profile(
    State(state): State<SharedState>,
    user: AuthUser,
) -> ApiResult<Json<Value>> {
    if user.role() != Role::Faculty {
        return Err(ApiError::forbidden("Only faculty have a faculty profile"));
    }
    let state = state.read().await;
    Ok(Json(state.db.get("faculty", user.id())?))
}

pub async fn update_my_faculty_profile(
    State(state): State<SharedState>,
    user: AuthUser,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    if user.role() != Role::Faculty {
        return Err(ApiError::forbidden("Only faculty have a faculty profile"));
    }
    let mut state = state.write().await;
    Ok(Json(state.db.update("faculty", user.id(), strip_role(body))?))
}

// Generic collections

pub async fn list_records(
    state: SharedState,
    _user: AuthUser,
    collection: &'static str,
) -> ApiResult<Json<Vec<Value>>> {
    let state = state.read().await;
    Ok(Json(state.db.list(collection)?))
}

pub async fn get_record(
    state: SharedState,
    _user: AuthUser,
    collection: &'static str,
    id: String,
) -> ApiResult<Json<Value>> {
    let state = state.read().await;
    Ok(Json(state.db.get(collection, &id)?))
}

pub async fn create_record(
    state: SharedState,
    user: AuthUser,
    collection: &'static str,
    body: Value,
) -> ApiResult<(StatusCode, Json<Value>)> {
    user.require_admin()?;
    let mut state = state.write().await;
    let record = state.db.create(collection, strip_role(body))?;
    tracing::debug!("Created record in {}", collection);
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update_record(
    state: SharedState,
    user: AuthUser,
    collection: &'static str,
    id: String,
    body: Value,
) -> ApiResult<Json<Value>> {
    user.require_admin()?;
    let mut state = state.write().await;
    Ok(Json(state.db.update(collection, &id, strip_role(body))?))
}

pub async fn delete_record(
    state: SharedState,
    user: AuthUser,
    collection: &'static str,
    id: String,
) -> ApiResult<Json<Value>> {
    user.require_admin()?;
    let mut state = state.write().await;
    state.db.delete(collection, &id)?;
    Ok(Json(json!({ "message": "Deleted" })))
}

// Marks and attendance

pub async fn record_mark(
    State(state): State<SharedState>,
    user: AuthUser,
    Json(body): Json<MarkBody>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    user.require_admin()?;
    let mut state = state.write().await;
    Ok((StatusCode::CREATED, Json(state.db.record_mark(body)?)))
}

pub async fn marks_for(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(student_id): Path<String>,
) -> ApiResult<Json<Vec<Value>>> {
    user.require_self_or_staff(&student_id)?;
    let state = state.read().await;
    Ok(Json(state.db.marks_for(&student_id)))
}

pub async fn record_attendance(
    State(state): State<SharedState>,
    user: AuthUser,
    Json(body): Json<AttendanceBody>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    user.require_admin()?;
    let mut state = state.write().await;
    Ok((StatusCode::CREATED, Json(state.db.record_attendance(body)?)))
}

pub async fn attendance_for(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(student_id): Path<String>,
) -> ApiResult<Json<Vec<Value>>> {
    user.require_self_or_staff(&student_id)?;
    let state = state.read().await;
    Ok(Json(state.db.attendance_for(&student_id)))
}

fn issue_token(claims: &Claims, secret: &str) -> ApiResult<String> {
    create_token(claims, secret).map_err(|e| {
        tracing::error!("Failed to sign token: {}", e);
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Could not issue token")
    })
}

fn with_token(mut identity: Value, token: String) -> Value {
    if let Value::Object(map) = &mut identity {
        map.insert("token".to_string(), Value::String(token));
    }
    identity
}

/// Roles are fixed at account creation
fn strip_role(mut body: Value) -> Value {
    if let Value::Object(map) = &mut body {
        map.remove("role");
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_errors_map_to_statuses() {
        assert_eq!(
            ApiError::from(DbError::NotFound("x".into())).status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(DbError::Conflict("x".into())).status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(DbError::Unauthorized("x".into())).status,
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_with_token_adds_field() {
        let body = with_token(json!({"_id": "u1"}), "tok".to_string());
        assert_eq!(body["token"], "tok");
        assert_eq!(body["_id"], "u1");
    }

    #[test]
    fn test_strip_role() {
        let body = strip_role(json!({"name": "Ann", "role": "ADMIN"}));
        assert!(body.get("role").is_none());
        assert_eq!(body["name"], "Ann");
    }
}
