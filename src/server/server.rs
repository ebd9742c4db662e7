//! Development server implementing the portal REST API in memory

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::db::{Db, COLLECTIONS};
use super::middleware::AuthUser;
use super::routes;
use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::session::Role;

/// Application state shared across handlers
pub struct AppState {
    pub db: Db,
    pub jwt_secret: String,
}

pub type SharedState = Arc<RwLock<AppState>>;

/// Bind to the configured address and serve until the process exits
pub async fn run_server(config: &ServerConfig) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("Dev server listening on http://{}/api", addr);

    serve(listener, config).await
}

/// Serve on an already-bound listener
pub async fn serve(listener: TcpListener, config: &ServerConfig) -> Result<()> {
    let state = build_state(config)?;
    axum::serve(listener, create_router(state)).await?;
    Ok(())
}

pub fn build_state(config: &ServerConfig) -> Result<SharedState> {
    let mut db = Db::new();

    if let Some(seed) = &config.seed_admin {
        db.register(&seed.name, &seed.email, &seed.password, Role::Admin)
            .map_err(|e| Error::Config(format!("Cannot seed admin account: {}", e)))?;
        tracing::info!("Seeded admin account {}", seed.email);
    }

    Ok(Arc::new(RwLock::new(AppState {
        db,
        jwt_secret: config.jwt_secret.clone(),
    })))
}

/// Create the router with all routes, mounted under `/api`
pub fn create_router(state: SharedState) -> Router {
    let mut api = Router::new()
        .route("/health", get(routes::health))
        .route("/auth/login", post(routes::login))
        .route("/auth/register", post(routes::register))
        .route(
            "/students/me",
            get(routes::my_student_profile).put(routes::update_my_student_profile),
        )
        .route(
            "/faculty/me",
            get(routes::my_faculty_profile).put(routes::update_my_faculty_profile),
        )
        .route("/marks", post(routes::record_mark))
        .route("/marks/{student_id}", get(routes::marks_for))
        .route("/attendance/upload", post(routes::record_attendance))
        .route("/attendance/{student_id}", get(routes::attendance_for));

    for name in COLLECTIONS.iter().copied() {
        api = collection_routes(api, name);
    }

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET/POST `/<name>` and GET/PUT/DELETE `/<name>/{id}`
fn collection_routes(router: Router<SharedState>, name: &'static str) -> Router<SharedState> {
    use axum::extract::{Path, State};

    router
        .route(
            &format!("/{}", name),
            get(move |State(state): State<SharedState>, user: AuthUser| {
                routes::list_records(state, user, name)
            })
            .post(
                move |State(state): State<SharedState>, user: AuthUser, Json(body): Json<Value>| {
                    routes::create_record(state, user, name, body)
                },
            ),
        )
        .route(
            &format!("/{}/{{id}}", name),
            get(
                move |State(state): State<SharedState>, user: AuthUser, Path(id): Path<String>| {
                    routes::get_record(state, user, name, id)
                },
            )
            .put(
                move |State(state): State<SharedState>,
                      user: AuthUser,
                      Path(id): Path<String>,
                      Json(body): Json<Value>| {
                    routes::update_record(state, user, name, id, body)
                },
            )
            .delete(
                move |State(state): State<SharedState>, user: AuthUser, Path(id): Path<String>| {
                    routes::delete_record(state, user, name, id)
                },
            ),
        )
}
