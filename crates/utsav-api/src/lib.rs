pub mod auth;
pub mod checkin;
pub mod error;
pub mod events;
pub mod extract;
pub mod middleware;
pub mod profile;
pub mod registrations;
pub mod volunteers;

use std::sync::Arc;

use axum::{
    Json, Router,
    routing::{delete, get, post, put},
};
use chrono::{FixedOffset, Offset, Utc};
use tracing::error;

use utsav_db::Database;

pub use error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    /// Lowercased emails that receive the admin role when they sign up.
    pub admin_emails: Vec<String>,
    /// Zone used when telling an operator when a ticket was already scanned.
    pub display_offset: FixedOffset,
}

impl AppStateInner {
    pub fn new(db: Database, jwt_secret: impl Into<String>) -> Self {
        Self {
            db,
            jwt_secret: jwt_secret.into(),
            admin_emails: Vec::new(),
            display_offset: Utc.fix(),
        }
    }
}

/// Full HTTP surface: public browsing and signup, authenticated user actions,
/// and admin management including ticket check-in.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/events", get(events::list_events))
        .route("/events/{id}", get(events::get_event))
        .route("/api/volunteer", post(volunteers::apply));

    let protected_routes = Router::new()
        .route("/api/profile", get(profile::get_profile).patch(profile::update_profile))
        .route("/events/{id}/register", post(registrations::register_for_event))
        .route("/registrations", get(registrations::my_registrations))
        .route("/registrations/{id}", get(registrations::get_ticket))
        .route("/api/registrations/revoke", delete(registrations::revoke_registration))
        .route("/api/checkin", post(checkin::check_in))
        .route("/admin/events", post(events::create_event))
        .route("/admin/events/{id}", put(events::update_event).delete(events::delete_event))
        .route("/admin/events/{id}/registrations", get(events::list_event_registrations))
        .route("/api/volunteers", get(volunteers::list_volunteers))
        .route("/api/volunteers/approve", post(volunteers::approve))
        .route("/api/volunteers/reject", post(volunteers::reject))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Runs a blocking store call off the async runtime.
pub(crate) async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed: {}", e))
        })?
        .map_err(ApiError::from)
}
