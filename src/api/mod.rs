use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use time;

use crate::config::Config;
use crate::db::Store;
use crate::services::Mailer;
use crate::state::SharedState;

mod activities;
mod admin;
pub mod auth;
mod error;
mod pages;
pub mod pagination;
mod password;
mod settings;
mod signup;
mod types;
mod validation;

pub use error::{ApiError, codes};
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.shared.store
    }

    #[must_use]
    pub fn mailer(&self) -> &Mailer {
        &self.shared.mailer
    }
}

pub fn create_app_state(shared: Arc<SharedState>) -> Arc<AppState> {
    Arc::new(AppState { shared })
}

pub async fn create_app_state_from_config(config: Config) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared))
}

/// GET /heartbeat liveness probe
async fn heartbeat() -> &'static str {
    "beat"
}

pub fn router(state: Arc<AppState>) -> Router {
    let (cors_origins, session_minutes) = (
        state.config().server.cors_allowed_origins.clone(),
        state.config().server.session_minutes,
    );

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(session_minutes)));

    let page_routes = Router::new()
        .route("/", get(pages::index))
        .route("/heartbeat", get(heartbeat))
        .route("/login", get(pages::login_page))
        .route("/login", post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/signup", get(signup::signup_page))
        .route("/signup", post(signup::signup))
        .route("/activate", get(signup::activate_page))
        .route("/activate/{code}", get(signup::activate_page))
        .route("/activate", post(signup::activate))
        .route("/forgot", get(pages::forgot_page))
        .route("/forgot", post(password::forgot))
        .route("/reset", get(pages::reset_page))
        .route("/reset/{code}", get(pages::reset_page))
        .route("/reset", post(password::reset))
        .route("/sheet", get(pages::sheet))
        .route("/activities", get(pages::activities))
        .route("/admin", get(pages::admin_general))
        .route("/admin/users", get(pages::admin_users))
        .route("/admin/new-user", get(pages::admin_new_user))
        .route("/admin/statistics", get(pages::admin_statistics));

    let activity_api = Router::new()
        .route("/api/activities", get(activities::list_activities))
        .route("/api/activities", post(activities::create_activity))
        .route("/api/activities/{id}", put(activities::update_activity))
        .route("/api/activities/{id}", delete(activities::delete_activity))
        .route_layer(middleware::from_fn(auth::require_user));

    let admin_api = Router::new()
        .route("/api/admin/users", get(admin::list_users))
        .route("/api/admin/users", post(admin::create_user))
        .route("/api/admin/users/{username}/enable", post(admin::enable_user))
        .route("/api/admin/users/{username}/disable", post(admin::disable_user))
        .route("/api/admin/users/{username}/delete", post(admin::delete_user))
        .route("/api/admin/statistics", get(admin::statistics))
        .route("/api/admin/settings/{key}", get(settings::get_setting))
        .route("/api/admin/settings/{key}", post(settings::put_setting))
        .route_layer(middleware::from_fn(auth::require_admin));

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .merge(page_routes)
        .merge(activity_api)
        .merge(admin_api)
        .fallback(pages::serve_asset)
        .layer(session_layer)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
