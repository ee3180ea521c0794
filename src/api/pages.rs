use axum::{
    body::Body,
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Redirect, Response},
};
use rust_embed::RustEmbed;
use tower_sessions::Session;

use super::auth;
use crate::db::UserRole;

#[derive(RustEmbed)]
#[folder = "web"]
struct Asset;

/// Serve one embedded page by name
pub(super) fn page(path: &str) -> Response {
    match Asset::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            (
                [(header::CONTENT_TYPE, mime.as_ref())],
                Body::from(content.data),
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
    }
}

/// An app page only a logged-in user should see; everyone else lands on
/// the login form
async fn app_page(session: &Session, name: &str) -> Response {
    match auth::current_user(session).await {
        Ok(_) => page(name),
        Err(_) => Redirect::to("/login").into_response(),
    }
}

/// An admin page. Anonymous visitors go to the login form; logged-in
/// non-admins see nothing but 404.
async fn admin_page(session: &Session, name: &str) -> Response {
    match auth::current_user(session).await {
        Ok(user) if user.role == UserRole::Administrator => page(name),
        Ok(_) => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
        Err(_) => Redirect::to("/login").into_response(),
    }
}

pub async fn index() -> Response {
    page("index.html")
}

pub async fn login_page() -> Response {
    page("login.html")
}

pub async fn forgot_page() -> Response {
    page("forgot.html")
}

/// GET /reset and /reset/{code}; the page reads the code from the URL
pub async fn reset_page() -> Response {
    page("reset.html")
}

pub async fn sheet(session: Session) -> Response {
    app_page(&session, "sheet.html").await
}

pub async fn activities(session: Session) -> Response {
    app_page(&session, "activities.html").await
}

pub async fn admin_general(session: Session) -> Response {
    admin_page(&session, "admin/general.html").await
}

pub async fn admin_users(session: Session) -> Response {
    admin_page(&session, "admin/users.html").await
}

pub async fn admin_new_user(session: Session) -> Response {
    admin_page(&session, "admin/new-user.html").await
}

pub async fn admin_statistics(session: Session) -> Response {
    admin_page(&session, "admin/statistics.html").await
}

/// Fallback for shared static assets (stylesheet, scripts)
pub async fn serve_asset(uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');
    page(path)
}
