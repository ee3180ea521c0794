use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use quarterd::api::codes;
use quarterd::config::Config;
use tower::ServiceExt;

/// Credentials seeded by the initial migration
const ADMIN_USER: &str = "admin";
const ADMIN_PASSWORD: &str = "quarter";

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();

    let state = quarterd::api::create_app_state_from_config(config)
        .await
        .expect("Failed to create app state");
    quarterd::api::router(state)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).expect("response body is JSON")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_with_session(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, payload: &serde_json::Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(serde_json::to_string(payload).unwrap()))
        .unwrap()
}

/// Log in and return the session cookie
async fn login(app: &Router, username: &str, password: &str) -> String {
    let response = app
        .clone()
        .oneshot(post_json(
            "/login",
            &serde_json::json!({ "username": username, "password": password }),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK, "login should succeed");

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("login sets a session cookie")
        .to_str()
        .unwrap();
    cookie.split(';').next().unwrap().to_string()
}

/// Create an active normal user through the admin API and return its name
async fn create_normal_user(app: &Router, admin_cookie: &str, username: &str) {
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/admin/users",
            &serde_json::json!({
                "username": username,
                "password": "secret",
                "verify_password": "secret",
            }),
            Some(admin_cookie),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_heartbeat() {
    let app = spawn_app().await;

    let response = app.oneshot(get("/heartbeat")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"beat");
}

#[tokio::test]
async fn test_unauthenticated_api_access() {
    let app = spawn_app().await;

    let response = app.clone().oneshot(get("/api/activities")).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], codes::NOT_AUTHENTICATED);
    assert_eq!(body["message"], "Not logged in");

    // Garbage cookie reads the same as no cookie
    let response = app
        .oneshot(get_with_session("/api/activities", "id=not-a-session"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_round_trip() {
    let app = spawn_app().await;

    // Wrong password is rejected and never authenticates
    let response = app
        .clone()
        .oneshot(post_json(
            "/login",
            &serde_json::json!({ "username": ADMIN_USER, "password": "wrong" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], codes::INVALID_CREDENTIALS);

    // A good login authenticates subsequent requests
    let cookie = login(&app, ADMIN_USER, ADMIN_PASSWORD).await;

    let response = app
        .clone()
        .oneshot(get_with_session("/api/activities", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Logout kills the session
    let response = app
        .clone()
        .oneshot(get_with_session("/logout", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = app
        .oneshot(get_with_session("/api/activities", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_validation() {
    let app = spawn_app().await;

    let response = app
        .oneshot(post_json(
            "/login",
            &serde_json::json!({ "username": "", "password": "x" }),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], codes::NO_USERNAME);
}

#[tokio::test]
async fn test_activity_creation_collects_all_errors() {
    let app = spawn_app().await;
    let cookie = login(&app, ADMIN_USER, ADMIN_PASSWORD).await;

    let response = app
        .oneshot(post_json(
            "/api/activities",
            &serde_json::json!({ "title": "", "color": "zzzzzz" }),
            Some(&cookie),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    let errors = body["errors"].as_array().expect("multi-error response");
    let codes_seen: Vec<u64> = errors.iter().map(|e| e["error"].as_u64().unwrap()).collect();
    assert!(codes_seen.contains(&u64::from(codes::NO_ACTIVITY_TITLE)));
    assert!(codes_seen.contains(&u64::from(codes::INVALID_COLOR_HEX)));
}

#[tokio::test]
async fn test_activity_create_and_list() {
    let app = spawn_app().await;
    let cookie = login(&app, ADMIN_USER, ADMIN_PASSWORD).await;

    // No activities yet is an empty list, not an error
    let response = app
        .clone()
        .oneshot(get_with_session("/api/activities", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["activities"].as_array().unwrap().len(), 0);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/activities",
            &serde_json::json!({ "title": "Reading", "color": "#1a2b3c" }),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["error"], codes::SUCCESS);
    assert_eq!(body["message"], "Ok");

    let response = app
        .oneshot(get_with_session("/api/activities", &cookie))
        .await
        .unwrap();
    let body = body_json(response).await;
    let activities = body["activities"].as_array().unwrap();
    assert_eq!(activities.len(), 1);
    assert_eq!(activities[0]["title"], "Reading");
    assert_eq!(activities[0]["color"], "#1a2b3c");
}

#[tokio::test]
async fn test_activity_update_and_delete_are_not_supported() {
    let app = spawn_app().await;
    let cookie = login(&app, ADMIN_USER, ADMIN_PASSWORD).await;

    let request = Request::builder()
        .method("PUT")
        .uri("/api/activities/1")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::COOKIE, &cookie)
        .body(Body::from("{}"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    let body = body_json(response).await;
    assert_eq!(body["error"], codes::NOT_SUPPORTED);

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/activities/1")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn test_signup_flag_gates_the_flow() {
    let app = spawn_app().await;
    let cookie = login(&app, ADMIN_USER, ADMIN_PASSWORD).await;

    // Seeded on: the form renders
    let response = app.clone().oneshot(get("/signup")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Switch the flag off
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/admin/settings/allow-signups",
            &serde_json::json!({ "value": "0" }),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get("/signup")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(post_json(
            "/signup",
            &serde_json::json!({ "username": "new@example.com" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // And back on
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/admin/settings/allow-signups",
            &serde_json::json!({ "value": "1" }),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/signup")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_signup_creates_a_pending_user() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/signup",
            &serde_json::json!({ "username": "pending@example.com" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Signing up twice with the same address is rejected
    let response = app
        .clone()
        .oneshot(post_json(
            "/signup",
            &serde_json::json!({ "username": "pending@example.com" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], codes::USERNAME_TAKEN);

    // The pending account cannot log in yet
    let response = app
        .clone()
        .oneshot(post_json(
            "/login",
            &serde_json::json!({ "username": "pending@example.com", "password": "" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(post_json(
            "/login",
            &serde_json::json!({ "username": "pending@example.com", "password": "guess" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], codes::USER_NOT_ACTIVATED);

    // It shows up in the statistics
    let cookie = login(&app, ADMIN_USER, ADMIN_PASSWORD).await;
    let response = app
        .oneshot(get_with_session("/api/admin/statistics", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["users"], 2);
    assert_eq!(body["signups"], 1);
}

#[tokio::test]
async fn test_activation_validation() {
    let app = spawn_app().await;

    // No code
    let response = app
        .clone()
        .oneshot(post_json(
            "/activate",
            &serde_json::json!({ "code": "", "password": "a", "verify_password": "a" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], codes::INVALID_CODE);

    // Mismatched passwords
    let response = app
        .clone()
        .oneshot(post_json(
            "/activate",
            &serde_json::json!({ "code": "x", "password": "a", "verify_password": "b" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], codes::PASSWORD_MISMATCH);

    // A code nobody holds
    let response = app
        .oneshot(post_json(
            "/activate",
            &serde_json::json!({ "code": "nosuchcode", "password": "a", "verify_password": "a" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], codes::INVALID_CODE);
}

#[tokio::test]
async fn test_reset_validation() {
    let app = spawn_app().await;

    // Unknown username is a validation error, not a fault
    let response = app
        .clone()
        .oneshot(post_json(
            "/forgot",
            &serde_json::json!({ "username": "ghost@example.com" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], codes::INVALID_USERNAME);

    // A known username gets a code stored and mailed (mail is disabled in
    // tests, so this only exercises the storage path)
    let response = app
        .clone()
        .oneshot(post_json(
            "/forgot",
            &serde_json::json!({ "username": ADMIN_USER }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Bogus reset code is rejected
    let response = app
        .oneshot(post_json(
            "/reset",
            &serde_json::json!({ "code": "nosuchcode", "password": "a", "verify_password": "a" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], codes::INVALID_CODE);
}

#[tokio::test]
async fn test_disable_is_idempotent() {
    let app = spawn_app().await;
    let cookie = login(&app, ADMIN_USER, ADMIN_PASSWORD).await;
    create_normal_user(&app, &cookie, "worker@example.com").await;

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/admin/users/worker@example.com/disable",
                &serde_json::json!({}),
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["error"], codes::SUCCESS);
    }

    // Disabled shows in the listing, and the account cannot log in
    let response = app
        .clone()
        .oneshot(get_with_session(
            "/api/admin/users?filter=worker",
            &cookie,
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["users"][0]["enabled"], false);

    let response = app
        .clone()
        .oneshot(post_json(
            "/login",
            &serde_json::json!({ "username": "worker@example.com", "password": "secret" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], codes::USER_DISABLED);

    // Enabling brings it back
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/admin/users/worker@example.com/enable",
            &serde_json::json!({}),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    login(&app, "worker@example.com", "secret").await;
}

#[tokio::test]
async fn test_user_actions_reject_blank_usernames() {
    let app = spawn_app().await;
    let cookie = login(&app, ADMIN_USER, ADMIN_PASSWORD).await;

    let response = app
        .oneshot(post_json(
            "/api/admin/users/%20/disable",
            &serde_json::json!({}),
            Some(&cookie),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], codes::NO_USER_GIVEN);
    assert_eq!(body["message"], "No user given");
}

#[tokio::test]
async fn test_disable_unknown_user_is_a_named_storage_fault() {
    let app = spawn_app().await;
    let cookie = login(&app, ADMIN_USER, ADMIN_PASSWORD).await;

    let response = app
        .oneshot(post_json(
            "/api/admin/users/ghost@example.com/disable",
            &serde_json::json!({}),
            Some(&cookie),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], codes::COULD_NOT_DISABLE_USER);
    assert_eq!(body["message"], "Could not disable user");
}

#[tokio::test]
async fn test_delete_user() {
    let app = spawn_app().await;
    let cookie = login(&app, ADMIN_USER, ADMIN_PASSWORD).await;
    create_normal_user(&app, &cookie, "gone@example.com").await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/admin/users/gone@example.com/delete",
            &serde_json::json!({}),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get_with_session("/api/admin/users?filter=gone", &cookie))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["total"], 0);
    assert_eq!(body["users"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_admin_surface_is_hidden_from_normal_users() {
    let app = spawn_app().await;
    let admin_cookie = login(&app, ADMIN_USER, ADMIN_PASSWORD).await;
    create_normal_user(&app, &admin_cookie, "plain@example.com").await;

    let cookie = login(&app, "plain@example.com", "secret").await;

    let response = app
        .clone()
        .oneshot(get_with_session("/api/admin/statistics", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Anonymous callers are told to log in instead
    let response = app.oneshot(get("/api/admin/statistics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_settings_round_trip() {
    let app = spawn_app().await;
    let cookie = login(&app, ADMIN_USER, ADMIN_PASSWORD).await;

    let response = app
        .clone()
        .oneshot(get_with_session(
            "/api/admin/settings/allow-signups",
            &cookie,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["key"], "allow-signups");
    assert_eq!(body["value"], "1");

    // Unknown key answers the dedicated code, not a generic fault
    let response = app
        .clone()
        .oneshot(get_with_session("/api/admin/settings/no-such-key", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], codes::SETTING_NOT_FOUND);

    // Writing without a value is its own error
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/admin/settings/allow-signups",
            &serde_json::json!({}),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], codes::SETTING_NO_VALUE);
    assert_eq!(body["message"], "No value specified");

    // A write echoes the stored pair
    let response = app
        .oneshot(post_json(
            "/api/admin/settings/allow-signups",
            &serde_json::json!({ "value": "0" }),
            Some(&cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["value"], "0");
}

#[tokio::test]
async fn test_user_listing_pagination() {
    let app = spawn_app().await;
    let cookie = login(&app, ADMIN_USER, ADMIN_PASSWORD).await;

    for name in ["a@example.com", "b@example.com", "c@example.com"] {
        create_normal_user(&app, &cookie, name).await;
    }

    // Four users, two per page -> two links, first one current
    let response = app
        .clone()
        .oneshot(get_with_session("/api/admin/users?start=0&count=2", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["error"], codes::SUCCESS);
    assert_eq!(body["total"], 4);
    assert_eq!(body["users"].as_array().unwrap().len(), 2);

    let pagination = body["pagination"].as_array().unwrap();
    assert_eq!(pagination.len(), 2);
    assert_eq!(pagination[0]["current"], true);
    assert_eq!(pagination[1]["current"], false);
    assert_eq!(pagination[1]["link"], "?start=2&count=2");

    // The second page flips the current flag
    let response = app
        .clone()
        .oneshot(get_with_session("/api/admin/users?start=2&count=2", &cookie))
        .await
        .unwrap();
    let body = body_json(response).await;
    let pagination = body["pagination"].as_array().unwrap();
    assert_eq!(pagination[0]["current"], false);
    assert_eq!(pagination[1]["current"], true);

    // A filter narrows both the rows and the links
    let response = app
        .clone()
        .oneshot(get_with_session(
            "/api/admin/users?start=0&count=2&filter=a%40",
            &cookie,
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["users"][0]["username"], "a@example.com");
    assert_eq!(
        body["pagination"][0]["link"],
        "?start=0&count=2&filter=a%40"
    );

    // Non-numeric input renders an empty, error-flagged set
    let response = app
        .oneshot(get_with_session("/api/admin/users?start=abc", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["error"], codes::INVALID_QUERY);
    assert_eq!(body["users"].as_array().unwrap().len(), 0);
    assert_eq!(body["pagination"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_admin_pages_require_the_role() {
    let app = spawn_app().await;
    let admin_cookie = login(&app, ADMIN_USER, ADMIN_PASSWORD).await;
    create_normal_user(&app, &admin_cookie, "plain@example.com").await;
    let cookie = login(&app, "plain@example.com", "secret").await;

    // Anonymous visitors are redirected to the login form
    let response = app.clone().oneshot(get("/admin/users")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    // Logged-in non-admins see nothing
    let response = app
        .clone()
        .oneshot(get_with_session("/admin/users", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Admins get the page
    let response = app
        .oneshot(get_with_session("/admin/users", &admin_cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_new_user_validation_collects_all_errors() {
    let app = spawn_app().await;
    let cookie = login(&app, ADMIN_USER, ADMIN_PASSWORD).await;

    let response = app
        .oneshot(post_json(
            "/api/admin/users",
            &serde_json::json!({
                "username": "not-an-email",
                "password": "a",
                "verify_password": "b",
            }),
            Some(&cookie),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    let errors = body["errors"].as_array().unwrap();
    let codes_seen: Vec<u64> = errors.iter().map(|e| e["error"].as_u64().unwrap()).collect();
    assert!(codes_seen.contains(&u64::from(codes::INVALID_USERNAME)));
    assert!(codes_seen.contains(&u64::from(codes::PASSWORD_MISMATCH)));
}
