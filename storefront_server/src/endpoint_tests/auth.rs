use actix_web::http::StatusCode;
use serde_json::json;

use super::helpers::TestServer;

#[actix_web::test]
async fn register_login_me_flow() {
    let server = TestServer::new().await;
    let token = server.register_user("julian@example.com", "julian").await;

    let (status, body) = server.get("/api/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "julian");
    assert_eq!(body["email"], "julian@example.com");
    assert_eq!(body["role"], "user");

    let (status, body) =
        server.post_json("/api/auth/login", None, json!({ "email": "Julian@Example.com", "password": "hunter2" })).await;
    assert_eq!(status, StatusCode::OK, "login is case-insensitive on email: {body}");
}

#[actix_web::test]
async fn me_requires_a_valid_token() {
    let server = TestServer::new().await;
    let (status, _) = server.get("/api/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = server.get("/api/auth/me", Some("made-up-nonsense")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthorized");
}

#[actix_web::test]
async fn register_validates_input() {
    let server = TestServer::new().await;
    let (status, body) = server.post_json("/api/auth/register", None, json!({ "email": "a@b.c" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing email, username or password");
}

#[actix_web::test]
async fn duplicate_email_is_rejected() {
    let server = TestServer::new().await;
    let _ = server.register_user("julian@example.com", "julian").await;
    let (status, body) = server
        .post_json(
            "/api/auth/register",
            None,
            json!({ "email": "JULIAN@example.com", "username": "julian2", "password": "hunter2" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Email already registered");
}

#[actix_web::test]
async fn wrong_password_is_a_401() {
    let server = TestServer::new().await;
    let _ = server.register_user("julian@example.com", "julian").await;
    let (status, body) =
        server.post_json("/api/auth/login", None, json!({ "email": "julian@example.com", "password": "wrong" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");
}

#[actix_web::test]
async fn default_admin_is_seeded() {
    let server = TestServer::new().await;
    let token = server.admin_token().await;
    let (status, body) = server.get("/api/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "admin");
}
