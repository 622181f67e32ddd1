use actix_web::http::StatusCode;
use serde_json::json;

use super::helpers::TestServer;

#[actix_web::test]
async fn admin_endpoints_reject_plain_users() {
    let server = TestServer::new().await;
    let token = server.register_user("user@example.com", "user").await;
    for path in ["/api/admin/chats", "/api/admin/activity"] {
        let (status, _) = server.get(path, Some(&token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{path}");
    }
}

#[actix_web::test]
async fn admin_sees_all_chats_with_their_orders() {
    let server = TestServer::new().await;
    let token = server.admin_token().await;
    let (status, body) = server.get("/api/admin/chats", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let chats = body["chats"].as_array().unwrap();
    // The default document seeds two sample chats, each with a matching order.
    assert_eq!(chats.len(), 2);
    for chat in chats {
        assert_eq!(chat["order"]["id"], chat["orderId"]);
    }
}

#[actix_web::test]
async fn admin_reply_updates_chat_metadata() {
    let server = TestServer::new().await;
    let token = server.admin_token().await;
    let (_, body) = server.get("/api/admin/chats", Some(&token)).await;
    let chat = &body["chats"][0];
    let chat_id = chat["id"].as_str().unwrap().to_string();
    let messages_before = chat["messages"].as_array().unwrap().len();
    let response_minutes = chat["responseMinutes"].clone();

    let (status, body) = server
        .post_json(&format!("/api/admin/chats/{chat_id}/messages"), Some(&token), json!({ "message": "  On my way!  " }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"]["author"], "admin");
    assert_eq!(body["message"]["body"], "On my way!");

    let (_, body) = server.get(&format!("/api/admin/chats/{chat_id}"), Some(&token)).await;
    let chat = &body["chat"];
    assert_eq!(chat["messages"].as_array().unwrap().len(), messages_before + 1);
    // The sample chat already had a response time; the first-reply stamp is set exactly once.
    assert_eq!(chat["responseMinutes"], response_minutes);
}

#[actix_web::test]
async fn empty_admin_message_is_rejected() {
    let server = TestServer::new().await;
    let token = server.admin_token().await;
    let (_, body) = server.get("/api/admin/chats", Some(&token)).await;
    let chat_id = body["chats"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = server
        .post_json(&format!("/api/admin/chats/{chat_id}/messages"), Some(&token), json!({ "message": "   " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Message is required");
}

#[actix_web::test]
async fn unknown_chat_is_a_404() {
    let server = TestServer::new().await;
    let token = server.admin_token().await;
    let (status, body) =
        server.post_json("/api/admin/chats/does-not-exist/messages", Some(&token), json!({ "message": "hi" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Chat not found");

    let (status, _) = server.get("/api/admin/chats/does-not-exist", Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn chat_status_can_be_toggled() {
    let server = TestServer::new().await;
    let token = server.admin_token().await;
    let (_, body) = server.get("/api/admin/chats", Some(&token)).await;
    let chat_id = body["chats"][0]["id"].as_str().unwrap().to_string();

    let (status, body) =
        server.patch_json(&format!("/api/admin/chats/{chat_id}"), Some(&token), json!({ "status": "closed" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["chat"]["status"], "closed");

    let (status, body) =
        server.patch_json(&format!("/api/admin/chats/{chat_id}"), Some(&token), json!({ "status": "archived" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Valid status is required (open or closed)");
}

#[actix_web::test]
async fn activity_feed_is_newest_first() {
    let server = TestServer::new().await;
    let token = server.admin_token().await;
    let (_, body) = server.get("/api/admin/chats", Some(&token)).await;
    let chat_id = body["chats"][0]["id"].as_str().unwrap().to_string();
    let _ = server
        .post_json(&format!("/api/admin/chats/{chat_id}/messages"), Some(&token), json!({ "message": "ping" }))
        .await;

    let (status, body) = server.get("/api/admin/activity", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let activity = body["activity"].as_array().unwrap();
    assert!(!activity.is_empty());
    assert!(activity[0]["message"].as_str().unwrap().starts_with("Admin replied to chat"));
}
