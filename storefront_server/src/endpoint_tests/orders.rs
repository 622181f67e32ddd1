use actix_web::http::StatusCode;
use serde_json::json;

use super::helpers::TestServer;

#[actix_web::test]
async fn create_order_requires_authentication() {
    let server = TestServer::new().await;
    let (status, _) =
        server.post_json("/api/orders", None, json!({ "amount": 5.0, "product": "Script" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn create_order_validates_details() {
    let server = TestServer::new().await;
    let token = server.register_user("buyer@example.com", "buyer").await;
    let (status, body) = server.post_json("/api/orders", Some(&token), json!({ "amount": 5.0 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing order details");

    let (status, _) = server.post_json("/api/orders", Some(&token), json!({ "product": "Script" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn create_order_rejects_unknown_payment_method() {
    let server = TestServer::new().await;
    let token = server.register_user("buyer@example.com", "buyer").await;
    let (status, body) = server
        .post_json(
            "/api/orders",
            Some(&token),
            json!({ "amount": 5.0, "product": "Script", "paymentMethod": "paypal" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Unknown payment method: paypal");
}

#[actix_web::test]
async fn manual_order_is_paid_immediately_with_admin_chat() {
    let server = TestServer::new().await;
    let token = server.register_user("julian@example.com", "julian").await;
    let (status, body) = server
        .post_json(
            "/api/orders",
            Some(&token),
            json!({ "amount": 14.50, "currency": "EUR", "product": "Private Chat", "paymentMethod": "manual" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let order = &body["order"];
    assert_eq!(order["status"], "paid");
    assert_eq!(order["amount"], 14.5);
    assert_eq!(order["currency"], "EUR");
    let payment = &body["payment"];
    assert_eq!(payment["provider"], "manual");
    assert_eq!(payment["providerLabel"], "Manual Payment");
    assert_eq!(payment["actuallyPaid"], 14.5);
    assert!(payment["invoiceUrl"].is_null());

    // Exactly one chat, open, seeded with the two system messages in order.
    let chat = &body["chat"];
    assert_eq!(chat["orderId"], order["id"]);
    assert_eq!(chat["status"], "open");
    let messages = chat["messages"].as_array().expect("chat messages");
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["author"], "system");
    assert!(messages[0]["body"].as_str().unwrap().starts_with("Payment confirmed for order"));
    assert!(messages[1]["body"].as_str().unwrap().contains("Please process the delivery for julian"));

    let (status, chats) = server.get("/api/chats", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let mine: Vec<_> = chats["chats"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|c| c["orderId"] == order["id"])
        .collect();
    assert_eq!(mine.len(), 1, "exactly one chat per order");
}

#[actix_web::test]
async fn my_orders_only_lists_own_orders() {
    let server = TestServer::new().await;
    let alice = server.register_user("alice@example.com", "alice").await;
    let bob = server.register_user("bob@example.com", "bob").await;
    let (_, created) = server
        .post_json(
            "/api/orders",
            Some(&alice),
            json!({ "amount": 3.0, "product": "Key", "paymentMethod": "manual" }),
        )
        .await;
    let order_id = created["order"]["id"].clone();

    let (status, body) = server.get("/api/orders", Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
    let orders = body["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["id"], order_id);

    let (_, body) = server.get("/api/orders", Some(&bob)).await;
    assert!(body["orders"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn provider_listing_is_public() {
    let server = TestServer::new().await;
    let (status, body) = server.get("/api/payments/providers", None).await;
    assert_eq!(status, StatusCode::OK);
    let providers = body["providers"].as_array().unwrap();
    assert_eq!(providers.len(), 1, "manual-only configuration");
    assert_eq!(providers[0]["key"], "manual");
    assert_eq!(providers[0]["type"], "manual");
    assert_eq!(providers[0]["supportsRedirect"], false);
}
