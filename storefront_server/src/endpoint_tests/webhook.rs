use actix_web::{http::StatusCode, test::TestRequest};
use chrono::Utc;
use nowpayments_tools::helpers::ipn_signature;
use serde_json::Value;
use storefront_engine::db_types::{Order, OrderId, OrderStatus, Payment};

use super::helpers::TestServer;

const SECRET: &str = "ipn-test-secret";

#[actix_web::test]
async fn webhook_is_a_sink_when_hosted_payments_are_disabled() {
    let server = TestServer::new().await;
    let (status, _) = post_webhook(&server, b"anything at all", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[actix_web::test]
async fn empty_body_is_acknowledged_without_processing() {
    let server = TestServer::with_ipn_secret(SECRET).await;
    let (status, _) = post_webhook(&server, b"", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[actix_web::test]
async fn missing_signature_is_rejected() {
    let server = TestServer::with_ipn_secret(SECRET).await;
    let (status, body) = post_webhook(&server, br##"{"order_id":"#30219"}"##, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid signature");
}

#[actix_web::test]
async fn tampered_body_with_original_signature_is_rejected() {
    let server = TestServer::with_ipn_secret(SECRET).await;
    seed_pending_order(&server, "#77777").await;

    let original = br##"{"order_id":"#11111","payment_status":"finished"}"##;
    let signature = ipn_signature(SECRET, original);
    // Same signature, different body -- referencing a real order.
    let tampered = br##"{"order_id":"#77777","payment_status":"finished"}"##;
    let (status, _) = post_webhook(&server, tampered, Some(&signature)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The referenced order was not touched.
    let status_after = server
        .store
        .read(|doc| doc.order(&OrderId("#77777".into())).map(|o| o.status.clone()))
        .await
        .expect("order still present");
    assert_eq!(status_after, OrderStatus::Pending);
}

#[actix_web::test]
async fn reconciliation_sequence_is_idempotent() {
    let server = TestServer::with_ipn_secret(SECRET).await;
    seed_pending_order(&server, "#30230").await;
    let oid = OrderId("#30230".into());

    // First signal: confirming. Stays pending, no chat, no confirmation entry.
    let body = br##"{"order_id":"#30230","payment_status":"confirming"}"##;
    let (status, _) = post_webhook(&server, body, Some(&ipn_signature(SECRET, body))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    server
        .store
        .read(|doc| {
            let order = doc.order(&oid).expect("order");
            assert_eq!(order.status, OrderStatus::Pending);
            let payment = order.payment.as_ref().expect("payment");
            assert_eq!(payment.status.as_deref(), Some("confirming"));
            assert_eq!(payment.provider, "nowpayments");
            assert_eq!(payment.provider_label, "NOWPayments");
            assert!(doc.chat_for_order(&oid).is_none());
            assert_eq!(confirmation_entries(doc, "#30230"), 0);
        })
        .await;

    // Second signal: finished. Paid, one chat, one confirmation entry.
    let body = br##"{"order_id":"#30230","payment_status":"finished","actually_paid":0.0003}"##;
    let signature = ipn_signature(SECRET, body);
    let (status, _) = post_webhook(&server, body, Some(&signature)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Replay the identical payload. Same terminal state, no duplicated side effects.
    let (status, _) = post_webhook(&server, body, Some(&signature)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    server
        .store
        .read(|doc| {
            let order = doc.order(&oid).expect("order");
            assert_eq!(order.status, OrderStatus::Paid);
            let payment = order.payment.as_ref().expect("payment");
            assert_eq!(payment.status.as_deref(), Some("finished"));
            assert_eq!(payment.actually_paid, Some(0.0003));
            assert_eq!(doc.chats.iter().filter(|c| c.order_id == oid).count(), 1);
            assert_eq!(confirmation_entries(doc, "#30230"), 1);
            // The replay still left its trace, but only as a generic status update.
            let generic = doc
                .activity_log
                .iter()
                .filter(|e| e.message.contains("status update for order #30230: finished"))
                .count();
            assert_eq!(generic, 1);
        })
        .await;
}

#[actix_web::test]
async fn alternate_signature_header_is_accepted() {
    let server = TestServer::with_ipn_secret(SECRET).await;
    seed_pending_order(&server, "#30231").await;
    let body = br##"{"orderId":"#30231","invoice_status":"expired"}"##;
    let req = TestRequest::post()
        .uri("/api/nowpayments/webhook")
        .insert_header(("x-nowpayments-signature", ipn_signature(SECRET, body)))
        .set_payload(body.to_vec());
    let (status, _) = server.request(req).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let order_status =
        server.store.read(|doc| doc.order(&OrderId("#30231".into())).map(|o| o.status.clone())).await;
    assert_eq!(order_status, Some(OrderStatus::Failed));
    let failed_entries = server
        .store
        .read(|doc| {
            doc.activity_log.iter().filter(|e| e.message.contains("marked order #30231 as failed")).count()
        })
        .await;
    assert_eq!(failed_entries, 1);
}

#[actix_web::test]
async fn unknown_order_is_silently_tolerated() {
    let server = TestServer::with_ipn_secret(SECRET).await;
    let orders_before = server.store.read(|doc| doc.orders.clone()).await;
    let body = br##"{"order_id":"#99999","payment_status":"finished"}"##;
    let (status, _) = post_webhook(&server, body, Some(&ipn_signature(SECRET, body))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let orders_after = server.store.read(|doc| doc.orders.clone()).await;
    assert_eq!(orders_before, orders_after);
}

//----------------------------------------------   Helpers  ----------------------------------------------------

async fn post_webhook(server: &TestServer, body: &[u8], signature: Option<&str>) -> (StatusCode, Value) {
    let mut req = TestRequest::post().uri("/api/nowpayments/webhook").set_payload(body.to_vec());
    if let Some(sig) = signature {
        req = req.insert_header(("x-nowpayments-sig", sig));
    }
    server.request(req).await
}

async fn seed_pending_order(server: &TestServer, id: &str) {
    let order = pending_order(id);
    server.store.write(move |doc| doc.orders.push(order)).await.expect("could not seed order");
}

fn pending_order(id: &str) -> Order {
    let now = Utc::now();
    Order {
        id: OrderId(id.to_string()),
        user_id: "user-buyer".to_string(),
        username: "buyer".to_string(),
        amount: 9.99,
        currency: "EUR".to_string(),
        product: "Script Bundle".to_string(),
        robux_amount: None,
        status: OrderStatus::Pending,
        created_at: now,
        payment: Some(Payment {
            provider: "nowpayments-btc".to_string(),
            provider_label: "NOWPayments (Bitcoin)".to_string(),
            invoice_id: Some("5205538221".to_string()),
            invoice_url: Some("https://nowpayments.io/payment/?iid=5205538221".to_string()),
            status: Some("waiting".to_string()),
            pay_currency: Some("BTC".to_string()),
            pay_amount: Some(0.0003),
            actually_paid: None,
            created_at: now,
            updated_at: now,
        }),
    }
}

fn confirmation_entries(doc: &storefront_engine::store::StateDocument, order_id: &str) -> usize {
    doc.activity_log.iter().filter(|e| e.message.contains(&format!("confirmed payment for order {order_id}"))).count()
}
