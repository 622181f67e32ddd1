use std::sync::Arc;

use actix_web::{http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use serde_json::Value;
use spg_common::Secret;
use storefront_engine::{
    providers::ProviderRegistry,
    store::{JsonStore, DEFAULT_ADMIN_EMAIL, DEFAULT_ADMIN_PASSWORD},
    AuthApi,
    ChatApi,
    OrderFlowApi,
};
use tempfile::TempDir;

use crate::{
    config::ServerConfig,
    routes::{
        admin_activity,
        admin_chat,
        admin_chat_message,
        admin_chat_status,
        admin_chats,
        create_order,
        health,
        login,
        me,
        my_chats,
        my_orders,
        nowpayments_webhook,
        payment_providers,
        register,
    },
    server::init_state,
};

/// A server context backed by a real store in a temp directory, seeded with the default
/// document (admin account plus the two sample orders/chats).
pub struct TestServer {
    pub store: JsonStore,
    pub providers: Arc<ProviderRegistry>,
    pub config: ServerConfig,
    _dir: TempDir,
}

impl TestServer {
    pub async fn new() -> Self {
        let _ = env_logger::try_init().ok();
        let dir = tempfile::tempdir().expect("could not create temp dir");
        let path = dir.path().join("state.json");
        let store = JsonStore::load(&path).await.expect("could not load store");
        let providers = Arc::new(ProviderRegistry::new(None));
        init_state(&store, &providers).await.expect("could not init state");
        let mut config = ServerConfig::default();
        config.state_file = path.display().to_string();
        Self { store, providers, config, _dir: dir }
    }

    /// Same as [`Self::new`], but with the webhook endpoint enabled under the given IPN secret.
    /// Order creation still runs manual-only; reconciliation does not need the invoice API.
    pub async fn with_ipn_secret(secret: &str) -> Self {
        let mut server = Self::new().await;
        server.config.nowpayments.api_key = Secret::new("test-api-key".to_string());
        server.config.nowpayments.ipn_secret = Secret::new(secret.to_string());
        server.config.nowpayments.webhook_url = "http://localhost/api/nowpayments/webhook".to_string();
        server
    }

    fn app_config(&self) -> impl FnOnce(&mut ServiceConfig) {
        let store = self.store.clone();
        let providers = Arc::clone(&self.providers);
        let config = self.config.clone();
        move |cfg: &mut ServiceConfig| {
            cfg.app_data(actix_web::web::Data::new(OrderFlowApi::new(store.clone(), providers)))
                .app_data(actix_web::web::Data::new(ChatApi::new(store.clone())))
                .app_data(actix_web::web::Data::new(AuthApi::new(store)))
                .app_data(actix_web::web::Data::new(config))
                .service(health)
                .service(register)
                .service(login)
                .service(me)
                .service(payment_providers)
                .service(create_order)
                .service(my_orders)
                .service(nowpayments_webhook)
                .service(my_chats)
                .service(admin_chats)
                .service(admin_chat)
                .service(admin_chat_message)
                .service(admin_chat_status)
                .service(admin_activity);
        }
    }

    pub async fn request(&self, req: TestRequest) -> (StatusCode, Value) {
        let app = App::new().configure(self.app_config());
        let service = test::init_service(app).await;
        let res = test::call_service(&service, req.to_request()).await;
        let status = res.status();
        let body = test::read_body(res).await;
        let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, value)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(with_bearer(TestRequest::get().uri(path), token)).await
    }

    pub async fn post_json(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(with_bearer(TestRequest::post().uri(path), token).set_json(body)).await
    }

    pub async fn patch_json(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(with_bearer(TestRequest::patch().uri(path), token).set_json(body)).await
    }

    //------------------------------------   Domain shortcuts   ------------------------------------------------------

    /// Register a fresh user and return their bearer token.
    pub async fn register_user(&self, email: &str, username: &str) -> String {
        let (status, body) = self
            .post_json(
                "/api/auth/register",
                None,
                serde_json::json!({ "email": email, "username": username, "password": "hunter2" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "registration failed: {body}");
        body["token"].as_str().expect("no token in registration response").to_string()
    }

    /// Log in as the seeded default admin.
    pub async fn admin_token(&self) -> String {
        let (status, body) = self
            .post_json(
                "/api/auth/login",
                None,
                serde_json::json!({ "email": DEFAULT_ADMIN_EMAIL, "password": DEFAULT_ADMIN_PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "admin login failed: {body}");
        body["token"].as_str().expect("no token in login response").to_string()
    }
}

fn with_bearer(req: TestRequest, token: Option<&str>) -> TestRequest {
    match token {
        Some(t) => req.insert_header(("Authorization", format!("Bearer {t}"))),
        None => req,
    }
}
