use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use chrono::Utc;
use log::*;
use nowpayments_tools::NowPaymentsApi;
use storefront_engine::{
    providers::ProviderRegistry,
    store::JsonStore,
    AuthApi,
    ChatApi,
    OrderFlowApi,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
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
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let store =
        JsonStore::load(&config.state_file).await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let providers = build_provider_registry(&config)?;
    init_state(&store, &providers).await?;
    let srv = create_server_instance(config, store, providers)?;
    srv.await.map_err(|e| ServerError::BackendError(e.to_string()))
}

/// Build the provider registry for this deployment. Manual settlement is always available; the
/// hosted crypto providers join only when the invoice API credentials are complete.
pub fn build_provider_registry(config: &ServerConfig) -> Result<Arc<ProviderRegistry>, ServerError> {
    let hosted = if config.nowpayments.is_enabled() {
        let api = NowPaymentsApi::new(config.nowpayments.clone())
            .map_err(|e| ServerError::InitializeError(e.to_string()))?;
        Some(api)
    } else {
        None
    };
    Ok(Arc::new(ProviderRegistry::new(hosted)))
}

/// One-time startup pass over the freshly loaded document: seed an admin account if none exists
/// and backfill payment shapes written by older releases. Persists only if something changed.
pub async fn init_state(store: &JsonStore, providers: &Arc<ProviderRegistry>) -> Result<(), ServerError> {
    let registry = Arc::clone(providers);
    store
        .write_if(move |doc| {
            let seeded = doc.ensure_admin_user(Utc::now());
            let patched = doc.ensure_payment_shapes(|key| registry.provider_label(key));
            (seeded || patched > 0, ())
        })
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    store: JsonStore,
    providers: Arc<ProviderRegistry>,
) -> Result<Server, ServerError> {
    let bind_address = (config.host.clone(), config.port);
    info!("🚀️ State document: {}", store.path().display());
    let srv = HttpServer::new(move || {
        let order_api = OrderFlowApi::new(store.clone(), Arc::clone(&providers));
        let chat_api = ChatApi::new(store.clone());
        let auth_api = AuthApi::new(store.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("spg::access_log"))
            .app_data(web::Data::new(order_api))
            .app_data(web::Data::new(chat_api))
            .app_data(web::Data::new(auth_api))
            .app_data(web::Data::new(config.clone()))
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
            .service(admin_activity)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind(bind_address)?
    .run();
    Ok(srv)
}
