//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! Handlers authenticate themselves: the bearer token from the `Authorization` header is resolved
//! against the session store at the top of every protected handler. Admin handlers additionally
//! require the admin role.

use actix_web::{get, patch, post, web, HttpRequest, HttpResponse, Responder};
use log::*;
use nowpayments_tools::{helpers::verify_ipn_signature, IpnPayload};
use serde_json::json;
use storefront_engine::{db_types::User, AuthApi, ChatApi, NewOrderRequest, OrderFlowApi};

use crate::{
    config::ServerConfig,
    data_objects::{
        AuthResponse,
        ChatMessageParams,
        ChatStatusParams,
        LoginParams,
        NewOrderParams,
        PublicUser,
        RegisterParams,
    },
    errors::ServerError,
};

/// How much of the activity log the admin feed serves.
const ACTIVITY_WINDOW: usize = 50;

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Auth  ----------------------------------------------------

#[post("/api/auth/register")]
pub async fn register(
    body: web::Json<RegisterParams>,
    api: web::Data<AuthApi>,
) -> Result<HttpResponse, ServerError> {
    let RegisterParams { email, username, password } = body.into_inner();
    let (email, username, password) = match (nonempty(email), nonempty(username), nonempty(password)) {
        (Some(e), Some(u), Some(p)) => (e, u, p),
        _ => return Err(ServerError::BadRequest("Missing email, username or password".to_string())),
    };
    debug!("💻️ POST register for {email}");
    let (token, user) = api.register(&email, &username, &password).await?;
    Ok(HttpResponse::Created().json(AuthResponse { token, user: PublicUser::from(&user) }))
}

#[post("/api/auth/login")]
pub async fn login(body: web::Json<LoginParams>, api: web::Data<AuthApi>) -> Result<HttpResponse, ServerError> {
    let LoginParams { email, password } = body.into_inner();
    let (email, password) = match (nonempty(email), nonempty(password)) {
        (Some(e), Some(p)) => (e, p),
        _ => return Err(ServerError::BadRequest("Missing credentials".to_string())),
    };
    debug!("💻️ POST login for {email}");
    let (token, user) = api.login(&email, &password).await?;
    Ok(HttpResponse::Ok().json(AuthResponse { token, user: PublicUser::from(&user) }))
}

#[get("/api/auth/me")]
pub async fn me(req: HttpRequest, api: web::Data<AuthApi>) -> Result<HttpResponse, ServerError> {
    let user = require_user(&req, &api).await?;
    Ok(HttpResponse::Ok().json(PublicUser::from(&user)))
}

//----------------------------------------------   Providers  ----------------------------------------------------

#[get("/api/payments/providers")]
pub async fn payment_providers(api: web::Data<OrderFlowApi>) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET payment providers");
    Ok(HttpResponse::Ok().json(json!({ "providers": api.providers().listing() })))
}

//----------------------------------------------   Orders  ----------------------------------------------------

#[post("/api/orders")]
pub async fn create_order(
    req: HttpRequest,
    body: web::Json<NewOrderParams>,
    auth: web::Data<AuthApi>,
    api: web::Data<OrderFlowApi>,
) -> Result<HttpResponse, ServerError> {
    let user = require_user(&req, &auth).await?;
    let params = body.into_inner();
    debug!("💻️ POST create order for {}", user.username);
    let request = NewOrderRequest {
        amount: params.amount.unwrap_or_default(),
        currency: params.currency,
        product: params.product.unwrap_or_default(),
        robux_amount: params.robux_amount,
        payment_method: params.payment_method,
    };
    let created = api.create_order(&user, request).await.map_err(|e| {
        debug!("💻️ Could not create order. {e}");
        e
    })?;
    Ok(HttpResponse::Created().json(created))
}

#[get("/api/orders")]
pub async fn my_orders(
    req: HttpRequest,
    auth: web::Data<AuthApi>,
    api: web::Data<OrderFlowApi>,
) -> Result<HttpResponse, ServerError> {
    let user = require_user(&req, &auth).await?;
    debug!("💻️ GET my_orders for {}", user.username);
    let orders = api.orders_for_user(&user.id).await;
    Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}

//------------------------------------------   Payment webhook  ---------------------------------------------

/// The provider webhook endpoint.
///
/// Deliberately opaque: it acknowledges quickly with 204 regardless of the business outcome so
/// the provider's retry policy is satisfied, and only a signature failure is reported back.
/// The raw body is never parsed before its signature has been verified.
#[post("/api/nowpayments/webhook")]
pub async fn nowpayments_webhook(
    req: HttpRequest,
    body: web::Bytes,
    config: web::Data<ServerConfig>,
    api: web::Data<OrderFlowApi>,
) -> Result<HttpResponse, ServerError> {
    let np = &config.nowpayments;
    if !np.is_enabled() {
        trace!("🔐️ Webhook received while hosted payments are disabled. Ignoring.");
        return Ok(HttpResponse::NoContent().finish());
    }
    if body.is_empty() {
        trace!("🔐️ Webhook received with an empty body. Ignoring.");
        return Ok(HttpResponse::NoContent().finish());
    }
    let signature = req
        .headers()
        .get("x-nowpayments-sig")
        .or_else(|| req.headers().get("x-nowpayments-signature"))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !verify_ipn_signature(np.ipn_secret.reveal(), &body, signature) {
        warn!("🔐️ Webhook signature missing or invalid. Rejecting without touching the payload.");
        return Err(ServerError::InvalidSignature);
    }
    let payload = IpnPayload::parse(&body);
    match api.reconcile_ipn(&payload).await? {
        Some(outcome) => {
            info!(
                "🔐️ Webhook processed for order {}: {} -> {}",
                outcome.order_id, outcome.previous_status, outcome.new_status
            );
        },
        None => debug!("🔐️ Webhook carried no actionable order reference. Acknowledged as a no-op."),
    }
    Ok(HttpResponse::NoContent().finish())
}

//----------------------------------------------   Chats  ----------------------------------------------------

#[get("/api/chats")]
pub async fn my_chats(
    req: HttpRequest,
    auth: web::Data<AuthApi>,
    api: web::Data<ChatApi>,
) -> Result<HttpResponse, ServerError> {
    let user = require_user(&req, &auth).await?;
    debug!("💻️ GET my_chats for {}", user.username);
    let chats = api.chats_for_user(&user.id).await;
    Ok(HttpResponse::Ok().json(json!({ "chats": chats })))
}

#[get("/api/admin/chats")]
pub async fn admin_chats(
    req: HttpRequest,
    auth: web::Data<AuthApi>,
    api: web::Data<ChatApi>,
) -> Result<HttpResponse, ServerError> {
    let admin = require_admin(&req, &auth).await?;
    debug!("💻️ GET all chats for admin {}", admin.username);
    let chats = api.all_chats_with_orders().await;
    Ok(HttpResponse::Ok().json(json!({ "chats": chats })))
}

#[get("/api/admin/chats/{chat_id}")]
pub async fn admin_chat(
    req: HttpRequest,
    path: web::Path<String>,
    auth: web::Data<AuthApi>,
    api: web::Data<ChatApi>,
) -> Result<HttpResponse, ServerError> {
    require_admin(&req, &auth).await?;
    let chat_id = path.into_inner();
    debug!("💻️ GET chat {chat_id}");
    let chat = api.chat_with_order(&chat_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "chat": chat })))
}

#[post("/api/admin/chats/{chat_id}/messages")]
pub async fn admin_chat_message(
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<ChatMessageParams>,
    auth: web::Data<AuthApi>,
    api: web::Data<ChatApi>,
) -> Result<HttpResponse, ServerError> {
    require_admin(&req, &auth).await?;
    let chat_id = path.into_inner();
    let message = body.into_inner().message.unwrap_or_default();
    debug!("💻️ POST admin message to chat {chat_id}");
    let message = api.post_admin_message(&chat_id, &message).await.map_err(|e| {
        debug!("💻️ Could not post admin message. {e}");
        e
    })?;
    Ok(HttpResponse::Ok().json(json!({ "message": message })))
}

#[patch("/api/admin/chats/{chat_id}")]
pub async fn admin_chat_status(
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<ChatStatusParams>,
    auth: web::Data<AuthApi>,
    api: web::Data<ChatApi>,
) -> Result<HttpResponse, ServerError> {
    require_admin(&req, &auth).await?;
    let chat_id = path.into_inner();
    let status = body.into_inner().status.unwrap_or_default();
    debug!("💻️ PATCH chat {chat_id} status to '{status}'");
    let chat = api.set_chat_status(&chat_id, &status).await.map_err(|e| {
        debug!("💻️ Could not set chat status. {e}");
        e
    })?;
    Ok(HttpResponse::Ok().json(json!({ "chat": chat })))
}

//----------------------------------------------   Activity  ----------------------------------------------------

#[get("/api/admin/activity")]
pub async fn admin_activity(
    req: HttpRequest,
    auth: web::Data<AuthApi>,
    api: web::Data<ChatApi>,
) -> Result<HttpResponse, ServerError> {
    require_admin(&req, &auth).await?;
    let activity = api.recent_activity(ACTIVITY_WINDOW).await;
    Ok(HttpResponse::Ok().json(json!({ "activity": activity })))
}

//----------------------------------------------   Helpers  ----------------------------------------------------

/// Resolve the request's bearer token to a user, or reject with 401.
pub async fn require_user(req: &HttpRequest, api: &AuthApi) -> Result<User, ServerError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ServerError::Unauthorized)?;
    let user = api.authenticate(token).await.map_err(|e| ServerError::BackendError(e.to_string()))?;
    user.ok_or(ServerError::Unauthorized)
}

/// Like [`require_user`], but additionally requires the admin role.
pub async fn require_admin(req: &HttpRequest, api: &AuthApi) -> Result<User, ServerError> {
    let user = require_user(req, api).await?;
    if !user.is_admin() {
        debug!("💻️ User {} is not an admin. Rejecting.", user.username);
        return Err(ServerError::Unauthorized);
    }
    Ok(user)
}

fn nonempty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
