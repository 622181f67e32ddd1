use std::{fmt::Debug, sync::Arc};

use chrono::{DateTime, Utc};
use log::*;
use nowpayments_tools::IpnPayload;
use serde::Serialize;

use crate::{
    db_types::{Chat, ChatStatus, Message, Order, OrderId, OrderStatus, Payment, User, SYSTEM_AUTHOR},
    helpers::{new_entity_id, new_order_id},
    providers::{PaymentRequest, ProviderError, ProviderRegistry, GENERIC_CRYPTO_KEY},
    sfe_api::errors::OrderFlowError,
    store::{JsonStore, StateDocument},
};

/// Seeded into every newly opened order chat.
const ORDER_CHAT_INTRO_MESSAGE: &str =
    "Follow the delivery instructions posted in this chat to receive your purchase.";

/// `OrderFlowApi` handles the order lifecycle: creating orders against a payment provider and
/// reconciling their status from provider webhook callbacks.
pub struct OrderFlowApi {
    store: JsonStore,
    providers: Arc<ProviderRegistry>,
}

impl Debug for OrderFlowApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

#[derive(Debug, Clone)]
pub struct NewOrderRequest {
    pub amount: f64,
    pub currency: Option<String>,
    pub product: String,
    pub robux_amount: Option<i64>,
    pub payment_method: Option<String>,
}

/// Everything a successful order creation hands back. The payment descriptor is also embedded in
/// the order; it is duplicated here for the caller's convenience.
#[derive(Debug, Clone, Serialize)]
pub struct OrderCreated {
    pub order: Order,
    pub chat: Chat,
    pub payment: Payment,
}

/// What a webhook reconciliation did, for the caller's logging. `None` order lookups and absent
/// order ids never get this far; they are silent no-ops.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub order_id: OrderId,
    pub previous_status: OrderStatus,
    pub new_status: OrderStatus,
    pub raw_status: Option<String>,
}

impl OrderFlowApi {
    pub fn new(store: JsonStore, providers: Arc<ProviderRegistry>) -> Self {
        Self { store, providers }
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    pub fn store(&self) -> &JsonStore {
        &self.store
    }

    /// Create a new order for an authenticated user.
    ///
    /// Side effects are strictly ordered: provider call first (a failure aborts with **zero**
    /// state committed), then — inside a single store write — order insertion, chat creation,
    /// activity entries, and one whole-document persist.
    ///
    /// When the provider reports the order as immediately paid, the admin chat is auto-opened;
    /// if that declines (no admin account), a plain order chat is created instead so the buyer
    /// is never left without a chat.
    pub async fn create_order(&self, user: &User, request: NewOrderRequest) -> Result<OrderCreated, OrderFlowError> {
        if !(request.amount > 0.0) || request.product.trim().is_empty() {
            return Err(OrderFlowError::MissingOrderDetails);
        }
        let currency =
            request.currency.as_deref().map(str::trim).filter(|c| !c.is_empty()).unwrap_or("EUR").to_string();
        let order_id = self.unused_order_id().await;
        let created_at = Utc::now();
        let provider = self.providers.resolve(request.payment_method.as_deref()).map_err(|e| match e {
            ProviderError::UnknownProvider(key) => OrderFlowError::UnknownPaymentMethod(key),
            _ => OrderFlowError::NoProviderConfigured,
        })?;
        let provider_label = provider.label();
        let provider_pay_currency = provider.pay_currency();
        trace!("🔄️ Creating order {order_id} for {} via {provider_label}", user.username);

        let payment_request = PaymentRequest {
            order_id: &order_id,
            amount: request.amount,
            currency: &currency,
            product: &request.product,
            username: &user.username,
            created_at,
        };
        let intent = provider.create_payment(&payment_request).await.map_err(|e| {
            error!("🔄️ Failed to create payment with {provider_label}. {e}");
            OrderFlowError::ProviderFailure { provider: provider_label.clone(), message: e.to_string() }
        })?;

        let mut payment = intent.payment;
        if payment.provider.is_empty() {
            payment.provider = provider.key();
        }
        if payment.provider_label.is_empty() {
            payment.provider_label = self.providers.provider_label(&payment.provider);
        }
        let order = Order {
            id: order_id,
            user_id: user.id.clone(),
            username: user.username.clone(),
            amount: request.amount,
            currency: currency.clone(),
            product: request.product.clone(),
            robux_amount: request.robux_amount,
            status: intent.order_status,
            created_at,
            payment: Some(payment.clone()),
        };

        let result = self
            .store
            .write(move |doc| {
                doc.orders.push(order.clone());
                let chat = if order.status.is_paid() {
                    open_admin_chat_on_payment(doc, &order, created_at)
                        .unwrap_or_else(|| open_order_chat(doc, &order, created_at))
                } else {
                    open_order_chat(doc, &order, created_at)
                };
                let label = &payment.provider_label;
                if order.status.is_paid() {
                    doc.log_activity(
                        created_at,
                        format!(
                            "New payment via {label} from {} ({:.2} {})",
                            order.username, order.amount, order.currency
                        ),
                    );
                } else {
                    let pending_currency = payment
                        .pay_currency
                        .clone()
                        .or(provider_pay_currency)
                        .unwrap_or_else(|| order.currency.clone());
                    doc.log_activity(
                        created_at,
                        format!(
                            "Order {} awaiting payment via {label} ({}) from {}",
                            order.id,
                            pending_currency.to_uppercase(),
                            order.username
                        ),
                    );
                }
                if payment.invoice_url.is_some() {
                    doc.log_activity(created_at, format!("{label} invoice created for order {}", order.id));
                }
                doc.log_activity(created_at, format!("Chat opened (Order {})", order.id));
                OrderCreated { order, chat, payment }
            })
            .await?;
        debug!("🔄️ Order {} created with status '{}'", result.order.id, result.order.status);
        Ok(result)
    }

    /// All orders owned by the given user, in insertion order.
    pub async fn orders_for_user(&self, user_id: &str) -> Vec<Order> {
        self.store.read(|doc| doc.orders.iter().filter(|o| o.user_id == user_id).cloned().collect()).await
    }

    /// Reconcile an order from a (signature-verified) provider webhook payload.
    ///
    /// Payloads without an order id, and payloads referencing an unknown order, are tolerated
    /// silently — the provider replays webhooks and may deliver them out of order. Everything
    /// else updates the embedded payment descriptor, renormalizes the order status, and fires
    /// the transition side effects at most once per actual transition: re-delivering the same
    /// payload finds the order already in its terminal status and appends only the generic
    /// status-update entry.
    pub async fn reconcile_ipn(&self, payload: &IpnPayload) -> Result<Option<ReconcileOutcome>, OrderFlowError> {
        let Some(order_id) = payload.order_id.as_deref().filter(|s| !s.is_empty()) else {
            debug!("🔄️ Webhook payload carries no order id. Ignoring.");
            return Ok(None);
        };
        let oid = OrderId(order_id.to_string());
        let now = Utc::now();
        let provider_label = self.providers.provider_label(GENERIC_CRYPTO_KEY);
        let registry = Arc::clone(&self.providers);
        let payload = payload.clone();
        let outcome = self
            .store
            .write_if(move |doc| {
                let Some(pos) = doc.order_position(&oid) else {
                    debug!("🔄️ Webhook for unknown order {oid}. Ignoring.");
                    return (false, None);
                };
                if let Some(payment) = &mut doc.orders[pos].payment {
                    // Documents written before labels existed get patched on the way through.
                    if payment.provider_label.is_empty() {
                        payment.provider_label = registry.provider_label(&payment.provider);
                    }
                }
                let existing = doc.orders[pos].payment.clone();
                let order_created_at = doc.orders[pos].created_at;
                let raw_status = payload
                    .raw_status()
                    .map(|s| s.to_lowercase())
                    .filter(|s| !s.is_empty())
                    .or_else(|| existing.as_ref().and_then(|p| p.status.clone()));
                let payment = Payment {
                    provider: GENERIC_CRYPTO_KEY.to_string(),
                    provider_label: provider_label.clone(),
                    invoice_id: payload
                        .invoice_id
                        .clone()
                        .or_else(|| existing.as_ref().and_then(|p| p.invoice_id.clone())),
                    invoice_url: payload
                        .invoice_url
                        .clone()
                        .or_else(|| existing.as_ref().and_then(|p| p.invoice_url.clone())),
                    status: raw_status.clone(),
                    pay_currency: payload
                        .pay_currency
                        .clone()
                        .or_else(|| existing.as_ref().and_then(|p| p.pay_currency.clone())),
                    pay_amount: payload.pay_amount.or_else(|| existing.as_ref().and_then(|p| p.pay_amount)),
                    actually_paid: payload
                        .actually_paid
                        .or_else(|| existing.as_ref().and_then(|p| p.actually_paid)),
                    created_at: existing.as_ref().map(|p| p.created_at).unwrap_or(order_created_at),
                    updated_at: now,
                };
                let previous_status = doc.orders[pos].status.clone();
                let new_status = OrderStatus::from_provider(raw_status.as_deref().unwrap_or(""));
                doc.orders[pos].payment = Some(payment);
                doc.orders[pos].status = new_status.clone();
                let order_snapshot = doc.orders[pos].clone();

                let shown_status = raw_status.clone().unwrap_or_else(|| "unknown".to_string());
                let mut activity = format!("{provider_label} status update for order {oid}: {shown_status}");
                if new_status.is_paid() && !previous_status.is_paid() {
                    activity = format!("{provider_label} confirmed payment for order {oid}");
                    if open_admin_chat_on_payment(doc, &order_snapshot, now).is_none() {
                        warn!("🔄️ Could not auto-open an admin chat for paid order {oid}");
                    }
                } else if new_status.is_failed() && !previous_status.is_failed() {
                    activity = format!("{provider_label} marked order {oid} as failed ({shown_status})");
                }
                doc.log_activity(now, activity);
                (true, Some(ReconcileOutcome { order_id: oid, previous_status, new_status, raw_status }))
            })
            .await?;
        if let Some(o) = &outcome {
            debug!("🔄️ Order {} reconciled: {} -> {}", o.order_id, o.previous_status, o.new_status);
        }
        Ok(outcome)
    }

    async fn unused_order_id(&self) -> OrderId {
        loop {
            let candidate = new_order_id();
            if self.store.read(|doc| doc.order(&candidate).is_none()).await {
                return candidate;
            }
        }
    }
}

//----------------------------------------   Chat creation   ---------------------------------------------------------

fn system_message(body: impl Into<String>, at: DateTime<Utc>) -> Message {
    Message { id: new_entity_id(), author: SYSTEM_AUTHOR.to_string(), body: body.into(), created_at: at }
}

/// Idempotently ensure an admin chat exists for a paid order.
///
/// Returns the existing chat unchanged if the order already has one. Returns `None` without
/// creating anything when no admin account exists — degraded, but not fatal.
pub(crate) fn open_admin_chat_on_payment(doc: &mut StateDocument, order: &Order, now: DateTime<Utc>) -> Option<Chat> {
    if let Some(existing) = doc.chat_for_order(&order.id) {
        return Some(existing.clone());
    }
    if !doc.has_admin() {
        warn!("🔄️ No admin user exists to open a chat with for order {}", order.id);
        return None;
    }
    let chat = Chat {
        id: new_entity_id(),
        order_id: order.id.clone(),
        user_id: order.user_id.clone(),
        username: order.username.clone(),
        status: ChatStatus::Open,
        created_at: now,
        last_activity_at: now,
        response_minutes: None,
        messages: vec![
            system_message(format!("Payment confirmed for order {} - chat opened with the admins", order.id), now),
            system_message(
                format!(
                    "Payment of {} {} has been confirmed. Please process the delivery for {}.",
                    order.amount, order.currency, order.username
                ),
                now,
            ),
        ],
    };
    doc.chats.push(chat.clone());
    doc.log_activity(now, format!("Admin chat opened automatically for paid order {} ({})", order.id, order.username));
    Some(chat)
}

/// Open the plain order chat every order gets while payment is still outstanding.
fn open_order_chat(doc: &mut StateDocument, order: &Order, now: DateTime<Utc>) -> Chat {
    let chat = Chat {
        id: new_entity_id(),
        order_id: order.id.clone(),
        user_id: order.user_id.clone(),
        username: order.username.clone(),
        status: ChatStatus::Open,
        created_at: now,
        last_activity_at: now,
        response_minutes: None,
        messages: vec![
            system_message(format!("Chat opened for order {}", order.id), now),
            system_message(ORDER_CHAT_INTRO_MESSAGE, now),
        ],
    };
    doc.chats.push(chat.clone());
    chat
}
