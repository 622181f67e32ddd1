use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

//--------------------------------------        OrderId        -------------------------------------------------------
/// A human-readable order identifier, e.g. `#30219`. The prefix is part of the id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------      OrderStatus      -------------------------------------------------------
/// The normalized order status. Providers report a much richer vocabulary; anything the
/// normalization table does not recognise is carried verbatim in `Other` until a later signal
/// classifies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Pending,
    Paid,
    Failed,
    Other(String),
}

impl OrderStatus {
    /// Normalize a raw provider status into an order status.
    ///
    /// | raw status family | normalized |
    /// |---|---|
    /// | finished, confirmed, completed | paid |
    /// | waiting, confirming, sending, partially_paid | pending |
    /// | failed, expired, refunded, chargeback | failed |
    /// | empty | pending |
    /// | anything else | the lowercased raw string, verbatim |
    pub fn from_provider(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        match normalized.as_str() {
            "finished" | "confirmed" | "completed" => Self::Paid,
            "waiting" | "confirming" | "sending" | "partially_paid" => Self::Pending,
            "failed" | "expired" | "refunded" | "chargeback" => Self::Failed,
            "" => Self::Pending,
            _ => Self::from(normalized),
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, Self::Paid)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" | "" => Self::Pending,
            "paid" => Self::Paid,
            "failed" => Self::Failed,
            _ => Self::Other(value),
        }
    }
}

impl From<OrderStatus> for String {
    fn from(value: OrderStatus) -> Self {
        value.to_string()
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Paid => write!(f, "paid"),
            Self::Failed => write!(f, "failed"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

//--------------------------------------        Payment        -------------------------------------------------------
/// The payment descriptor embedded in an order. Created together with the order and thereafter
/// mutated only by webhook reconciliation. `status` holds the provider's raw vocabulary; the
/// normalized form lives on [`Order::status`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub provider: String,
    /// Display label, resolved once and cached on the record. Documents written by older
    /// releases may miss it; the load-time backfill pass fills it in.
    #[serde(default)]
    pub provider_label: String,
    pub invoice_id: Option<String>,
    pub invoice_url: Option<String>,
    pub status: Option<String>,
    pub pay_currency: Option<String>,
    pub pay_amount: Option<f64>,
    pub actually_paid: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------         Order         -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: String,
    pub username: String,
    pub amount: f64,
    pub currency: String,
    pub product: String,
    /// Quantity of virtual currency being purchased. Null for non-quantity products.
    #[serde(default)]
    pub robux_amount: Option<i64>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub payment: Option<Payment>,
}

//--------------------------------------         Chats         -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatStatus {
    Open,
    Closed,
}

impl Display for ChatStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Valid status is required (open or closed)")]
pub struct InvalidChatStatus;

impl FromStr for ChatStatus {
    type Err = InvalidChatStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(InvalidChatStatus),
        }
    }
}

/// The author of a chat message is a free string: `system`, `admin`, or a customer username.
pub const SYSTEM_AUTHOR: &str = "system";
pub const ADMIN_AUTHOR: &str = "admin";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// A per-order support thread. At most one chat exists per order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    pub order_id: OrderId,
    pub user_id: String,
    pub username: String,
    pub status: ChatStatus,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    /// Minutes from chat creation to the first admin reply. Set exactly once.
    #[serde(default)]
    pub response_minutes: Option<i64>,
    pub messages: Vec<Message>,
}

//--------------------------------------     Users & roles     -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    /// Stored lowercased; lookups are case-insensitive.
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

//--------------------------------------        Session        -------------------------------------------------------
/// A bearer credential with an absolute expiry. Not refreshed on use; evicted lazily on the
/// first lookup after expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

//--------------------------------------      Activity log     -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}
