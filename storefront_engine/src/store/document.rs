use chrono::{DateTime, TimeZone, Utc};
use log::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    db_types::{
        ActivityEntry,
        Chat,
        ChatStatus,
        Message,
        Order,
        OrderId,
        OrderStatus,
        Payment,
        Role,
        Session,
        User,
        SYSTEM_AUTHOR,
    },
    helpers::{new_entity_id, sha256_hex},
};

pub const DEFAULT_ADMIN_EMAIL: &str = "admin@storefront.local";
pub const DEFAULT_ADMIN_PASSWORD: &str = "ChangeMe123!";

/// The aggregate root: every top-level collection of the persisted document.
///
/// The engine only interprets the collections it owns. `settings` and the analytics sections
/// belong to subsystems outside the engine and are carried as opaque JSON so that a load/save
/// cycle never drops them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StateDocument {
    pub users: Vec<User>,
    pub sessions: Vec<Session>,
    pub orders: Vec<Order>,
    pub chats: Vec<Chat>,
    pub activity_log: Vec<ActivityEntry>,
    pub settings: Value,
    pub scripts: Value,
    pub script_visibility: Value,
    pub views: Value,
    pub view_timeline: Value,
    pub metrics: Value,
    pub robux_settings: Value,
}

impl Default for StateDocument {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            sessions: Vec::new(),
            orders: Vec::new(),
            chats: Vec::new(),
            activity_log: Vec::new(),
            settings: json!({}),
            scripts: json!([]),
            script_visibility: json!({}),
            views: json!({}),
            view_timeline: json!([]),
            metrics: json!({}),
            robux_settings: json!({}),
        }
    }
}

impl StateDocument {
    //----------------------------------------    Lookups    ---------------------------------------------------------

    pub fn order(&self, id: &OrderId) -> Option<&Order> {
        self.orders.iter().find(|o| &o.id == id)
    }

    pub fn order_position(&self, id: &OrderId) -> Option<usize> {
        self.orders.iter().position(|o| &o.id == id)
    }

    pub fn chat_for_order(&self, id: &OrderId) -> Option<&Chat> {
        self.chats.iter().find(|c| &c.order_id == id)
    }

    pub fn chat_by_id(&self, chat_id: &str) -> Option<&Chat> {
        self.chats.iter().find(|c| c.id == chat_id)
    }

    pub fn user_by_id(&self, user_id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == user_id)
    }

    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        let email = email.to_lowercase();
        self.users.iter().find(|u| u.email == email)
    }

    pub fn has_admin(&self) -> bool {
        self.users.iter().any(|u| u.role == Role::Admin)
    }

    //----------------------------------------    Mutators    --------------------------------------------------------

    /// Append a human-readable entry to the audit trail.
    pub fn log_activity(&mut self, now: DateTime<Utc>, message: impl Into<String>) {
        self.activity_log.push(ActivityEntry { id: new_entity_id(), timestamp: now, message: message.into() });
    }

    /// Seed a default admin account if none exists. Returns true when one was created.
    pub fn ensure_admin_user(&mut self, now: DateTime<Utc>) -> bool {
        if self.has_admin() {
            return false;
        }
        warn!("🗄️ No admin user found. Seeding the default admin account; change its password immediately.");
        self.users.push(User {
            id: new_entity_id(),
            email: DEFAULT_ADMIN_EMAIL.to_string(),
            username: "Admin".to_string(),
            password_hash: sha256_hex(DEFAULT_ADMIN_PASSWORD),
            role: Role::Admin,
            created_at: now,
            last_login_at: None,
        });
        true
    }

    /// One-shot backfill for documents written before payment records carried a display label.
    /// Returns the number of records that were patched.
    pub fn ensure_payment_shapes(&mut self, label_for: impl Fn(&str) -> String) -> usize {
        let mut patched = 0;
        for order in &mut self.orders {
            if let Some(payment) = &mut order.payment {
                if payment.provider_label.is_empty() {
                    payment.provider_label = label_for(&payment.provider);
                    patched += 1;
                }
            }
        }
        if patched > 0 {
            info!("🗄️ Backfilled provider labels on {patched} payment record(s)");
        }
        patched
    }

    //----------------------------------------    Defaults    --------------------------------------------------------

    /// Synthesize the document a brand-new deployment starts from: the default admin, two sample
    /// paid orders with their chats, and seeded analytics sections for the surrounding admin UI.
    pub fn default_document(now: DateTime<Utc>) -> Self {
        let mut doc = Self {
            orders: sample_orders(),
            chats: sample_chats(),
            settings: json!({
                "siteName": "Storefront",
                "siteTagline": "Premium game scripts",
                "chatEnabled": true,
                "loggingEnabled": true,
                "notificationsEnabled": true,
            }),
            views: json!({ "auto-rob-hub": 1580, "private-chat": 640 }),
            view_timeline: json!([
                { "date": "2025-10-08", "count": 310 },
                { "date": "2025-10-09", "count": 355 },
            ]),
            metrics: json!({ "chatResponseMinutes": 10 }),
            ..Self::default()
        };
        doc.ensure_admin_user(now);
        for (ts, message) in [
            ("2025-10-09T09:43:00Z", "New payment from Alex#123 (7.99 USD)"),
            ("2025-10-09T09:45:00Z", "Chat opened (Order #30219)"),
            ("2025-10-09T09:46:00Z", "Message sent by Admin"),
        ] {
            doc.activity_log.push(ActivityEntry {
                id: new_entity_id(),
                timestamp: ts.parse().unwrap_or(now),
                message: message.to_string(),
            });
        }
        doc
    }
}

fn sample_ts(hour: u32, min: u32) -> DateTime<Utc> {
    // Fixed timestamps keep the default document deterministic apart from generated ids.
    Utc.with_ymd_and_hms(2025, 10, 9, hour, min, 0).unwrap()
}

fn sample_payment(amount: f64, created_at: DateTime<Utc>) -> Payment {
    Payment {
        provider: "demo".to_string(),
        provider_label: "Demo Checkout".to_string(),
        invoice_id: None,
        invoice_url: None,
        status: Some("finished".to_string()),
        pay_currency: Some("USD".to_string()),
        pay_amount: Some(amount),
        actually_paid: Some(amount),
        created_at,
        updated_at: created_at,
    }
}

fn sample_orders() -> Vec<Order> {
    vec![
        Order {
            id: OrderId("#30219".to_string()),
            user_id: "sample-alex".to_string(),
            username: "Alex#123".to_string(),
            amount: 7.99,
            currency: "USD".to_string(),
            product: "Auto Rob Hub".to_string(),
            robux_amount: None,
            status: OrderStatus::Paid,
            created_at: sample_ts(9, 10),
            payment: Some(sample_payment(7.99, sample_ts(9, 10))),
        },
        Order {
            id: OrderId("#30220".to_string()),
            user_id: "sample-julian".to_string(),
            username: "Julian".to_string(),
            amount: 14.5,
            currency: "USD".to_string(),
            product: "Private Chat".to_string(),
            robux_amount: None,
            status: OrderStatus::Paid,
            created_at: sample_ts(9, 15),
            payment: Some(sample_payment(14.5, sample_ts(9, 15))),
        },
    ]
}

fn sample_message(author: &str, body: &str, at: DateTime<Utc>) -> Message {
    Message { id: new_entity_id(), author: author.to_string(), body: body.to_string(), created_at: at }
}

fn sample_chats() -> Vec<Chat> {
    vec![
        Chat {
            id: new_entity_id(),
            order_id: OrderId("#30219".to_string()),
            user_id: "sample-alex".to_string(),
            username: "Alex#123".to_string(),
            status: ChatStatus::Open,
            created_at: sample_ts(9, 45),
            last_activity_at: sample_ts(9, 46),
            response_minutes: Some(12),
            messages: vec![
                sample_message(SYSTEM_AUTHOR, "Chat opened for order #30219", sample_ts(9, 45)),
                sample_message("Alex#123", "Hi, just placed an order! Let me know when you are ready.", sample_ts(9, 45)),
                sample_message("admin", "Thanks Alex! I will deliver within the hour.", sample_ts(9, 46)),
            ],
        },
        Chat {
            id: new_entity_id(),
            order_id: OrderId("#30220".to_string()),
            user_id: "sample-julian".to_string(),
            username: "Julian".to_string(),
            status: ChatStatus::Closed,
            created_at: sample_ts(9, 45),
            last_activity_at: sample_ts(10, 5),
            response_minutes: Some(8),
            messages: vec![
                sample_message(SYSTEM_AUTHOR, "Chat opened for order #30220", sample_ts(9, 45)),
                sample_message("Julian", "Looking forward to the private coaching session.", sample_ts(9, 47)),
                sample_message("admin", "Scheduled for tonight 20:00 CET. See you there!", sample_ts(9, 48)),
            ],
        },
    ]
}
