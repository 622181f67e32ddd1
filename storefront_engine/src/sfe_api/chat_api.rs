use chrono::Utc;
use serde::Serialize;

use crate::{
    db_types::{ActivityEntry, Chat, ChatStatus, Message, Order, ADMIN_AUTHOR},
    helpers::new_entity_id,
    sfe_api::errors::ChatApiError,
    store::JsonStore,
};

/// A chat joined with the order it belongs to, as served to admins.
#[derive(Debug, Clone, Serialize)]
pub struct ChatWithOrder {
    #[serde(flatten)]
    pub chat: Chat,
    pub order: Option<Order>,
}

/// `ChatApi` serves the support-chat surface: customer chat listings and the admin back-office
/// operations (replying, opening/closing threads).
#[derive(Debug)]
pub struct ChatApi {
    store: JsonStore,
}

impl ChatApi {
    pub fn new(store: JsonStore) -> Self {
        Self { store }
    }

    pub async fn chats_for_user(&self, user_id: &str) -> Vec<Chat> {
        self.store.read(|doc| doc.chats.iter().filter(|c| c.user_id == user_id).cloned().collect()).await
    }

    pub async fn all_chats_with_orders(&self) -> Vec<ChatWithOrder> {
        self.store
            .read(|doc| {
                doc.chats
                    .iter()
                    .map(|chat| ChatWithOrder { chat: chat.clone(), order: doc.order(&chat.order_id).cloned() })
                    .collect()
            })
            .await
    }

    pub async fn chat_with_order(&self, chat_id: &str) -> Result<ChatWithOrder, ChatApiError> {
        self.store
            .read(|doc| {
                doc.chat_by_id(chat_id)
                    .map(|chat| ChatWithOrder { chat: chat.clone(), order: doc.order(&chat.order_id).cloned() })
                    .ok_or(ChatApiError::ChatNotFound)
            })
            .await
    }

    /// Append an admin reply to a chat.
    ///
    /// The first admin reply also freezes the chat's response time: the elapsed minutes between
    /// chat creation and that reply.
    pub async fn post_admin_message(&self, chat_id: &str, body: &str) -> Result<Message, ChatApiError> {
        let body = body.trim().to_string();
        if body.is_empty() {
            return Err(ChatApiError::EmptyMessage);
        }
        let chat_id = chat_id.to_string();
        let now = Utc::now();
        self.store
            .write_if(move |doc| {
                let Some(pos) = doc.chats.iter().position(|c| c.id == chat_id) else {
                    return (false, Err(ChatApiError::ChatNotFound));
                };
                let message =
                    Message { id: new_entity_id(), author: ADMIN_AUTHOR.to_string(), body, created_at: now };
                let chat = &mut doc.chats[pos];
                chat.messages.push(message.clone());
                chat.last_activity_at = now;
                if chat.response_minutes.is_none() {
                    let minutes = ((now - chat.created_at).num_seconds() as f64 / 60.0).round() as i64;
                    chat.response_minutes = Some(minutes);
                }
                let order_id = chat.order_id.clone();
                let username = chat.username.clone();
                doc.log_activity(now, format!("Admin replied to chat {order_id} ({username})"));
                (true, Ok(message))
            })
            .await?
    }

    /// Open or close a chat. Any other status string is rejected.
    pub async fn set_chat_status(&self, chat_id: &str, status: &str) -> Result<Chat, ChatApiError> {
        let status: ChatStatus = status.parse().map_err(|_| ChatApiError::InvalidStatus)?;
        let chat_id = chat_id.to_string();
        let now = Utc::now();
        self.store
            .write_if(move |doc| {
                let Some(pos) = doc.chats.iter().position(|c| c.id == chat_id) else {
                    return (false, Err(ChatApiError::ChatNotFound));
                };
                let chat = &mut doc.chats[pos];
                chat.status = status;
                chat.last_activity_at = now;
                let verb = if status == ChatStatus::Closed { "closed" } else { "reopened" };
                let order_id = chat.order_id.clone();
                let username = chat.username.clone();
                let updated = chat.clone();
                doc.log_activity(now, format!("Admin {verb} chat {order_id} ({username})"));
                (true, Ok(updated))
            })
            .await?
    }

    /// The most recent activity entries, newest first. Consumers display a bounded window; the
    /// log itself grows without bound.
    pub async fn recent_activity(&self, limit: usize) -> Vec<ActivityEntry> {
        self.store.read(|doc| doc.activity_log.iter().rev().take(limit).cloned().collect()).await
    }
}
