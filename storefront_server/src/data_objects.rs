use serde::{Deserialize, Serialize};
use storefront_engine::db_types::{Role, User};

/// The projection of a user that is safe to hand to clients.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub username: String,
    pub role: Role,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self { id: user.id.clone(), email: user.email.clone(), username: user.username.clone(), role: user.role }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterParams {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginParams {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Body of `POST /api/orders`. Presence of amount and product is validated by the order flow.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderParams {
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub product: Option<String>,
    pub robux_amount: Option<i64>,
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessageParams {
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatStatusParams {
    pub status: Option<String>,
}
