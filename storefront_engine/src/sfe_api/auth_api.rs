use chrono::{DateTime, Duration, Utc};
use log::*;

use crate::{
    db_types::{Role, Session, User},
    helpers::{new_entity_id, new_session_token, sha256_hex},
    sfe_api::errors::AuthApiError,
    store::{JsonStore, StateDocument},
};

/// Sessions expire a fixed period after issue and are not refreshed on use.
const SESSION_TTL_DAYS: i64 = 7;

/// `AuthApi` resolves bearer tokens to users and manages registration, login and the session
/// pool. Expired sessions are evicted lazily, on the first lookup that finds them stale.
#[derive(Debug)]
pub struct AuthApi {
    store: JsonStore,
}

impl AuthApi {
    pub fn new(store: JsonStore) -> Self {
        Self { store }
    }

    /// Register a new user account and log them in. The email is stored lowercased and must be
    /// unique, case-insensitively.
    pub async fn register(&self, email: &str, username: &str, password: &str) -> Result<(String, User), AuthApiError> {
        let email = email.to_lowercase();
        let username = username.to_string();
        let password_hash = sha256_hex(password);
        let now = Utc::now();
        self.store
            .write_if(move |doc| {
                if doc.user_by_email(&email).is_some() {
                    return (false, Err(AuthApiError::EmailTaken));
                }
                let user = User {
                    id: new_entity_id(),
                    email,
                    username,
                    password_hash,
                    role: Role::User,
                    created_at: now,
                    last_login_at: None,
                };
                doc.users.push(user.clone());
                let token = create_session(doc, &user.id, now);
                doc.log_activity(now, format!("User {} registered", user.username));
                (true, Ok((token, user)))
            })
            .await?
    }

    /// Verify credentials and issue a fresh session token.
    pub async fn login(&self, email: &str, password: &str) -> Result<(String, User), AuthApiError> {
        let email = email.to_lowercase();
        let password_hash = sha256_hex(password);
        let now = Utc::now();
        self.store
            .write_if(move |doc| {
                let Some(pos) = doc.users.iter().position(|u| u.email == email) else {
                    return (false, Err(AuthApiError::InvalidCredentials));
                };
                if doc.users[pos].password_hash != password_hash {
                    return (false, Err(AuthApiError::InvalidCredentials));
                }
                doc.users[pos].last_login_at = Some(now);
                let user = doc.users[pos].clone();
                let token = create_session(doc, &user.id, now);
                doc.log_activity(now, format!("User {} logged in", user.username));
                (true, Ok((token, user)))
            })
            .await?
    }

    /// Resolve a bearer token to its user, or `None` for unknown/expired tokens. Finding an
    /// expired session deletes it as a side effect.
    pub async fn authenticate(&self, token: &str) -> Result<Option<User>, AuthApiError> {
        let token = token.to_string();
        let now = Utc::now();
        let user = self
            .store
            .write_if(move |doc| {
                let Some(pos) = doc.sessions.iter().position(|s| s.token == token) else {
                    return (false, None);
                };
                if doc.sessions[pos].is_expired(now) {
                    let stale = doc.sessions.remove(pos);
                    debug!("🔐️ Evicted expired session for user {}", stale.user_id);
                    return (true, None);
                }
                let user_id = doc.sessions[pos].user_id.clone();
                (false, doc.user_by_id(&user_id).cloned())
            })
            .await?;
        Ok(user)
    }
}

fn create_session(doc: &mut StateDocument, user_id: &str, now: DateTime<Utc>) -> String {
    let token = new_session_token();
    doc.sessions.push(Session {
        token: token.clone(),
        user_id: user_id.to_string(),
        created_at: now,
        expires_at: now + Duration::days(SESSION_TTL_DAYS),
    });
    token
}
