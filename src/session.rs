use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::kv::KvStore;

pub const USER_KEY: &str = "user";
pub const DEMO_PASSWORD: &str = "password";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,
}

fn demo_users() -> Vec<User> {
    vec![
        User {
            id: "1".to_string(),
            email: "admin@example.com".to_string(),
            name: "Admin User".to_string(),
            role: Role::Admin,
            img: None,
        },
        User {
            id: "2".to_string(),
            email: "user@example.com".to_string(),
            name: "Regular User".to_string(),
            role: Role::User,
            img: None,
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error(
        "Invalid credentials. Try admin@example.com / password or user@example.com / password"
    )]
    InvalidCredentials,
    #[error("Not logged in. Run `news login admin@example.com`")]
    LoggedOut,
    #[error("{0} is not an admin; payouts are restricted to admins")]
    NotAdmin(String),
}

/// The logged-in user, mirrored into the key-value store.
pub struct Session {
    kv: KvStore,
    user: Option<User>,
}

impl Session {
    /// A stored user that fails to parse is dropped and the session starts logged out.
    pub fn restore(kv: KvStore) -> anyhow::Result<Self> {
        let user = kv.get::<User>(USER_KEY)?;
        Ok(Self { kv, user })
    }

    pub fn login(&mut self, email: &str, password: &str) -> anyhow::Result<&User> {
        let found = demo_users()
            .into_iter()
            .find(|u| u.email.eq_ignore_ascii_case(email.trim()))
            .filter(|_| password == DEMO_PASSWORD)
            .ok_or(SessionError::InvalidCredentials)?;
        self.kv.set(USER_KEY, &found)?;
        info!(email = %found.email, "logged in");
        Ok(self.user.insert(found))
    }

    pub fn logout(&mut self) -> anyhow::Result<()> {
        self.user = None;
        self.kv.remove(USER_KEY)
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn require_admin(&self) -> Result<&User, SessionError> {
        match &self.user {
            None => Err(SessionError::LoggedOut),
            Some(u) if u.role != Role::Admin => Err(SessionError::NotAdmin(u.email.clone())),
            Some(u) => Ok(u),
        }
    }
}
