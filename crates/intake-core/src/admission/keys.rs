//! Counter store key layout.
//!
//! `{prefix}:policy:{user}`, `{prefix}:usage:{kind}:{window_start}:{user}`,
//! `{prefix}:lock:{user}` and `{prefix}:dup:{request}`. The namespace
//! segment always precedes caller-supplied text, and the numeric window
//! start precedes the user id, so keys from different namespaces or windows
//! cannot collide whatever the identifiers contain.

use chrono::{DateTime, Utc};

use crate::domain::WindowKind;

pub const DEFAULT_KEY_PREFIX: &str = "intake";

#[derive(Debug, Clone)]
pub struct KeySpace {
    prefix: String,
}

impl Default for KeySpace {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PREFIX)
    }
}

impl KeySpace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn policy(&self, user_id: &str) -> String {
        format!("{}:policy:{}", self.prefix, user_id)
    }

    pub fn usage(&self, kind: WindowKind, window_start: DateTime<Utc>, user_id: &str) -> String {
        format!(
            "{}:usage:{}:{}:{}",
            self.prefix,
            kind,
            window_start.timestamp(),
            user_id
        )
    }

    pub fn lock(&self, user_id: &str) -> String {
        format!("{}:lock:{}", self.prefix, user_id)
    }

    pub fn duplicate(&self, request_id: &str) -> String {
        format!("{}:dup:{}", self.prefix, request_id)
    }
}
