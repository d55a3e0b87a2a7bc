//! Token resolution seam. Token issuance lives elsewhere; the server only
//! maps bearer tokens to already-provisioned identities.

use std::collections::HashMap;

use async_trait::async_trait;
use blackjack_shared::UserId;

use crate::config::TokenEntry;

/// A resolved player identity.
#[derive(Clone, Debug)]
pub struct Identity {
    pub user_id: UserId,
    pub name: String,
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Resolve a bearer token. None means unknown or expired.
    async fn resolve(&self, token: &str) -> Option<Identity>;
}

/// Static token table loaded from the config file.
#[derive(Default)]
pub struct StaticTokens {
    tokens: HashMap<String, Identity>,
}

impl StaticTokens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, token: &str, user_id: &str, name: &str) {
        self.tokens.insert(
            token.to_string(),
            Identity {
                user_id: UserId::from(user_id),
                name: name.to_string(),
            },
        );
    }

    pub fn from_config(entries: &HashMap<String, TokenEntry>) -> Self {
        let mut tokens = StaticTokens::new();
        for (token, entry) in entries {
            tokens.insert(token, &entry.user_id, &entry.name);
        }
        tokens
    }
}

#[async_trait]
impl Authenticator for StaticTokens {
    async fn resolve(&self, token: &str) -> Option<Identity> {
        self.tokens.get(token).cloned()
    }
}
