//! Player identity and group membership views.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a player, as resolved from their bearer token.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct UserId(pub String);

impl From<&str> for UserId {
    fn from(v: &str) -> Self {
        UserId(v.to_string())
    }
}

impl From<String> for UserId {
    fn from(v: String) -> Self {
        UserId(v)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of a group membership view.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupMember {
    pub user_id: UserId,
    pub name: String,
    pub is_ready: bool,
    pub in_waiting_room: bool,
}
