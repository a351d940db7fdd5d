#![allow(dead_code)]

use serde::{Deserialize, Serialize};

/// Role tag attached to every user record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    /// Parses the role string the backend sends. Anything unrecognized
    /// falls back to the ordinary user role.
    pub fn parse(s: &str) -> Self {
        match s {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

/// Canonical user record. All remote payload shapes are normalized into
/// this type at the API boundary before the coordinator ever sees them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// The authenticated session: an opaque token plus the user it belongs to.
///
/// Holding both in one struct is what enforces the session invariant:
/// there is no reachable state with a token but no user, or vice versa.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// Signup form data as collected by the caller.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}
