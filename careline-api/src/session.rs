//! Authentication context passed into every clinic API call.

use serde::{Deserialize, Serialize};

/// The two audiences of the clinic API.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Staff,
    Patient,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
    role: Option<Role>,
}

impl Session {
    pub fn new(token: impl Into<String>, role: Role) -> Self {
        let mut session = Self::default();
        session.login(token, role);
        session
    }

    pub fn login(&mut self, token: impl Into<String>, role: Role) {
        let token = token.into();
        let token = token.trim();
        self.token = (!token.is_empty()).then(|| token.to_string());
        self.role = self.token.as_ref().map(|_| role);
    }

    pub fn logout(&mut self) {
        self.token = None;
        self.role = None;
    }

    /// Clear the session when the API answered 401 or 403.
    ///
    /// Returns whether the status was an authorization failure.
    pub fn clear_on(&mut self, status: u16) -> bool {
        if !is_auth_failure(status) {
            return false;
        }
        if self.is_authenticated() {
            tracing::info!(status, role = ?self.role, "clearing session after rejected credentials");
        }
        self.logout();
        true
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> Option<String> {
        self.token.as_ref().map(|token| format!("Bearer {token}"))
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

pub fn is_auth_failure(status: u16) -> bool {
    matches!(status, 401 | 403)
}
