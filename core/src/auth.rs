//! Credentials held by a client and their injection into requests.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const SESSION_PARAM: &str = "sessionID";
pub const API_KEY_PARAM: &str = "apiKey";

/// The credential a client authenticates with.
///
/// A session id takes precedence over an API key. The session id and user id
/// are set by `login` and cleared by `logout`; the API key is long-lived.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub session_id: Option<String>,
    pub api_key: Option<String>,
    pub user_id: Option<String>,
}

impl Credentials {
    pub fn api_key(key: impl Into<String>) -> Self {
        Self {
            api_key: Some(key.into()),
            ..Self::default()
        }
    }

    pub fn session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            ..Self::default()
        }
    }

    /// The single `(name, value)` pair to attach to an outgoing request.
    pub fn auth_pair(&self) -> Result<(String, String), ApiError> {
        if let Some(session) = self.session_id.as_deref().filter(|s| !s.is_empty()) {
            return Ok((SESSION_PARAM.to_string(), session.to_string()));
        }
        if let Some(key) = self.api_key.as_deref().filter(|s| !s.is_empty()) {
            return Ok((API_KEY_PARAM.to_string(), key.to_string()));
        }
        Err(ApiError::MissingCredentials)
    }

    pub fn clear_session(&mut self) {
        self.session_id = None;
        self.user_id = None;
    }
}
