//! Session token handling and persistence.
//!
//! The session is persisted under a single storage key as
//! `{"state": {"user", "token", "isAuthenticated"}, "version": 0}`, the
//! layout earlier releases of the web client wrote, so existing browser
//! sessions survive an upgrade.

use std::cell::RefCell;
use std::collections::HashMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::User;

/// Errors raised while reading a session token or its persisted copy.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The token is not a three-part `header.payload.signature` string
    #[error("Malformed token: expected 3 segments, found {0}")]
    MalformedToken(usize),

    /// The payload segment is not valid base64
    #[error("Token payload is not base64: {0}")]
    PayloadEncoding(#[from] base64::DecodeError),

    /// The payload is not a JSON claims object
    #[error("Token payload is not JSON: {0}")]
    PayloadJson(#[from] serde_json::Error),
}

/// Claims the client reads from the token payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    /// Expiry as seconds since the epoch.
    pub exp: Option<i64>,
}

impl TokenClaims {
    /// Decode the (unverified) claims of a JWT-style token.
    pub fn decode(token: &str) -> Result<Self, SessionError> {
        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 {
            return Err(SessionError::MalformedToken(segments.len()));
        }
        // Some issuers pad the payload; the URL-safe engine rejects padding.
        let payload = segments[1].trim_end_matches('=');
        let bytes = URL_SAFE_NO_PAD.decode(payload)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// True when the token carries an expiry strictly before `now_secs`.
    pub fn is_expired(&self, now_secs: i64) -> bool {
        self.exp.is_some_and(|exp| exp < now_secs)
    }
}

/// The authenticated session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: User,
}

impl Session {
    pub fn claims(&self) -> Result<TokenClaims, SessionError> {
        TokenClaims::decode(&self.token)
    }
}

/// Key/value string storage (browser `localStorage` or an in-memory map).
pub trait SessionStorage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory storage, used off the browser and in tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedState {
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    is_authenticated: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedEnvelope {
    #[serde(default)]
    state: PersistedState,
    #[serde(default)]
    version: u32,
}

/// Read the persisted session; unreadable entries count as absent.
pub fn load_session(storage: &dyn SessionStorage, key: &str) -> Option<Session> {
    let text = storage.get(key)?;
    let envelope: PersistedEnvelope = match serde_json::from_str(&text) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(error = %e, "discarding unreadable persisted session");
            return None;
        }
    };
    let PersistedState { user, token, .. } = envelope.state;
    Some(Session {
        token: token?,
        user: user?,
    })
}

/// Persist `session`, or clear the stored copy when `None`.
pub fn store_session(storage: &dyn SessionStorage, key: &str, session: Option<&Session>) {
    let Some(session) = session else {
        storage.remove(key);
        return;
    };
    let envelope = PersistedEnvelope {
        state: PersistedState {
            user: Some(session.user.clone()),
            token: Some(session.token.clone()),
            is_authenticated: true,
        },
        version: 0,
    };
    match serde_json::to_string(&envelope) {
        Ok(text) => storage.set(key, &text),
        Err(e) => tracing::warn!(error = %e, "failed to persist session"),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;
    use serde_json::Value;

    /// Build an unsigned token whose payload is `claims`.
    pub fn token_with(claims: Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{payload}.sig")
    }
}
