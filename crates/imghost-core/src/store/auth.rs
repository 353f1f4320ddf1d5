//! Authentication state: the current session, its persistence, and the
//! account-settings operations.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::Activity;
use crate::api::{
    decode, expect_success, ApiClient, ApiError, AuthResponse, Credentials, HttpRequest,
    ProfileUpdate, Registration, Reply, UserResponse,
};
use crate::config::ClientConfig;
use crate::model::User;
use crate::session::{load_session, store_session, Session, SessionStorage};

/// Holds the session and mirrors it into [`SessionStorage`].
#[derive(Debug, Clone)]
pub struct AuthStore {
    session: Option<Session>,
    storage_key: String,
    activity: Activity,
}

impl AuthStore {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            session: None,
            storage_key: config.auth_storage_key.clone(),
            activity: Activity::default(),
        }
    }

    /// Restore the persisted session.
    ///
    /// Returns `true` when a usable session was found. A token whose `exp`
    /// claim lies before `now_secs`, or whose payload cannot be read, is
    /// discarded and the user is treated as logged out.
    pub fn initialize(&mut self, storage: &dyn SessionStorage, now_secs: i64) -> bool {
        let Some(session) = load_session(storage, &self.storage_key) else {
            return false;
        };
        match session.claims() {
            Ok(claims) if claims.is_expired(now_secs) => {
                warn!(exp = ?claims.exp, now = now_secs, "persisted session expired");
                self.logout(storage);
                false
            }
            Ok(_) => {
                debug!(user = %session.user.username, "restored session");
                self.session = Some(session);
                true
            }
            Err(e) => {
                warn!(error = %e, "persisted session token unreadable");
                self.logout(storage);
                false
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }

    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.token.as_str())
    }

    /// An [`ApiClient`] carrying this session's bearer token.
    pub fn client(&self, config: &ClientConfig) -> ApiClient {
        ApiClient::new(config).with_token(self.token())
    }

    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    pub fn clear_error(&mut self) {
        self.activity.clear_error();
    }

    /// Drop the session and its persisted copy.
    pub fn logout(&mut self, storage: &dyn SessionStorage) {
        self.session = None;
        self.activity.clear_error();
        store_session(storage, &self.storage_key, None);
    }

    /// Apply the global 401 policy: any unauthorized reply ends the session.
    ///
    /// Returns `true` when the session was cleared.
    pub fn handle_unauthorized(&mut self, storage: &dyn SessionStorage, err: &ApiError) -> bool {
        if !err.requires_login() {
            return false;
        }
        warn!("service rejected the session token");
        self.logout(storage);
        true
    }

    // ===== Login / register =====

    pub fn login_request(&mut self, client: &ApiClient, credentials: &Credentials) -> HttpRequest {
        self.activity.begin();
        client.login(credentials)
    }

    pub fn finish_login(
        &mut self,
        storage: &dyn SessionStorage,
        reply: Reply,
    ) -> Result<User, ApiError> {
        self.finish_sign_in(storage, reply, "Login failed")
    }

    pub fn register_request(
        &mut self,
        client: &ApiClient,
        registration: &Registration,
    ) -> HttpRequest {
        self.activity.begin();
        client.register(registration)
    }

    pub fn finish_register(
        &mut self,
        storage: &dyn SessionStorage,
        reply: Reply,
    ) -> Result<User, ApiError> {
        self.finish_sign_in(storage, reply, "Registration failed")
    }

    fn finish_sign_in(
        &mut self,
        storage: &dyn SessionStorage,
        reply: Reply,
        fallback: &str,
    ) -> Result<User, ApiError> {
        match decode::<AuthResponse>(reply) {
            Ok(AuthResponse { user, token }) => {
                self.activity.succeed();
                debug!(user = %user.username, "signed in");
                self.set_session(
                    storage,
                    Session {
                        token,
                        user: user.clone(),
                    },
                );
                Ok(user)
            }
            Err(e) => {
                self.activity.fail(&e, fallback);
                Err(e)
            }
        }
    }

    // ===== Account settings =====

    pub fn update_profile_request(
        &mut self,
        client: &ApiClient,
        update: &ProfileUpdate,
    ) -> HttpRequest {
        self.activity.begin();
        client.update_profile(update)
    }

    pub fn finish_update_profile(
        &mut self,
        storage: &dyn SessionStorage,
        reply: Reply,
    ) -> Result<User, ApiError> {
        self.finish_user_reply(storage, reply, "Could not update profile")
    }

    pub fn change_password_request(
        &mut self,
        client: &ApiClient,
        current_password: &str,
        new_password: &str,
    ) -> HttpRequest {
        self.activity.begin();
        client.change_password(current_password, new_password)
    }

    pub fn finish_change_password(&mut self, reply: Reply) -> Result<(), ApiError> {
        match expect_success(reply) {
            Ok(()) => {
                self.activity.succeed();
                Ok(())
            }
            Err(e) => {
                self.activity.fail(&e, "Could not change password");
                Err(e)
            }
        }
    }

    pub fn update_avatar_request(&mut self, client: &ApiClient, avatar_url: &str) -> HttpRequest {
        self.activity.begin();
        client.update_avatar(avatar_url)
    }

    pub fn finish_update_avatar(
        &mut self,
        storage: &dyn SessionStorage,
        reply: Reply,
    ) -> Result<User, ApiError> {
        self.finish_user_reply(storage, reply, "Could not update avatar")
    }

    pub fn fetch_user_request(&mut self, client: &ApiClient) -> HttpRequest {
        self.activity.begin();
        client.current_user()
    }

    /// Refresh the cached user. A 401 ends the session.
    pub fn finish_fetch_user(
        &mut self,
        storage: &dyn SessionStorage,
        reply: Reply,
    ) -> Result<User, ApiError> {
        let result = self.finish_user_reply(storage, reply, "Could not load user");
        if let Err(e) = &result {
            self.handle_unauthorized(storage, e);
        }
        result
    }

    fn finish_user_reply(
        &mut self,
        storage: &dyn SessionStorage,
        reply: Reply,
        fallback: &str,
    ) -> Result<User, ApiError> {
        match decode::<UserResponse>(reply) {
            Ok(UserResponse { user }) => {
                self.activity.succeed();
                if let Some(session) = &self.session {
                    let session = Session {
                        token: session.token.clone(),
                        user: user.clone(),
                    };
                    self.set_session(storage, session);
                }
                Ok(user)
            }
            Err(e) => {
                self.activity.fail(&e, fallback);
                Err(e)
            }
        }
    }

    /// Merge locally edited fields into the cached user.
    pub fn update_user(
        &mut self,
        storage: &dyn SessionStorage,
        patch: &Map<String, Value>,
    ) -> Result<(), serde_json::Error> {
        let Some(session) = &self.session else {
            return Ok(());
        };
        let mut current = match serde_json::to_value(&session.user)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in patch {
            current.insert(key.clone(), value.clone());
        }
        let user: User = serde_json::from_value(Value::Object(current))?;
        let session = Session {
            token: session.token.clone(),
            user,
        };
        self.set_session(storage, session);
        Ok(())
    }

    fn set_session(&mut self, storage: &dyn SessionStorage, session: Session) {
        store_session(storage, &self.storage_key, Some(&session));
        self.session = Some(session);
    }
}
