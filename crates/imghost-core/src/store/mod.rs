//! Client-side state containers.
//!
//! Each store is an explicit value owned by the caller; there are no global
//! singletons. Network operations are split in two halves:
//!
//! - a `*_request` method that records the intent (loading flag, optimistic
//!   change) and returns the [`HttpRequest`](crate::api::HttpRequest) to send;
//! - a `finish_*` method that takes the [`Reply`](crate::api::Reply) and
//!   folds it into the state.
//!
//! Nothing is borrowed across the network round trip, so a host may keep a
//! store behind a `RefCell` and release it while waiting for the reply.

mod auth;
mod favorites;
mod images;
mod tags;

pub use auth::AuthStore;
pub use favorites::{
    FavoriteMutation, FavoriteStore, MutationKind, MutationState, SettleOutcome, Ticket,
    ToggleOutcome,
};
pub use images::{DeleteReport, FetchTicket, Filters, ImageStore, SortBy, ViewMode};
pub use tags::TagStore;

use crate::api::ApiError;

/// Loading flag and last error message shared by every store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Activity {
    loading: bool,
    error: Option<String>,
}

impl Activity {
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub(crate) fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    pub(crate) fn succeed(&mut self) {
        self.loading = false;
        self.error = None;
    }

    /// Record a failure using the service's message or `fallback`.
    pub(crate) fn fail(&mut self, err: &ApiError, fallback: &str) {
        self.loading = false;
        self.error = Some(err.message_or(fallback));
    }

    /// Record a failure without touching the loading flag.
    pub(crate) fn note(&mut self, err: &ApiError, fallback: &str) {
        self.error = Some(err.message_or(fallback));
    }
}
