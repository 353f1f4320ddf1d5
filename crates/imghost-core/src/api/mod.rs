//! Boundary with the remote image-hosting service.
//!
//! This module describes requests and interprets replies; it never performs
//! I/O itself. The flow for every operation is:
//!
//! 1. A store (or [`ApiClient`] directly) builds an [`HttpRequest`].
//! 2. The host sends it (browser `fetch`/XHR in the WASM crate).
//! 3. The resulting [`Reply`] is handed back to the store, which decodes it
//!    and updates its state.
//!
//! # Errors
//!
//! Every failure is an [`ApiError`]. An HTTP 401 means the session is gone;
//! callers clear it and send the user to the login view (see
//! [`ApiError::requires_login`]). Nothing is retried.

mod client;
mod error;
mod request;

pub use client::{
    decode, expect_success, ApiClient, AuthResponse, BatchAction, Credentials, FilePatchResponse,
    ImageList, ImagePage, ImageQuery, ImageUpdate, ProfileUpdate, Registration, TagDraft,
    TagList, TagResponse, UserResponse,
};
pub use error::{ApiError, Notification, NotificationLevel};
pub use request::{Body, FilePart, HttpRequest, HttpResponse, Method, Reply, TransportError};
