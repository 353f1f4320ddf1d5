//! imghost core - client logic for the image-hosting web app
//!
//! Everything here is plain Rust with no I/O: the WASM crate owns the
//! browser (fetch, XHR, localStorage) and drives these types.
//!
//! - [`api`]: request descriptions, reply decoding, error normalization
//! - [`store`]: auth, image, favorite and tag state
//! - [`session`]: persisted login and token expiry
//! - [`preview`]: filter/rotate/scale preview and JPEG export
//! - [`validation`], [`format`], [`upload`]: form and file helpers

pub mod api;
pub mod config;
pub mod decode;
pub mod encode;
pub mod format;
pub mod model;
pub mod preview;
pub mod session;
pub mod store;
pub mod upload;
pub mod validation;

pub use api::{ApiClient, ApiError, HttpRequest, HttpResponse, Reply};
pub use config::ClientConfig;
pub use model::{ImageRecord, Pagination, RecordId, Tag, Timestamp, User};
pub use preview::{ImagePreviewer, PreviewParams, Preset};
pub use session::{Session, SessionStorage};
pub use store::{AuthStore, FavoriteStore, ImageStore, TagStore};
