//! Image encoding for saving edits back to the service.
//!
//! Edited images are re-encoded as JPEG before upload. All operations are
//! synchronous and single-threaded within WASM.

mod jpeg;

pub use jpeg::{encode_jpeg, quality_from_factor, EncodeError};
