//! imghost WASM - browser bindings for the imghost web client
//!
//! Wraps `imghost-core` for the views: the network goes through `fetch`
//! and `XMLHttpRequest`, the session persists in `localStorage`, and
//! `tracing` output lands in the browser console.
//!
//! # Module Structure
//!
//! - `app` - `ImageHostApp`, the stores and every API operation
//! - `preview` - image editor (filters, rotate, scale, JPEG export)
//! - `decode` / `encode` - image bytes to pixels and back
//! - `forms` - validation and formatting helpers for the views
//! - `transport` / `storage` / `logging` - browser plumbing
//!
//! # Usage
//!
//! ```typescript
//! import init, { ImageHostApp } from '@imghost/wasm';
//!
//! await init();
//! const app = new ImageHostApp({ apiBaseUrl: '' });
//! app.on_notification((n) => toast(n.message));
//! if (app.initialize()) {
//!   await app.fetch_images();
//! }
//! ```

use wasm_bindgen::prelude::*;

mod app;
mod decode;
mod encode;
mod forms;
mod logging;
mod preview;
mod storage;
mod transport;
mod types;

pub use app::ImageHostApp;
pub use decode::{decode_image, image_orientation};
pub use encode::encode_jpeg;
pub use forms::{
    check_upload, file_extension, format_date, format_file_size, format_number,
    format_percentage, format_relative_time, password_strength, truncate_text, validate_login,
    validate_password_change, validate_profile, validate_registration,
};
pub use preview::{preset_ids, JsImagePreviewer};
pub use types::JsDecodedImage;

/// Runs when the module loads: installs console logging at `info`.
#[wasm_bindgen(start)]
pub fn init() {
    logging::install(tracing::Level::INFO);
}

/// Change the console log level (`"trace"` to `"error"`).
#[wasm_bindgen]
pub fn set_log_level(level: &str) -> Result<(), JsValue> {
    let level = logging::parse_level(level)
        .ok_or_else(|| JsValue::from_str(&format!("Unknown log level: {level}")))?;
    logging::set_max_level(level);
    Ok(())
}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
