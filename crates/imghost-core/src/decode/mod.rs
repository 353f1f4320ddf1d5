//! Image decoding for the editor.
//!
//! Bytes come from a file picked for upload or from an image already hosted
//! by the service. JPEG, PNG and WebP are recognised from their content and
//! decoded to an RGB [`DecodedImage`] with EXIF orientation applied.
//!
//! All operations are synchronous and single-threaded within WASM.

mod reader;
mod types;

pub use reader::{decode_image, get_orientation};
pub use types::{DecodeError, DecodedImage, Orientation};
