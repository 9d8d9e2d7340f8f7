//! Concrete adapter bindings.
//!
//! - [`NativeAdapter`]: format-specific codec crates (png, optionally zenjpeg)
//!   with true row-at-a-time streaming for PNG.
//! - [`ImageRsAdapter`]: the `image` crate toolkit, covering every format it
//!   was built with.

use std::path::Path;

use crate::ImageFormat;

#[cfg(feature = "native")]
mod native;
#[cfg(feature = "native")]
pub use native::NativeAdapter;

#[cfg(feature = "image-rs")]
mod image_rs;
#[cfg(feature = "image-rs")]
pub use image_rs::ImageRsAdapter;

/// Resolve the format an adapter should try for `path`.
///
/// Magic bytes win. The extension is consulted only when the header is too
/// short to judge or names a format without a signature.
pub(crate) fn sniff(path: &Path, header: &[u8]) -> Option<ImageFormat> {
    if let Some(format) = ImageFormat::detect(header) {
        return Some(format);
    }
    let by_ext = ImageFormat::from_path(path)?;
    let inconclusive = header.len() < ImageFormat::max_signature_len();
    if inconclusive || by_ext == ImageFormat::Tga {
        Some(by_ext)
    } else {
        None
    }
}
