//! # Media storage adapters
//!
//! Implementations of [`domains::ports::MediaStorage`]. Uploads reaching these
//! adapters have already been checked to be images by the services layer.

#[cfg(feature = "media-local")]
pub mod local;

#[cfg(feature = "media-cloudinary")]
pub mod cloudinary;

#[cfg(feature = "media-local")]
pub use local::LocalMediaStorage;

#[cfg(feature = "media-cloudinary")]
pub use cloudinary::CloudinaryMediaStorage;

/// File extension for the sniffed image format, `bin` when unknown.
pub fn extension_for(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .ok()
        .and_then(|format| format.extensions_str().first().copied())
        .unwrap_or("bin")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_png_and_jpeg() {
        assert_eq!(extension_for(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"), "png");
        assert_eq!(extension_for(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10]), "jpg");
    }

    #[test]
    fn unknown_bytes_fall_back() {
        assert_eq!(extension_for(b"plain text"), "bin");
    }
}
