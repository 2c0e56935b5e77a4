//! Image upload screening. Runs before anything reaches the media host.

use domains::errors::{FieldError, Result};
use domains::models::Upload;

use crate::validation::Validator;

pub const IMAGE_FIELD: &str = "image";
const NOT_AN_IMAGE: &str = "Only image files are allowed";

/// The declared type, or a guess from the file name when none was sent.
fn declared_type(upload: &Upload) -> Option<mime::Mime> {
    upload.content_type.clone().or_else(|| {
        upload
            .file_name
            .as_deref()
            .and_then(|name| mime_guess::from_path(name).first())
    })
}

/// Accepts an upload only when both its declared type and its bytes say image.
pub fn validate_image(upload: &Upload) -> Result<()> {
    let declared_ok = declared_type(upload).is_some_and(|m| m.type_() == mime::IMAGE);
    let sniffed_ok = !upload.bytes.is_empty() && image::guess_format(&upload.bytes).is_ok();

    let mut v = Validator::new();
    if !(declared_ok && sniffed_ok) {
        v.push(FieldError::new(IMAGE_FIELD, NOT_AN_IMAGE));
    }
    v.finish()
}
