//! Upload validation and content fingerprinting for training photos.
//!
//! Fingerprints are SHA-256 hex digests of the original upload bytes and
//! back the per-user duplicate check: the same photo uploaded twice by
//! one user is rejected, while two users may upload identical bytes.

use sha2::{Digest, Sha256};

use crate::error::CoreError;

/// Maximum accepted upload size.
pub const MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;

/// Minimum width and height. The trainer degrades sharply below this.
pub const MIN_PHOTO_DIMENSION: u32 = 256;

/// Accepted content types, paired with the storage-key extension.
pub const ALLOWED_CONTENT_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
];

/// Validate the declared content type and byte size of an upload.
pub fn validate_upload(content_type: &str, size_bytes: usize) -> Result<(), CoreError> {
    if extension_for(content_type).is_none() {
        return Err(CoreError::Validation(format!(
            "Unsupported photo type '{content_type}'. Accepted: JPEG, PNG, WebP"
        )));
    }
    if size_bytes == 0 {
        return Err(CoreError::Validation("Photo upload is empty".to_string()));
    }
    if size_bytes > MAX_PHOTO_BYTES {
        return Err(CoreError::Validation(format!(
            "Photo exceeds the {} MB upload limit",
            MAX_PHOTO_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Validate decoded pixel dimensions.
pub fn validate_dimensions(width: u32, height: u32) -> Result<(), CoreError> {
    if width < MIN_PHOTO_DIMENSION || height < MIN_PHOTO_DIMENSION {
        return Err(CoreError::Validation(format!(
            "Photo is {width}x{height}; at least {MIN_PHOTO_DIMENSION}x{MIN_PHOTO_DIMENSION} is required"
        )));
    }
    Ok(())
}

/// Storage-key extension for an accepted content type.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    ALLOWED_CONTENT_TYPES
        .iter()
        .find(|(ct, _)| *ct == content_type)
        .map(|(_, ext)| *ext)
}

/// SHA-256 hex fingerprint of the upload bytes.
pub fn content_fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{digest:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_supported_types_within_limits() {
        assert!(validate_upload("image/jpeg", 1024).is_ok());
        assert!(validate_upload("image/png", MAX_PHOTO_BYTES).is_ok());
    }

    #[test]
    fn rejects_unsupported_type_empty_and_oversized() {
        assert!(validate_upload("image/gif", 1024).is_err());
        assert!(validate_upload("image/jpeg", 0).is_err());
        assert!(validate_upload("image/jpeg", MAX_PHOTO_BYTES + 1).is_err());
    }

    #[test]
    fn rejects_undersized_dimensions() {
        assert!(validate_dimensions(256, 256).is_ok());
        assert!(validate_dimensions(255, 512).is_err());
        assert!(validate_dimensions(512, 1).is_err());
    }

    #[test]
    fn fingerprint_is_stable_and_hex() {
        let bytes = b"not really a photo";
        let a = content_fingerprint(bytes);
        let b = content_fingerprint(bytes);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, content_fingerprint(b"different bytes"));
    }

    #[test]
    fn extensions_match_content_types() {
        assert_eq!(extension_for("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for("image/webp"), Some("webp"));
        assert_eq!(extension_for("application/pdf"), None);
    }
}
