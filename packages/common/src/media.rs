//! Content-type sniffing for uploaded files.
//!
//! Declared filenames and client-supplied content types are never trusted;
//! the type is derived from the leading bytes of the payload.

/// Fallback type for payloads with no recognized signature.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Image types accepted for discussion attachments.
pub const ATTACHMENT_IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg", "image/gif"];

/// Image types accepted for profile pictures.
pub const PROFILE_IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg"];

/// Detects the MIME type of a byte payload.
pub trait TypeDetector: Send + Sync {
    fn detect(&self, bytes: &[u8]) -> &'static str;

    /// Detect the type and return it only if it is in `allowed`.
    fn detect_allowed(&self, bytes: &[u8], allowed: &[&str]) -> Result<&'static str, &'static str> {
        let mime = self.detect(bytes);
        if allowed.contains(&mime) {
            Ok(mime)
        } else {
            Err(mime)
        }
    }
}

/// Signature-based detector covering the formats the board deals with.
#[derive(Debug, Default, Clone, Copy)]
pub struct MagicBytesDetector;

const SIGNATURES: &[(&[u8], &str)] = &[
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"%PDF-", "application/pdf"),
    (b"PK\x03\x04", "application/zip"),
];

impl TypeDetector for MagicBytesDetector {
    fn detect(&self, bytes: &[u8]) -> &'static str {
        if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            return "image/webp";
        }
        SIGNATURES
            .iter()
            .find(|(magic, _)| bytes.starts_with(magic))
            .map(|(_, mime)| *mime)
            .unwrap_or(OCTET_STREAM)
    }
}
