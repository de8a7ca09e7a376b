//! Upload relay policy and descriptors.
//!
//! The relay evaluates an [`UploadPolicy`] against each multipart file part
//! before writing anything to storage. Rejected parts are silently dropped
//! (the filter is advisory at the parsing layer, not a validating gate), and
//! parts without a filename are skipped.

use serde::Serialize;
use uuid::Uuid;

use crate::audio;

/// Maximum accepted file size (200 MiB).
pub const MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

/// Multipart field name the relay treats as the file payload.
pub const FILE_FIELD: &str = "file";

/// Decision returned by [`UploadPolicy::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartDecision {
    /// Write the part to storage.
    Accept,
    /// Drop the part without error; no storage write occurs.
    Reject,
    /// The part has no filename; skip it entirely.
    Skip,
}

/// Per-part accept/reject predicate over `(filename, content type, field name)`.
#[derive(Debug, Clone, Default)]
pub struct UploadPolicy {
    /// When `true`, only [`audio::ALLOWED_AUDIO_TYPES`] pass the filter.
    pub audio_only: bool,
}

impl UploadPolicy {
    /// Policy that admits only playable audio content types.
    pub fn audio() -> Self {
        Self { audio_only: true }
    }

    /// Evaluate one multipart part. Called before any bytes are persisted.
    pub fn evaluate(
        &self,
        filename: Option<&str>,
        content_type: &str,
        field_name: &str,
    ) -> PartDecision {
        if field_name != FILE_FIELD {
            return PartDecision::Skip;
        }
        match filename {
            None | Some("") => PartDecision::Skip,
            Some(_) if self.audio_only && !audio::is_allowed_content_type(content_type) => {
                PartDecision::Reject
            }
            Some(_) => PartDecision::Accept,
        }
    }
}

/// Generate a unique storage key for an uploaded file.
///
/// Keys are `{uuid}/{filename}`: unique per upload while preserving the
/// display filename as the final path segment.
pub fn generate_key(filename: &str) -> String {
    format!("{}/{}", Uuid::new_v4(), filename)
}

/// JSON description of a stored upload, returned to the client which then
/// persists a database record referencing `key`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredUpload {
    /// Opaque key identifying the object in the storage bucket.
    pub key: String,
    /// Original display filename.
    pub filename: String,
    /// Declared content type of the uploaded bytes.
    pub content_type: String,
    /// Size of the stored object in bytes.
    pub size: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_policy_accepts_wav() {
        let policy = UploadPolicy::audio();
        assert_eq!(
            policy.evaluate(Some("a.wav"), "audio/wav", "file"),
            PartDecision::Accept
        );
    }

    #[test]
    fn audio_policy_rejects_png() {
        let policy = UploadPolicy::audio();
        assert_eq!(
            policy.evaluate(Some("a.png"), "image/png", "file"),
            PartDecision::Reject
        );
    }

    #[test]
    fn missing_filename_is_skipped_not_rejected() {
        let policy = UploadPolicy::audio();
        assert_eq!(
            policy.evaluate(None, "audio/wav", "file"),
            PartDecision::Skip
        );
        assert_eq!(
            policy.evaluate(Some(""), "audio/wav", "file"),
            PartDecision::Skip
        );
    }

    #[test]
    fn non_file_fields_are_skipped() {
        let policy = UploadPolicy::audio();
        assert_eq!(
            policy.evaluate(Some("a.wav"), "audio/wav", "notes"),
            PartDecision::Skip
        );
    }

    #[test]
    fn permissive_policy_accepts_anything_named() {
        let policy = UploadPolicy::default();
        assert_eq!(
            policy.evaluate(Some("a.bin"), "application/octet-stream", "file"),
            PartDecision::Accept
        );
    }

    #[test]
    fn generated_keys_are_unique_and_keep_filename() {
        let a = generate_key("mix.wav");
        let b = generate_key("mix.wav");
        assert_ne!(a, b);
        assert!(a.ends_with("/mix.wav"));
        assert!(b.ends_with("/mix.wav"));
    }

    #[test]
    fn stored_upload_serializes_camel_case() {
        let upload = StoredUpload {
            key: "k/a.wav".into(),
            filename: "a.wav".into(),
            content_type: "audio/wav".into(),
            size: 3,
        };
        let json = serde_json::to_value(&upload).unwrap();
        assert_eq!(json["key"], "k/a.wav");
        assert_eq!(json["contentType"], "audio/wav");
        assert_eq!(json["size"], 3);
    }
}
