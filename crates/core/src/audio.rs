//! Audio content-type policy.
//!
//! The upload relay filters file parts by declared MIME type before any
//! bytes reach the storage backend. This module is the single source of
//! truth for which types are playable.

/// MIME types the upload relay accepts.
pub const ALLOWED_AUDIO_TYPES: &[&str] = &[
    "audio/mpeg",
    "audio/mp3",
    "audio/wav",
    "audio/x-wav",
    "audio/mp4",
    "audio/x-m4a",
    "audio/m4a",
    "audio/aac",
    "audio/ogg",
    "audio/flac",
    "audio/webm",
];

/// Fallback content type when a part declares none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Whether `content_type` is an accepted audio format.
///
/// Matching is case-insensitive and ignores MIME parameters
/// (`audio/ogg; codecs=opus` is accepted).
pub fn is_allowed_content_type(content_type: &str) -> bool {
    let base = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim();
    ALLOWED_AUDIO_TYPES
        .iter()
        .any(|allowed| base.eq_ignore_ascii_case(allowed))
}

/// File extension conventionally associated with a content type.
pub fn extension_for_content_type(content_type: &str) -> &'static str {
    let ct = content_type.to_ascii_lowercase();
    if ct.contains("mpeg") || ct.contains("mp3") {
        "mp3"
    } else if ct.contains("wav") {
        "wav"
    } else if ct.contains("m4a") || ct.contains("mp4") {
        "m4a"
    } else if ct.contains("aac") {
        "aac"
    } else if ct.contains("ogg") {
        "ogg"
    } else if ct.contains("flac") {
        "flac"
    } else if ct.contains("webm") {
        "webm"
    } else {
        "bin"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_audio_types() {
        assert!(is_allowed_content_type("audio/mpeg"));
        assert!(is_allowed_content_type("audio/wav"));
        assert!(is_allowed_content_type("audio/flac"));
    }

    #[test]
    fn accepts_case_insensitive_and_parameters() {
        assert!(is_allowed_content_type("Audio/MPEG"));
        assert!(is_allowed_content_type("audio/ogg; codecs=opus"));
    }

    #[test]
    fn rejects_non_audio_types() {
        assert!(!is_allowed_content_type("image/png"));
        assert!(!is_allowed_content_type("application/pdf"));
        assert!(!is_allowed_content_type("text/html"));
        assert!(!is_allowed_content_type(""));
    }

    #[test]
    fn extension_mapping() {
        assert_eq!(extension_for_content_type("audio/mpeg"), "mp3");
        assert_eq!(extension_for_content_type("audio/x-wav"), "wav");
        assert_eq!(extension_for_content_type("audio/mp4"), "m4a");
        assert_eq!(extension_for_content_type("application/blob"), "bin");
    }
}
