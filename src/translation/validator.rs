/*!
 * Subtitle validation policy.
 *
 * A stateless predicate over a candidate translated line and the configured
 * thresholds. The validator only answers "does this line pass"; what a
 * failure means for the request is the orchestrator's decision.
 */

use serde::{Deserialize, Serialize};

/// Thresholds applied to each translated line when validation is enabled
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtitleValidationOptions {
    /// Whether validation runs at all
    pub enabled: bool,

    /// Maximum serialized size of one line in bytes
    pub max_file_size_bytes: u64,

    /// Maximum character length of one line
    pub max_subtitle_length: usize,

    /// Minimum character length of one line
    pub min_subtitle_length: usize,

    /// Minimum display duration in milliseconds
    pub min_duration_ms: u64,

    /// Maximum display duration in seconds
    pub max_duration_secs: u64,
}

impl Default for SubtitleValidationOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            max_file_size_bytes: 2_097_152,
            max_subtitle_length: 500,
            min_subtitle_length: 2,
            min_duration_ms: 500,
            max_duration_secs: 10,
        }
    }
}

/// Check a candidate line against the configured thresholds.
///
/// Duration bounds are applied only when timing metadata is available.
pub fn validate_subtitle(
    text: &str,
    duration_ms: Option<u64>,
    options: &SubtitleValidationOptions,
) -> bool {
    if text.len() as u64 > options.max_file_size_bytes {
        return false;
    }

    let char_count = text.chars().count();
    if char_count < options.min_subtitle_length || char_count > options.max_subtitle_length {
        return false;
    }

    if let Some(duration) = duration_ms {
        if duration < options.min_duration_ms {
            return false;
        }
        if duration > options.max_duration_secs * 1000 {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> SubtitleValidationOptions {
        SubtitleValidationOptions {
            enabled: true,
            max_file_size_bytes: 64,
            max_subtitle_length: 20,
            min_subtitle_length: 2,
            min_duration_ms: 500,
            max_duration_secs: 10,
        }
    }

    #[test]
    fn test_validateSubtitle_withinBounds_shouldPass() {
        assert!(validate_subtitle("Hello there", Some(1500), &options()));
    }

    #[test]
    fn test_validateSubtitle_tooShort_shouldFail() {
        assert!(!validate_subtitle("a", Some(1500), &options()));
    }

    #[test]
    fn test_validateSubtitle_tooLong_shouldFail() {
        assert!(!validate_subtitle("this line is much too long", Some(1500), &options()));
    }

    #[test]
    fn test_validateSubtitle_byteBudget_countsBytesNotChars() {
        let mut opts = options();
        opts.max_subtitle_length = 500;
        // 20 chars but 40 bytes of multi-byte text
        let text = "éééééééééééééééééééé";
        assert!(text.len() as u64 > opts.max_file_size_bytes / 2);
        opts.max_file_size_bytes = 10;
        assert!(!validate_subtitle(text, None, &opts));
    }

    #[test]
    fn test_validateSubtitle_durationBounds_shouldApplyWhenKnown() {
        assert!(!validate_subtitle("Hello there", Some(100), &options()));
        assert!(!validate_subtitle("Hello there", Some(11_000), &options()));
        // No timing metadata: duration checks are skipped
        assert!(validate_subtitle("Hello there", None, &options()));
    }
}
