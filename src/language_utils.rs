use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for ISO language code handling
///
/// This module provides functions for validating and normalizing ISO 639-1
/// (2-letter) and ISO 639-2 (3-letter) language codes, and for resolving the
/// display names used in prompt templates and the language listing.

/// Validate that a code is a known ISO 639-1 or ISO 639-2/T code
pub fn validate_language_code(code: &str) -> Result<()> {
    let normalized = code.trim().to_lowercase();

    if normalized.len() == 2 && Language::from_639_1(&normalized).is_some() {
        return Ok(());
    }
    if normalized.len() == 3 && Language::from_639_3(&normalized).is_some() {
        return Ok(());
    }

    Err(anyhow!("Invalid language code: {}", code))
}

/// Normalize a language code to ISO 639-1 (2-letter) format if possible
/// Falls back to ISO 639-2/T if no ISO 639-1 code exists
pub fn normalize_to_part1_or_part2t(code: &str) -> Result<String> {
    let normalized = code.trim().to_lowercase();

    if normalized.len() == 2 {
        if Language::from_639_1(&normalized).is_some() {
            return Ok(normalized);
        }
    } else if normalized.len() == 3 {
        if let Some(lang) = Language::from_639_3(&normalized) {
            if let Some(code_639_1) = lang.to_639_1() {
                return Ok(code_639_1.to_string());
            }
            return Ok(normalized);
        }
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Resolve the full English display name for a language code.
///
/// Unknown or empty codes fall back to the code itself, mirroring the
/// soft-default behavior of the rest of the pipeline: a prompt with a raw
/// code is still usable, a hard failure here would not be.
pub fn display_name(code: &str) -> String {
    let normalized = code.trim().to_lowercase();
    if normalized.is_empty() {
        return code.to_string();
    }

    let lang = match normalized.len() {
        2 => Language::from_639_1(&normalized),
        3 => Language::from_639_3(&normalized),
        _ => None,
    };

    lang.map(|l| l.to_name().to_string())
        .unwrap_or_else(|| code.to_string())
}

/// Check if two language codes represent the same language
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (
        normalize_to_part1_or_part2t(code1),
        normalize_to_part1_or_part2t(code2),
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validateLanguageCode_withValidCodes_shouldAccept() {
        assert!(validate_language_code("en").is_ok());
        assert!(validate_language_code("spa").is_ok());
        assert!(validate_language_code(" FR ").is_ok());
    }

    #[test]
    fn test_validateLanguageCode_withInvalidCode_shouldReject() {
        assert!(validate_language_code("xx").is_err());
        assert!(validate_language_code("english").is_err());
        assert!(validate_language_code("").is_err());
    }

    #[test]
    fn test_displayName_shouldResolveFullName() {
        assert_eq!(display_name("en"), "English");
        assert_eq!(display_name("es"), "Spanish");
        assert_eq!(display_name("deu"), "German");
    }

    #[test]
    fn test_displayName_withUnknownCode_shouldFallBackToCode() {
        assert_eq!(display_name("zz"), "zz");
        assert_eq!(display_name(""), "");
    }

    #[test]
    fn test_languageCodesMatch_acrossCodeLengths_shouldMatch() {
        assert!(language_codes_match("en", "eng"));
        assert!(language_codes_match("fr", "fra"));
        assert!(!language_codes_match("en", "es"));
    }
}
