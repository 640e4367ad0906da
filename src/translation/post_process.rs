/*!
 * Post-processing applied to the translated subtitle collection.
 *
 * The orchestrator runs these in a fixed, deterministic order:
 * overlap fix → strip formatting → translator-info injection →
 * language-tag removal → subtitle-tag wrapping. Each step is toggled
 * independently by its setting.
 */

use isolang::Language;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::subtitle_processor::SubtitleItem;

// HTML-ish formatting tags (<i>, <b>, <font ...>, ...)
static HTML_TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?[a-zA-Z][^>]*>").unwrap());

// ASS override blocks ({\an8}, {\i1}, ...)
static ASS_TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\\[^}]*\}").unwrap());

// Bracketed tag candidates, checked against ISO language names/codes
static BRACKET_TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\[\]]{2,24})\]").unwrap());

/// Clamp overlapping display intervals so each cue ends before the next
/// one starts. Items must already be in start-time order.
pub fn fix_overlapping_items(items: &mut [SubtitleItem]) {
    for index in 1..items.len() {
        let next_start = items[index].start_time_ms;
        let current = &mut items[index - 1];
        if current.end_time_ms > next_start {
            debug!(
                "Clamping overlapping cue {} ({} > {})",
                current.position, current.end_time_ms, next_start
            );
            current.end_time_ms = next_start.saturating_sub(1).max(current.start_time_ms);
        }
    }
}

/// Remove HTML-style and ASS override formatting from every line
pub fn strip_formatting(items: &mut [SubtitleItem]) {
    for item in items.iter_mut() {
        for line in item.lines.iter_mut() {
            let stripped = HTML_TAG_REGEX.replace_all(line, "");
            let stripped = ASS_TAG_REGEX.replace_all(&stripped, "");
            *line = stripped.trim().to_string();
        }
        item.lines.retain(|line| !line.is_empty());
    }
}

/// Insert a leading cue identifying the translation service and model.
///
/// Positions are renumbered afterwards so the sequence stays 1-based and
/// strictly increasing.
pub fn add_translator_info(items: &mut Vec<SubtitleItem>, service_name: &str, model_name: &str) {
    let end_time_ms = items
        .first()
        .map(|first| first.start_time_ms.saturating_sub(1).clamp(500, 2000))
        .unwrap_or(2000);

    let info = if model_name.is_empty() {
        format!("Translated with polysub ({})", service_name)
    } else {
        format!("Translated with polysub ({}/{})", service_name, model_name)
    };

    items.insert(0, SubtitleItem::new(0, 0, end_time_ms, &info));

    for (index, item) in items.iter_mut().enumerate() {
        item.position = index + 1;
    }
}

/// Remove bracketed language tags like `[English]` or `[eng]` left behind
/// by upstream tooling. Only brackets whose content resolves to a known
/// ISO language are touched.
pub fn remove_language_tags(items: &mut [SubtitleItem]) {
    for item in items.iter_mut() {
        for line in item.lines.iter_mut() {
            let cleaned = BRACKET_TAG_REGEX.replace_all(line, |caps: &regex::Captures| {
                if is_language_tag(&caps[1]) {
                    String::new()
                } else {
                    caps[0].to_string()
                }
            });
            *line = cleaned.trim().to_string();
        }
        item.lines.retain(|line| !line.is_empty());
    }
}

/// Prefix each cue's first line with the configured tag, e.g. to mark
/// machine-translated output
pub fn apply_subtitle_tag(items: &mut [SubtitleItem], tag: &str) {
    if tag.is_empty() {
        return;
    }

    for item in items.iter_mut() {
        if let Some(first) = item.lines.first_mut() {
            *first = format!("{} {}", tag, first);
        }
    }
}

fn is_language_tag(candidate: &str) -> bool {
    let trimmed = candidate.trim();
    let lowered = trimmed.to_lowercase();

    match lowered.len() {
        2 => Language::from_639_1(&lowered).is_some(),
        3 => Language::from_639_3(&lowered).is_some(),
        _ => Language::from_name(trimmed).is_some() || {
            // Titlecase fallback for all-caps or lowercase names
            let mut chars = lowered.chars();
            let titled: String = match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => return false,
            };
            Language::from_name(&titled).is_some()
        },
    }
}
