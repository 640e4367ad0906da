/*!
 * Context window construction for translation.
 *
 * Extracts the subtitle lines surrounding the line being translated so the
 * backend sees the neighboring dialogue. Pure functions over the ordered
 * item sequence: windows truncate at the sequence boundaries and never
 * wrap around.
 */

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::subtitle_processor::SubtitleItem;

/// Extract up to `before_count` lines before and `after_count` lines after
/// the item at `index`.
///
/// Multi-line cues are joined with `\n` so each window entry maps to one
/// subtitle item. Out-of-range indices yield empty windows rather than a
/// fault; a window that reaches past either end of the sequence is simply
/// truncated.
pub fn context_window(
    items: &[SubtitleItem],
    index: usize,
    before_count: usize,
    after_count: usize,
) -> (Vec<String>, Vec<String>) {
    if index >= items.len() {
        return (Vec::new(), Vec::new());
    }

    let before_start = index.saturating_sub(before_count);
    let before: Vec<String> = items[before_start..index].iter().map(|i| i.text()).collect();

    let after_end = index.saturating_add(1).saturating_add(after_count).min(items.len());
    let after: Vec<String> = items[index + 1..after_end].iter().map(|i| i.text()).collect();

    (before, after)
}

/// Per-line context handed to the backend adapter.
///
/// Built fresh for every translated unit and discarded afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextBundle {
    /// Lines preceding the current one, in document order
    pub before: Vec<String>,

    /// Lines following the current one, in document order
    pub after: Vec<String>,

    /// Optional named context properties, e.g. media title
    pub properties: BTreeMap<String, String>,
}

impl ContextBundle {
    /// Build a bundle for the item at `index`
    pub fn for_item(
        items: &[SubtitleItem],
        index: usize,
        before_count: usize,
        after_count: usize,
    ) -> Self {
        let (before, after) = context_window(items, index, before_count, after_count);
        Self {
            before,
            after,
            properties: BTreeMap::new(),
        }
    }

    /// Attach a named context property
    pub fn with_property(mut self, key: &str, value: &str) -> Self {
        self.properties.insert(key.to_string(), value.to_string());
        self
    }
}
