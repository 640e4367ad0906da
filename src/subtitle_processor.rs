use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;

// @module: Subtitle file reading, writing and the in-memory item model

// @const: SRT timestamp regex
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2}):(\d{2}):(\d{2}),(\d{3}) --> (\d{2}):(\d{2}):(\d{2}),(\d{3})").unwrap()
});

// @struct: Single subtitle item, the unit the translation pipeline works on
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleItem {
    // @field: Ordinal position, 1-based, strictly increasing within a file
    pub position: usize,

    // @field: Raw text lines of the cue
    pub lines: Vec<String>,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,
}

impl SubtitleItem {
    pub fn new(position: usize, start_time_ms: u64, end_time_ms: u64, text: &str) -> Self {
        SubtitleItem {
            position,
            lines: text.lines().map(str::to_string).collect(),
            start_time_ms,
            end_time_ms,
        }
    }

    // @creates: Validated subtitle item
    // @validates: Time range and non-empty text
    pub fn new_validated(
        position: usize,
        start_time_ms: u64,
        end_time_ms: u64,
        text: &str,
    ) -> Result<Self> {
        if end_time_ms <= start_time_ms {
            return Err(anyhow!(
                "Invalid time range: end time {} <= start time {}",
                end_time_ms,
                start_time_ms
            ));
        }

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(anyhow!("Empty subtitle text for item {}", position));
        }

        Ok(SubtitleItem::new(position, start_time_ms, end_time_ms, trimmed))
    }

    /// Joined view of the cue text, one string with embedded newlines
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Replace the cue text, splitting on embedded newlines
    pub fn set_text(&mut self, text: &str) {
        self.lines = text.lines().map(str::to_string).collect();
    }

    /// Display duration of the cue
    pub fn duration_ms(&self) -> u64 {
        self.end_time_ms.saturating_sub(self.start_time_ms)
    }

    /// Format a timestamp in milliseconds to SRT format (HH:MM:SS,mmm)
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }
}

impl fmt::Display for SubtitleItem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.position)?;
        writeln!(
            f,
            "{} --> {}",
            Self::format_timestamp(self.start_time_ms),
            Self::format_timestamp(self.end_time_ms)
        )?;
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        writeln!(f)
    }
}

/// Read an SRT file into an ordered sequence of subtitle items.
///
/// The file is decoded leniently: subtitle files in the wild are UTF-8-ish
/// at best, so undecodable bytes are replaced rather than rejected.
pub fn read_subtitles<P: AsRef<Path>>(path: P) -> Result<Vec<SubtitleItem>> {
    let path = path.as_ref();
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read subtitle file: {:?}", path))?;
    let content = String::from_utf8_lossy(&bytes);
    parse_srt_string(&content)
}

/// Parse SRT format content into subtitle items
pub fn parse_srt_string(content: &str) -> Result<Vec<SubtitleItem>> {
    let mut items: Vec<SubtitleItem> = Vec::new();

    let mut current_position: Option<usize> = None;
    let mut current_start_ms: Option<u64> = None;
    let mut current_end_ms: Option<u64> = None;
    let mut current_text = String::new();
    let mut line_count = 0;

    let flush =
        |position: usize, start_ms: u64, end_ms: u64, text: &str, items: &mut Vec<SubtitleItem>| {
            match SubtitleItem::new_validated(position, start_ms, end_ms, text) {
                Ok(item) => items.push(item),
                Err(e) => warn!("Skipping invalid subtitle item {}: {}", position, e),
            }
        };

    for line in content.lines() {
        line_count += 1;
        let trimmed = line.trim();

        // A blank line terminates the current cue
        if trimmed.is_empty() {
            if let (Some(position), Some(start_ms), Some(end_ms)) =
                (current_position, current_start_ms, current_end_ms)
            {
                if !current_text.is_empty() {
                    flush(position, start_ms, end_ms, &current_text, &mut items);
                }
                current_position = None;
                current_start_ms = None;
                current_end_ms = None;
                current_text.clear();
            }
            continue;
        }

        // Sequence number opens a new cue
        if current_position.is_none() && current_text.is_empty() {
            if let Ok(num) = trimmed.parse::<usize>() {
                current_position = Some(num);
                continue;
            }
        }

        // Timestamp line follows the sequence number
        if current_position.is_some() && current_start_ms.is_none() {
            if let Some(caps) = TIMESTAMP_REGEX.captures(trimmed) {
                current_start_ms = Some(parse_timestamp_to_ms(&caps, 1));
                current_end_ms = Some(parse_timestamp_to_ms(&caps, 5));
                continue;
            }
        }

        // Everything else inside a cue is text
        if current_position.is_some() && current_start_ms.is_some() {
            if !current_text.is_empty() {
                current_text.push('\n');
            }
            current_text.push_str(trimmed);
        } else {
            warn!(
                "Unexpected text at line {} before sequence number or timestamp: {}",
                line_count, trimmed
            );
        }
    }

    // Flush the trailing cue, if any
    if let (Some(position), Some(start_ms), Some(end_ms)) =
        (current_position, current_start_ms, current_end_ms)
    {
        if !current_text.is_empty() {
            flush(position, start_ms, end_ms, &current_text, &mut items);
        }
    }

    if items.is_empty() {
        return Err(anyhow!("No valid subtitle items were found in the SRT content"));
    }

    // Sort by start time, then renumber to keep positions strictly increasing
    items.sort_by_key(|item| item.start_time_ms);
    for (i, item) in items.iter_mut().enumerate() {
        item.position = i + 1;
    }

    Ok(items)
}

/// Serialize subtitle items to SRT format
pub fn to_srt_string(items: &[SubtitleItem]) -> String {
    let mut out = String::new();
    for item in items {
        out.push_str(&item.to_string());
    }
    out
}

/// Write subtitle items to an SRT file.
///
/// The write goes through a temp file in the destination directory that is
/// atomically persisted over the target path, so a crash mid-write never
/// leaves a truncated output file behind.
pub fn write_subtitles<P: AsRef<Path>>(path: P, items: &[SubtitleItem]) -> Result<()> {
    let path = path.as_ref();
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {:?}", dir))?;
    tmp.write_all(to_srt_string(items).as_bytes())
        .with_context(|| format!("Failed to write subtitle content for {:?}", path))?;
    tmp.persist(path)
        .with_context(|| format!("Failed to persist subtitle file: {:?}", path))?;

    Ok(())
}

fn parse_timestamp_to_ms(caps: &regex::Captures, start_idx: usize) -> u64 {
    let hours: u64 = caps.get(start_idx).map_or(0, |m| m.as_str().parse().unwrap_or(0));
    let minutes: u64 = caps.get(start_idx + 1).map_or(0, |m| m.as_str().parse().unwrap_or(0));
    let seconds: u64 = caps.get(start_idx + 2).map_or(0, |m| m.as_str().parse().unwrap_or(0));
    let millis: u64 = caps.get(start_idx + 3).map_or(0, |m| m.as_str().parse().unwrap_or(0));

    (hours * 3600 + minutes * 60 + seconds) * 1000 + millis
}
