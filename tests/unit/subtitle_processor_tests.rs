/*!
 * Tests for subtitle file reading and writing
 */

use anyhow::Result;

use polysub::subtitle_processor::{SubtitleItem, read_subtitles, write_subtitles};

use crate::common;

#[test]
fn test_read_subtitles_withValidFile_shouldParseOrderedItems() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = common::create_test_subtitle(dir.path(), "test.srt")?;

    let items = read_subtitles(&path)?;

    assert_eq!(items.len(), 3);
    assert_eq!(items[0].position, 1);
    assert_eq!(items[0].text(), "This is a test subtitle.");
    assert!(items.windows(2).all(|w| w[0].position < w[1].position));
    Ok(())
}

#[test]
fn test_read_subtitles_withMissingFile_shouldFail() {
    let result = read_subtitles("/nonexistent/path/test.srt");
    assert!(result.is_err());
}

#[test]
fn test_read_subtitles_withInvalidUtf8_shouldStillParse() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("latin1.srt");

    // "café" encoded as Latin-1: the 0xE9 byte is not valid UTF-8
    let mut bytes = b"1\n00:00:01,000 --> 00:00:02,000\ncaf".to_vec();
    bytes.push(0xE9);
    bytes.push(b'\n');
    std::fs::write(&path, bytes)?;

    let items = read_subtitles(&path)?;

    assert_eq!(items.len(), 1);
    assert!(items[0].text().starts_with("caf"));
    Ok(())
}

#[test]
fn test_write_subtitles_roundTrip_shouldPreserveContent() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("out.srt");

    let items = vec![
        SubtitleItem::new(1, 0, 2000, "First"),
        SubtitleItem::new(2, 2500, 4000, "Second\nwith two lines"),
    ];

    write_subtitles(&path, &items)?;
    let reread = read_subtitles(&path)?;

    assert_eq!(reread, items);
    Ok(())
}

#[test]
fn test_write_subtitles_shouldOverwriteDeterministically() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("out.srt");

    let items = vec![SubtitleItem::new(1, 0, 2000, "Content")];

    write_subtitles(&path, &items)?;
    let first = std::fs::read_to_string(&path)?;
    write_subtitles(&path, &items)?;
    let second = std::fs::read_to_string(&path)?;

    assert_eq!(first, second);
    Ok(())
}
