use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    // @generates: Sibling output path for a translated subtitle
    // @shape: <basename>.<target_language>.<ext>
    pub fn translated_sibling_path<P: AsRef<Path>>(source: P, target_language: &str) -> PathBuf {
        let source = source.as_ref();

        let stem = source.file_stem().unwrap_or_default();
        let ext = source
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_else(|| "srt".to_string());

        let mut file_name = stem.to_string_lossy().to_string();
        file_name.push('.');
        file_name.push_str(target_language);
        file_name.push('.');
        file_name.push_str(&ext);

        match source.parent() {
            Some(parent) => parent.join(file_name),
            None => PathBuf::from(file_name),
        }
    }

    /// Find subtitle files with a specific extension in a directory tree
    pub fn find_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();
        let normalized_ext = extension.trim_start_matches('.');

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() {
                if let Some(ext) = path.extension() {
                    if ext.to_string_lossy().eq_ignore_ascii_case(normalized_ext) {
                        result.push(path.to_path_buf());
                    }
                }
            }
        }

        Ok(result)
    }

    /// Compute the SHA-256 hash of a file, hex-encoded.
    ///
    /// Stored on translation requests at enqueue time so re-runs can tell
    /// whether the source changed since the request was created.
    pub fn hash_file<P: AsRef<Path>>(path: P) -> Result<String> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read file for hashing: {:?}", path))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hasher.finalize();

        Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
    }
}
