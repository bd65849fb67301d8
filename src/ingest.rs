//! Filesystem document loading.
//!
//! Walks a directory, applies the configured include/exclude globs, and
//! turns each matching UTF-8 text file into a [`Document`] whose
//! metadata records the relative path, title, and modification time.

use anyhow::{bail, Result};
use chrono::{TimeZone, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use tracing::warn;
use walkdir::WalkDir;

use rag_harness_core::models::{Document, Metadata};

use crate::config::IngestConfig;

/// Scan `root` and load every matching file as a document.
///
/// Files that are not valid UTF-8 are skipped with a warning. Results
/// are sorted by relative path for deterministic ordering.
pub fn scan_directory(root: &Path, config: &IngestConfig) -> Result<Vec<Document>> {
    if !root.exists() {
        bail!("Ingest root does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.include_globs)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    default_excludes.extend(config.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut entries: Vec<(String, std::path::PathBuf)> = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) {
            continue;
        }
        if !include_set.is_match(&rel_str) {
            continue;
        }

        entries.push((rel_str, path.to_path_buf()));
    }

    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut documents = Vec::with_capacity(entries.len());
    for (rel_str, path) in entries {
        match load_document(&path, &rel_str) {
            Ok(doc) => documents.push(doc),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping file"),
        }
    }

    Ok(documents)
}

fn load_document(path: &Path, relative_path: &str) -> Result<Document> {
    let text = std::fs::read_to_string(path)?;

    let file_metadata = std::fs::metadata(path)?;
    let modified = file_metadata
        .modified()
        .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
    let modified_secs = modified
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    let modified_iso = Utc
        .timestamp_opt(modified_secs, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_default();

    let title = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut metadata = Metadata::new();
    metadata.insert("path".to_string(), relative_path.to_string());
    metadata.insert("title".to_string(), title);
    metadata.insert("modified".to_string(), modified_iso);

    Ok(Document::new(text, metadata))
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_applies_globs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "# A").unwrap();
        std::fs::write(dir.path().join("b.txt"), "B").unwrap();
        std::fs::write(dir.path().join("c.rs"), "fn main() {}").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/d.md"), "# D").unwrap();

        let config = IngestConfig::default();
        let docs = scan_directory(dir.path(), &config).unwrap();

        let paths: Vec<&str> = docs
            .iter()
            .map(|d| d.metadata.get("path").unwrap().as_str())
            .collect();
        assert_eq!(paths, vec!["a.md", "b.txt", "sub/d.md"]);
    }

    #[test]
    fn test_scan_exclude_globs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("keep.md"), "keep").unwrap();
        std::fs::create_dir(dir.path().join("drafts")).unwrap();
        std::fs::write(dir.path().join("drafts/skip.md"), "skip").unwrap();

        let config = IngestConfig {
            exclude_globs: vec!["drafts/**".to_string()],
            ..IngestConfig::default()
        };
        let docs = scan_directory(dir.path(), &config).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text, "keep");
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let config = IngestConfig::default();
        assert!(scan_directory(Path::new("/nonexistent/nowhere"), &config).is_err());
    }
}
