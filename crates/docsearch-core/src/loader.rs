//! Turns a directory tree into document drafts for bulk import.
//!
//! `.json` files hold a single draft or an array of drafts. `.txt` files
//! become one draft each: the file stem is the title, the content is the
//! body and the parent directory (relative to the root) is the category.
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::DocumentDraft;

#[derive(Debug, Clone)]
pub struct LoadedDraft {
    pub source: PathBuf,
    pub draft: DocumentDraft,
}

#[derive(Default)]
pub struct DocumentLoader {
    limit: Option<usize>,
}

impl DocumentLoader {
    pub fn new() -> Self { Self::default() }

    /// Only read the first `limit` files (in path order).
    pub fn with_limit(limit: usize) -> Self { Self { limit: Some(limit) } }

    pub fn load_directory(&self, root: &Path) -> Result<Vec<LoadedDraft>> {
        let mut files = self.list_source_files(root);
        if let Some(limit) = self.limit { files.truncate(limit); }
        let mut drafts = Vec::new();
        for path in files {
            match path.extension().and_then(|s| s.to_str()) {
                Some("json") => {
                    for draft in self.read_json(&path)? {
                        drafts.push(LoadedDraft { source: path.clone(), draft });
                    }
                }
                _ => {
                    let draft = self.read_text(&path, root)?;
                    drafts.push(LoadedDraft { source: path, draft });
                }
            }
        }
        Ok(drafts)
    }

    fn read_json(&self, path: &Path) -> Result<Vec<DocumentDraft>> {
        let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        let drafts = if value.is_array() {
            serde_json::from_value::<Vec<DocumentDraft>>(value)
        } else {
            serde_json::from_value::<DocumentDraft>(value).map(|d| vec![d])
        };
        drafts.with_context(|| format!("{} is not a document draft", path.display()))
    }

    fn read_text(&self, path: &Path, root: &Path) -> Result<DocumentDraft> {
        let body = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => String::from_utf8_lossy(&fs::read(path)?).to_string(),
        };
        let title = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
        Ok(DocumentDraft { title, body, category: self.category_from_path(path, root), ..Default::default() })
    }

    fn category_from_path(&self, path: &Path, root: &Path) -> Option<String> {
        let relative = path.strip_prefix(root).unwrap_or(path);
        let parent = relative.parent()?.to_str()?;
        if parent.is_empty() { None } else { Some(parent.replace('\\', "/")) }
    }

    fn list_source_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
            let path = entry.path();
            if matches!(path.extension().and_then(|s| s.to_str()), Some("txt") | Some("json")) { files.push(path.to_path_buf()); }
        }
        files.sort(); files
    }
}
