//! Source connector: enumerate documents under a local directory.
//!
//! Filenames are reported relative to the source root with `/` separators,
//! so the same tree indexed from different machines produces identical keys.
//! Hidden files and directories (leading `.`) are skipped.

use crate::error::MultidexError;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// A document discovered by [`scan`]. The connector owns filename and
/// location; content is read later by the pipeline that needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Path relative to the source root, `/`-separated.
    pub filename: String,
    /// Absolute (or root-joined) path on disk.
    pub path: PathBuf,
}

/// Walk `root` and return every regular file matching `included_patterns`.
///
/// Patterns are `*.md`-style suffix globs matched against the file name;
/// an empty pattern list admits every file. Results are sorted by filename
/// so runs are deterministic.
pub fn scan(root: &Path, included_patterns: &[String]) -> Result<Vec<SourceDocument>, MultidexError> {
    if !root.is_dir() {
        return Err(MultidexError::SourceNotFound {
            path: root.to_path_buf(),
        });
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        // depth 0 is the root itself; its name must not disqualify the walk
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name().to_str()))
    {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
            match e.into_io_error() {
                Some(io) => MultidexError::Io { path, source: io },
                None => MultidexError::Internal("walkdir loop".into()),
            }
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !matches_any(&name, included_patterns) {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        documents.push(SourceDocument {
            filename: rel,
            path: entry.path().to_path_buf(),
        });
    }

    documents.sort_by(|a, b| a.filename.cmp(&b.filename));
    debug!("scanned {}: {} documents", root.display(), documents.len());
    Ok(documents)
}

fn is_hidden(name: Option<&str>) -> bool {
    matches!(name, Some(n) if n.starts_with('.') && n.len() > 1)
}

/// `*.md`-style suffix matching; a pattern without a leading `*` must match
/// the whole file name. Comparison is case-insensitive, like the extension
/// classification downstream.
fn matches_any(name: &str, patterns: &[String]) -> bool {
    if patterns.is_empty() {
        return true;
    }
    let lower = name.to_ascii_lowercase();
    patterns.iter().any(|p| {
        let p = p.to_ascii_lowercase();
        match p.strip_prefix('*') {
            Some(suffix) => lower.ends_with(suffix),
            None => lower == p,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn scan_missing_dir_fails() {
        let err = scan(Path::new("/no/such/dir"), &[]).unwrap_err();
        assert!(matches!(err, MultidexError::SourceNotFound { .. }));
    }

    #[test]
    fn scan_reports_relative_slash_paths() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.md"));
        touch(&dir.path().join("sub/b.md"));
        let docs = scan(dir.path(), &[]).unwrap();
        let names: Vec<_> = docs.iter().map(|d| d.filename.as_str()).collect();
        assert_eq!(names, vec!["a.md", "sub/b.md"]);
    }

    #[test]
    fn scan_applies_patterns() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("doc.md"));
        touch(&dir.path().join("doc.mdx"));
        touch(&dir.path().join("image.png"));
        let docs = scan(dir.path(), &["*.md".into(), "*.mdx".into()]).unwrap();
        let names: Vec<_> = docs.iter().map(|d| d.filename.as_str()).collect();
        assert_eq!(names, vec!["doc.md", "doc.mdx"]);
    }

    #[test]
    fn scan_skips_hidden() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join(".hidden/secret.md"));
        touch(&dir.path().join(".env"));
        touch(&dir.path().join("visible.md"));
        let docs = scan(dir.path(), &[]).unwrap();
        let names: Vec<_> = docs.iter().map(|d| d.filename.as_str()).collect();
        assert_eq!(names, vec!["visible.md"]);
    }

    #[test]
    fn exact_pattern_matches_whole_name() {
        assert!(matches_any("README", &["readme".into()]));
        assert!(!matches_any("README.md", &["readme".into()]));
        assert!(matches_any("notes.MD", &["*.md".into()]));
    }
}
