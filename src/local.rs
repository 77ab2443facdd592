use chrono::{DateTime, Local, NaiveDateTime};
use std::fs;
use std::path::Path;

use crate::models::{sort_entries, DirectoryEntry};

/// Directory enumeration for local panes
pub trait LocalLister: Send + Sync {
    /// Entries of `path`, empty on any error.
    fn list(&self, path: &Path) -> Vec<DirectoryEntry>;
}

/// `std::fs` backed lister, hidden entries are skipped
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLister;

impl LocalLister for FsLister {
    fn list(&self, path: &Path) -> Vec<DirectoryEntry> {
        let entries = match fs::read_dir(path) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read local directory");
                return Vec::new();
            }
        };

        let mut items: Vec<DirectoryEntry> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().to_string();
                if name.starts_with('.') {
                    return None;
                }
                // Follows symlinks so linked directories can be entered
                let metadata = fs::metadata(entry.path()).ok()?;
                let is_directory = metadata.is_dir();
                Some(DirectoryEntry {
                    full_path: entry.path().display().to_string(),
                    name,
                    is_directory,
                    size_bytes: if is_directory { 0 } else { metadata.len() as i64 },
                    modified_at: metadata.modified().ok().map(to_local_naive),
                })
            })
            .collect();

        sort_entries(&mut items);
        items
    }
}

fn to_local_naive(time: std::time::SystemTime) -> NaiveDateTime {
    DateTime::<Local>::from(time).naive_local()
}

/// Remove local files or directory trees.
pub fn delete_local(paths: &[String]) -> anyhow::Result<()> {
    use anyhow::Context;

    for path in paths {
        let path = Path::new(path);
        if path.parent().is_none() {
            anyhow::bail!("Refusing to delete {}", path.display());
        }
        let metadata = fs::symlink_metadata(path)
            .with_context(|| format!("Failed to stat {}", path.display()))?;
        if metadata.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        }
        .with_context(|| format!("Failed to delete {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_sorted_without_hidden() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "hello").unwrap();
        fs::write(dir.path().join(".hidden"), "x").unwrap();
        fs::create_dir(dir.path().join("Zdir")).unwrap();
        fs::write(dir.path().join("A.txt"), "").unwrap();

        let entries = FsLister.list(dir.path());
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Zdir", "A.txt", "b.txt"]);
        assert_eq!(entries[2].size_bytes, 5);
        assert_eq!(entries[0].size_bytes, 0);
        assert!(entries[2].modified_at.is_some());
    }

    #[test]
    fn missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FsLister.list(&dir.path().join("missing")).is_empty());
    }

    #[test]
    fn deletes_files_and_trees() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f.txt");
        let tree = dir.path().join("tree");
        fs::write(&file, "x").unwrap();
        fs::create_dir_all(tree.join("inner")).unwrap();

        delete_local(&[file.display().to_string(), tree.display().to_string()]).unwrap();
        assert!(!file.exists());
        assert!(!tree.exists());
        assert!(delete_local(&["/".to_string()]).is_err());
    }
}
