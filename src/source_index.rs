//! Basename -> repository-relative path index of the physical source tree.
//!
//! Only used to repair dangling source URLs. Built once per resolve run.

use std::collections::HashMap;
use std::path::Path;

use walkdir::WalkDir;

/// Directory names never descended into when none are configured.
pub const DEFAULT_SKIP_DIRS: &[&str] =
    &["bin", "obj", "node_modules", ".vs", "packages", "wwwroot"];

/// First-sighting map from file name to its path relative to the repo root.
#[derive(Debug, Default)]
pub struct SourceIndex {
    /// `Order.cs` -> `src/Ordering.Domain/Order.cs`.
    paths: HashMap<String, String>,
}

impl SourceIndex {
    /// Walk `repo_root/source_root` in file-name order and record every file
    /// whose extension is in `extensions`. Directories named in `skip_dirs`
    /// are pruned. A missing source root yields an empty index.
    pub fn build(
        repo_root: &Path,
        source_root: &str,
        skip_dirs: &[String],
        extensions: &[String],
    ) -> Self {
        let start = repo_root.join(source_root);
        let mut paths: HashMap<String, String> = HashMap::new();
        if !start.is_dir() {
            tracing::debug!(root = %start.display(), "source root missing, index is empty");
            return Self { paths };
        }

        let walker = WalkDir::new(&start).sort_by_file_name().into_iter().filter_entry(|e| {
            let is_skipped_dir = e.file_type().is_dir()
                && skip_dirs.iter().any(|s| return e.file_name().to_str() == Some(s.as_str()));
            return !is_skipped_dir;
        });

        for entry in walker.filter_map(Result::ok).filter(|e| return e.file_type().is_file()) {
            let has_extension = entry
                .path()
                .extension()
                .and_then(|ext| return ext.to_str())
                .is_some_and(|ext| return extensions.iter().any(|allowed| return allowed == ext));
            if !has_extension {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            let relative = entry.path().strip_prefix(repo_root).unwrap_or(entry.path());
            let relative = relative
                .components()
                .map(|c| return c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            paths.entry(name.to_string()).or_insert(relative);
        }

        tracing::debug!(files = paths.len(), "built source index");
        return Self { paths };
    }

    /// Repository-relative path of the first file seen with this name.
    pub fn get(&self, basename: &str) -> Option<&str> {
        return self.paths.get(basename).map(String::as_str);
    }

    /// Whether nothing was indexed.
    pub fn is_empty(&self) -> bool {
        return self.paths.is_empty();
    }

    /// Number of indexed file names.
    pub fn len(&self) -> usize {
        return self.paths.len();
    }
}
