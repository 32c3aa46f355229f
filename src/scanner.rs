use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use walkdir::{DirEntry, WalkDir};

use crate::config::Config;
use crate::extractor::Extractor;
use crate::paths;
use crate::types::{Classification, FileRecord};

/// One extracted source file with its classification and canonical links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedFile {
    /// Category and output document from the classification rules.
    #[serde(flatten)]
    pub classification: Classification,
    /// Declarations recovered from the file.
    #[serde(flatten)]
    pub record: FileRecord,
    /// Link to the file in the configured repository.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Type name -> link to its declaration line. First declaration wins.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub type_urls: BTreeMap<String, String>,
}

/// Walk the configured source tree and extract every allowed file.
/// Paths in the result are relative to the source root, forward slashes,
/// in file-name order. Unreadable files are skipped with a warning; a
/// missing source root yields an empty result.
pub fn scan(project_root: &Path, config: &Config, extractor: &Extractor) -> Vec<ClassifiedFile> {
    let root = project_root.join(&config.source_root);
    if !root.is_dir() {
        tracing::warn!(root = %root.display(), "source root does not exist");
        return Vec::new();
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(&root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| return !is_excluded_dir(e, config, &root))
        .filter_map(Result::ok)
        .filter(|e| return e.file_type().is_file())
        .filter(|e| {
            return e.file_name().to_str().is_some_and(|name| return config.includes_file(name));
        })
    {
        let relative = relative_forward_slash(entry.path(), &root);
        let text = match std::fs::read_to_string(entry.path()) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    path = %entry.path().display(),
                    error = %e,
                    "skipping unreadable source file"
                );
                continue;
            },
        };
        files.push(classify_and_extract(config, extractor, &relative, &text));
    }

    tracing::info!(files = files.len(), root = %root.display(), "parsed source files");
    return files;
}

/// Extract one file and attach its classification and source links.
fn classify_and_extract(
    config: &Config,
    extractor: &Extractor,
    relative: &str,
    text: &str,
) -> ClassifiedFile {
    let record = extractor.extract(text, relative);
    let classification = config.classifier.classify(relative);

    let repo_path = paths::normalize(&format!("{}/{relative}", config.source_root));
    let source_url = config.repository.as_ref().map(|t| return t.build(&repo_path, None));
    let mut type_urls = BTreeMap::new();
    if let Some(template) = &config.repository {
        for declared in &record.types {
            type_urls
                .entry(declared.name.clone())
                .or_insert_with(|| return template.build(&repo_path, Some(declared.line_number)));
        }
    }

    return ClassifiedFile {
        classification,
        record,
        source_url,
        type_urls,
    };
}

/// Whether a directory (below the root) matches an exclude-folder glob.
fn is_excluded_dir(entry: &DirEntry, config: &Config, root: &Path) -> bool {
    if !entry.file_type().is_dir() || entry.path() == root {
        return false;
    }
    return entry.file_name().to_str().is_some_and(|name| return config.excludes_dir(name));
}

/// `path` relative to `root`, joined with forward slashes.
fn relative_forward_slash(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    return relative
        .components()
        .map(|c| return c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
}
