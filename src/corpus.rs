//! The document corpus: logical path -> markdown text, in insertion order.
//!
//! Iteration order decides first-occurrence ties in the entity map, so it
//! must be the order documents were added, never hash order.

use std::collections::HashMap;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::Error;

/// One generated document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Logical forward-slash path, e.g. `Ordering.API/Commands.md`.
    pub path: String,
    /// Markdown source.
    pub text: String,
}

/// Ordered set of documents keyed by path.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    /// Documents in insertion order.
    documents: Vec<Document>,
    /// Path -> position in `documents`.
    index: HashMap<String, usize>,
}

impl Corpus {
    /// Documents whose text differs from the same path in `other`.
    pub fn changed_from<'a>(&'a self, other: &'a Self) -> impl Iterator<Item = &'a Document> {
        return self
            .documents
            .iter()
            .filter(move |d| return other.get(&d.path) != Some(d.text.as_str()));
    }

    /// Whether a document exists at exactly this path.
    pub fn contains(&self, path: &str) -> bool {
        return self.index.contains_key(path);
    }

    /// Text of the document at `path`.
    pub fn get(&self, path: &str) -> Option<&str> {
        let position = self.index.get(path)?;
        return self.documents.get(*position).map(|d| return d.text.as_str());
    }

    /// Add a document. Replacing an existing path keeps its original position.
    pub fn insert(&mut self, path: impl Into<String>, text: impl Into<String>) {
        let path = path.into();
        let text = text.into();
        let slot = self.index.get(&path).and_then(|&p| return self.documents.get_mut(p));
        if let Some(existing) = slot {
            existing.text = text;
            return;
        }
        self.index.insert(path.clone(), self.documents.len());
        self.documents.push(Document { path, text });
    }

    /// Whether the corpus holds no documents.
    pub fn is_empty(&self) -> bool {
        return self.documents.is_empty();
    }

    /// Documents in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        return self.documents.iter();
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        return self.documents.len();
    }

    /// Load every `.md` file under `dir`, walking in file-name order so the
    /// corpus order is reproducible across runs and platforms.
    ///
    /// # Errors
    ///
    /// Returns `Error::PathNotFound` if `dir` does not exist, or `Error::Io`
    /// if a document cannot be read.
    pub fn load(dir: &Path) -> Result<Self, Error> {
        if !dir.is_dir() {
            return Err(Error::PathNotFound { path: dir.to_path_buf() });
        }

        let mut corpus = Self::default();
        for entry in WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| return e.file_type().is_file())
            .filter(|e| return e.path().extension().is_some_and(|ext| return ext == "md"))
        {
            let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
            let logical = relative
                .components()
                .map(|c| return c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let text = std::fs::read_to_string(entry.path())?;
            corpus.insert(logical, text);
        }
        tracing::debug!(documents = corpus.len(), dir = %dir.display(), "loaded corpus");
        return Ok(corpus);
    }

    /// Write every document under `dir`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if a directory or file cannot be written.
    pub fn write(&self, dir: &Path) -> Result<(), Error> {
        for document in &self.documents {
            write_document(dir, document)?;
        }
        return Ok(());
    }
}

impl PartialEq for Corpus {
    /// Same documents in the same order.
    fn eq(&self, other: &Self) -> bool {
        return self.documents == other.documents;
    }
}

impl Eq for Corpus {}

impl<P: Into<String>, T: Into<String>> FromIterator<(P, T)> for Corpus {
    fn from_iter<I: IntoIterator<Item = (P, T)>>(iter: I) -> Self {
        let mut corpus = Self::default();
        for (path, text) in iter {
            corpus.insert(path, text);
        }
        return corpus;
    }
}

/// Write one document below `dir`.
///
/// # Errors
///
/// Returns `Error::Io` if a directory or the file cannot be written.
pub fn write_document(dir: &Path, document: &Document) -> Result<(), Error> {
    let destination = dir.join(&document.path);
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&destination, &document.text)?;
    return Ok(());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iteration_follows_insertion_order() {
        let corpus: Corpus = [("b.md", "B"), ("a.md", "A"), ("c.md", "C")].into_iter().collect();
        let paths: Vec<&str> = corpus.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, ["b.md", "a.md", "c.md"]);
    }

    #[test]
    fn replacing_keeps_position() {
        let mut corpus: Corpus = [("b.md", "B"), ("a.md", "A")].into_iter().collect();
        corpus.insert("b.md", "B2");
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.iter().next().map(|d| d.text.as_str()), Some("B2"));
        assert_eq!(corpus.get("b.md"), Some("B2"));
    }

    #[test]
    fn load_and_write_round_trip() {
        let source = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(source.path().join("Ordering.API")).unwrap();
        std::fs::write(source.path().join("Ordering.API/Commands.md"), "## Commands\n").unwrap();
        std::fs::write(source.path().join("Index.md"), "# Index\n").unwrap();
        std::fs::write(source.path().join("notes.txt"), "ignored").unwrap();

        let corpus = Corpus::load(source.path()).unwrap();
        assert_eq!(corpus.len(), 2);
        assert!(corpus.contains("Ordering.API/Commands.md"));
        assert!(!corpus.contains("notes.txt"));

        let out = tempfile::tempdir().unwrap();
        corpus.write(out.path()).unwrap();
        let reloaded = Corpus::load(out.path()).unwrap();
        assert_eq!(reloaded, corpus);
    }

    #[test]
    fn missing_dir_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = Corpus::load(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, Error::PathNotFound { .. }), "unexpected error: {err}");
    }

    #[test]
    fn changed_documents_are_listed() {
        let before: Corpus = [("a.md", "A"), ("b.md", "B")].into_iter().collect();
        let after: Corpus = [("a.md", "A"), ("b.md", "B2")].into_iter().collect();
        let changed: Vec<&str> = after.changed_from(&before).map(|d| d.path.as_str()).collect();
        assert_eq!(changed, ["b.md"]);
    }
}
