//! Core CLI commands for docmend: extract, classify, inventory, resolve, info.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use serde::Serialize;

use crate::config::Config;
use crate::corpus::{self, Corpus};
use crate::error;
use crate::extractor::Extractor;
use crate::inventory::{Anchor, HeadingPatterns, Inventory, Location};
use crate::resolver::LinkResolver;
use crate::scanner;
use crate::source_index::SourceIndex;
use crate::urls::SourceRepair;

/// Inventory of one document, in corpus order.
#[derive(Serialize)]
struct DocumentAnchors<'a> {
    /// Headings of the document.
    anchors: &'a [Anchor],
    /// Corpus path.
    document: &'a str,
}

/// Deterministic JSON view of an inventory.
#[derive(Serialize)]
struct InventoryReport<'a> {
    /// Documents in corpus order.
    documents: Vec<DocumentAnchors<'a>>,
    /// Entity map sorted by name.
    entities: BTreeMap<&'a str, &'a Location>,
}

/// Print the classification of one path relative to the source root.
///
/// # Errors
///
/// Returns errors from config loading.
pub fn classify(path: &str) -> Result<(), error::Error> {
    let root = PathBuf::from(".");
    let config = Config::load(&root)?;
    let classification = config.classifier.classify(path);

    println!("category:  {}", classification.category);
    println!("doc_file:  {}", classification.doc_file.as_deref().unwrap_or("-"));
    println!("doc_title: {}", classification.doc_title.as_deref().unwrap_or("-"));
    return Ok(());
}

/// Extract the configured source tree and print the model as JSON.
///
/// # Errors
///
/// Returns errors from config loading, pattern compilation, or serialization.
pub fn extract(compact: bool) -> Result<(), error::Error> {
    let root = PathBuf::from(".");
    let config = Config::load(&root)?;
    let extractor = Extractor::new()?;
    let files = scanner::scan(&root, &config, &extractor);

    let json = if compact {
        serde_json::to_string(&files)?
    } else {
        serde_json::to_string_pretty(&files)?
    };
    println!("{json}");
    eprintln!("Extracted {} files", files.len());
    return Ok(());
}

/// Output a comprehensive reference document for docmend.
pub fn info(json: bool) {
    return crate::info::run(json);
}

/// Print the heading anchors of every document and the entity map.
///
/// # Errors
///
/// Returns errors from config loading, corpus loading, or serialization.
pub fn inventory(json: bool) -> Result<(), error::Error> {
    let root = PathBuf::from(".");
    let config = Config::load(&root)?;
    let corpus = Corpus::load(&root.join(&config.docs_dir))?;
    let inventory = Inventory::build(&corpus, &HeadingPatterns::new()?);

    if json {
        let report = InventoryReport {
            documents: corpus
                .iter()
                .map(|d| {
                    return DocumentAnchors {
                        anchors: inventory.anchors_of(&d.path),
                        document: &d.path,
                    };
                })
                .collect(),
            entities: inventory.entities.iter().map(|(k, v)| return (k.as_str(), v)).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for document in corpus.iter() {
        println!("{}", document.path);
        for anchor in inventory.anchors_of(&document.path) {
            println!("  #{}  {}", anchor.slug, anchor.heading);
        }
    }
    let entities: BTreeMap<&String, &Location> = inventory.entities.iter().collect();
    println!();
    for (name, location) in &entities {
        println!("{name}  ->  {}#{}", location.document, location.anchor);
    }
    eprintln!("{} documents, {} entities", corpus.len(), entities.len());
    return Ok(());
}

/// Repair links in the docs corpus.
///
/// With `check`, writes nothing and exits 1 if any document would change.
/// With `out`, writes the whole repaired corpus there. Otherwise rewrites
/// changed documents in place.
///
/// # Errors
///
/// Returns errors from config loading, corpus I/O, or pattern compilation.
pub fn resolve(check: bool, out: Option<&Path>) -> Result<ExitCode, error::Error> {
    let root = PathBuf::from(".");
    let config = Config::load(&root)?;
    let docs_dir = root.join(&config.docs_dir);
    let corpus = Corpus::load(&docs_dir)?;
    if corpus.is_empty() {
        tracing::warn!(dir = %docs_dir.display(), "docs directory holds no markdown documents");
    }

    let repair = source_repair(&root, &config)?;
    let repaired = LinkResolver::new()?.resolve_all(&corpus, repair.as_ref());
    let changed: Vec<&corpus::Document> = repaired.changed_from(&corpus).collect();
    let total = corpus.len();

    if check {
        for document in &changed {
            println!("NEEDS REPAIR  {}", document.path);
        }
        if changed.is_empty() {
            println!("All {total} documents clean");
            return Ok(ExitCode::SUCCESS);
        }
        println!();
        println!("{} of {total} documents need repair", changed.len());
        eprintln!("hint: run `docmend resolve` to rewrite them in place");
        return Ok(ExitCode::from(1));
    }

    if let Some(out) = out {
        repaired.write(out)?;
        eprintln!("Wrote {total} documents to {} ({} repaired)", out.display(), changed.len());
        return Ok(ExitCode::SUCCESS);
    }

    for document in &changed {
        corpus::write_document(&docs_dir, document)?;
        println!("REPAIRED  {}", document.path);
    }
    eprintln!("Repaired {} of {total} documents in {}", changed.len(), config.docs_dir.display());
    return Ok(ExitCode::SUCCESS);
}

/// Build the source URL repair pass when a repository is configured.
///
/// # Errors
///
/// Returns `Error::Regex` if a built-in pattern fails to compile.
fn source_repair(root: &Path, config: &Config) -> Result<Option<SourceRepair>, error::Error> {
    let Some(template) = &config.repository else {
        return Ok(None);
    };
    let settings = &config.resolver;
    let index = SourceIndex::build(
        root,
        &settings.source_root,
        &settings.skip_dirs,
        &settings.source_extensions,
    );
    if index.is_empty() {
        tracing::warn!(
            root = %settings.source_root,
            "source index is empty, moved source files cannot be relocated"
        );
    } else {
        tracing::info!(files = index.len(), "indexed source files");
    }
    let repair =
        SourceRepair::new(root, template.clone(), index, settings.source_extensions.clone())?;
    return Ok(Some(repair));
}
