//! Project configuration loaded from `.docmend.toml`.

use std::path::{Path, PathBuf};

use glob::Pattern;

use crate::classifier::{Classifier, RuleConfig};
use crate::error::Error;
use crate::source_index::DEFAULT_SKIP_DIRS;
use crate::urls::SourceUrlTemplate;

/// Config file name, looked up in the project root.
pub const CONFIG_FILE: &str = ".docmend.toml";

/// Source URL format used when `[repository]` omits one.
pub const DEFAULT_SOURCE_URL_FORMAT: &str = "{repo_url}/blob/{branch}/{file_path}";

/// Validated configuration. Globs and rule regexes are compiled, so a
/// `Config` that loaded can no longer fail on a bad pattern.
#[derive(Debug)]
pub struct Config {
    /// Compiled `[[classification_rules]]`.
    pub classifier: Classifier,
    /// Directory holding the generated corpus.
    pub docs_dir: PathBuf,
    /// File-name globs skipped by the scanner.
    pub exclude_files: Vec<Pattern>,
    /// Directory-name globs skipped by the scanner.
    pub exclude_folders: Vec<Pattern>,
    /// File-name globs the scanner extracts from.
    pub extensions: Vec<Pattern>,
    /// Source URL template; `None` disables source URL repair.
    pub repository: Option<SourceUrlTemplate>,
    /// Source File Index settings.
    pub resolver: ResolverSettings,
    /// Tree the scanner walks, relative to the project root.
    pub source_root: String,
}

/// `[resolver]` after defaults are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverSettings {
    /// Directory names never indexed.
    pub skip_dirs: Vec<String>,
    /// Extensions (no dot) that make a URL a source-file URL.
    pub source_extensions: Vec<String>,
    /// Subtree of the repository that is indexed.
    pub source_root: String,
}

/// Raw TOML structure for `.docmend.toml`.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DocmendTomlConfig {
    /// Ordered classification rules.
    classification_rules: Vec<RuleConfig>,
    /// `[docs]`
    docs: DocsTable,
    /// `[repository]`
    repository: Option<RepositoryTable>,
    /// `[resolver]`
    resolver: ResolverTable,
    /// `[source]`
    source: SourceTable,
}

/// `[docs]` table.
#[derive(Debug, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DocsTable {
    /// Corpus directory.
    dir: String,
}

impl Default for DocsTable {
    fn default() -> Self {
        return Self { dir: "docs".to_string() };
    }
}

/// `[repository]` table.
#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct RepositoryTable {
    /// Branch for `{branch}`.
    #[serde(default = "default_branch")]
    branch: String,
    /// URL format string.
    #[serde(default = "default_source_url_format")]
    source_url_format: String,
    /// Repository base URL.
    url: String,
}

/// `[resolver]` table.
#[derive(Debug, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ResolverTable {
    /// Directory names never indexed.
    skip_dirs: Vec<String>,
    /// Source-file extensions without the dot.
    source_extensions: Vec<String>,
    /// Indexed subtree.
    source_root: String,
}

impl Default for ResolverTable {
    fn default() -> Self {
        return Self {
            skip_dirs: DEFAULT_SKIP_DIRS.iter().map(|s| return (*s).to_string()).collect(),
            source_extensions: vec!["cs".to_string()],
            source_root: "src".to_string(),
        };
    }
}

/// `[source]` table.
#[derive(Debug, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SourceTable {
    /// File-name globs to skip.
    exclude_files: Vec<String>,
    /// Directory-name globs to skip.
    exclude_folders: Vec<String>,
    /// File-name globs to extract from.
    extensions: Vec<String>,
    /// Tree to extract from.
    root: String,
}

impl Default for SourceTable {
    fn default() -> Self {
        return Self {
            exclude_files: Vec::new(),
            exclude_folders: Vec::new(),
            extensions: vec!["*.cs".to_string()],
            root: ".".to_string(),
        };
    }
}

impl Config {
    /// Whether the scanner skips directories with this name.
    pub fn excludes_dir(&self, dir_name: &str) -> bool {
        return self.exclude_folders.iter().any(|p| return p.matches(dir_name));
    }

    /// Validate and compile a raw config.
    ///
    /// # Errors
    ///
    /// Returns the first invalid glob, rule, or value.
    fn from_raw(raw: DocmendTomlConfig) -> Result<Self, Error> {
        if raw.source.extensions.is_empty() {
            return Err(Error::ConfigInvalid {
                reason: "`source.extensions` must list at least one glob".to_string(),
            });
        }
        let repository = raw.repository.map(validate_repository).transpose()?;

        return Ok(Self {
            classifier: Classifier::from_rules(&raw.classification_rules)?,
            docs_dir: PathBuf::from(raw.docs.dir),
            exclude_files: compile_globs(&raw.source.exclude_files)?,
            exclude_folders: compile_globs(&raw.source.exclude_folders)?,
            extensions: compile_globs(&raw.source.extensions)?,
            repository,
            resolver: ResolverSettings {
                skip_dirs: raw.resolver.skip_dirs,
                source_extensions: raw
                    .resolver
                    .source_extensions
                    .iter()
                    .map(|ext| return ext.trim_start_matches('.').to_string())
                    .collect(),
                source_root: raw.resolver.source_root,
            },
            source_root: raw.source.root,
        });
    }

    /// Whether the scanner should extract from a file with this name.
    pub fn includes_file(&self, file_name: &str) -> bool {
        let allowed = self.extensions.iter().any(|p| return p.matches(file_name));
        return allowed && !self.exclude_files.iter().any(|p| return p.matches(file_name));
    }

    /// Load config from `.docmend.toml` in the given root directory.
    /// Returns defaults if the file doesn't exist. Returns an error if the
    /// file exists but is malformed; never silently falls back to defaults
    /// when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// `Error::TomlDe` if the TOML is malformed, `Error::Glob` or
    /// `Error::InvalidRule` if a pattern does not compile, or
    /// `Error::ConfigInvalid` if a value is unusable.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let raw = match std::fs::read_to_string(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                DocmendTomlConfig::default()
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(content) => toml::from_str(&content)?,
        };
        return Self::from_raw(raw);
    }

    /// Parse config from TOML text.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`], minus the I/O failure.
    pub fn parse(content: &str) -> Result<Self, Error> {
        return Self::from_raw(toml::from_str(content)?);
    }
}

/// Compile a list of globs, naming the first bad one.
///
/// # Errors
///
/// Returns `Error::Glob` for the first pattern that fails to compile.
fn compile_globs(patterns: &[String]) -> Result<Vec<Pattern>, Error> {
    return patterns
        .iter()
        .map(|p| {
            return Pattern::new(p).map_err(|e| {
                return Error::Glob {
                    pattern: p.clone(),
                    reason: e.to_string(),
                };
            });
        })
        .collect();
}

/// Serde default for `repository.branch`.
fn default_branch() -> String {
    return "main".to_string();
}

/// Serde default for `repository.source_url_format`.
fn default_source_url_format() -> String {
    return DEFAULT_SOURCE_URL_FORMAT.to_string();
}

/// Check the `[repository]` table and turn it into a URL template.
///
/// # Errors
///
/// Returns `Error::ConfigInvalid` for an empty URL or a format without
/// `{file_path}`.
fn validate_repository(table: RepositoryTable) -> Result<SourceUrlTemplate, Error> {
    if table.url.trim().is_empty() {
        return Err(Error::ConfigInvalid {
            reason: "`repository.url` is empty".to_string(),
        });
    }
    if !table.source_url_format.contains("{file_path}") {
        return Err(Error::ConfigInvalid {
            reason: format!(
                "`repository.source_url_format` has no `{{file_path}}` placeholder: `{}`",
                table.source_url_format
            ),
        });
    }
    return Ok(SourceUrlTemplate::new(table.url.trim(), &table.branch, &table.source_url_format));
}
