//! Crate-level error types for docmend diagnostics.

use std::path::PathBuf;

/// Every error names the file, pattern, or reason for failure so that the
/// diagnostic printed by `main` is actionable without a debugger.
///
/// Extraction and link resolution never produce these: they degrade locally.
/// Only configuration and top-level I/O can abort a command.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Config file parsed but a value is unusable.
    #[error("invalid config: {reason}")]
    ConfigInvalid {
        /// Description of the problem, naming the offending key.
        reason: String,
    },

    /// A glob from the `[source]` table failed to compile.
    #[error("invalid glob `{pattern}`: {reason}")]
    Glob {
        /// The glob as written in the config.
        pattern: String,
        /// Compiler message from the glob crate.
        reason: String,
    },

    /// A classification rule's regex failed to compile.
    #[error("classification rule #{index} has an invalid pattern `{pattern}`: {reason}")]
    InvalidRule {
        /// One-based position of the rule in `[[classification_rules]]`.
        index: usize,
        /// The pattern as written in the config.
        pattern: String,
        /// Compiler message from the regex crate.
        reason: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON serialization of command output failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped serde_json error.
        #[from]
        serde_json::Error,
    ),

    /// A configured directory does not exist on disk.
    #[error("path not found: {}", path.display())]
    PathNotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// A built-in pattern failed to compile.
    #[error("regex: {0}")]
    Regex(
        /// The wrapped regex error.
        #[from]
        regex::Error,
    ),

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),
}
