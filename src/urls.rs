//! Source-repository URLs: building them from a template and repairing the
//! ones generated text gets wrong (placeholder hosts, moved or invented
//! file paths).

use std::path::{Path, PathBuf};

use regex::{Captures, Regex};

use crate::error::Error;
use crate::paths;
use crate::source_index::SourceIndex;

/// Comment left in place of a diagram `click` directive whose target is gone.
pub const REMOVED_CLICK: &str = "%% Removed: invalid source link";

/// Placeholder for the per-line anchor in a URL template.
const LINE_PLACEHOLDER: &str = "{line}";

/// Canonical source URL format, e.g. `{repo_url}/blob/{branch}/{file_path}#L{line}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUrlTemplate {
    /// Default branch substituted for `{branch}`.
    branch: String,
    /// Format string with `{repo_url}`, `{branch}`, `{file_path}`, `{line}`.
    format: String,
    /// Repository base URL without a trailing slash.
    repo_url: String,
}

impl SourceUrlTemplate {
    /// Branch used when the caller does not supply one.
    pub fn branch(&self) -> &str {
        return &self.branch;
    }

    /// URL for `file_path` on the configured branch. Without a line number
    /// any `#...{line}` fragment in the format is dropped.
    pub fn build(&self, file_path: &str, line: Option<u32>) -> String {
        return self.build_on(&self.branch, file_path, line);
    }

    /// Same as [`Self::build`] with an explicit branch.
    pub fn build_on(&self, branch: &str, file_path: &str, line: Option<u32>) -> String {
        let format = match line {
            Some(n) => self.format.replace(LINE_PLACEHOLDER, &n.to_string()),
            None => strip_line_fragment(&self.format),
        };
        return format
            .replace("{repo_url}", &self.repo_url)
            .replace("{branch}", branch)
            .replace("{file_path}", file_path.trim_start_matches('/'));
    }

    /// Whether the format carries a `{line}` placeholder.
    pub fn has_line(&self) -> bool {
        return self.format.contains(LINE_PLACEHOLDER);
    }

    /// Template for `repo_url` with the given branch and format.
    pub fn new(repo_url: &str, branch: &str, format: &str) -> Self {
        return Self {
            branch: branch.to_string(),
            format: format.to_string(),
            repo_url: repo_url.trim_end_matches('/').to_string(),
        };
    }

    /// Repository base URL.
    pub fn repo_url(&self) -> &str {
        return &self.repo_url;
    }
}

/// What to do with one URL found in generated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlRepair {
    /// Already valid, or not a source URL at all.
    Keep,
    /// Points at a source file that cannot be found anywhere.
    Remove,
    /// Rebuilt URL pointing at the real file.
    Replace(String),
}

/// Pass one of link resolution: validates source URLs against the checkout.
#[derive(Debug)]
pub struct SourceRepair {
    /// `https://github.com/<owner>/<repo>/blob/<branch>/<path>#<fragment>`.
    blob_url: Regex,
    /// Diagram `click Node "url"` directive, one per line.
    click: Regex,
    /// File-name lookup for paths that do not exist as written.
    index: SourceIndex,
    /// `[text](http...)` markdown link.
    link: Regex,
    /// Placeholder repository URL left by the generator.
    placeholder: Regex,
    /// Checkout that source paths are checked against.
    repo_root: PathBuf,
    /// File extensions (without dot) that count as source files.
    source_extensions: Vec<String>,
    /// Used to rebuild every replacement URL.
    template: SourceUrlTemplate,
}

impl SourceRepair {
    /// Where a URL path points in the checkout.
    fn locate(&self, url_path: &str) -> Located {
        let decoded = paths::decode(url_path);
        let is_source = Path::new(&decoded)
            .extension()
            .and_then(|ext| return ext.to_str())
            .is_some_and(|ext| {
                return self.source_extensions.iter().any(|allowed| return allowed == ext);
            });
        if !is_source {
            return Located::NotSource;
        }
        if self.repo_root.join(&decoded).is_file() {
            return Located::Present;
        }
        return match self.index.get(paths::file_name(&decoded)) {
            Some(found) => Located::Elsewhere(found.to_string()),
            None => Located::Missing,
        };
    }

    /// Compile the URL patterns.
    ///
    /// # Errors
    ///
    /// Returns `Error::Regex` if a built-in pattern fails to compile.
    pub fn new(
        repo_root: &Path,
        template: SourceUrlTemplate,
        index: SourceIndex,
        source_extensions: Vec<String>,
    ) -> Result<Self, Error> {
        return Ok(Self {
            blob_url: Regex::new(
                r#"^https?://github\.com/[^/\s"]+/[^/\s"]+/blob/(?P<branch>[^/\s"]+)/(?P<path>[^#?\s")]+)(?:\?[^#\s")]*)?(?:#(?P<fragment>[^\s")]*))?$"#,
            )?,
            click: Regex::new(
                r#"(?m)^(?P<indent>[ \t]*)click[ \t]+\w+[ \t]+(?:href[ \t]+)?"(?P<url>https?://[^"]+)"[^\n]*$"#,
            )?,
            index,
            link: Regex::new(r"\[(?P<text>[^\]]*)\]\((?P<url>https?://[^)\s]+)\)")?,
            placeholder: Regex::new(
                r#"https?://github\.com/(?:your-repo(?:-link)?|OWNER/REPO)(?P<rest>/[^\s")\]]*)?"#,
            )?,
            repo_root: repo_root.to_path_buf(),
            source_extensions,
            template,
        });
    }

    /// Rebuild a URL for a known-good path, carrying the old fragment over.
    fn rebuild(&self, branch: &str, file_path: &str, fragment: Option<&str>) -> String {
        let line = fragment
            .filter(|_| return self.template.has_line())
            .and_then(|f| return f.strip_prefix('L'))
            .and_then(|digits| return digits.parse::<u32>().ok());
        let mut url = self.template.build_on(branch, file_path, line);
        if line.is_some() {
            return url;
        }
        if let Some(fragment) = fragment.filter(|f| return !f.is_empty()) {
            url.push('#');
            url.push_str(fragment);
        }
        return url;
    }

    /// Replace a click directive's URL, or the whole line with a removal note.
    fn repair_click(&self, caps: &Captures<'_>) -> String {
        let (Some(whole), Some(url)) = (caps.get(0), caps.name("url")) else {
            return String::new();
        };
        return match self.repair_url(url.as_str()) {
            UrlRepair::Keep => whole.as_str().to_string(),
            UrlRepair::Remove => {
                tracing::debug!(url = url.as_str(), "removed click directive");
                let indent = caps.name("indent").map_or("", |m| return m.as_str());
                format!("{indent}{REMOVED_CLICK}")
            },
            UrlRepair::Replace(fixed) => {
                let start = url.start().saturating_sub(whole.start());
                let end = url.end().saturating_sub(whole.start());
                let line = whole.as_str();
                format!(
                    "{}{fixed}{}",
                    line.get(..start).unwrap_or_default(),
                    line.get(end..).unwrap_or_default()
                )
            },
        };
    }

    /// Rewrite a markdown link's URL, or collapse it to its text.
    fn repair_link(&self, caps: &Captures<'_>) -> String {
        let whole = caps.get(0).map_or("", |m| return m.as_str());
        let text = caps.name("text").map_or("", |m| return m.as_str());
        let url = caps.name("url").map_or("", |m| return m.as_str());
        return match self.repair_url(url) {
            UrlRepair::Keep => whole.to_string(),
            UrlRepair::Remove => {
                tracing::debug!(url, "removed source link");
                text.to_string()
            },
            UrlRepair::Replace(fixed) => format!("[{text}]({fixed})"),
        };
    }

    /// Placeholder host: keep the path if it is a `/blob/<branch>/<path>`,
    /// otherwise treat the last segment as a bare file name.
    fn repair_placeholder(&self, rest: &str) -> UrlRepair {
        let (without_fragment, fragment) = match rest.split_once('#') {
            Some((head, tail)) => (head, Some(tail)),
            None => (rest, None),
        };
        // `/your-repo/<repo>/blob/...` and `/OWNER/REPO/blob/...` both carry the
        // branch after `blob`.
        if let Some((_, after_blob)) = without_fragment.split_once("/blob/") {
            let (branch, path) =
                after_blob.split_once('/').unwrap_or((self.template.branch(), after_blob));
            return match self.locate(path) {
                Located::Elsewhere(found) => {
                    UrlRepair::Replace(self.rebuild(branch, &found, fragment))
                },
                Located::Missing => UrlRepair::Remove,
                Located::NotSource | Located::Present => {
                    UrlRepair::Replace(self.rebuild(branch, path, fragment))
                },
            };
        }

        let name = paths::file_name(without_fragment);
        if let Located::NotSource = self.locate(name) {
            return UrlRepair::Keep;
        }
        return match self.index.get(name) {
            Some(found) => {
                UrlRepair::Replace(self.rebuild(self.template.branch(), found, fragment))
            },
            None => UrlRepair::Remove,
        };
    }

    /// Rewrite or remove every broken source URL in one document: diagram
    /// click lines, markdown links, then any bare placeholder URL left over.
    pub fn repair_text(&self, text: &str) -> String {
        let clicked =
            self.click.replace_all(text, |caps: &Captures<'_>| return self.repair_click(caps));
        let linked =
            self.link.replace_all(&clicked, |caps: &Captures<'_>| return self.repair_link(caps));
        let bare = self.placeholder.replace_all(&linked, |caps: &Captures<'_>| {
            let whole = caps.get(0).map_or("", |m| return m.as_str());
            return match self.repair_url(whole) {
                UrlRepair::Keep => whole.to_string(),
                UrlRepair::Remove => String::new(),
                UrlRepair::Replace(url) => url,
            };
        });
        return bare.into_owned();
    }

    /// Decide the fate of one URL.
    pub fn repair_url(&self, url: &str) -> UrlRepair {
        if let Some(caps) = self.placeholder.captures(url) {
            return self.repair_placeholder(caps.name("rest").map_or("", |m| return m.as_str()));
        }
        let Some(caps) = self.blob_url.captures(url) else {
            return UrlRepair::Keep;
        };
        let branch = caps.name("branch").map_or("", |m| return m.as_str());
        let path = caps.name("path").map_or("", |m| return m.as_str());
        let fragment = caps.name("fragment").map(|m| return m.as_str());
        return match self.locate(path) {
            Located::Elsewhere(found) => UrlRepair::Replace(self.rebuild(branch, &found, fragment)),
            Located::Missing => UrlRepair::Remove,
            Located::Present | Located::NotSource => UrlRepair::Keep,
        };
    }
}

/// Result of checking a URL path against the checkout.
enum Located {
    /// Found under a different path.
    Elsewhere(String),
    /// Source file that exists nowhere.
    Missing,
    /// Not a configured source extension.
    NotSource,
    /// Exists exactly as written.
    Present,
}

/// Remove the `{line}` placeholder and the `#` fragment that introduces it.
fn strip_line_fragment(format: &str) -> String {
    let Some(at) = format.find(LINE_PLACEHOLDER) else {
        return format.to_string();
    };
    let end = at.saturating_add(LINE_PLACEHOLDER.len());
    let start = format.get(..at).and_then(|head| return head.rfind('#')).unwrap_or(at);
    let mut out = format.get(..start).unwrap_or_default().to_string();
    out.push_str(format.get(end..).unwrap_or_default());
    return out;
}
