use std::fmt::Write as _;

use crate::config::CONFIG_FILE;
use crate::error::Error;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and, where the user can
/// act on it, how to fix it.
pub fn render_error(e: &Error) -> String {
    match e {
        Error::ConfigInvalid { reason } => render_config_invalid(reason),
        Error::Glob { pattern, reason } => render_glob(pattern, reason),
        Error::InvalidRule { index, pattern, reason } => {
            render_invalid_rule(*index, pattern, reason)
        },
        Error::PathNotFound { path } => render_path_not_found(&path.display().to_string()),
        _ => render_generic(e),
    }
}

fn render_generic(e: &Error) -> String {
    match e {
        Error::Io(e) => format!("\
# Error: I/O

{e}
"),
        Error::Json(e) => format!("\
# Error: JSON Output

{e}
"),
        Error::Regex(e) => format!("\
# Error: Built-in Pattern

{e}
"),
        Error::TomlDe(e) => format!("\
# Error: Invalid TOML

{e}

## Fix

Check `{CONFIG_FILE}` against the reference:

    docmend info
"),
        // Already handled in render_error, but need exhaustive match.
        _ => format!("\
# Error

{e}
"),
    }
}

fn render_config_invalid(reason: &str) -> String {
    format!("\
# Error: Invalid Config

{reason}

## Fix

Edit `{CONFIG_FILE}`. The accepted keys are listed by:

    docmend info
")
}

fn render_glob(pattern: &str, reason: &str) -> String {
    format!("\
# Error: Invalid Glob

`{pattern}` in `{CONFIG_FILE}` is not a valid glob: {reason}

## Fix

Globs match a single file or directory name, e.g. `*.cs` or `Migrations`.
")
}

fn render_invalid_rule(index: usize, pattern: &str, reason: &str) -> String {
    let mut out = format!("\
# Error: Invalid Classification Rule

Rule #{index} in `{CONFIG_FILE}` has a pattern that does not compile:

    pattern = \"{pattern}\"

{reason}
");

    out.push_str("\n## Fix\n\n");
    if pattern.contains('\\') && !pattern.contains("\\\\") {
        out.push_str("TOML basic strings consume one backslash.\n");
        out.push_str("Double it or use a literal string:\n\n");
        let _ = writeln!(out, "    pattern = '{pattern}'");
    } else {
        out.push_str("Patterns are regexes matched against the path relative to the source ");
        out.push_str("root.\n");
    }
    out
}

fn render_path_not_found(path: &str) -> String {
    format!("\
# Error: Path Not Found

`{path}` does not exist.

## Fix

Check `[docs] dir` in `{CONFIG_FILE}`, or generate the documentation first.
")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn path_not_found_names_the_path() {
        let md = render_error(&Error::PathNotFound { path: PathBuf::from("site/docs") });
        assert!(md.starts_with("# Error: Path Not Found"));
        assert!(md.contains("`site/docs`"));
        assert!(md.contains("[docs] dir"));
    }

    #[test]
    fn invalid_rule_suggests_literal_string() {
        let md = render_error(&Error::InvalidRule {
            index: 2,
            pattern: "Handler\\.cs$(".to_string(),
            reason: "unclosed group".to_string(),
        });
        assert!(md.contains("Rule #2"));
        assert!(md.contains("pattern = 'Handler\\.cs$('"));
    }

    #[test]
    fn invalid_rule_without_backslash_has_generic_fix() {
        let md = render_error(&Error::InvalidRule {
            index: 1,
            pattern: "(".to_string(),
            reason: "unclosed group".to_string(),
        });
        assert!(md.contains("regexes matched against the path"));
    }

    #[test]
    fn every_block_has_a_heading() {
        let errors = [
            Error::ConfigInvalid { reason: "x".to_string() },
            Error::Glob { pattern: "[".to_string(), reason: "y".to_string() },
            Error::Io(std::io::Error::other("disk")),
        ];
        for e in &errors {
            assert!(render_error(e).starts_with("# Error"), "{e}");
        }
    }
}
