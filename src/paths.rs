//! Path arithmetic over logical corpus paths (`Project/File.md`).
//!
//! Corpus paths are plain forward-slash strings, never touched on disk, so
//! this works on segments rather than `std::path`.

use percent_encoding::percent_decode_str;

/// Drop a duplicated directory segment: `A/X/X/File.md` -> `A/X/File.md`.
/// Returns `None` when there is nothing to collapse.
pub fn collapse_duplicate_segment(path: &str) -> Option<String> {
    let segments: Vec<&str> = path.split('/').collect();
    let Some((file, dirs)) = segments.split_last() else {
        return None;
    };

    let mut kept: Vec<&str> = Vec::with_capacity(segments.len());
    for dir in dirs {
        if kept.last() == Some(dir) {
            continue;
        }
        kept.push(dir);
    }
    if kept.len() == dirs.len() {
        return None;
    }
    kept.push(file);
    return Some(kept.join("/"));
}

/// Decode `%20` and friends. Invalid UTF-8 is replaced, never an error.
pub fn decode(path: &str) -> String {
    return percent_decode_str(path).decode_utf8_lossy().into_owned();
}

/// Last segment of a corpus path.
pub fn file_name(path: &str) -> &str {
    return path.rsplit('/').next().unwrap_or(path);
}

/// File name without its final extension.
pub fn file_stem(path: &str) -> &str {
    let name = file_name(path);
    return name.rsplit_once('.').map_or(name, |(stem, _)| return stem);
}

/// Collapse `.`, `..` and empty segments. `..` at the corpus root is dropped,
/// since nothing can live above it.
pub fn normalize(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                segments.pop();
            },
            other => segments.push(other),
        }
    }
    return segments.join("/");
}

/// Directory segments of a document path (everything but the file name).
fn parent_segments(path: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = path.split('/').filter(|s| return !s.is_empty()).collect();
    segments.pop();
    return segments;
}

/// Shortest relative link from the document `from` to the document `to`,
/// with `#anchor` appended when one is given. Spaces are percent-encoded so
/// the result is a valid markdown link target.
pub fn relative_link(from: &str, to: &str, anchor: Option<&str>) -> String {
    let from_dir = parent_segments(from);
    let to_segments: Vec<&str> = to.split('/').filter(|s| return !s.is_empty()).collect();
    let to_dir_len = to_segments.len().saturating_sub(1);

    let common = from_dir
        .iter()
        .zip(to_segments.iter().take(to_dir_len))
        .take_while(|(a, b)| return a == b)
        .count();

    let ups = from_dir.len().saturating_sub(common);
    let rest = to_segments.get(common..).unwrap_or_default().join("/");
    let mut link = format!("{}{rest}", "../".repeat(ups)).replace(' ', "%20");
    if let Some(anchor) = anchor.filter(|a| return !a.is_empty()) {
        link.push('#');
        link.push_str(anchor);
    }
    return link;
}

/// Resolve a link target written inside `current` to a corpus path.
/// Relative targets are joined to the current document's directory; a
/// leading `/` means corpus-root relative.
pub fn resolve_against(current: &str, target: &str) -> String {
    let unified = target.replace('\\', "/");
    if let Some(rooted) = unified.strip_prefix('/') {
        return normalize(rooted);
    }
    let mut joined = parent_segments(current).join("/");
    if !joined.is_empty() {
        joined.push('/');
    }
    joined.push_str(&unified);
    return normalize(&joined);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_parent_and_current_dir_targets() {
        assert_eq!(resolve_against("A/B.md", "../C/D.md"), "C/D.md");
        assert_eq!(resolve_against("A/B.md", "./E.md"), "A/E.md");
        assert_eq!(resolve_against("A/B.md", "E.md"), "A/E.md");
        assert_eq!(resolve_against("A/B/C.md", "../../X.md"), "X.md");
        assert_eq!(resolve_against("A/B.md", "/Root.md"), "Root.md");
    }

    #[test]
    fn parent_beyond_root_is_dropped() {
        assert_eq!(resolve_against("Top.md", "../../Other/X.md"), "Other/X.md");
    }

    #[test]
    fn relative_link_is_minimal() {
        assert_eq!(relative_link("A/B.md", "X/C/D.md", Some("baz-bar")), "../X/C/D.md#baz-bar");
        assert_eq!(relative_link("A/B.md", "A/C.md", None), "C.md");
        assert_eq!(relative_link("Top.md", "A/C.md", Some("")), "A/C.md");
        assert_eq!(relative_link("A/B/C.md", "A/D.md", None), "../D.md");
        assert_eq!(relative_link("A/B.md", "A/Data Flow.md", None), "Data%20Flow.md");
    }

    #[test]
    fn relative_link_round_trips_through_resolution() {
        for (from, to) in [("A/B.md", "X/C/D.md"), ("A/B/C.md", "A/D.md"), ("Top.md", "A/B/C.md")] {
            let link = relative_link(from, to, None);
            assert_eq!(resolve_against(from, &link), to, "link {link} from {from}");
        }
    }

    #[test]
    fn duplicate_segment_collapses() {
        assert_eq!(
            collapse_duplicate_segment("Ordering.API/Ordering.API/Commands.md").as_deref(),
            Some("Ordering.API/Commands.md")
        );
        assert_eq!(collapse_duplicate_segment("A/B/C.md"), None);
        assert_eq!(collapse_duplicate_segment("A/A.md"), None);
    }

    #[test]
    fn stems_and_names() {
        assert_eq!(file_name("A/B/Order.md"), "Order.md");
        assert_eq!(file_stem("A/B/Order.md"), "Order");
        assert_eq!(file_stem("README"), "README");
        assert_eq!(decode("Data%20Interactions.md"), "Data Interactions.md");
    }
}
