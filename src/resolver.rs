//! Link repair over a whole corpus.
//!
//! Every internal markdown link is resolved through a fixed chain of
//! strategies: path lookups, known aliases, entity lookups. The first hit
//! wins; when nothing hits the link is demoted to its label, so the output
//! never contains a link to nowhere. `{ref:Name}` placeholders become links
//! to the heading documenting `Name`. Running the resolver over its own
//! output changes nothing.

use regex::{Captures, Regex};

use crate::corpus::{Corpus, Document};
use crate::error::Error;
use crate::inventory::{Anchor, HeadingPatterns, Inventory};
use crate::paths;
use crate::urls::SourceRepair;

/// Document names generators commonly invent, and the real documents they
/// usually mean, tried in order.
const ALIASES: &[(&str, &[&str])] = &[
    ("BaseDomainDefinition.md", &["Models.md"]),
    ("Data Interactions.md", &["DataContext.md"]),
    ("DataInteraction.md", &["Repositories.md"]),
    ("DomainEvent.md", &["Models.md"]),
    ("Entities.md", &["Aggregate.md", "Models.md"]),
    ("ValueObject.md", &["Models.md", "Aggregate.md"]),
];

/// File stems that never name an entity.
const GENERIC_STEMS: &[&str] = &["index", "README"];

/// Markdown fence delimiter.
const FENCE: &str = "```";

/// Upper bound on repair passes over one document. Each pass unwraps one
/// level of nested link syntax; real documents settle after two.
const MAX_PASSES: usize = 8;

/// What happens to one link.
#[derive(Debug, PartialEq, Eq)]
enum Resolution {
    /// Replace the link with its label.
    Demote,
    /// Leave it exactly as written.
    Keep,
    /// Point it at this target instead.
    Rewrite(String),
}

/// Compiled patterns for the internal link pass.
#[derive(Debug)]
pub struct LinkResolver {
    /// Heading slug and entity rules, shared with the inventory.
    headings: HeadingPatterns,
    /// Link labels that look like a type or member name.
    identifier: Regex,
    /// `L42`: a source line anchor, never a document heading.
    line_anchor: Regex,
    /// `[label](target)`.
    link: Regex,
    /// `{ref:Name}` or `{ref:Ns.Name}` placeholder left by the generator.
    reference: Regex,
}

impl LinkResolver {
    /// Entity names to try when no document matched, most specific first.
    fn entity_guesses(&self, label: &str, anchor: Option<&str>, candidate: &str) -> Vec<String> {
        let mut guesses = Vec::new();
        if label.len() >= 2 && self.identifier.is_match(label) {
            guesses.push(label.to_string());
        }
        if let Some(guess) = anchor.and_then(anchor_entity) {
            guesses.push(guess);
        }
        let stem = paths::file_stem(candidate);
        if !stem.is_empty() && !GENERIC_STEMS.contains(&stem) {
            guesses.push(stem.to_string());
        }
        return guesses;
    }

    /// Compile the link patterns.
    ///
    /// # Errors
    ///
    /// Returns `Error::Regex` if a built-in pattern fails to compile.
    pub fn new() -> Result<Self, Error> {
        return Ok(Self {
            headings: HeadingPatterns::new()?,
            identifier: Regex::new(r"^[A-Za-z][\w.]*$")?,
            line_anchor: Regex::new(r"^L\d+$")?,
            link: Regex::new(r"\[([^\]]*)\]\(([^)]+)\)")?,
            reference: Regex::new(r"\{ref:(\w+(?:\.\w+)?)\}")?,
        });
    }

    /// Run every pass over one document until its text stops changing:
    /// source URLs (when `repair` is given), reference placeholders, then
    /// internal links. Demoting a link can expose a link nested in its
    /// label, which only a further pass sees. Returns the text and the
    /// number of links that changed.
    fn repair_document(
        &self,
        document: &Document,
        corpus: &Corpus,
        inventory: &Inventory,
        repair: Option<&SourceRepair>,
    ) -> (String, usize) {
        let mut text = document.text.clone();
        let mut changed = 0_usize;

        for _ in 0..MAX_PASSES {
            let external =
                repair.map_or_else(|| return text.clone(), |r| return r.repair_text(&text));
            let (referenced, _) = replace_outside_fences(&external, &self.reference, |caps| {
                return reference_link(caps, &document.path, inventory);
            });
            let (next, links) = self.repair_links(&referenced, &document.path, corpus, inventory);
            if next == text {
                return (text, changed);
            }
            changed = changed.saturating_add(links);
            text = next;
        }

        tracing::debug!(
            document = %document.path,
            passes = MAX_PASSES,
            "link repair did not settle"
        );
        return (text, changed);
    }

    /// Repair every internal link of one document. Links inside fenced code
    /// blocks pass through untouched. Returns the new text and the number of
    /// links that changed.
    fn repair_links(
        &self,
        text: &str,
        current: &str,
        corpus: &Corpus,
        inventory: &Inventory,
    ) -> (String, usize) {
        return replace_outside_fences(text, &self.link, |caps| {
            return self.replacement(caps, current, corpus, inventory);
        });
    }

    /// Text that replaces one link match.
    fn replacement(
        &self,
        caps: &Captures<'_>,
        current: &str,
        corpus: &Corpus,
        inventory: &Inventory,
    ) -> String {
        let original = caps.get(0).map_or("", |m| return m.as_str());
        let label = caps.get(1).map_or("", |m| return m.as_str());
        let target = caps.get(2).map_or("", |m| return m.as_str());
        return match self.resolve_link(label, target, current, corpus, inventory) {
            Resolution::Demote => {
                tracing::debug!(document = current, target, "demoted unresolvable link");
                label.to_string()
            },
            Resolution::Keep => original.to_string(),
            Resolution::Rewrite(resolved) => format!("[{label}]({resolved})"),
        };
    }

    /// Repair a whole corpus and return the repaired copy. The inventory is
    /// built from the input corpus before anything is rewritten.
    pub fn resolve_all(&self, corpus: &Corpus, repair: Option<&SourceRepair>) -> Corpus {
        let inventory = Inventory::build(corpus, &self.headings);
        let mut repaired = Corpus::default();

        for document in corpus.iter() {
            let (text, changed) = self.repair_document(document, corpus, &inventory, repair);
            if text != document.text {
                tracing::info!(document = %document.path, links = changed, "repaired document");
            }
            repaired.insert(document.path.clone(), text);
        }
        return repaired;
    }

    /// Resolve one link found in `current`.
    fn resolve_link(
        &self,
        label: &str,
        target: &str,
        current: &str,
        corpus: &Corpus,
        inventory: &Inventory,
    ) -> Resolution {
        let target = target.trim();
        if target.is_empty() || target.starts_with("http://") || target.starts_with("https://") {
            return Resolution::Keep;
        }

        let (path_part, anchor) = target
            .split_once('#')
            .map_or((target, None), |(path, anchor)| return (path.trim(), Some(anchor.trim())));
        let anchor = anchor.filter(|a| return !a.is_empty());
        if path_part.is_empty() {
            return Resolution::Keep;
        }
        if anchor.is_some_and(|a| return self.line_anchor.is_match(a)) {
            return Resolution::Demote;
        }
        if !paths::decode(path_part).ends_with(".md") {
            return Resolution::Keep;
        }

        let candidate = paths::resolve_against(current, path_part);
        let document = lookup(corpus, &candidate, path_part).or_else(|| {
            return aliases_of(&candidate)
                .iter()
                .find_map(|alias| return lookup(corpus, alias, alias));
        });

        let Some(document) = document else {
            return self
                .entity_guesses(label, anchor, &candidate)
                .iter()
                .find_map(|entity| return inventory.locate(entity))
                .map_or(Resolution::Demote, |location| {
                    return Resolution::Rewrite(paths::relative_link(
                        current,
                        &location.document,
                        Some(&location.anchor),
                    ));
                });
        };

        let anchors = inventory.anchors_of(&document);
        let chosen = match anchor {
            Some(wanted) => {
                let hint = anchor_entity(wanted);
                pick_anchor(anchors, wanted, &[hint.as_deref().unwrap_or_default(), label])
            },
            None => anchors.first().map(|a| return a.slug.clone()),
        };
        return Resolution::Rewrite(paths::relative_link(current, &document, chosen.as_deref()));
    }
}

/// Alias paths for a candidate whose file name is a known invention.
fn aliases_of(candidate: &str) -> Vec<String> {
    let decoded = paths::decode(candidate);
    let name = paths::file_name(&decoded);
    let dir = decoded.get(..decoded.len().saturating_sub(name.len())).unwrap_or_default();
    return ALIASES
        .iter()
        .filter(|(invented, _)| return *invented == name)
        .flat_map(|(_, real)| return real.iter())
        .map(|real| return format!("{dir}{real}"))
        .collect();
}

/// Entity guess from an anchor: strip digits, hyphens and underscores and
/// keep the rest if at least three characters survive.
fn anchor_entity(anchor: &str) -> Option<String> {
    let cleaned: String = anchor
        .chars()
        .filter(|c| return !c.is_ascii_digit() && *c != '-' && *c != '_')
        .collect();
    if cleaned.chars().count() < 3 {
        return None;
    }
    return Some(cleaned);
}

/// Find a corpus document for `candidate`: exact, percent-decoded, the raw
/// target taken from the corpus root, duplicate-segment collapse, then the
/// first document (in corpus order) with the same file name.
fn lookup(corpus: &Corpus, candidate: &str, raw_target: &str) -> Option<String> {
    let decoded = paths::decode(candidate);
    let rooted = paths::normalize(&paths::decode(raw_target));
    if let Some(found) = [candidate, decoded.as_str(), rooted.as_str()]
        .into_iter()
        .find(|path| return corpus.contains(path))
    {
        return Some(found.to_string());
    }

    if let Some(collapsed) =
        paths::collapse_duplicate_segment(&decoded).filter(|c| return corpus.contains(c))
    {
        return Some(collapsed);
    }

    let name = paths::file_name(&decoded);
    let suffix = format!("/{name}");
    return corpus
        .iter()
        .find(|d| return d.path == name || d.path.ends_with(&suffix))
        .map(|d| return d.path.clone());
}

/// Best anchor for `wanted` among a document's headings: exact slug, then
/// containment either way, then a hint found in the raw heading text, then
/// the first heading.
fn pick_anchor(anchors: &[Anchor], wanted: &str, hints: &[&str]) -> Option<String> {
    let lowered = wanted.to_lowercase().replace('_', "");
    let exact = anchors.iter().find(|a| return a.slug == wanted || a.slug == lowered);
    let contained = || {
        return anchors
            .iter()
            .find(|a| return a.slug.contains(&lowered) || lowered.contains(&a.slug));
    };
    let hinted = || {
        return hints.iter().filter(|h| return !h.is_empty()).find_map(|hint| {
            let hint = hint.to_lowercase();
            return anchors.iter().find(|a| return a.heading.to_lowercase().contains(&hint));
        });
    };
    return exact
        .or_else(contained)
        .or_else(hinted)
        .or_else(|| return anchors.first())
        .map(|a| return a.slug.clone());
}

/// Link for one `{ref:Name}` placeholder, or the bare name when the entity
/// is documented nowhere. A dotted name falls back to its last segment.
fn reference_link(caps: &Captures<'_>, current: &str, inventory: &Inventory) -> String {
    let name = caps.get(1).map_or("", |m| return m.as_str());
    let last = name.rsplit('.').next().unwrap_or(name);
    let Some(location) = inventory.locate(name).or_else(|| return inventory.locate(last)) else {
        tracing::debug!(document = current, name, "unresolved reference placeholder");
        return name.to_string();
    };
    let target = paths::relative_link(current, &location.document, Some(&location.anchor));
    return format!("[{name}]({target})");
}

/// Replace every match of `pattern` that starts outside a fenced code
/// block. Fences are counted over the whole prefix, including fences inside
/// earlier matches. Returns the new text and how many matches changed.
fn replace_outside_fences(
    text: &str,
    pattern: &Regex,
    mut replace: impl FnMut(&Captures<'_>) -> String,
) -> (String, usize) {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0_usize;
    let mut fences = 0_usize;
    let mut changed = 0_usize;

    for caps in pattern.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let before = text.get(cursor..whole.start()).unwrap_or_default();
        fences = fences.saturating_add(before.matches(FENCE).count());
        out.push_str(before);
        cursor = whole.end();

        let original = whole.as_str();
        let replacement =
            if fences.is_multiple_of(2) { replace(&caps) } else { original.to_string() };
        fences = fences.saturating_add(original.matches(FENCE).count());
        if replacement != original {
            changed = changed.saturating_add(1);
        }
        out.push_str(&replacement);
    }
    out.push_str(text.get(cursor..).unwrap_or_default());
    return (out, changed);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(docs: &[(&str, &str)]) -> Corpus {
        let corpus: Corpus = docs.iter().copied().collect();
        LinkResolver::new().unwrap().resolve_all(&corpus, None)
    }

    fn text_of<'a>(corpus: &'a Corpus, path: &str) -> &'a str {
        corpus.get(path).unwrap()
    }

    #[test]
    fn basename_match_with_partial_anchor() {
        let out = resolve(&[
            ("A/B.md", "See [Foo](../C/D.md#bar) now.\n"),
            ("X/C/D.md", "# D\n\n## Baz Bar\n"),
        ]);
        assert_eq!(text_of(&out, "A/B.md"), "See [Foo](../X/C/D.md#baz-bar) now.\n");
    }

    #[test]
    fn unresolvable_link_becomes_label() {
        let out = resolve(&[("A.md", "Use [Bar](NoSuchClass.md) here.\n"), ("B.md", "## Other\n")]);
        assert_eq!(text_of(&out, "A.md"), "Use Bar here.\n");
    }

    #[test]
    fn links_inside_fences_are_untouched() {
        let text = "```\n[Bar](NoSuchClass.md)\n```\n[Baz](Missing.md)\n";
        let out = resolve(&[("A.md", text)]);
        assert_eq!(text_of(&out, "A.md"), "```\n[Bar](NoSuchClass.md)\n```\nBaz\n");
    }

    #[test]
    fn source_line_anchor_is_demoted() {
        let out = resolve(&[
            ("A.md", "[Order.cs](../src/Order.cs#L42)\n[Order](B.md#L3)\n"),
            ("B.md", "## Order\n"),
        ]);
        assert_eq!(text_of(&out, "A.md"), "Order.cs\nOrder\n");
    }

    #[test]
    fn non_document_targets_are_untouched() {
        let text = concat!(
            "[img](diagram.png) [ext](https://example.com/x.md) ",
            "[top](#overview) [mail](mailto:a@b.c)\n",
        );
        let out = resolve(&[("A.md", text)]);
        assert_eq!(text_of(&out, "A.md"), text);
    }

    #[test]
    fn missing_anchor_links_to_first_heading() {
        let out = resolve(&[
            ("A/B.md", "[Models](../Domain/Models.md)\n"),
            ("Domain/Models.md", "## Address\n## Money\n"),
        ]);
        assert_eq!(text_of(&out, "A/B.md"), "[Models](../Domain/Models.md#address)\n");
    }

    #[test]
    fn exact_slug_beats_earlier_containment() {
        let out = resolve(&[
            ("A.md", "[x](B.md#order-aggregate)\n"),
            ("B.md", "## Order\n## Order (Aggregate)\n"),
        ]);
        assert_eq!(text_of(&out, "A.md"), "[x](B.md#order-aggregate)\n");
    }

    #[test]
    fn alias_table_redirects_invented_names() {
        let out = resolve(&[
            ("Domain/Index.md", "[VO](ValueObject.md)\n"),
            ("Domain/Aggregate.md", "## Order\n"),
        ]);
        assert_eq!(text_of(&out, "Domain/Index.md"), "[VO](Aggregate.md#order)\n");
    }

    #[test]
    fn entity_fallback_uses_label_then_stem() {
        let out = resolve(&[
            ("Api/Commands.md", "[CreateOrderCommand](Missing.md) and [here](Buyer.md)\n"),
            ("Domain/Aggregate.md", "## Order\n## Buyer (Entity)\n"),
            ("Api/Handlers.md", "## CreateOrderCommand\n"),
        ]);
        assert_eq!(
            text_of(&out, "Api/Commands.md"),
            concat!(
                "[CreateOrderCommand](Handlers.md#createordercommand) and ",
                "[here](../Domain/Aggregate.md#buyer-entity)\n",
            )
        );
    }

    #[test]
    fn entity_fallback_uses_anchor_guess() {
        let out = resolve(&[("A.md", "[see this](Gone.md#Order-1)\n"), ("B.md", "## Order\n")]);
        assert_eq!(text_of(&out, "A.md"), "[see this](B.md#order)\n");
    }

    #[test]
    fn duplicated_segment_and_encoded_space_resolve() {
        let out = resolve(&[
            ("Index.md", "[a](Api/Api/Commands.md) [b](Data%20Flow.md)\n"),
            ("Api/Commands.md", "## Create\n"),
            ("Data Flow.md", "## Flow\n"),
        ]);
        assert_eq!(
            text_of(&out, "Index.md"),
            "[a](Api/Commands.md#create) [b](Data%20Flow.md#flow)\n"
        );
    }

    #[test]
    fn root_relative_targets_resolve() {
        let out =
            resolve(&[("Api/Commands.md", "[m](Domain/Models.md)\n"), ("Domain/Models.md", "")]);
        assert_eq!(text_of(&out, "Api/Commands.md"), "[m](../Domain/Models.md)\n");
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let corpus: Corpus = [
            (
                "A/B.md",
                concat!(
                    "[Foo](../C/D.md#bar) [Bar](NoSuchClass.md) ",
                    "[Order](X.md) [m](../Domain/Models.md)\n",
                ),
            ),
            ("X/C/D.md", "## Baz Bar\n```\n[in](fence.md)\n```\n"),
            ("Domain/Models.md", "## Order\n## Order (Aggregate)\n[agg](#order-aggregate)\n"),
        ]
        .into_iter()
        .collect();
        let resolver = LinkResolver::new().unwrap();
        let once = resolver.resolve_all(&corpus, None);
        let twice = resolver.resolve_all(&once, None);
        assert_eq!(once, twice);
    }

    #[test]
    fn link_nested_in_a_label_settles_in_one_run() {
        let corpus: Corpus = [("A.md", "see [[Inner](Missing.md)](B.md)\n"), ("B.md", "## Thing\n")]
            .into_iter()
            .collect();
        let resolver = LinkResolver::new().unwrap();
        let once = resolver.resolve_all(&corpus, None);
        assert_eq!(text_of(&once, "A.md"), "see [Inner](B.md#thing)\n");
        assert_eq!(resolver.resolve_all(&once, None), once);
    }

    #[test]
    fn reference_placeholders_link_to_entity_headings() {
        let out = resolve(&[
            ("Api/Commands.md", "Creates an {ref:Order}.\n"),
            ("Domain/Models.md", "## Order (Aggregate)\n## Buyer\n"),
        ]);
        assert_eq!(
            text_of(&out, "Api/Commands.md"),
            "Creates an [Order](../Domain/Models.md#order-aggregate).\n"
        );
    }

    #[test]
    fn dotted_reference_falls_back_to_last_segment() {
        let out = resolve(&[("A.md", "Owned by {ref:Domain.Buyer}.\n"), ("B.md", "## Buyer\n")]);
        assert_eq!(text_of(&out, "A.md"), "Owned by [Domain.Buyer](B.md#buyer).\n");
    }

    #[test]
    fn unresolved_reference_becomes_bare_name() {
        let text = "Uses {ref:Ghost}.\n```\n{ref:Ghost}\n```\n";
        let out = resolve(&[("A.md", text), ("B.md", "## Order\n")]);
        assert_eq!(text_of(&out, "A.md"), "Uses Ghost.\n```\n{ref:Ghost}\n```\n");
    }
}
