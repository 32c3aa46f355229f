//! Reference inventory: the headings of every document, their anchor slugs,
//! and a global map from entity name to the first place it is documented.

use std::collections::HashMap;

use regex::Regex;
use serde::Serialize;

use crate::corpus::Corpus;
use crate::error::Error;

/// One level-2 heading of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Anchor {
    /// Heading text as written, trimmed.
    pub heading: String,
    /// Anchor slug derived from it.
    pub slug: String,
}

/// Where an entity is documented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    /// Slug of the heading naming the entity.
    pub anchor: String,
    /// Corpus path of the document.
    pub document: String,
}

/// Compiled heading patterns, shared by the inventory and the resolver.
#[derive(Debug)]
pub struct HeadingPatterns {
    /// Leading identifier of stripped heading text.
    entity: Regex,
    /// `## heading` lines.
    heading: Regex,
    /// `[text](url)`, replaced by `text`.
    link_text: Regex,
    /// Runs of whitespace and underscores.
    separators: Regex,
}

impl HeadingPatterns {
    /// Primary entity of a heading: the leading `[A-Za-z][\w.]*` token once
    /// link syntax is stripped.
    pub fn entity_name(&self, heading: &str) -> Option<String> {
        let stripped = self.strip_links(heading);
        return self.entity.find(stripped.trim()).map(|m| return m.as_str().to_string());
    }

    /// Compile the patterns.
    ///
    /// # Errors
    ///
    /// Returns `Error::Regex` if a built-in pattern fails to compile.
    pub fn new() -> Result<Self, Error> {
        return Ok(Self {
            entity: Regex::new(r"^[A-Za-z][\w.]*")?,
            heading: Regex::new(r"(?m)^##[ \t]+(.+?)[ \t]*\r?$")?,
            link_text: Regex::new(r"\[([^\]]+)\]\([^)]+\)")?,
            separators: Regex::new(r"[\s_]+")?,
        });
    }

    /// Anchor slug of a heading. Never empty: falls back to `section`.
    pub fn slugify(&self, heading: &str) -> String {
        let lowered = self.strip_links(heading).trim().to_lowercase();
        let hyphenated = self.separators.replace_all(&lowered, "-");
        let mut slug = String::with_capacity(hyphenated.len());
        for ch in hyphenated.chars() {
            let keep = ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-';
            if !keep || (ch == '-' && slug.ends_with('-')) {
                continue;
            }
            slug.push(ch);
        }
        let trimmed = slug.trim_matches('-');
        if trimmed.is_empty() {
            return "section".to_string();
        }
        return trimmed.to_string();
    }

    /// Replace `[text](url)` with `text`.
    fn strip_links(&self, text: &str) -> String {
        return self.link_text.replace_all(text, "$1").into_owned();
    }
}

/// Per-document anchors plus the entity map.
#[derive(Debug, Default, Serialize)]
pub struct Inventory {
    /// Document path -> its headings in order.
    pub anchors: HashMap<String, Vec<Anchor>>,
    /// Entity name -> first location, in corpus order.
    pub entities: HashMap<String, Location>,
}

impl Inventory {
    /// Headings of a document; empty when it has none or is unknown.
    pub fn anchors_of(&self, document: &str) -> &[Anchor] {
        return self.anchors.get(document).map_or(&[], Vec::as_slice);
    }

    /// Scan every document in corpus order. First occurrence of an entity wins.
    pub fn build(corpus: &Corpus, patterns: &HeadingPatterns) -> Self {
        let mut inventory = Self::default();
        for document in corpus.iter() {
            let mut anchors = Vec::new();
            for caps in patterns.heading.captures_iter(&document.text) {
                let Some(raw) = caps.get(1).map(|m| return m.as_str().trim()) else {
                    continue;
                };
                let slug = patterns.slugify(raw);
                if let Some(entity) = patterns.entity_name(raw) {
                    inventory.entities.entry(entity).or_insert_with(|| {
                        return Location {
                            anchor: slug.clone(),
                            document: document.path.clone(),
                        };
                    });
                }
                anchors.push(Anchor { heading: raw.to_string(), slug });
            }
            inventory.anchors.insert(document.path.clone(), anchors);
        }
        tracing::debug!(
            documents = inventory.anchors.len(),
            entities = inventory.entities.len(),
            "built reference inventory"
        );
        return inventory;
    }

    /// Where an entity is documented.
    pub fn locate(&self, entity: &str) -> Option<&Location> {
        return self.entities.get(entity);
    }
}
