//! Ordered pattern -> category rules for source file paths.

use regex::Regex;

use crate::error::Error;
use crate::types::Classification;

/// A classification rule as written in `[[classification_rules]]`.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct RuleConfig {
    /// Category label assigned on match.
    pub category: String,
    /// Output document the matched files are grouped into.
    #[serde(default)]
    pub doc_file: Option<String>,
    /// Title of that output document.
    #[serde(default)]
    pub doc_title: Option<String>,
    /// Regex searched (unanchored) in the forward-slash relative path.
    pub pattern: String,
}

/// Compiled rule list. First match wins; no match is `other`.
#[derive(Debug)]
pub struct Classifier {
    /// Rules in config order, each paired with its compiled pattern.
    rules: Vec<(Regex, RuleConfig)>,
}

impl Classifier {
    /// Classify a path relative to the scanned root. Backslashes are
    /// normalized before matching.
    pub fn classify(&self, relative_path: &str) -> Classification {
        let normalized = relative_path.replace('\\', "/");
        return self
            .rules
            .iter()
            .find(|(pattern, _)| return pattern.is_match(&normalized))
            .map_or_else(Classification::other, |(_, rule)| {
                return Classification {
                    category: rule.category.clone(),
                    doc_file: rule.doc_file.clone(),
                    doc_title: rule.doc_title.clone(),
                };
            });
    }

    /// Compile every rule up front. A bad pattern is a configuration error,
    /// not a rule that silently never matches.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRule` naming the first rule that fails to compile.
    pub fn from_rules(rules: &[RuleConfig]) -> Result<Self, Error> {
        let mut compiled = Vec::with_capacity(rules.len());
        for (position, rule) in rules.iter().enumerate() {
            let pattern = Regex::new(&rule.pattern).map_err(|e| {
                return Error::InvalidRule {
                    index: position.saturating_add(1),
                    pattern: rule.pattern.clone(),
                    reason: e.to_string(),
                };
            })?;
            compiled.push((pattern, rule.clone()));
        }
        return Ok(Self { rules: compiled });
    }

    /// The rules in evaluation order, as configured.
    pub fn rules(&self) -> impl Iterator<Item = &RuleConfig> {
        return self.rules.iter().map(|(_, rule)| return rule);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(pattern: &str, category: &str, doc_file: Option<&str>) -> RuleConfig {
        RuleConfig {
            category: category.to_string(),
            doc_file: doc_file.map(String::from),
            doc_title: None,
            pattern: pattern.to_string(),
        }
    }

    #[test]
    fn command_handler_rule_matches() {
        let rules = [rule(r"CommandHandler\.cs$", "command_handler", Some("Commands.md"))];
        let classifier = Classifier::from_rules(&rules).unwrap();
        let result = classifier.classify("Commands/CreateOrderCommandHandler.cs");
        assert_eq!(result.category, "command_handler");
        assert_eq!(result.doc_file.as_deref(), Some("Commands.md"));
    }

    #[test]
    fn first_matching_rule_wins() {
        let classifier = Classifier::from_rules(&[
            rule(r"Handler\.cs$", "handler", None),
            rule(r"CommandHandler\.cs$", "command_handler", None),
        ])
        .unwrap();
        assert_eq!(classifier.classify("CreateOrderCommandHandler.cs").category, "handler");
    }

    #[test]
    fn no_match_falls_back_to_other() {
        let classifier =
            Classifier::from_rules(&[rule(r"Controller\.cs$", "controller", None)]).unwrap();
        assert_eq!(classifier.classify("Domain/Order.cs"), Classification::other());
    }

    #[test]
    fn backslashes_are_normalized() {
        let classifier = Classifier::from_rules(&[rule(r"^Domain/", "domain", None)]).unwrap();
        assert_eq!(classifier.classify(r"Domain\Order.cs").category, "domain");
    }

    #[test]
    fn bad_pattern_fails_fast() {
        let err = Classifier::from_rules(&[
            rule(r"ok\.cs$", "ok", None),
            rule(r"(unclosed", "broken", None),
        ])
        .unwrap_err();
        assert!(
            matches!(err, Error::InvalidRule { index: 2, .. }),
            "unexpected error: {err}"
        );
    }
}
