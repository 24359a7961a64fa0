//! Normalized tag sets, committee derivation and name-based auto-tagging.
//!
//! Besides configurable rules, every event gets derived `type:`, `recurring:`
//! and `venue:` tags from its name (and location, for the venue).
//!
//! Tags are trimmed and lowercased exactly once, when a `TagSet` is built, so
//! predicates downstream compare plain strings.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::constants::{
    COMMITTEE_PREFIX_MAX, GENERAL_COMMITTEE, OUTDOOR_VENUE_TAG, RECURRING_MARKERS,
};

/// A set of normalized (trimmed, lowercased, non-empty) tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(BTreeSet<String>);

fn normalize_tag(raw: &str) -> Option<String> {
    let tag = raw.trim().to_lowercase();
    (!tag.is_empty()).then_some(tag)
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a feed's tag string: either a JSON-encoded array or a comma-separated list.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with('[') {
            return match serde_json::from_str::<Vec<String>>(trimmed) {
                Ok(list) => list.iter().collect(),
                Err(_) => TagSet::new(),
            };
        }
        trimmed.split(',').collect()
    }

    pub fn insert(&mut self, tag: &str) {
        if let Some(tag) = normalize_tag(tag) {
            self.0.insert(tag);
        }
    }

    pub fn contains(&self, tag: &str) -> bool {
        normalize_tag(tag).is_some_and(|t| self.0.contains(&t))
    }

    /// True if any tag contains `needle` (already lowercase) as a substring.
    pub fn any_contains(&self, needle: &str) -> bool {
        self.0.iter().any(|t| t.contains(needle))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = TagSet::new();
        for tag in iter {
            set.insert(tag.as_ref());
        }
        set
    }
}

/// Text before a "Committee: Title" colon, if the colon is close enough to the start.
pub fn committee_prefix(name: &str) -> Option<&str> {
    let idx = name.find(':')?;
    let prefix = &name[..idx];
    let chars = prefix.chars().count();
    (chars > 0 && chars < COMMITTEE_PREFIX_MAX).then_some(prefix)
}

/// Event title without its committee prefix.
pub fn clean_title(name: &str) -> &str {
    match committee_prefix(name) {
        Some(prefix) => name[prefix.len() + 1..].trim(),
        None => name,
    }
}

/// Name prefixes that identify one committee, e.g. "Pop Up:" for "Pop-Up".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteePrefixes {
    pub committee: String,
    pub prefixes: Vec<String>,
}

impl CommitteePrefixes {
    pub fn new(committee: &str, prefixes: &[&str]) -> Self {
        CommitteePrefixes {
            committee: committee.to_string(),
            prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.prefixes
            .iter()
            .any(|p| !p.is_empty() && name.starts_with(&p.to_lowercase()))
    }
}

/// Derive the committee that runs an event.
///
/// Known prefixes win, first match in table order; otherwise the raw prefix
/// is used with decoration characters stripped; otherwise "General".
pub fn extract_committee(name: &str, known: &[CommitteePrefixes]) -> String {
    if let Some(entry) = known.iter().find(|entry| entry.matches(name)) {
        return entry.committee.clone();
    }

    match committee_prefix(name) {
        Some(prefix) => {
            let cleaned: String = prefix
                .chars()
                .filter(|c| !matches!(c, '*' | '-' | '(' | ')'))
                .collect();
            let cleaned = cleaned.trim();
            if cleaned.is_empty() {
                GENERAL_COMMITTEE.to_string()
            } else {
                cleaned.to_string()
            }
        }
        None => GENERAL_COMMITTEE.to_string(),
    }
}

/// The `committee:<slug>` tag for a committee name.
pub fn committee_tag(committee: &str) -> String {
    format!("committee:{}", slug::slugify(committee))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutoTagKind {
    NamePrefix,
    NameContains,
    NameSuffix,
}

/// A configurable rule that tags events by matching their name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoTagRule {
    #[serde(rename = "type")]
    pub kind: AutoTagKind,
    pub pattern: String,
    pub tag: String,
}

impl AutoTagRule {
    pub fn new(kind: AutoTagKind, pattern: &str, tag: &str) -> Self {
        AutoTagRule {
            kind,
            pattern: pattern.to_string(),
            tag: tag.to_string(),
        }
    }

    /// Case-insensitive match against an event name. Empty rules never match.
    pub fn matches(&self, name: &str) -> bool {
        if self.pattern.is_empty() || self.tag.trim().is_empty() {
            return false;
        }
        let name = name.to_lowercase();
        let pattern = self.pattern.to_lowercase();
        match self.kind {
            AutoTagKind::NamePrefix => name.starts_with(&pattern),
            AutoTagKind::NameContains => name.contains(&pattern),
            AutoTagKind::NameSuffix => name.ends_with(&pattern),
        }
    }
}

/// Tags contributed by every matching rule, in rule order.
pub fn apply_auto_tags<'a>(name: &str, rules: &'a [AutoTagRule]) -> Vec<&'a str> {
    rules
        .iter()
        .filter(|rule| rule.matches(name))
        .map(|rule| rule.tag.as_str())
        .collect()
}

/// A title keyword and the `type:` tag it implies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordTag {
    pub keyword: String,
    pub tag: String,
}

impl KeywordTag {
    pub fn new(keyword: &str, tag: &str) -> Self {
        KeywordTag {
            keyword: keyword.to_string(),
            tag: tag.to_string(),
        }
    }
}

/// The format of an event, e.g. `type:workshop`. Only the title after a
/// colon is searched; the first keyword in table order wins.
pub fn derive_event_type<'a>(name: &str, keywords: &'a [KeywordTag]) -> Option<&'a str> {
    let title = match name.split_once(':') {
        Some((prefix, rest)) if !prefix.is_empty() => rest,
        _ => name,
    }
    .to_lowercase();
    keywords
        .iter()
        .find(|k| !k.keyword.is_empty() && title.contains(&k.keyword.to_lowercase()))
        .map(|k| k.tag.as_str())
}

/// `recurring:weekly` and friends, from the event name.
pub fn derive_recurring(name: &str) -> Option<String> {
    let name = name.to_lowercase();
    RECURRING_MARKERS
        .iter()
        .find(|marker| name.contains(*marker))
        .map(|marker| format!("recurring:{marker}"))
}

/// `venue:outdoor` when the name or location mentions an outdoor keyword.
pub fn derive_venue(name: &str, location: Option<&str>, outdoor: &[String]) -> Option<&'static str> {
    let text = format!("{} {}", name, location.unwrap_or_default()).to_lowercase();
    outdoor
        .iter()
        .any(|k| !k.is_empty() && text.contains(&k.to_lowercase()))
        .then_some(OUTDOOR_VENUE_TAG)
}
