//! Rule and marker types
//!
//! This module defines the declarative rule representation used by patch
//! scripts: literal replacement, line-range deletion, and marker-bounded
//! block deletion.

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One transformation applied to the document, in declared order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Rule {
    /// Global literal substitution (may span multiple lines)
    Replace {
        find: String,
        replace: String,
    },

    /// Delete lines [start, end), half-open and 0-based, against the
    /// document state at the time the rule runs
    DeleteLines {
        start: usize,
        end: usize,
    },

    /// Delete from the first line matching `start` up to (excluding) the
    /// first subsequent line matching `stop`
    DeleteBlock {
        start: Marker,
        stop: Marker,
    },
}

impl Rule {
    /// Short human-readable label for status reporting
    pub fn describe(&self) -> String {
        match self {
            Rule::Replace { find, .. } => {
                format!("replace {:?}", truncate_for_display(find))
            }
            Rule::DeleteLines { start, end } => {
                format!("delete lines {}..{}", start, end)
            }
            Rule::DeleteBlock { start, stop } => {
                format!("delete block {} .. {}", start.describe(), stop.describe())
            }
        }
    }
}

/// Single-line predicate used to locate block boundaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Marker {
    /// Line contains the given substring
    Contains(String),

    /// Line starts with the given text after leading whitespace is trimmed
    StartsWith(String),

    /// Line matches the given regex
    Matches(String),
}

impl Marker {
    /// Test a single line against this marker
    pub fn matches_line(&self, line: &str) -> Result<bool> {
        match self {
            Marker::Contains(needle) => Ok(line.contains(needle.as_str())),
            Marker::StartsWith(prefix) => Ok(line.trim_start().starts_with(prefix.as_str())),
            Marker::Matches(pattern) => {
                let re = Regex::new(pattern)
                    .with_context(|| format!("Invalid marker regex: {}", pattern))?;
                Ok(re.is_match(line))
            }
        }
    }

    /// Validate the marker without matching anything (regex compile check)
    pub fn validate(&self) -> Result<()> {
        match self {
            Marker::Contains(needle) if needle.is_empty() => {
                anyhow::bail!("Empty 'contains' marker matches every line")
            }
            Marker::StartsWith(prefix) if prefix.is_empty() => {
                anyhow::bail!("Empty 'starts-with' marker matches every line")
            }
            Marker::Matches(pattern) => {
                Regex::new(pattern)
                    .with_context(|| format!("Invalid marker regex: {}", pattern))?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn describe(&self) -> String {
        match self {
            Marker::Contains(s) => format!("contains {:?}", truncate_for_display(s)),
            Marker::StartsWith(s) => format!("starts-with {:?}", truncate_for_display(s)),
            Marker::Matches(s) => format!("matches /{}/", s),
        }
    }
}

/// Result of applying one rule, surfaced to the caller instead of being
/// swallowed: a no-op is visible, not silent
#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutcome {
    /// Literal replace applied; `occurrences` substitutions were made
    Replaced { occurrences: usize },

    /// Literal replace found no occurrence; document unchanged
    PatternAbsent,

    /// Line range [start, end) removed
    LinesDeleted { start: usize, end: usize },

    /// Marker-bounded block [start, end) removed (0-based line indices)
    BlockDeleted { start: usize, end: usize },

    /// No line matched the start marker; document unchanged
    BlockAbsent,
}

impl RuleOutcome {
    /// True if the rule changed the document
    pub fn changed(&self) -> bool {
        match self {
            RuleOutcome::Replaced { occurrences } => *occurrences > 0,
            RuleOutcome::PatternAbsent | RuleOutcome::BlockAbsent => false,
            RuleOutcome::LinesDeleted { .. } | RuleOutcome::BlockDeleted { .. } => true,
        }
    }

    /// True if the rule matched nothing (candidate for --strict failure)
    pub fn is_absent(&self) -> bool {
        matches!(self, RuleOutcome::PatternAbsent | RuleOutcome::BlockAbsent)
    }
}

fn truncate_for_display(s: &str) -> String {
    const MAX: usize = 40;
    let flat = s.replace('\n', "\\n");
    if flat.chars().count() <= MAX {
        flat
    } else {
        let head: String = flat.chars().take(MAX).collect();
        format!("{}…", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_equality() {
        let a = Rule::DeleteLines { start: 499, end: 502 };
        let b = Rule::DeleteLines { start: 499, end: 502 };
        assert_eq!(a, b);
    }

    #[test]
    fn test_marker_contains() {
        let m = Marker::Contains("Widget _buildUserManagement()".to_string());
        assert!(m.matches_line("  Widget _buildUserManagement() {").unwrap());
        assert!(!m.matches_line("  Widget _buildHeader() {").unwrap());
    }

    #[test]
    fn test_marker_starts_with_trims_leading_whitespace() {
        let m = Marker::StartsWith("Widget _build".to_string());
        assert!(m.matches_line("    Widget _buildSyncedUsers() {").unwrap());
        assert!(!m.matches_line("  // Widget _build comment").unwrap());
    }

    #[test]
    fn test_marker_regex() {
        let m = Marker::Matches(r"^\s*Future<void> _confirm\w+".to_string());
        assert!(m.matches_line("  Future<void> _confirmDeleteUser(User u) async {").unwrap());
        assert!(!m.matches_line("  Future<void> _loadUsers() async {").unwrap());
    }

    #[test]
    fn test_marker_invalid_regex_rejected() {
        let m = Marker::Matches("([unclosed".to_string());
        assert!(m.validate().is_err());
        assert!(m.matches_line("anything").is_err());
    }

    #[test]
    fn test_empty_markers_rejected() {
        assert!(Marker::Contains(String::new()).validate().is_err());
        assert!(Marker::StartsWith(String::new()).validate().is_err());
    }

    #[test]
    fn test_outcome_changed() {
        assert!(RuleOutcome::Replaced { occurrences: 3 }.changed());
        assert!(!RuleOutcome::Replaced { occurrences: 0 }.changed());
        assert!(!RuleOutcome::PatternAbsent.changed());
        assert!(RuleOutcome::LinesDeleted { start: 0, end: 2 }.changed());
        assert!(!RuleOutcome::BlockAbsent.changed());
    }

    #[test]
    fn test_rule_toml_round_trip() {
        let rule = Rule::DeleteBlock {
            start: Marker::Contains("Widget _buildUserManagement()".to_string()),
            stop: Marker::StartsWith("Widget _build".to_string()),
        };
        let toml_str = toml::to_string(&rule).unwrap();
        let back: Rule = toml::from_str(&toml_str).unwrap();
        assert_eq!(rule, back);
    }
}
