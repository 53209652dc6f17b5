//! Patch script loading
//!
//! A patch script is a TOML file with an optional description and a
//! `[[rules]]` array. Scripts are fully validated before the target file is
//! touched, so a malformed rule never leaves a half-applied document.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error_helpers;
use crate::rule::Rule;

/// A parsed, validated patch script
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchScript {
    /// Free-form description shown in reports and recorded in backups
    #[serde(default)]
    pub description: Option<String>,

    /// Rules, applied in declared order
    pub rules: Vec<Rule>,
}

impl PatchScript {
    /// Load and validate a script from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!(error_helpers::not_found_error(path, "loading patch script"));
        }

        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read patch script: {}", path.display()))?;

        let script: PatchScript = toml::from_str(&source)
            .with_context(|| format!("Failed to parse patch script: {}", path.display()))?;

        script
            .validate()
            .with_context(|| format!("Invalid patch script: {}", path.display()))?;

        Ok(script)
    }

    /// Reject rules that would misbehave at application time
    pub fn validate(&self) -> Result<()> {
        if self.rules.is_empty() {
            anyhow::bail!("Script contains no rules");
        }

        for (i, rule) in self.rules.iter().enumerate() {
            let check = match rule {
                Rule::Replace { find, .. } => {
                    if find.is_empty() {
                        Err(anyhow::anyhow!("'find' must not be empty"))
                    } else {
                        Ok(())
                    }
                }
                Rule::DeleteLines { start, end } => {
                    if start > end {
                        Err(anyhow::anyhow!(
                            "line range {}..{} is inverted (start > end)",
                            start,
                            end
                        ))
                    } else {
                        Ok(())
                    }
                }
                Rule::DeleteBlock { start, stop } => {
                    start.validate().and_then(|_| stop.validate())
                }
            };

            check.with_context(|| format!("Rule {}: {}", i + 1, rule.describe()))?;
        }

        Ok(())
    }

    /// Label used in reports and backup metadata
    pub fn label(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| format!("{} rules", self.rules.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Marker;

    const SAMPLE: &str = r#"
description = "Remove the legacy user-management section"

[[rules]]
kind = "replace"
find = "trailing: Icon(Icons.check_circle, color: Colors.green),"
replace = "trailing: _buildUserActions(user),"

[[rules]]
kind = "delete-lines"
start = 499
end = 502

[[rules]]
kind = "delete-block"
start = { contains = "Widget _buildUserManagement()" }
stop = { starts-with = "Widget _build" }
"#;

    #[test]
    fn test_parse_sample_script() {
        let script: PatchScript = toml::from_str(SAMPLE).unwrap();
        assert_eq!(script.rules.len(), 3);
        assert!(script.validate().is_ok());

        assert!(matches!(script.rules[0], Rule::Replace { .. }));
        assert_eq!(
            script.rules[1],
            Rule::DeleteLines { start: 499, end: 502 }
        );
        assert_eq!(
            script.rules[2],
            Rule::DeleteBlock {
                start: Marker::Contains("Widget _buildUserManagement()".to_string()),
                stop: Marker::StartsWith("Widget _build".to_string()),
            }
        );
    }

    #[test]
    fn test_empty_rules_rejected() {
        let script: PatchScript = toml::from_str("rules = []").unwrap();
        assert!(script.validate().is_err());
    }

    #[test]
    fn test_empty_find_rejected() {
        let script: PatchScript = toml::from_str(
            r#"
[[rules]]
kind = "replace"
find = ""
replace = "x"
"#,
        )
        .unwrap();
        assert!(script.validate().is_err());
    }

    #[test]
    fn test_inverted_range_rejected() {
        let script = PatchScript {
            description: None,
            rules: vec![Rule::DeleteLines { start: 10, end: 5 }],
        };
        assert!(script.validate().is_err());
    }

    #[test]
    fn test_bad_marker_regex_rejected() {
        let script = PatchScript {
            description: None,
            rules: vec![Rule::DeleteBlock {
                start: Marker::Matches("([unclosed".to_string()),
                stop: Marker::Contains("x".to_string()),
            }],
        };
        assert!(script.validate().is_err());
    }

    #[test]
    fn test_label_falls_back_to_rule_count() {
        let script = PatchScript {
            description: None,
            rules: vec![Rule::DeleteLines { start: 0, end: 1 }],
        };
        assert_eq!(script.label(), "1 rules");
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let err = PatchScript::load(Path::new("/nonexistent/patch.toml")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
