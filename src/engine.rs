use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::error_helpers;
use crate::rule::{Marker, Rule, RuleOutcome};

/// Fatal conditions raised during rule application
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("line range {start}..{end} is out of range (document has {line_count} lines)")]
    OutOfRange {
        start: usize,
        end: usize,
        line_count: usize,
    },

    #[error("block starting at line {start_line} has no matching stop marker")]
    UnterminatedBlock { start_line: usize },

    #[error("invalid rule: {message}")]
    InvalidRule { message: String },
}

/// In-memory content of the file under transformation
///
/// Lines are the canonical representation; literal replacement joins them,
/// substitutes, and re-splits so line-oriented and substring-oriented rules
/// observe the same logical document within one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    lines: Vec<String>,
    trailing_newline: bool,
}

impl Document {
    pub fn from_text(text: &str) -> Self {
        let trailing_newline = text.ends_with('\n') || text.is_empty();
        let body = text.strip_suffix('\n').unwrap_or(text);
        let lines = if text.is_empty() {
            Vec::new()
        } else {
            body.split('\n').map(str::to_string).collect()
        };
        Self {
            lines,
            trailing_newline,
        }
    }

    pub fn to_text(&self) -> String {
        let mut out = self.lines.join("\n");
        if self.trailing_newline && !self.lines.is_empty() {
            out.push('\n');
        }
        out
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Replace all non-overlapping occurrences of `find`; returns how many
    /// substitutions were made (0 is a visible no-op, not an error)
    pub fn replace_literal(&mut self, find: &str, replace: &str) -> Result<usize, EngineError> {
        if find.is_empty() {
            return Err(EngineError::InvalidRule {
                message: "replace rule has an empty 'find' string".to_string(),
            });
        }

        let text = self.lines.join("\n");
        let occurrences = text.matches(find).count();
        if occurrences > 0 {
            let replaced = text.replace(find, replace);
            self.lines = replaced.split('\n').map(str::to_string).collect();
        }
        Ok(occurrences)
    }

    /// Remove lines [start, end). Out-of-range indices are fatal; there is
    /// no silent clamping.
    pub fn delete_lines(&mut self, start: usize, end: usize) -> Result<(), EngineError> {
        if start > end || end > self.lines.len() {
            return Err(EngineError::OutOfRange {
                start,
                end,
                line_count: self.lines.len(),
            });
        }
        self.lines.drain(start..end);
        Ok(())
    }

    /// Remove the first block bounded by `start`/`stop` markers
    ///
    /// No start match leaves the document unchanged (block already absent).
    /// A start match with no subsequent stop match is fatal rather than
    /// scanning to end-of-file.
    pub fn delete_block(&mut self, start: &Marker, stop: &Marker) -> Result<RuleOutcome> {
        let mut start_idx = None;
        for (i, line) in self.lines.iter().enumerate() {
            if start.matches_line(line)? {
                start_idx = Some(i);
                break;
            }
        }

        let Some(start_idx) = start_idx else {
            return Ok(RuleOutcome::BlockAbsent);
        };

        let mut stop_idx = None;
        for (i, line) in self.lines.iter().enumerate().skip(start_idx + 1) {
            if stop.matches_line(line)? {
                stop_idx = Some(i);
                break;
            }
        }

        let Some(stop_idx) = stop_idx else {
            return Err(EngineError::UnterminatedBlock {
                start_line: start_idx + 1,
            }
            .into());
        };

        self.lines.drain(start_idx..stop_idx);
        Ok(RuleOutcome::BlockDeleted {
            start: start_idx,
            end: stop_idx,
        })
    }
}

/// What a run would do to a file, computed without writing anything
#[derive(Debug)]
pub struct PatchPreview {
    pub file_path: String,
    pub outcomes: Vec<(Rule, RuleOutcome)>,
    pub old_text: String,
    pub new_text: String,
}

impl PatchPreview {
    pub fn change_count(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.changed()).count()
    }

    pub fn absent_count(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_absent()).count()
    }
}

/// Straight-line pipeline applying an ordered rule list to one file
pub struct PatchEngine {
    rules: Vec<Rule>,
}

impl PatchEngine {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Apply the full rule sequence to an in-memory document
    ///
    /// Each rule observes the document as mutated by all earlier rules.
    /// The first fatal error aborts; the caller's document copy is the only
    /// thing mutated at that point.
    pub fn run(&self, document: &mut Document) -> Result<Vec<(Rule, RuleOutcome)>> {
        let mut outcomes = Vec::with_capacity(self.rules.len());

        for (i, rule) in self.rules.iter().enumerate() {
            let outcome = match rule {
                Rule::Replace { find, replace } => {
                    let occurrences = document
                        .replace_literal(find, replace)
                        .with_context(|| format!("Rule {} failed: {}", i + 1, rule.describe()))?;
                    if occurrences == 0 {
                        RuleOutcome::PatternAbsent
                    } else {
                        RuleOutcome::Replaced { occurrences }
                    }
                }
                Rule::DeleteLines { start, end } => {
                    document
                        .delete_lines(*start, *end)
                        .with_context(|| format!("Rule {} failed: {}", i + 1, rule.describe()))?;
                    RuleOutcome::LinesDeleted {
                        start: *start,
                        end: *end,
                    }
                }
                Rule::DeleteBlock { start, stop } => document
                    .delete_block(start, stop)
                    .with_context(|| format!("Rule {} failed: {}", i + 1, rule.describe()))?,
            };

            tracing::info!(rule = %rule.describe(), outcome = ?outcome, "rule applied");
            outcomes.push((rule.clone(), outcome));
        }

        Ok(outcomes)
    }

    /// Read the target file and compute the full run without writing
    pub fn preview(&self, file_path: &Path) -> Result<PatchPreview> {
        if !file_path.exists() {
            anyhow::bail!(error_helpers::not_found_error(
                file_path,
                "loading target file"
            ));
        }

        let old_text = fs::read_to_string(file_path).map_err(|e| {
            if error_helpers::is_permission_denied(&e) {
                anyhow::anyhow!(error_helpers::permission_error(file_path, "reading"))
            } else {
                anyhow::Error::new(e)
                    .context(format!("Failed to read file: {}", file_path.display()))
            }
        })?;

        let mut document = Document::from_text(&old_text);
        let outcomes = self.run(&mut document)?;

        Ok(PatchPreview {
            file_path: file_path.display().to_string(),
            outcomes,
            old_text,
            new_text: document.to_text(),
        })
    }

    /// Apply the rule sequence and write the result back atomically
    ///
    /// The new content goes to a temp file in the target's directory and is
    /// renamed over the original. Any failure before the rename leaves the
    /// on-disk file byte-identical to its pre-run state.
    pub fn apply(&self, file_path: &Path) -> Result<PatchPreview> {
        let preview = self.preview(file_path)?;

        let parent_dir = file_path.parent().unwrap_or(Path::new("."));
        let temp_file = NamedTempFile::new_in(parent_dir)
            .with_context(|| format!("Failed to create temp file in {}", parent_dir.display()))?;

        fs::write(temp_file.path(), &preview.new_text)
            .with_context(|| format!("Failed to write temp file for {}", file_path.display()))?;

        temp_file
            .persist(file_path)
            .with_context(|| format!("Failed to persist temp file to {}", file_path.display()))?;

        tracing::info!(file = %file_path.display(), changes = preview.change_count(), "file patched");

        Ok(preview)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Marker;

    fn doc(lines: &[&str]) -> Document {
        Document::from_text(&(lines.join("\n") + "\n"))
    }

    #[test]
    fn test_document_round_trip_preserves_trailing_newline() {
        let with_nl = "a\nb\nc\n";
        assert_eq!(Document::from_text(with_nl).to_text(), with_nl);

        let without_nl = "a\nb\nc";
        assert_eq!(Document::from_text(without_nl).to_text(), without_nl);
    }

    #[test]
    fn test_replace_literal_counts_occurrences() {
        let mut d = doc(&["foo bar foo", "baz", "foo"]);
        let n = d.replace_literal("foo", "qux").unwrap();
        assert_eq!(n, 3);
        assert_eq!(d.lines(), &["qux bar qux", "baz", "qux"]);
    }

    #[test]
    fn test_replace_literal_absent_is_noop() {
        let mut d = doc(&["alpha", "beta"]);
        let before = d.clone();
        let n = d.replace_literal("gamma", "delta").unwrap();
        assert_eq!(n, 0);
        assert_eq!(d, before);
    }

    #[test]
    fn test_replace_literal_spanning_lines() {
        let mut d = doc(&["trailing: IconButton(", "  icon: old,", "),", "done"]);
        let find = "trailing: IconButton(\n  icon: old,\n),";
        let n = d.replace_literal(find, "trailing: Row(\n  children: [],\n),").unwrap();
        assert_eq!(n, 1);
        assert_eq!(d.lines(), &["trailing: Row(", "  children: [],", "),", "done"]);
    }

    #[test]
    fn test_replace_empty_find_rejected() {
        let mut d = doc(&["x"]);
        assert!(matches!(
            d.replace_literal("", "y"),
            Err(EngineError::InvalidRule { .. })
        ));
    }

    #[test]
    fn test_delete_lines_length_invariant() {
        let mut d = doc(&["0", "1", "2", "3", "4"]);
        d.delete_lines(1, 3).unwrap();
        assert_eq!(d.line_count(), 3);
        assert_eq!(d.lines(), &["0", "3", "4"]);
    }

    #[test]
    fn test_delete_lines_out_of_range() {
        let mut d = doc(&["a", "b"]);
        let before = d.clone();
        assert!(matches!(
            d.delete_lines(1, 5),
            Err(EngineError::OutOfRange { .. })
        ));
        assert!(matches!(
            d.delete_lines(2, 1),
            Err(EngineError::OutOfRange { .. })
        ));
        assert_eq!(d, before);
    }

    #[test]
    fn test_delete_lines_empty_range_is_noop() {
        let mut d = doc(&["a", "b"]);
        d.delete_lines(1, 1).unwrap();
        assert_eq!(d.line_count(), 2);
    }

    #[test]
    fn test_delete_block_concrete_scenario() {
        // First start-marker line wins; stop scan begins on the next line.
        let mut d = doc(&["Widget _buildA() {", "  return X;", "Widget _buildB() {"]);
        let marker = Marker::StartsWith("Widget _build".to_string());
        let outcome = d.delete_block(&marker, &marker).unwrap();
        assert_eq!(outcome, RuleOutcome::BlockDeleted { start: 0, end: 2 });
        assert_eq!(d.lines(), &["Widget _buildB() {"]);
    }

    #[test]
    fn test_delete_block_absent_start_is_noop() {
        let mut d = doc(&["a", "b"]);
        let before = d.clone();
        let outcome = d
            .delete_block(
                &Marker::Contains("missing".to_string()),
                &Marker::Contains("also missing".to_string()),
            )
            .unwrap();
        assert_eq!(outcome, RuleOutcome::BlockAbsent);
        assert_eq!(d, before);
    }

    #[test]
    fn test_delete_block_unterminated_is_fatal() {
        let mut d = doc(&["before", "Widget _buildOnly() {", "  body;"]);
        let err = d
            .delete_block(
                &Marker::StartsWith("Widget _build".to_string()),
                &Marker::StartsWith("Widget _build".to_string()),
            )
            .unwrap_err();
        let engine_err = err.downcast_ref::<EngineError>().unwrap();
        assert!(matches!(
            engine_err,
            EngineError::UnterminatedBlock { start_line: 2 }
        ));
    }

    #[test]
    fn test_run_applies_rules_in_order() {
        // The delete-lines rule addresses the document state after the
        // replace has already run.
        let mut d = doc(&["keep", "old old", "drop me", "tail"]);
        let engine = PatchEngine::new(vec![
            Rule::Replace {
                find: "old".to_string(),
                replace: "new".to_string(),
            },
            Rule::DeleteLines { start: 2, end: 3 },
        ]);
        let outcomes = engine.run(&mut d).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].1, RuleOutcome::Replaced { occurrences: 2 });
        assert_eq!(d.lines(), &["keep", "new new", "tail"]);
    }

    #[test]
    fn test_run_stops_at_first_fatal_error() {
        let mut d = doc(&["only line"]);
        let engine = PatchEngine::new(vec![
            Rule::Replace {
                find: "only".to_string(),
                replace: "single".to_string(),
            },
            Rule::DeleteLines { start: 5, end: 9 },
            Rule::Replace {
                find: "never reached".to_string(),
                replace: "x".to_string(),
            },
        ]);
        assert!(engine.run(&mut d).is_err());
    }
}
