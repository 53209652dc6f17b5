use crate::engine::PatchPreview;
use crate::rule::RuleOutcome;
use colored::*;
use similar::{ChangeTag, TextDiff};
use std::io::IsTerminal;

pub struct Reporter;

impl Reporter {
    /// Auto-detect if we should use colors
    fn should_use_color() -> bool {
        // Check NO_COLOR env var (https://no-color.org/)
        if std::env::var("NO_COLOR").is_ok() {
            return false;
        }

        std::io::stdout().is_terminal()
    }

    /// Header shown before a dry-run preview
    pub fn format_dry_run_header(script_label: &str) -> String {
        let use_color = Self::should_use_color();
        if use_color {
            format!(
                "{} {}\n{}",
                "DRY RUN".bold().yellow(),
                script_label.bold(),
                "No files will be modified.".dimmed()
            )
        } else {
            format!("DRY RUN {}\nNo files will be modified.", script_label)
        }
    }

    /// One status line per rule: applied / no-op, with counts
    pub fn format_rule_outcomes(preview: &PatchPreview) -> String {
        let use_color = Self::should_use_color();
        let mut output = String::new();

        for (i, (rule, outcome)) in preview.outcomes.iter().enumerate() {
            let status = match outcome {
                RuleOutcome::Replaced { occurrences } => {
                    let s = format!("{} substitution{}", occurrences, plural(*occurrences));
                    if use_color { s.green().to_string() } else { s }
                }
                RuleOutcome::PatternAbsent => {
                    let s = "pattern not found (no-op)".to_string();
                    if use_color { s.yellow().to_string() } else { s }
                }
                RuleOutcome::LinesDeleted { start, end } => {
                    let s = format!("{} line{} deleted", end - start, plural(end - start));
                    if use_color { s.red().to_string() } else { s }
                }
                RuleOutcome::BlockDeleted { start, end } => {
                    let s = format!(
                        "block deleted (lines {}-{}, {} line{})",
                        start + 1,
                        end,
                        end - start,
                        plural(end - start)
                    );
                    if use_color { s.red().to_string() } else { s }
                }
                RuleOutcome::BlockAbsent => {
                    let s = "block not found (no-op)".to_string();
                    if use_color { s.yellow().to_string() } else { s }
                }
            };

            output.push_str(&format!("  rule {}: {} -> {}\n", i + 1, rule.describe(), status));
        }

        output
    }

    /// Unified diff of the pending change with the given context size
    pub fn format_diff(preview: &PatchPreview, context_size: usize) -> String {
        let use_color = Self::should_use_color();
        let mut output = String::new();

        if use_color {
            output.push_str(&format!("{}\n", preview.file_path.bold().cyan()));
        } else {
            output.push_str(&format!("{}\n", preview.file_path));
        }

        let diff = TextDiff::from_lines(preview.old_text.as_str(), preview.new_text.as_str());

        for (group_idx, group) in diff.grouped_ops(context_size).iter().enumerate() {
            if group_idx > 0 {
                if use_color {
                    output.push_str(&format!("{}\n", "...".dimmed()));
                } else {
                    output.push_str("...\n");
                }
            }

            for op in group {
                for change in diff.iter_changes(op) {
                    let line_num = change
                        .old_index()
                        .or(change.new_index())
                        .map(|i| i + 1)
                        .unwrap_or(0);
                    let content = change.value().trim_end_matches('\n');

                    let formatted = match change.tag() {
                        ChangeTag::Equal => if use_color {
                            format!("L{}: {} {}", line_num, "=".dimmed(), content.dimmed())
                        } else {
                            format!("L{}: = {}", line_num, content)
                        },
                        ChangeTag::Delete => if use_color {
                            format!("L{}: {} {}", line_num, "-".red().bold(), content.red())
                        } else {
                            format!("L{}: - {}", line_num, content)
                        },
                        ChangeTag::Insert => if use_color {
                            format!("L{}: {} {}", line_num, "+".green().bold(), content.green().bold())
                        } else {
                            format!("L{}: + {}", line_num, content)
                        },
                    };
                    output.push_str(&formatted);
                    output.push('\n');
                }
            }
        }

        // Summary
        let deleted = diff
            .iter_all_changes()
            .filter(|c| c.tag() == ChangeTag::Delete)
            .count();
        let added = diff
            .iter_all_changes()
            .filter(|c| c.tag() == ChangeTag::Insert)
            .count();
        let total = deleted + added;

        if use_color {
            output.push_str(&format!(
                "\nTotal: {} changed line{}",
                total.to_string().bold().white(),
                plural(total)
            ));
            let mut parts = Vec::new();
            if added > 0 {
                parts.push(format!("{} {}", added, "added".green()));
            }
            if deleted > 0 {
                parts.push(format!("{} {}", deleted, "deleted".red()));
            }
            if !parts.is_empty() {
                output.push_str(&format!(" ({})", parts.join(", ")));
            }
            output.push('\n');
        } else {
            output.push_str(&format!("\nTotal: {} changed lines", total));
            if total > 0 {
                output.push_str(&format!(" ({} added, {} deleted)", added, deleted));
            }
            output.push('\n');
        }

        output
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}
