mod backup_manager;
mod cli;
mod config;
mod engine;
mod error_helpers;
mod logger;
mod report;
mod rule;
mod script;

use anyhow::{Context, Result};
use cli::{parse_args, Args};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let args = parse_args()?;

    match args {
        Args::Execute {
            script,
            file,
            dry_run,
            interactive,
            context,
            strict,
            no_backup,
            backup_dir,
        } => {
            execute_patch(
                &script,
                &file,
                dry_run,
                interactive,
                context,
                strict,
                no_backup,
                backup_dir,
            )?;
        }
        Args::Rollback { id } => {
            rollback(id)?;
        }
        Args::History => {
            show_history()?;
        }
        Args::Status => {
            show_status()?;
        }
        Args::BackupList { verbose } => {
            backup_list(verbose)?;
        }
        Args::BackupRestore { id } => {
            let manager = backup_manager::BackupManager::new()?;
            manager.restore_backup(&id)?;
        }
        Args::BackupPrune { keep, keep_days, force } => {
            backup_prune(keep, keep_days, force)?;
        }
        Args::Config { show } => {
            edit_config(show)?;
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn execute_patch(
    script_path: &str,
    file: &str,
    dry_run: bool,
    interactive: bool,
    context_override: Option<usize>,
    strict_flag: bool,
    no_backup: bool,
    backup_dir: Option<String>,
) -> Result<()> {
    let cfg = config::load_config()?;
    config::validate_config(&cfg)?;

    if logger::init_debug_logging(cfg.logging.debug.unwrap_or(false))?.is_some() {
        tracing::info!(script = script_path, file = file, "starting run");
    }

    let script = script::PatchScript::load(Path::new(script_path))?;
    let engine = engine::PatchEngine::new(script.rules.clone());
    let file_path = PathBuf::from(file);

    // Compute the full run in memory; nothing is written yet
    let preview = engine.preview(&file_path)?;

    let strict = strict_flag || cfg.behavior.strict.unwrap_or(false);
    if strict && preview.absent_count() > 0 {
        print!("{}", report::Reporter::format_rule_outcomes(&preview));
        anyhow::bail!(
            "{} rule(s) matched nothing (strict mode). \
             The patch script may have drifted from the target file.",
            preview.absent_count()
        );
    }

    println!("{}: {}", script.label(), preview.file_path);
    print!("{}", report::Reporter::format_rule_outcomes(&preview));

    if preview.change_count() == 0 {
        println!("\nNo changes would be made.");
        return Ok(());
    }

    let context = context_override
        .or(cfg.output.context_lines)
        .unwrap_or(2);

    if dry_run || interactive {
        println!("{}", report::Reporter::format_dry_run_header(&script.label()));
        print!("{}", report::Reporter::format_diff(&preview, context));
    }

    if interactive && !dry_run {
        print!("Apply changes? [y/N] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        let input = input.trim().to_lowercase();
        if input != "y" && input != "yes" {
            println!("Changes not applied.");
            return Ok(());
        }
    }

    if dry_run {
        return Ok(());
    }

    // Apply with backup
    let backup_id = if no_backup {
        None
    } else {
        let mut manager = match backup_dir.or(cfg.backup.backup_dir.clone()) {
            Some(dir) => backup_manager::BackupManager::with_directory(dir)?,
            None => backup_manager::BackupManager::new()?,
        };
        if let Some(max) = cfg.backup.max_backups {
            manager.set_max_backups(max);
        }
        Some(manager.create_backup(&script.label(), std::slice::from_ref(&file_path))?)
    };

    let applied = engine.apply(&file_path)?;

    if !interactive {
        print!("{}", report::Reporter::format_diff(&applied, context));
    }

    match backup_id {
        Some(id) => {
            println!("\nBackup ID: {}", id);
            println!("Rollback with: patchx rollback {}", id);
        }
        None => {
            println!("\nNo backup was created (--no-backup).");
        }
    }

    Ok(())
}

fn rollback(id: Option<String>) -> Result<()> {
    let backup_manager = backup_manager::BackupManager::new()?;

    let backup_id = match id {
        Some(id) => id,
        None => match backup_manager.get_last_backup_id()? {
            Some(id) => {
                println!("Rolling back last operation: {}\n", id);
                id
            }
            None => {
                anyhow::bail!("No backups found to rollback");
            }
        },
    };

    backup_manager.restore_backup(&backup_id)?;
    println!("\n✅ Rollback complete");

    Ok(())
}

fn show_history() -> Result<()> {
    let backup_manager = backup_manager::BackupManager::new()?;
    let mut backups = backup_manager.list_backups()?;

    if backups.is_empty() {
        println!("No operations recorded.");
        return Ok(());
    }

    // Most recent first
    backups.reverse();

    for backup in backups {
        println!(
            "{}  {}  {}",
            backup.id,
            backup.timestamp.format("%Y-%m-%d %H:%M:%S"),
            backup.script
        );
        for file in &backup.files {
            println!("    {}", file.original_path.display());
        }
    }

    Ok(())
}

fn show_status() -> Result<()> {
    let backup_manager = backup_manager::BackupManager::new()?;
    let backups = backup_manager.list_backups()?;

    println!("Backup directory: {}", backup_manager.backups_dir().display());
    println!("Total backups: {}\n", backups.len());

    if let Some(last) = backups.last() {
        println!("Last operation:");
        println!("  ID: {}", last.id);
        println!("  Time: {}", last.timestamp.format("%Y-%m-%d %H:%M:%S"));
        println!("  Script: {}", last.script);
    }

    Ok(())
}

fn backup_list(verbose: bool) -> Result<()> {
    let backup_manager = backup_manager::BackupManager::new()?;
    let mut backups = backup_manager.list_backups()?;
    backups.reverse();

    if backups.is_empty() {
        println!("No backups found.");
        return Ok(());
    }

    for backup in backups {
        println!(
            "{}  {}  {}",
            backup.id,
            backup.timestamp.format("%Y-%m-%d %H:%M:%S"),
            backup.script
        );
        if verbose {
            for file in &backup.files {
                println!(
                    "    {} -> {}",
                    file.original_path.display(),
                    file.backup_path.display()
                );
            }
        }
    }

    Ok(())
}

fn backup_prune(keep: Option<usize>, keep_days: Option<usize>, force: bool) -> Result<()> {
    let backup_manager = backup_manager::BackupManager::new()?;

    let description = match (keep, keep_days) {
        (_, Some(days)) => format!("backups older than {} days", days),
        (Some(n), None) => format!("all but the {} most recent backups", n),
        (None, None) => "all but the 10 most recent backups".to_string(),
    };

    if !force {
        print!("Remove {}? [y/N] ", description);
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if input.trim().to_lowercase() != "y" {
            println!("Nothing removed.");
            return Ok(());
        }
    }

    let removed = match (keep, keep_days) {
        (_, Some(days)) => backup_manager.prune_older_than(days)?,
        (Some(n), None) => backup_manager.prune(n)?,
        (None, None) => backup_manager.prune(10)?,
    };

    println!("Removed {} backup(s)", removed.len());
    Ok(())
}

fn edit_config(show: bool) -> Result<()> {
    let config_path = config::config_file_path()?;

    if !config_path.exists() {
        config::save_default_config()?;
    }

    if show {
        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
        print!("{}", content);
        return Ok(());
    }

    let editor = resolve_editor(std::env::var("EDITOR").ok())?;

    let status = std::process::Command::new(&editor)
        .arg(&config_path)
        .status()
        .with_context(|| format!("Failed to launch editor: {}", editor.display()))?;

    if !status.success() {
        anyhow::bail!("Editor exited with an error");
    }

    // Validate what the user saved
    let cfg = config::load_config()?;
    config::validate_config(&cfg)?;
    println!("Configuration saved: {}", config_path.display());

    Ok(())
}

/// Pick the editor for `patchx config`: $EDITOR if set, else nano, else vi
fn resolve_editor(env_editor: Option<String>) -> Result<PathBuf> {
    env_editor
        .map(PathBuf::from)
        .or_else(|| which::which("nano").ok())
        .or_else(|| which::which("vi").ok())
        .context("No editor found. Set $EDITOR or install nano/vi.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_editor_prefers_env_var() {
        let editor = resolve_editor(Some("/usr/bin/hx".to_string())).unwrap();
        assert_eq!(editor, PathBuf::from("/usr/bin/hx"));
    }

    #[test]
    fn test_resolve_editor_without_env_var() {
        // Falls back to nano/vi lookup; either a real editor path or a
        // clear error on systems with neither installed
        match resolve_editor(None) {
            Ok(path) => assert!(path.file_name().is_some()),
            Err(e) => assert!(e.to_string().contains("No editor found")),
        }
    }
}
