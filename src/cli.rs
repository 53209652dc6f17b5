use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "

Copyright (c) 2026 InkyQuill
License: MIT
Source: https://github.com/InkyQuill/patchx
Rust Edition: 2024"
);

#[derive(Parser)]
#[command(name = "patchx")]
#[command(about = "Declarative single-file patcher with preview, backups, and rollback")]
#[command(long_about = "patchx applies an ordered list of transformation rules to one text file.

Rules live in a TOML patch script and come in three kinds: literal replace
(exact substring, may span lines), delete-lines (half-open 0-based range),
and delete-block (from a start marker up to a stop marker).

Unlike ad-hoc edit scripts, patchx shows exactly what will change, reports
rules that matched nothing, backs the file up before writing, and applies
the result through an atomic rename.

RULE KINDS:
  replace       find = \"old text\"  replace = \"new text\"
  delete-lines  start = 499  end = 502
  delete-block  start = { contains = \"...\" }  stop = { starts-with = \"...\" }

MARKERS:
  contains      line contains the given substring
  starts-with   line starts with the text after leading whitespace
  matches       line matches a regex

EXAMPLES:
  patchx fix_admin_panel.toml lib/screens/admin_panel_screen.dart
  patchx clean_login.toml login_screen.dart --dry-run
  patchx patch.toml file.dart --strict       Fail if any rule matches nothing
  patchx rollback                            Undo the last applied patch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_version = LONG_VERSION)]
#[command(propagate_version = true)]
struct Cli {
    /// Patch script (TOML file with [[rules]])
    #[arg(value_name = "SCRIPT")]
    script: Option<String>,

    /// Target file to patch
    #[arg(value_name = "FILE")]
    file: Option<String>,

    /// Dry run mode (preview changes without applying)
    #[arg(short = 'd', long, alias = "dry-run")]
    #[arg(help = "Preview changes without modifying the file")]
    dry_run: bool,

    /// Interactive mode (ask before applying changes)
    #[arg(short = 'i', long)]
    #[arg(help = "Ask for confirmation before applying changes")]
    interactive: bool,

    /// Number of context lines to show (default: 2)
    #[arg(short = 'n', long, value_name = "NUM")]
    #[arg(help = "Number of context lines to show around changes\nUse 0 to show only changed lines")]
    context: Option<usize>,

    /// Fail when a rule matches nothing
    #[arg(long)]
    #[arg(help = "Treat unmatched patterns and absent blocks as fatal errors\nCatches patch scripts that drifted from their target file")]
    strict: bool,

    /// Skip backup creation (requires --force)
    #[arg(long = "no-backup", requires = "force")]
    #[arg(help = "Skip creating a backup (requires --force)\n⚠️  USE WITH CAUTION: Changes cannot be undone!\nRecommended only for files under version control")]
    no_backup: bool,

    /// Force dangerous operations (use with --no-backup)
    #[arg(long = "force", requires = "no_backup")]
    #[arg(help = "Force dangerous operations (required for --no-backup)\nConfirms you understand the risks")]
    force: bool,

    /// Custom backup directory
    #[arg(long, value_name = "DIR")]
    #[arg(help = "Use custom directory for backups\nDefault: ~/.patchx/backups/")]
    backup_dir: Option<String>,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rollback a previous operation
    #[command(long_about = "Restore the target file from a backup.

If no backup ID is specified, rolls back the most recent operation.
Use 'patchx history' to see all available backups.

EXAMPLES:
  patchx rollback                    Rollback last operation
  patchx rollback 20260830-120000    Rollback specific backup")]
    Rollback {
        /// Backup ID to rollback (optional, defaults to last operation)
        #[arg(value_name = "ID")]
        id: Option<String>,
    },

    /// Show operation history
    #[command(long_about = "Display a log of all patchx operations.

Shows timestamp, script, files affected, and backup location for each
operation, most recent first.")]
    History,

    /// Show current backup status
    #[command(long_about = "Display backup directory location and usage.

Shows where backups are stored and details of the last operation.")]
    Status,

    /// Manage backups
    #[command(long_about = "Manage patchx backups.

EXAMPLES:
  patchx backup list                 List all backups
  patchx backup restore <id>         Restore from backup
  patchx backup prune --keep=5       Keep only 5 most recent backups
  patchx backup prune --keep-days=7  Keep only backups from last 7 days")]
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },

    /// Edit configuration file
    #[command(long_about = "Open configuration file in text editor.

Opens ~/.patchx/config.toml in your default editor. If the file doesn't
exist, a default one will be created. After saving, the configuration is
validated; errors are displayed if any.

CONFIGURATION OPTIONS:
  [backup]
    backup_dir = \"/path\"        # Custom backup directory (optional)
    max_backups = 50             # Backups kept before pruning

  [output]
    context_lines = 2            # Context lines to show (max 10)

  [behavior]
    strict = false               # Fail when a rule matches nothing

  [logging]
    debug = false                # Log operations to file

EXAMPLES:
  patchx config                  Edit configuration
  patchx config --show           Show current configuration")]
    Config {
        /// Show current configuration without editing
        #[arg(long = "show")]
        show: bool,
    },
}

#[derive(Subcommand)]
enum BackupAction {
    /// List all backups
    List {
        /// Show more details (file paths)
        #[arg(short, long)]
        verbose: bool,
    },

    /// Restore from a backup
    Restore {
        /// Backup ID
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Prune old backups
    Prune {
        /// Number of recent backups to keep
        #[arg(long, value_name = "N")]
        keep: Option<usize>,

        /// Keep backups from last N days
        #[arg(long, value_name = "N")]
        keep_days: Option<usize>,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

pub fn parse_args() -> Result<Args> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Rollback { id }) => Ok(Args::Rollback { id }),
        Some(Commands::History) => Ok(Args::History),
        Some(Commands::Status) => Ok(Args::Status),
        Some(Commands::Config { show }) => Ok(Args::Config { show }),
        Some(Commands::Backup { action }) => match action {
            BackupAction::List { verbose } => Ok(Args::BackupList { verbose }),
            BackupAction::Restore { id } => Ok(Args::BackupRestore { id }),
            BackupAction::Prune { keep, keep_days, force } => {
                Ok(Args::BackupPrune { keep, keep_days, force })
            }
        },
        None => {
            let script = cli
                .script
                .context("Missing patch script. Usage: patchx <script.toml> <file>")?;
            let file = cli
                .file
                .context("Missing target file. Usage: patchx <script.toml> <file>")?;

            Ok(Args::Execute {
                script,
                file,
                dry_run: cli.dry_run,
                interactive: cli.interactive,
                context: cli.context,
                strict: cli.strict,
                no_backup: cli.no_backup,
                backup_dir: cli.backup_dir,
            })
        }
    }
}

#[derive(Debug)]
pub enum Args {
    Execute {
        script: String,
        file: String,
        dry_run: bool,
        interactive: bool,
        context: Option<usize>,
        strict: bool,
        no_backup: bool,
        backup_dir: Option<String>,
    },
    Rollback {
        id: Option<String>,
    },
    History,
    Status,
    BackupList {
        verbose: bool,
    },
    BackupRestore {
        id: String,
    },
    BackupPrune {
        keep: Option<usize>,
        keep_days: Option<usize>,
        force: bool,
    },
    Config {
        show: bool,
    },
}
