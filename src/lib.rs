//! patchx: declarative single-file source patcher
//!
//! This library exposes patchx's core functionality for use in property-based tests.
//! The main binary is at src/main.rs.

pub mod backup_manager;
pub mod config;
pub mod engine;
pub mod error_helpers;
pub mod logger;
pub mod report;
pub mod rule;
pub mod script;

// Re-export commonly used types for convenience
pub use backup_manager::{BackupManager, BackupMetadata, FileBackup};
pub use engine::{Document, EngineError, PatchEngine, PatchPreview};
pub use report::Reporter;
pub use rule::{Marker, Rule, RuleOutcome};
pub use script::PatchScript;
