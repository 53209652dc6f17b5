use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const MAX_BACKUPS: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupMetadata {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// Label of the patch script that produced this backup
    pub script: String,
    pub files: Vec<FileBackup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileBackup {
    pub original_path: PathBuf,
    pub backup_path: PathBuf,
}

pub struct BackupManager {
    backups_dir: PathBuf,
    max_backups: usize,
}

impl BackupManager {
    pub fn new() -> Result<Self> {
        let home_dir =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
        let backups_dir = home_dir.join(".patchx").join("backups");
        Self::with_path(backups_dir)
    }

    /// Create a BackupManager with a custom backup directory
    pub fn with_directory(dir: String) -> Result<Self> {
        Self::with_path(PathBuf::from(dir))
    }

    fn with_path(backups_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&backups_dir).with_context(|| {
            format!(
                "Failed to create backups directory: {}",
                backups_dir.display()
            )
        })?;

        Ok(Self {
            backups_dir,
            max_backups: MAX_BACKUPS,
        })
    }

    /// Get the backup directory path
    pub fn backups_dir(&self) -> &Path {
        &self.backups_dir
    }

    pub fn set_max_backups(&mut self, max: usize) {
        self.max_backups = max;
    }

    pub fn create_backup(&mut self, script: &str, files: &[PathBuf]) -> Result<String> {
        // Millisecond precision keeps ids sortable even for back-to-back runs
        let id = format!(
            "{}-{}",
            Utc::now().format("%Y%m%d-%H%M%S%3f"),
            Uuid::new_v4().to_string().split_at(8).0
        );
        let backup_dir = self.backups_dir.join(&id);

        fs::create_dir_all(&backup_dir).with_context(|| {
            format!(
                "Failed to create backup directory: {}",
                backup_dir.display()
            )
        })?;

        let mut file_backups = Vec::new();

        for file_path in files {
            if !file_path.exists() {
                continue;
            }

            let file_name = file_path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Invalid file name: {}", file_path.display()))?;

            let backup_path = backup_dir.join(file_name);

            fs::copy(file_path, &backup_path)
                .with_context(|| format!("Failed to backup file: {}", file_path.display()))?;

            file_backups.push(FileBackup {
                original_path: file_path.clone(),
                backup_path,
            });
        }

        let metadata = BackupMetadata {
            id: id.clone(),
            timestamp: Utc::now(),
            script: script.to_string(),
            files: file_backups,
        };

        let metadata_path = backup_dir.join("operation.json");
        let metadata_json =
            serde_json::to_string_pretty(&metadata).context("Failed to serialize metadata")?;

        fs::write(&metadata_path, metadata_json)
            .with_context(|| format!("Failed to write metadata: {}", metadata_path.display()))?;

        self.cleanup_old_backups()?;

        Ok(id)
    }

    pub fn restore_backup(&self, id: &str) -> Result<()> {
        let backup_dir = self.backups_dir.join(id);
        let metadata_path = backup_dir.join("operation.json");

        if !backup_dir.exists() {
            anyhow::bail!("Backup not found: {}", id);
        }

        let metadata_json = fs::read_to_string(&metadata_path)
            .with_context(|| format!("Failed to read metadata: {}", metadata_path.display()))?;

        let metadata: BackupMetadata =
            serde_json::from_str(&metadata_json).context("Failed to parse metadata")?;

        for file_backup in &metadata.files {
            if !file_backup.backup_path.exists() {
                eprintln!(
                    "Warning: Backup file missing: {}",
                    file_backup.backup_path.display()
                );
                continue;
            }

            fs::copy(&file_backup.backup_path, &file_backup.original_path).with_context(|| {
                format!(
                    "Failed to restore file: {}",
                    file_backup.original_path.display()
                )
            })?;

            println!("Restored: {}", file_backup.original_path.display());
        }

        // Remove backup after successful restore
        fs::remove_dir_all(&backup_dir).with_context(|| {
            format!(
                "Failed to remove backup directory: {}",
                backup_dir.display()
            )
        })?;

        println!("Backup {} removed after restore", id);

        Ok(())
    }

    pub fn get_last_backup_id(&self) -> Result<Option<String>> {
        let backups = self.list_backups()?;
        Ok(backups.last().map(|b| b.id.clone()))
    }

    pub fn list_backups(&self) -> Result<Vec<BackupMetadata>> {
        let mut backups = Vec::new();

        for entry in fs::read_dir(&self.backups_dir).with_context(|| {
            format!(
                "Failed to read backups directory: {}",
                self.backups_dir.display()
            )
        })? {
            let entry = entry?;
            let metadata_path = entry.path().join("operation.json");

            if !metadata_path.exists() {
                continue;
            }

            let metadata_json = fs::read_to_string(&metadata_path)?;
            if let Ok(metadata) = serde_json::from_str::<BackupMetadata>(&metadata_json) {
                backups.push(metadata);
            }
        }

        // Chronological order; id as tiebreaker for equal timestamps
        backups.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        Ok(backups)
    }

    pub fn remove_backup(&self, id: &str) -> Result<()> {
        let backup_dir = self.backups_dir.join(id);
        if !backup_dir.exists() {
            anyhow::bail!("Backup not found: {}", id);
        }
        fs::remove_dir_all(&backup_dir)
            .with_context(|| format!("Failed to remove backup: {}", backup_dir.display()))?;
        Ok(())
    }

    /// Keep only the `keep` most recent backups; returns removed ids
    pub fn prune(&self, keep: usize) -> Result<Vec<String>> {
        let backups = self.list_backups()?;
        let mut removed = Vec::new();

        if backups.len() > keep {
            for backup in backups.iter().take(backups.len() - keep) {
                self.remove_backup(&backup.id)?;
                removed.push(backup.id.clone());
            }
        }

        Ok(removed)
    }

    /// Keep only backups newer than `days` days; returns removed ids
    pub fn prune_older_than(&self, days: usize) -> Result<Vec<String>> {
        let cutoff = Utc::now() - chrono::Duration::days(days as i64);
        let backups = self.list_backups()?;
        let mut removed = Vec::new();

        for backup in backups.iter().filter(|b| b.timestamp < cutoff) {
            self.remove_backup(&backup.id)?;
            removed.push(backup.id.clone());
        }

        Ok(removed)
    }

    fn cleanup_old_backups(&self) -> Result<()> {
        self.prune(self.max_backups)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager_in(dir: &TempDir) -> BackupManager {
        BackupManager::with_directory(dir.path().join("backups").display().to_string()).unwrap()
    }

    #[test]
    fn test_create_and_restore_backup() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("screen.dart");
        fs::write(&target, "original content\n").unwrap();

        let mut manager = manager_in(&temp);
        let id = manager
            .create_backup("clean login", &[target.clone()])
            .unwrap();

        fs::write(&target, "mutated content\n").unwrap();
        manager.restore_backup(&id).unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "original content\n");
        // Backup is consumed by restore
        assert!(manager.list_backups().unwrap().is_empty());
    }

    #[test]
    fn test_restore_unknown_backup_fails() {
        let temp = TempDir::new().unwrap();
        let manager = manager_in(&temp);
        assert!(manager.restore_backup("no-such-id").is_err());
    }

    #[test]
    fn test_last_backup_is_most_recent() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("a.txt");
        fs::write(&target, "x\n").unwrap();

        let mut manager = manager_in(&temp);
        let _first = manager.create_backup("first", &[target.clone()]).unwrap();
        let second = manager.create_backup("second", &[target.clone()]).unwrap();

        assert_eq!(manager.get_last_backup_id().unwrap(), Some(second));
    }

    #[test]
    fn test_prune_keeps_most_recent() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("a.txt");
        fs::write(&target, "x\n").unwrap();

        let mut manager = manager_in(&temp);
        for i in 0..4 {
            manager
                .create_backup(&format!("op {}", i), &[target.clone()])
                .unwrap();
        }

        let removed = manager.prune(2).unwrap();
        assert_eq!(removed.len(), 2);

        let remaining = manager.list_backups().unwrap();
        assert_eq!(remaining.len(), 2);
        assert_eq!(remaining[0].script, "op 2");
        assert_eq!(remaining[1].script, "op 3");
    }
}
