//! JSON file registry.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use swarm_types::FleetRecord;

use super::{FleetRegistry, RegistryError};

/// Registry backed by one JSON file.
///
/// Saves write a sibling temp file and rename it over the target, so a
/// crash mid-save leaves the previous record intact.
#[derive(Debug, Clone)]
pub struct FileRegistry {
    path: PathBuf,
}

impl FileRegistry {
    /// Create a registry stored at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "bees".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> RegistryError {
        RegistryError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl FleetRegistry for FileRegistry {
    async fn load(&self) -> Result<Option<FleetRecord>, RegistryError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        let record: FleetRecord =
            serde_json::from_str(&contents).map_err(|source| RegistryError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        tracing::debug!("Read {} bees from the roster", record.len());
        Ok(Some(record))
    }

    async fn save(&self, record: &FleetRecord) -> Result<(), RegistryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let contents = serde_json::to_string_pretty(record).map_err(|source| {
            RegistryError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;

        let temp = self.temp_path();
        tokio::fs::write(&temp, contents)
            .await
            .map_err(|e| self.io_error(e))?;
        set_file_permissions_0600(&temp)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), RegistryError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

/// Set file permissions to 0600 (owner read/write only) on Unix.
/// No-op on non-Unix platforms.
async fn set_file_permissions_0600(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record() -> FleetRecord {
        FleetRecord::new(
            "ubuntu",
            "frontend",
            "us-east-1d",
            vec!["i-a".into(), "i-b".into(), "i-c".into()],
        )
    }

    #[tokio::test]
    async fn load_without_file_is_absent() {
        let dir = tempdir().unwrap();
        let registry = FileRegistry::new(dir.path().join("bees.json"));
        assert!(registry.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_then_load_roundtrip() {
        let dir = tempdir().unwrap();
        let registry = FileRegistry::new(dir.path().join("state").join("bees.json"));

        registry.save(&record()).await.unwrap();
        let loaded = registry.load().await.unwrap().unwrap();

        assert_eq!(loaded.instance_ids, record().instance_ids);
        assert_eq!(loaded.zone, "us-east-1d");
        assert!(!registry.temp_path().exists());
    }

    #[tokio::test]
    async fn save_replaces_previous_record() {
        let dir = tempdir().unwrap();
        let registry = FileRegistry::new(dir.path().join("bees.json"));

        registry.save(&record()).await.unwrap();
        let replacement = FleetRecord::new("ec2-user", "k", "eu-west-1a", vec!["i-z".into()]);
        registry.save(&replacement).await.unwrap();

        assert_eq!(registry.load().await.unwrap(), Some(replacement));
    }

    #[tokio::test]
    async fn clear_removes_record_and_is_idempotent() {
        let dir = tempdir().unwrap();
        let registry = FileRegistry::new(dir.path().join("bees.json"));

        registry.save(&record()).await.unwrap();
        registry.clear().await.unwrap();
        assert!(registry.load().await.unwrap().is_none());
        registry.clear().await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bees.json");
        tokio::fs::write(&path, "not json").await.unwrap();

        let result = FileRegistry::new(&path).load().await;
        assert!(matches!(result, Err(RegistryError::Corrupt { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn state_file_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let registry = FileRegistry::new(dir.path().join("bees.json"));
        registry.save(&record()).await.unwrap();

        let perms = tokio::fs::metadata(registry.path())
            .await
            .unwrap()
            .permissions();
        assert_eq!(perms.mode() & 0o777, 0o600, "file should be 0600");
    }
}
