/// Photo asset storage
///
/// Uploads land under a quarantine prefix and move to `approved/` once a
/// reviewer signs off. Rejected assets are deleted.
use crate::error::{ModerationError, ModerationResult};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Prefixes that mark an asset as not yet cleared
pub const QUARANTINE_PREFIXES: [&str; 2] = ["temp/", "moderation-queue/"];
pub const APPROVED_PREFIX: &str = "approved/";
/// Where the ingestion endpoint stores raw uploads
pub const UPLOAD_PREFIX: &str = "moderation-queue/";

/// Storage id after approval, or `None` when the asset is not quarantined
pub fn approved_location(storage_id: &str) -> Option<String> {
    QUARANTINE_PREFIXES
        .iter()
        .find(|prefix| storage_id.contains(*prefix))
        .map(|prefix| storage_id.replacen(prefix, APPROVED_PREFIX, 1))
}

/// Whether `storage_id` sits in `user_id`'s own quarantine area,
/// i.e. `<quarantine-prefix><user_id>/<name>` with no `..` segments
pub fn in_user_quarantine(storage_id: &str, user_id: &str) -> bool {
    if user_id.is_empty() || storage_id.split('/').any(|segment| segment == "..") {
        return false;
    }
    QUARANTINE_PREFIXES.iter().any(|prefix| {
        storage_id
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix(user_id))
            .and_then(|rest| rest.strip_prefix('/'))
            .is_some_and(|name| !name.is_empty())
    })
}

/// Asset storage backend
#[async_trait]
pub trait AssetStorage: Send + Sync {
    /// Store raw bytes
    async fn put(&self, storage_id: &str, data: &[u8]) -> ModerationResult<()>;

    /// Move an asset; the destination is overwritten
    async fn relocate(&self, from: &str, to: &str) -> ModerationResult<()>;

    /// Delete an asset; missing assets are not an error
    async fn delete(&self, storage_id: &str) -> ModerationResult<()>;

    /// Public URL for a storage id
    fn public_url(&self, storage_id: &str) -> String;
}

/// Filesystem-backed storage rooted at one directory
#[derive(Clone)]
pub struct DiskAssetStorage {
    root: PathBuf,
    public_base_url: String,
}

impl DiskAssetStorage {
    pub fn new(root: PathBuf, public_base_url: impl Into<String>) -> Self {
        Self {
            root,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Resolve a storage id under the root, refusing anything that escapes it
    fn resolve(&self, storage_id: &str) -> ModerationResult<PathBuf> {
        let relative = Path::new(storage_id);
        let safe = !storage_id.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(ModerationError::Validation(format!(
                "Invalid storage id: {}",
                storage_id
            )));
        }
        Ok(self.root.join(relative))
    }

    async fn ensure_parent(path: &Path) -> ModerationResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                ModerationError::StorageSideEffect(format!("Failed to create directory: {}", e))
            })?;
        }
        Ok(())
    }
}

#[async_trait]
impl AssetStorage for DiskAssetStorage {
    async fn put(&self, storage_id: &str, data: &[u8]) -> ModerationResult<()> {
        let path = self.resolve(storage_id)?;
        Self::ensure_parent(&path).await?;

        fs::write(&path, data).await.map_err(|e| {
            ModerationError::StorageSideEffect(format!("Failed to write {}: {}", storage_id, e))
        })
    }

    async fn relocate(&self, from: &str, to: &str) -> ModerationResult<()> {
        let source = self.resolve(from)?;
        let destination = self.resolve(to)?;
        Self::ensure_parent(&destination).await?;

        fs::rename(&source, &destination).await.map_err(|e| {
            ModerationError::StorageSideEffect(format!("Failed to move {} to {}: {}", from, to, e))
        })
    }

    async fn delete(&self, storage_id: &str) -> ModerationResult<()> {
        let path = self.resolve(storage_id)?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ModerationError::StorageSideEffect(format!(
                "Failed to delete {}: {}",
                storage_id, e
            ))),
        }
    }

    fn public_url(&self, storage_id: &str) -> String {
        format!("{}/{}", self.public_base_url, storage_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_approved_location() {
        assert_eq!(
            approved_location("moderation-queue/u1/a.jpg").as_deref(),
            Some("approved/u1/a.jpg")
        );
        assert_eq!(
            approved_location("uploads/temp/a.jpg").as_deref(),
            Some("uploads/approved/a.jpg")
        );
        assert_eq!(approved_location("approved/a.jpg"), None);
        assert_eq!(approved_location("avatars/a.jpg"), None);
    }

    #[test]
    fn test_user_quarantine_scope() {
        assert!(in_user_quarantine("moderation-queue/user-1/a.png", "user-1"));
        assert!(in_user_quarantine("temp/user-1/nested/a.png", "user-1"));

        assert!(!in_user_quarantine("moderation-queue/user-2/a.png", "user-1"));
        assert!(!in_user_quarantine("moderation-queue/user-10/a.png", "user-1"));
        assert!(!in_user_quarantine("moderation-queue/user-1/", "user-1"));
        assert!(!in_user_quarantine("moderation-queue/user-1/../user-2/a.png", "user-1"));
        assert!(!in_user_quarantine("approved/user-1/a.png", "user-1"));
    }

    #[tokio::test]
    async fn test_put_relocate_delete() {
        let dir = tempdir().unwrap();
        let storage = DiskAssetStorage::new(dir.path().to_path_buf(), "https://cdn.example.com/");

        storage.put("temp/a.jpg", b"jpeg bytes").await.unwrap();
        storage.relocate("temp/a.jpg", "approved/a.jpg").await.unwrap();
        assert!(!dir.path().join("temp/a.jpg").exists());
        assert!(dir.path().join("approved/a.jpg").exists());

        storage.delete("approved/a.jpg").await.unwrap();
        assert!(!dir.path().join("approved/a.jpg").exists());

        // Deleting twice is fine
        storage.delete("approved/a.jpg").await.unwrap();

        assert_eq!(
            storage.public_url("approved/a.jpg"),
            "https://cdn.example.com/approved/a.jpg"
        );
    }

    #[tokio::test]
    async fn test_relocating_missing_asset_fails() {
        let dir = tempdir().unwrap();
        let storage = DiskAssetStorage::new(dir.path().to_path_buf(), "http://localhost");

        let err = storage.relocate("temp/gone.jpg", "approved/gone.jpg").await.unwrap_err();
        assert!(matches!(err, ModerationError::StorageSideEffect(_)));
    }

    #[tokio::test]
    async fn test_traversal_is_refused() {
        let dir = tempdir().unwrap();
        let storage = DiskAssetStorage::new(dir.path().to_path_buf(), "http://localhost");

        assert!(storage.put("../escape.jpg", b"x").await.is_err());
        assert!(storage.delete("/etc/passwd").await.is_err());
    }
}
