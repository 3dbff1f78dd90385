//! Directory-backed stores
//!
//! Hats live at `<root>/<user>.png`. An enabled channel is an empty marker
//! file at `<root>/<channel>`.

use super::file_key;
use crate::error::StoreError;
use crate::traits::{AssetStore, ChannelPolicyStore};
use hatbot_core::{ChannelId, UserId};
use log::debug;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

fn unavailable(err: std::io::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

fn invalid_key(id: &str) -> StoreError {
    StoreError::Unavailable(format!("identifier '{id}' cannot be stored"))
}

/// Custom hats stored as PNG files in a directory
#[derive(Debug, Clone)]
pub struct DirAssetStore {
    root: PathBuf,
}

impl DirAssetStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn hat_path(&self, user: &UserId) -> Option<PathBuf> {
        file_key(user.as_str()).map(|key| self.root.join(format!("{key}.png")))
    }
}

impl AssetStore for DirAssetStore {
    async fn get(&self, user: &UserId) -> Result<Vec<u8>, StoreError> {
        // An id we could never have written has nothing stored.
        let Some(path) = self.hat_path(user) else {
            return Err(StoreError::NotFound);
        };
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(StoreError::NotFound),
            Err(err) => Err(unavailable(err)),
        }
    }

    async fn set(&self, user: &UserId, hat: Vec<u8>) -> Result<(), StoreError> {
        let path = self
            .hat_path(user)
            .ok_or_else(|| invalid_key(user.as_str()))?;
        fs::create_dir_all(&self.root).await.map_err(unavailable)?;

        // Write then rename so readers never see a partial file.
        let staging = path.with_extension("png.tmp");
        fs::write(&staging, &hat).await.map_err(unavailable)?;
        fs::rename(&staging, &path).await.map_err(unavailable)?;
        debug!("Stored {} byte hat at {}", hat.len(), path.display());
        Ok(())
    }

    async fn remove(&self, user: &UserId) -> Result<bool, StoreError> {
        let Some(path) = self.hat_path(user) else {
            return Ok(false);
        };
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(unavailable(err)),
        }
    }
}

/// Enabled channels stored as marker files in a directory
#[derive(Debug, Clone)]
pub struct DirChannelPolicy {
    root: PathBuf,
}

impl DirChannelPolicy {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn marker_path(&self, channel: &ChannelId) -> Option<PathBuf> {
        file_key(channel.as_str()).map(|key| self.root.join(key))
    }
}

impl ChannelPolicyStore for DirChannelPolicy {
    async fn is_enabled(&self, channel: &ChannelId) -> Result<bool, StoreError> {
        let Some(path) = self.marker_path(channel) else {
            return Ok(false);
        };
        fs::try_exists(&path).await.map_err(unavailable)
    }

    async fn toggle(&self, channel: &ChannelId) -> Result<bool, StoreError> {
        let path = self
            .marker_path(channel)
            .ok_or_else(|| invalid_key(channel.as_str()))?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(false),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                fs::create_dir_all(&self.root).await.map_err(unavailable)?;
                fs::write(&path, b"").await.map_err(unavailable)?;
                Ok(true)
            }
            Err(err) => Err(unavailable(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hats_persist_across_store_instances() {
        let dir = tempfile::tempdir().unwrap();
        let user = UserId::new("123");

        DirAssetStore::new(dir.path().join("hats"))
            .set(&user, vec![9, 8, 7])
            .await
            .unwrap();

        let reopened = DirAssetStore::new(dir.path().join("hats"));
        assert_eq!(reopened.get(&user).await.unwrap(), vec![9, 8, 7]);
        assert!(reopened.remove(&user).await.unwrap());
        assert!(matches!(reopened.get(&user).await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_missing_directory_reads_as_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirAssetStore::new(dir.path().join("never-created"));
        assert!(matches!(store.get(&UserId::new("1")).await, Err(StoreError::NotFound)));
        assert!(!store.remove(&UserId::new("1")).await.unwrap());
    }

    #[tokio::test]
    async fn test_path_like_ids_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirAssetStore::new(dir.path());
        let sneaky = UserId::new("../outside");
        assert!(store.set(&sneaky, vec![1]).await.is_err());
        assert!(matches!(store.get(&sneaky).await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_channel_toggle_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let policy = DirChannelPolicy::new(dir.path().join("channels"));
        let channel = ChannelId::new("42");

        assert!(!policy.is_enabled(&channel).await.unwrap());
        assert!(policy.toggle(&channel).await.unwrap());
        assert!(DirChannelPolicy::new(dir.path().join("channels"))
            .is_enabled(&channel)
            .await
            .unwrap());
        assert!(!policy.toggle(&channel).await.unwrap());
        assert!(!policy.is_enabled(&channel).await.unwrap());
    }
}
