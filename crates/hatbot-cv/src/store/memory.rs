//! In-memory stores

use crate::error::StoreError;
use crate::traits::{AssetStore, ChannelPolicyStore};
use hatbot_core::{ChannelId, UserId};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

/// Custom hats held in a map. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryAssetStore {
    hats: RwLock<HashMap<UserId, Vec<u8>>>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AssetStore for MemoryAssetStore {
    async fn get(&self, user: &UserId) -> Result<Vec<u8>, StoreError> {
        self.hats
            .read()
            .await
            .get(user)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn set(&self, user: &UserId, hat: Vec<u8>) -> Result<(), StoreError> {
        self.hats.write().await.insert(user.clone(), hat);
        Ok(())
    }

    async fn remove(&self, user: &UserId) -> Result<bool, StoreError> {
        Ok(self.hats.write().await.remove(user).is_some())
    }
}

/// Enabled channels held in a set.
#[derive(Debug, Default)]
pub struct MemoryChannelPolicy {
    enabled: RwLock<HashSet<ChannelId>>,
}

impl MemoryChannelPolicy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChannelPolicyStore for MemoryChannelPolicy {
    async fn is_enabled(&self, channel: &ChannelId) -> Result<bool, StoreError> {
        Ok(self.enabled.read().await.contains(channel))
    }

    async fn toggle(&self, channel: &ChannelId) -> Result<bool, StoreError> {
        let mut enabled = self.enabled.write().await;
        if enabled.remove(channel) {
            Ok(false)
        } else {
            enabled.insert(channel.clone());
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_asset_store_set_get_remove() {
        let store = MemoryAssetStore::new();
        let user = UserId::new("1");
        assert!(matches!(store.get(&user).await, Err(StoreError::NotFound)));

        store.set(&user, vec![1, 2, 3]).await.unwrap();
        assert_eq!(store.get(&user).await.unwrap(), vec![1, 2, 3]);

        assert!(store.remove(&user).await.unwrap());
        assert!(!store.remove(&user).await.unwrap());
    }

    #[tokio::test]
    async fn test_channels_start_disabled_and_toggle() {
        let policy = MemoryChannelPolicy::new();
        let channel = ChannelId::new("general");
        assert!(!policy.is_enabled(&channel).await.unwrap());
        assert!(policy.toggle(&channel).await.unwrap());
        assert!(policy.is_enabled(&channel).await.unwrap());
        assert!(!policy.toggle(&channel).await.unwrap());
        assert!(!policy.is_enabled(&channel).await.unwrap());
    }
}
