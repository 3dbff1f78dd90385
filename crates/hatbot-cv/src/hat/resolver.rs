//! Per-user hat resolution

use super::{DefaultHat, HatAsset};
use crate::detection::cancel::{with_deadline, CancelToken};
use crate::error::{Dependency, PipelineError, StoreError};
use crate::traits::AssetStore;
use crate::utils::ImageUtils;
use hatbot_core::UserId;
use log::{debug, error};
use std::sync::Arc;
use std::time::Duration;

/// Largest accepted width or height of an uploaded hat.
pub const MAX_CUSTOM_HAT_SIDE: u32 = 2048;

/// Picks the hat to draw for a user: their stored custom hat, else the
/// default. Read-only on the resolve path.
pub struct HatResolver<S> {
    store: Arc<S>,
    default_hat: DefaultHat,
    timeout: Duration,
}

impl<S: AssetStore> HatResolver<S> {
    pub fn new(store: Arc<S>, default_hat: DefaultHat, timeout: Duration) -> Self {
        Self {
            store,
            default_hat,
            timeout,
        }
    }

    pub fn default_hat(&self) -> &DefaultHat {
        &self.default_hat
    }

    /// Resolve the hat for `user`.
    ///
    /// A user without a stored hat gets the default. Stored bytes that no
    /// longer decode are a [`PipelineError::DataIntegrity`] fault and never
    /// fall back to the default.
    pub async fn resolve(
        &self,
        user: &UserId,
        cancel: &CancelToken,
    ) -> Result<HatAsset, PipelineError> {
        let stored =
            with_deadline(Dependency::AssetStore, self.timeout, cancel, self.store.get(user))
                .await?;

        match stored {
            Ok(bytes) => match ImageUtils::decode_png(&bytes) {
                Ok(image) => {
                    debug!("Using custom hat for user {}", user);
                    Ok(HatAsset::custom(image))
                }
                Err(source) => {
                    error!("Stored hat for user {} is corrupt: {}", user, source);
                    Err(PipelineError::DataIntegrity {
                        user: user.clone(),
                        source,
                    })
                }
            },
            Err(StoreError::NotFound) => {
                debug!("No custom hat for user {}, using default", user);
                Ok(self.default_hat.asset())
            }
            Err(err) => Err(PipelineError::store(err)),
        }
    }

    /// Validate and store a custom hat. Bytes that are not a PNG, or a PNG
    /// larger than [`MAX_CUSTOM_HAT_SIDE`] on either side, are rejected
    /// before anything is written.
    pub async fn set_custom(
        &self,
        user: &UserId,
        hat: Vec<u8>,
        cancel: &CancelToken,
    ) -> Result<(), PipelineError> {
        ImageUtils::decode_png_within(&hat, MAX_CUSTOM_HAT_SIDE).map_err(|source| {
            PipelineError::MalformedInput {
                name: format!("custom hat for user {user}"),
                source,
            }
        })?;

        with_deadline(Dependency::AssetStore, self.timeout, cancel, self.store.set(user, hat))
            .await?
            .map_err(PipelineError::store)
    }

    /// Remove a custom hat. Returns `false` if the user had none.
    pub async fn remove_custom(
        &self,
        user: &UserId,
        cancel: &CancelToken,
    ) -> Result<bool, PipelineError> {
        with_deadline(Dependency::AssetStore, self.timeout, cancel, self.store.remove(user))
            .await?
            .map_err(PipelineError::store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::OutputFormat;
    use crate::hat::HatSource;
    use crate::store::MemoryAssetStore;
    use image::{Rgba, RgbaImage};

    struct UnreachableStore;

    impl AssetStore for UnreachableStore {
        async fn get(&self, _user: &UserId) -> Result<Vec<u8>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        async fn set(&self, _user: &UserId, _hat: Vec<u8>) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        async fn remove(&self, _user: &UserId) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    struct StalledStore;

    impl AssetStore for StalledStore {
        async fn get(&self, _user: &UserId) -> Result<Vec<u8>, StoreError> {
            std::future::pending().await
        }

        async fn set(&self, _user: &UserId, _hat: Vec<u8>) -> Result<(), StoreError> {
            std::future::pending().await
        }

        async fn remove(&self, _user: &UserId) -> Result<bool, StoreError> {
            std::future::pending().await
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([0, 0, 255, 255]));
        ImageUtils::encode(&img, OutputFormat::Png).unwrap()
    }

    fn default_hat() -> DefaultHat {
        DefaultHat::from_png_bytes(&png(8, 4)).unwrap()
    }

    fn resolver<S: AssetStore>(store: S) -> HatResolver<S> {
        HatResolver::new(Arc::new(store), default_hat(), Duration::from_millis(100))
    }

    #[tokio::test]
    async fn test_user_without_hat_gets_default() {
        let resolver = resolver(MemoryAssetStore::new());
        let hat = resolver
            .resolve(&UserId::new("1"), &CancelToken::never())
            .await
            .unwrap();
        assert_eq!(hat.source, HatSource::Default);
        assert_eq!(hat.dimensions(), (8, 4));
    }

    #[tokio::test]
    async fn test_stored_hat_wins_over_default() {
        let store = MemoryAssetStore::new();
        let user = UserId::new("2");
        store.set(&user, png(30, 10)).await.unwrap();

        let hat = resolver(store).resolve(&user, &CancelToken::never()).await.unwrap();
        assert_eq!(hat.source, HatSource::Custom);
        assert_eq!(hat.dimensions(), (30, 10));
    }

    #[tokio::test]
    async fn test_corrupt_stored_hat_is_data_integrity_fault() {
        let store = MemoryAssetStore::new();
        let user = UserId::new("3");
        let mut truncated = png(30, 10);
        truncated.truncate(20);
        store.set(&user, truncated).await.unwrap();

        let err = resolver(store)
            .resolve(&user, &CancelToken::never())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::DataIntegrity { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_store_is_transient() {
        let err = resolver(UnreachableStore)
            .resolve(&UserId::new("4"), &CancelToken::never())
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_stalled_store_times_out() {
        let err = resolver(StalledStore)
            .resolve(&UserId::new("5"), &CancelToken::never())
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_cancelled_request_stops_waiting_on_store() {
        let (handle, token) = crate::detection::cancel_pair();
        handle.cancel();
        let err = resolver(StalledStore)
            .resolve(&UserId::new("6"), &token)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled));
    }

    #[tokio::test]
    async fn test_set_custom_rejects_non_png() {
        let resolver = resolver(MemoryAssetStore::new());
        let user = UserId::new("7");
        let err = resolver
            .set_custom(&user, b"GIF89a".to_vec(), &CancelToken::never())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput { .. }));

        let hat = resolver.resolve(&user, &CancelToken::never()).await.unwrap();
        assert_eq!(hat.source, HatSource::Default);
    }

    #[tokio::test]
    async fn test_set_then_remove_custom() {
        let resolver = resolver(MemoryAssetStore::new());
        let user = UserId::new("8");
        let never = CancelToken::never();

        resolver.set_custom(&user, png(12, 12), &never).await.unwrap();
        assert_eq!(resolver.resolve(&user, &never).await.unwrap().source, HatSource::Custom);

        assert!(resolver.remove_custom(&user, &never).await.unwrap());
        assert!(!resolver.remove_custom(&user, &never).await.unwrap());
        assert_eq!(resolver.resolve(&user, &never).await.unwrap().source, HatSource::Default);
    }

    #[tokio::test]
    async fn test_set_custom_rejects_oversized_hat() {
        let resolver = resolver(MemoryAssetStore::new());
        let user = UserId::new("9");
        let never = CancelToken::never();

        let err = resolver
            .set_custom(&user, png(1, MAX_CUSTOM_HAT_SIDE + 1), &never)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput { .. }));
        assert_eq!(resolver.resolve(&user, &never).await.unwrap().source, HatSource::Default);

        resolver.set_custom(&user, png(1, MAX_CUSTOM_HAT_SIDE), &never).await.unwrap();
        assert_eq!(resolver.resolve(&user, &never).await.unwrap().source, HatSource::Custom);
    }
}
