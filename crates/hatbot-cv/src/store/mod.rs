//! Asset and channel-policy stores

pub mod fs;
pub mod memory;

pub use fs::{DirAssetStore, DirChannelPolicy};
pub use memory::{MemoryAssetStore, MemoryChannelPolicy};

/// File-system safe form of an identifier, `None` if it has characters
/// that could escape the store directory.
pub(crate) fn file_key(id: &str) -> Option<&str> {
    let safe = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    safe.then_some(id)
}
