use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use super::{image_key, metadata_key, MetadataPublisher, MetadataRequest, TokenMetadata};
use crate::error::{LaunchError, Result};

const SCHEME: &str = "memory://";

/// Keeps published documents and images in process memory.
///
/// Used when no storage endpoint is configured, and by tests.
#[derive(Debug, Default)]
pub struct InMemoryMetadataPublisher {
    documents: DashMap<String, TokenMetadata>,
    images: DashMap<String, Bytes>,
    unavailable: parking_lot::Mutex<Option<String>>,
}

impl InMemoryMetadataPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent publish fail with a storage error.
    pub fn set_unavailable(&self, reason: impl Into<String>) {
        *self.unavailable.lock() = Some(reason.into());
    }

    pub fn document(&self, uri: &str) -> Option<TokenMetadata> {
        let key = uri.strip_prefix(SCHEME)?;
        self.documents.get(key).map(|d| d.value().clone())
    }

    pub fn image(&self, uri: &str) -> Option<Bytes> {
        let key = uri.strip_prefix(SCHEME)?;
        self.images.get(key).map(|b| b.value().clone())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl MetadataPublisher for InMemoryMetadataPublisher {
    async fn publish(&self, request: MetadataRequest<'_>) -> Result<String> {
        if let Some(reason) = self.unavailable.lock().clone() {
            return Err(LaunchError::Storage(reason));
        }

        let image = request.logo.map(|logo| {
            let key = image_key(request.mint, logo);
            self.images.insert(key.clone(), logo.bytes.clone());
            format!("{}{}", SCHEME, key)
        });

        let key = metadata_key(request.mint);
        let document = TokenMetadata::new(request.name, request.symbol, request.links, image);
        self.documents.insert(key.clone(), document);
        Ok(format!("{}{}", SCHEME, key))
    }
}
