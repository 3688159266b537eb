//! Off-chain token metadata: the JSON document wallets and explorers read,
//! and the publishers that store it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::error::Result;
use crate::token::{LogoAsset, SocialLinks};

pub mod http;
pub mod memory;

pub use http::HttpMetadataPublisher;
pub use memory::InMemoryMetadataPublisher;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataExtensions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram: Option<String>,
}

/// Metaplex-style token metadata document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
    #[serde(default)]
    pub extensions: MetadataExtensions,
}

impl TokenMetadata {
    pub fn new(name: &str, symbol: &str, links: &SocialLinks, image: Option<String>) -> Self {
        Self {
            name: name.trim().to_string(),
            symbol: symbol.trim().to_string(),
            description: format!("{} token on Solana", name.trim()),
            image,
            external_url: links.website.clone(),
            extensions: MetadataExtensions {
                website: links.website.clone(),
                twitter: links.twitter.clone(),
                telegram: links.telegram.clone(),
            },
        }
    }
}

/// Everything a publisher needs for one mint.
#[derive(Debug, Clone)]
pub struct MetadataRequest<'a> {
    pub mint: &'a Pubkey,
    pub name: &'a str,
    pub symbol: &'a str,
    pub links: &'a SocialLinks,
    pub logo: Option<&'a LogoAsset>,
}

/// Mint-addressed object keys shared by every publisher.
pub fn metadata_key(mint: &Pubkey) -> String {
    format!("token-metadata/{}.json", mint)
}

pub fn image_key(mint: &Pubkey, logo: &LogoAsset) -> String {
    format!("token-images/{}.{}", mint, logo.extension())
}

/// Stores a token's metadata document and returns its stable URI.
/// Failures are `LaunchError::Storage`.
#[async_trait]
pub trait MetadataPublisher: Send + Sync {
    async fn publish(&self, request: MetadataRequest<'_>) -> Result<String>;
}
