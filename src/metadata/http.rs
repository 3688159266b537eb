use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{debug, info};

use super::{image_key, metadata_key, MetadataPublisher, MetadataRequest, TokenMetadata};
use crate::error::{handle_reqwest_error, retry_with_backoff, LaunchError, Result};

const UPLOAD_RETRIES: u32 = 3;
const UPLOAD_BACKOFF_MS: u64 = 250;

/// Uploads metadata to an object store that accepts `PUT <endpoint>/<key>`
/// (S3-compatible gateways, pinning services behind a proxy).
///
/// Objects are mint-addressed, so re-uploading is idempotent and safe to retry.
#[derive(Debug, Clone)]
pub struct HttpMetadataPublisher {
    client: reqwest::Client,
    endpoint: String,
    public_base: String,
}

impl HttpMetadataPublisher {
    pub fn new(endpoint: &str, public_base: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LaunchError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        let endpoint = endpoint.trim_end_matches('/').to_string();
        let public_base = public_base
            .map(|b| b.trim_end_matches('/').to_string())
            .unwrap_or_else(|| endpoint.clone());
        Ok(Self {
            client,
            endpoint,
            public_base,
        })
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, key)
    }

    async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        let url = format!("{}/{}", self.endpoint, key);
        retry_with_backoff(
            || {
                let request = self
                    .client
                    .put(&url)
                    .header(CONTENT_TYPE, content_type)
                    .body(body.clone());
                async move {
                    let response = request
                        .send()
                        .await
                        .map_err(|e| handle_reqwest_error(e, "metadata upload"))?;
                    response
                        .error_for_status()
                        .map_err(|e| handle_reqwest_error(e, "metadata upload"))?;
                    Ok(())
                }
            },
            UPLOAD_RETRIES,
            UPLOAD_BACKOFF_MS,
        )
        .await
        .map_err(|e| LaunchError::Storage(format!("PUT {} failed: {}", key, e)))?;
        debug!(key = key, "Uploaded metadata object");
        Ok(())
    }
}

#[async_trait]
impl MetadataPublisher for HttpMetadataPublisher {
    async fn publish(&self, request: MetadataRequest<'_>) -> Result<String> {
        // Keys are mint-addressed, so the document can name the image URL
        // before the image upload finishes.
        let logo_key = request.logo.map(|logo| image_key(request.mint, logo));
        let document = TokenMetadata::new(
            request.name,
            request.symbol,
            request.links,
            logo_key.as_deref().map(|key| self.public_url(key)),
        );
        let body = serde_json::to_vec(&document)
            .map_err(|e| LaunchError::Storage(format!("Failed to encode metadata: {}", e)))?;
        let key = metadata_key(request.mint);

        let upload_image = async {
            match (request.logo, logo_key.as_deref()) {
                (Some(logo), Some(key)) => {
                    self.put_object(key, logo.bytes.to_vec(), &logo.content_type)
                        .await
                }
                _ => Ok(()),
            }
        };
        let upload_document = self.put_object(&key, body, "application/json");
        futures::try_join!(upload_image, upload_document)?;

        let uri = self.public_url(&key);
        info!(mint = %request.mint, uri = %uri, "Token metadata published");
        Ok(uri)
    }
}
