use std::sync::Arc;

use filestore_core::config::S3TargetConfig;
use filestore_core::ProviderType;
use object_store::aws::AmazonS3Builder;

use crate::object::ObjectStorageProvider;
use crate::traits::{StorageError, StorageResult};

/// Endpoint URL of an S3-compatible service.
///
/// Connection strings carry a bare host (`minio.local:9000`); the scheme follows the
/// `ssl` flag unless the endpoint already names one.
pub fn endpoint_url(endpoint: &str, use_ssl: bool) -> String {
    if endpoint.contains("://") {
        endpoint.to_string()
    } else if use_ssl {
        format!("https://{}", endpoint)
    } else {
        format!("http://{}", endpoint)
    }
}

impl ObjectStorageProvider {
    /// Amazon S3 (or S3-compatible) provider from a parsed connection string.
    pub fn amazon_s3(config: &S3TargetConfig) -> StorageResult<Self> {
        let endpoint = endpoint_url(&config.endpoint, config.use_ssl);
        let allow_http = endpoint.starts_with("http://");

        let store = AmazonS3Builder::new()
            .with_region(config.region.clone())
            .with_bucket_name(config.bucket.clone())
            .with_access_key_id(config.access_id.clone())
            .with_secret_access_key(config.access_key.clone())
            .with_endpoint(endpoint.clone())
            .with_allow_http(allow_http)
            .with_virtual_hosted_style_request(false)
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        tracing::debug!(
            bucket = %config.bucket,
            region = %config.region,
            endpoint = %endpoint,
            "S3 provider configured"
        );

        Ok(Self::with_store(
            ProviderType::AmazonS3,
            Arc::new(store),
            config.bucket.clone(),
        ))
    }
}
