use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use crate::config::get_config;
use crate::error::AppError;

#[derive(Clone)]
pub struct StorageService {
    client: Client,
    pub bucket_name: String,
}

impl StorageService {
    pub async fn new() -> Self {
        let config = get_config();

        let credentials = aws_sdk_s3::config::Credentials::new(
            config.aws_access_key_id.clone(),
            config.aws_secret_access_key.clone(),
            None,
            None,
            "manual_config",
        );

        let region = aws_sdk_s3::config::Region::new(config.aws_region.clone());

        let mut s3_config_builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .region(region)
            .credentials_provider(credentials);

        if let Some(endpoint) = &config.s3_endpoint {
            s3_config_builder = s3_config_builder
                .endpoint_url(endpoint)
                .force_path_style(true);
        }

        let client = Client::from_conf(s3_config_builder.build());

        Self {
            client,
            bucket_name: config.s3_bucket_name.clone(),
        }
    }

    pub async fn put_object(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("storage upload failed for {}: {:?}", key, e);
                AppError::DependencyFailed(format!("Failed to upload object: {}", e))
            })?;

        Ok(())
    }

    pub async fn delete_object(&self, key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("storage delete failed for {}: {}", key, e);
                AppError::DependencyFailed("Failed to delete object".to_string())
            })?;

        Ok(())
    }

    /// Best-effort cleanup of a media row's objects. Failures are logged
    /// and never propagated; the database delete proceeds regardless.
    pub async fn delete_media_objects(&self, storage_key: &str, thumbnail_key: Option<&str>) {
        if let Err(e) = self.delete_object(storage_key).await {
            tracing::warn!("leaving orphaned media object {}: {:?}", storage_key, e);
        }
        if let Some(thumb) = thumbnail_key {
            if let Err(e) = self.delete_object(thumb).await {
                tracing::warn!("leaving orphaned thumbnail {}: {:?}", thumb, e);
            }
        }
    }

    pub async fn get_presigned_url(
        &self,
        key: &str,
        expires_in: std::time::Duration,
    ) -> Result<String, AppError> {
        let presigning_config = aws_sdk_s3::presigning::PresigningConfig::expires_in(expires_in)
            .map_err(|e| {
                tracing::error!("presigning config error: {}", e);
                AppError::InternalServerError("Failed to configure presigner".to_string())
            })?;

        let presigned_req = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .presigned(presigning_config)
            .await
            .map_err(|e| {
                tracing::error!("presigning error: {}", e);
                AppError::DependencyFailed("Failed to generate presigned URL".to_string())
            })?;

        Ok(presigned_req.uri().to_string())
    }
}
