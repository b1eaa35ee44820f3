use async_trait::async_trait;
use aws_sdk_s3::{
    config::{Credentials, Region},
    error::DisplayErrorContext,
    primitives::ByteStream,
    types::{Delete, ObjectIdentifier},
    Client as S3Client,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::ObjectStore;
use crate::error::{AdminError, AdminResult};
use crate::model::{
    DeleteAllResult, DeleteResult, KeyFailure, ObjectBody, ObjectPage, StoredObject,
};

/// DeleteObjects accepts at most this many keys per request.
const DELETE_BATCH_LIMIT: usize = 1000;
const DELETE_ALL_PAGE_SIZE: i32 = 1000;
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Connection settings for one S3-compatible endpoint.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreProfile {
    /// `aws`, `r2`, `minio` or `custom`.
    pub provider: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub endpoint: Option<String>,
    pub region: Option<String>,
    /// Reported by `list_buckets` when the credentials may not list buckets.
    pub default_bucket: Option<String>,
}

impl StoreProfile {
    fn region_or_default(&self) -> &str {
        let fallback = if self.provider == "r2" {
            "auto"
        } else {
            "us-east-1"
        };
        self.region
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(fallback)
    }

    fn default_bucket(&self) -> Option<&str> {
        self.default_bucket
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

/// [`ObjectStore`] backed by the AWS SDK.
#[derive(Clone, Debug)]
pub struct S3Store {
    client: S3Client,
    default_bucket: Option<String>,
}

impl S3Store {
    pub fn new(profile: &StoreProfile) -> AdminResult<Self> {
        Ok(Self {
            client: to_s3_client(profile)?,
            default_bucket: profile.default_bucket().map(str::to_string),
        })
    }

    pub fn from_client(client: S3Client, default_bucket: Option<String>) -> Self {
        Self {
            client,
            default_bucket,
        }
    }

    async fn delete_batch(
        &self,
        bucket: &str,
        keys: &[String],
        quiet: bool,
    ) -> AdminResult<DeleteResult> {
        let mut objects = Vec::with_capacity(keys.len());
        for key in keys {
            let object = ObjectIdentifier::builder()
                .key(key.clone())
                .build()
                .map_err(|err| AdminError::store("delete objects", err))?;
            objects.push(object);
        }

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(quiet)
            .build()
            .map_err(|err| AdminError::store("delete objects", err))?;

        let output = self
            .client
            .delete_objects()
            .bucket(bucket.to_string())
            .delete(delete)
            .send()
            .await
            .map_err(|err| AdminError::store("delete objects", DisplayErrorContext(&err)))?;

        Ok(DeleteResult {
            deleted: output
                .deleted()
                .iter()
                .filter_map(|item| item.key().map(str::to_string))
                .collect(),
            errors: output
                .errors()
                .iter()
                .map(|item| KeyFailure {
                    key: item.key().unwrap_or_default().to_string(),
                    reason: item
                        .message()
                        .or(item.code())
                        .unwrap_or("unknown error")
                        .to_string(),
                })
                .collect(),
        })
    }
}

fn to_s3_client(profile: &StoreProfile) -> AdminResult<S3Client> {
    if profile.access_key_id.trim().is_empty() || profile.secret_access_key.trim().is_empty() {
        return Err(AdminError::Config(
            "profile credentials are missing".to_string(),
        ));
    }

    let credentials = Credentials::new(
        profile.access_key_id.clone(),
        profile.secret_access_key.clone(),
        profile.session_token.clone(),
        None,
        "bucketview",
    );

    let mut config_builder = aws_sdk_s3::config::Builder::new()
        .behavior_version_latest()
        .region(Region::new(profile.region_or_default().to_string()))
        .credentials_provider(credentials);

    if let Some(endpoint) = profile
        .endpoint
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        config_builder = config_builder.endpoint_url(endpoint.to_string());
    }

    if matches!(profile.provider.as_str(), "minio" | "custom") {
        config_builder = config_builder.force_path_style(true);
    }

    Ok(S3Client::from_conf(config_builder.build()))
}

fn s3_datetime_to_utc(dt: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    dt.to_millis()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_buckets(&self) -> AdminResult<Vec<String>> {
        match self.client.list_buckets().send().await {
            Ok(output) => Ok(output
                .buckets()
                .iter()
                .filter_map(|bucket| bucket.name().map(str::to_string))
                .collect()),
            Err(err) => {
                if let Some(default_bucket) = self.default_bucket.as_deref() {
                    warn!(
                        error = %DisplayErrorContext(&err),
                        bucket = default_bucket,
                        "bucket listing denied, using configured bucket"
                    );
                    return Ok(vec![default_bucket.to_string()]);
                }
                Err(AdminError::store("list buckets", DisplayErrorContext(&err)))
            }
        }
    }

    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        cursor: Option<&str>,
        page_size: u16,
    ) -> AdminResult<ObjectPage> {
        let mut request = self
            .client
            .list_objects_v2()
            .bucket(bucket.to_string())
            .max_keys(i32::from(page_size));

        if !prefix.is_empty() {
            request = request.prefix(prefix.to_string());
        }
        if let Some(token) = cursor {
            request = request.continuation_token(token.to_string());
        }

        let output = request
            .send()
            .await
            .map_err(|err| AdminError::store("list objects", DisplayErrorContext(&err)))?;

        let items = output
            .contents()
            .iter()
            .map(|item| StoredObject {
                key: item.key().unwrap_or_default().to_string(),
                size: item.size().map(|size| size.max(0) as u64),
                last_modified: item.last_modified().and_then(s3_datetime_to_utc),
            })
            .collect();

        let is_truncated = output.is_truncated().unwrap_or(false);
        let next_cursor = if is_truncated {
            output.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(ObjectPage {
            items,
            next_cursor,
            is_truncated,
        })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> AdminResult<String> {
        let length = bytes.len();
        self.client
            .put_object()
            .bucket(bucket.to_string())
            .key(key.to_string())
            .content_type(content_type.to_string())
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|err| AdminError::store("upload object", DisplayErrorContext(&err)))?;

        debug!(bucket, key, length, "object uploaded");
        Ok(key.to_string())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> AdminResult<ObjectBody> {
        let output = self
            .client
            .get_object()
            .bucket(bucket.to_string())
            .key(key.to_string())
            .send()
            .await
            .map_err(|err| AdminError::store("download object", DisplayErrorContext(&err)))?;

        let content_type = output
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let content_length = output.content_length().map(|len| len.max(0) as u64);

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|err| AdminError::store("download object", err))?
            .into_bytes()
            .to_vec();

        Ok(ObjectBody {
            bytes,
            content_type,
            content_length,
        })
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> AdminResult<DeleteResult> {
        let mut result = DeleteResult::default();
        for chunk in keys.chunks(DELETE_BATCH_LIMIT) {
            let batch = self.delete_batch(bucket, chunk, false).await?;
            result.deleted.extend(batch.deleted);
            result.errors.extend(batch.errors);
        }
        Ok(result)
    }

    async fn delete_all(&self, bucket: &str) -> AdminResult<DeleteAllResult> {
        let mut continuation_token: Option<String> = None;
        let mut deleted: u64 = 0;
        let mut failed: u64 = 0;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(bucket.to_string())
                .max_keys(DELETE_ALL_PAGE_SIZE);

            if let Some(token) = continuation_token.as_deref() {
                request = request.continuation_token(token.to_string());
            }

            let output = request
                .send()
                .await
                .map_err(|err| AdminError::store("delete all objects", DisplayErrorContext(&err)))?;

            let keys: Vec<String> = output
                .contents()
                .iter()
                .filter_map(|item| item.key().map(str::to_string))
                .collect();
            if keys.is_empty() {
                break;
            }

            // Quiet mode only reports failures.
            let batch = self.delete_batch(bucket, &keys, true).await?;
            failed += batch.errors.len() as u64;
            deleted += (keys.len() - batch.errors.len().min(keys.len())) as u64;

            continuation_token = output.next_continuation_token().map(str::to_string);
            if continuation_token.is_none() {
                break;
            }
        }

        if failed > 0 {
            warn!(bucket, deleted, failed, "bucket purge left objects behind");
        } else {
            info!(bucket, deleted, "bucket purged");
        }

        Ok(DeleteAllResult {
            success: failed == 0,
            count: deleted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(provider: &str) -> StoreProfile {
        StoreProfile {
            provider: provider.to_string(),
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "secret".to_string(),
            ..StoreProfile::default()
        }
    }

    #[test]
    fn test_should_default_region_per_provider() {
        assert_eq!(profile("aws").region_or_default(), "us-east-1");
        assert_eq!(profile("r2").region_or_default(), "auto");

        let mut custom = profile("r2");
        custom.region = Some("  eu-west-1 ".to_string());
        assert_eq!(custom.region_or_default(), "eu-west-1");
    }

    #[test]
    fn test_should_reject_missing_credentials() {
        let mut missing = profile("aws");
        missing.secret_access_key = "   ".to_string();
        let err = S3Store::new(&missing).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_should_ignore_blank_default_bucket() {
        let mut blank = profile("minio");
        blank.default_bucket = Some(" ".to_string());
        assert!(blank.default_bucket().is_none());

        blank.default_bucket = Some("photos".to_string());
        assert_eq!(blank.default_bucket(), Some("photos"));
    }
}
