//! Object store capability consumed by the listing controller.

mod s3;

pub use s3::{S3Store, StoreProfile};

use async_trait::async_trait;

use crate::error::AdminResult;
use crate::model::{DeleteAllResult, DeleteResult, ObjectBody, ObjectPage};

/// Operations the controller needs from an S3-compatible store.
///
/// Implementations report transport and permission failures as
/// [`crate::AdminError::Store`]; per-key delete failures are returned inside
/// [`DeleteResult`] instead.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_buckets(&self) -> AdminResult<Vec<String>>;

    /// Lists at most `page_size` objects under `prefix`, resuming at `cursor`.
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        cursor: Option<&str>,
        page_size: u16,
    ) -> AdminResult<ObjectPage>;

    /// Writes `bytes` under `key`, overwriting any existing object.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> AdminResult<String>;

    async fn get_object(&self, bucket: &str, key: &str) -> AdminResult<ObjectBody>;

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> AdminResult<DeleteResult>;

    /// Deletes every object of `bucket`, paging server side.
    async fn delete_all(&self, bucket: &str) -> AdminResult<DeleteAllResult>;
}
