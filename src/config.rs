//! Runtime configuration.
//!
//! Everything is read from `BUCKETVIEW_*` environment variables; the usual
//! `AWS_*` credential variables are honored as fallbacks.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AdminError, AdminResult};
use crate::store::StoreProfile;

pub const DEFAULT_PAGE_SIZE: u16 = 50;
pub const MAX_PAGE_SIZE: u16 = 1000;
pub const DEFAULT_MAX_FOLDER_DEPTH: usize = 3;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminConfig {
    pub profile: StoreProfile,
    /// Objects requested per listing call.
    pub page_size: u16,
    /// Deepest relative upload path, in segments.
    pub max_folder_depth: usize,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            profile: StoreProfile {
                provider: "aws".to_owned(),
                ..StoreProfile::default()
            },
            page_size: DEFAULT_PAGE_SIZE,
            max_folder_depth: DEFAULT_MAX_FOLDER_DEPTH,
        }
    }
}

impl AdminConfig {
    pub fn from_env() -> AdminResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AdminResult<Self> {
        let var = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| lookup(*key))
                .map(|value| value.trim().to_owned())
                .find(|value| !value.is_empty())
        };

        let mut config = Self::default();

        if let Some(v) = var(&["BUCKETVIEW_PROVIDER"]) {
            config.profile.provider = v.to_ascii_lowercase();
        }
        config.profile.access_key_id =
            var(&["BUCKETVIEW_ACCESS_KEY_ID", "AWS_ACCESS_KEY_ID"]).unwrap_or_default();
        config.profile.secret_access_key =
            var(&["BUCKETVIEW_SECRET_ACCESS_KEY", "AWS_SECRET_ACCESS_KEY"]).unwrap_or_default();
        config.profile.session_token = var(&["BUCKETVIEW_SESSION_TOKEN", "AWS_SESSION_TOKEN"]);
        config.profile.endpoint = var(&["BUCKETVIEW_ENDPOINT"]);
        config.profile.region = var(&["BUCKETVIEW_REGION", "AWS_REGION"]);
        config.profile.default_bucket = var(&["BUCKETVIEW_BUCKET"]);

        if let Some(v) = var(&["BUCKETVIEW_PAGE_SIZE"]) {
            config.page_size = v
                .parse()
                .map_err(|_| AdminError::Config(format!("invalid page size: {v}")))?;
        }
        if let Some(v) = var(&["BUCKETVIEW_MAX_FOLDER_DEPTH"]) {
            config.max_folder_depth = v
                .parse()
                .map_err(|_| AdminError::Config(format!("invalid max folder depth: {v}")))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AdminResult<()> {
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(AdminError::Config(format!(
                "page size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }
        if self.max_folder_depth == 0 {
            return Err(AdminError::Config(
                "max folder depth must be at least 1".to_owned(),
            ));
        }
        if let Some(endpoint) = self.profile.endpoint.as_deref() {
            let url = Url::parse(endpoint)
                .map_err(|err| AdminError::Config(format!("invalid endpoint {endpoint}: {err}")))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(AdminError::Config(format!(
                    "endpoint must use http or https: {endpoint}"
                )));
            }
        }
        if !matches!(
            self.profile.provider.as_str(),
            "aws" | "r2" | "minio" | "custom"
        ) {
            return Err(AdminError::Config(format!(
                "unknown provider: {}",
                self.profile.provider
            )));
        }
        Ok(())
    }
}
