//! Core of a browser-facing admin tool for S3-compatible buckets: paginated
//! listing with multi-select, bulk mutations, and a virtual folder view over
//! flat keys.

pub mod config;
pub mod config_paths;
pub mod confirm;
pub mod controller;
pub mod download;
pub mod error;
pub mod format;
pub mod model;
pub mod notify;
pub mod settings;
pub mod store;
pub mod tree;
pub mod upload;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

pub use config::AdminConfig;
pub use confirm::{AlwaysConfirm, ConfirmGate, ConfirmOptions, ConfirmVariant, NeverConfirm};
pub use controller::{
    Confirmed, DeleteAllReport, DeleteReport, DownloadReport, FetchOutcome, ListingController,
    ListingOptions, ListingPhase, ListingState, UploadReport,
};
pub use download::{DirectorySink, DownloadSink};
pub use error::{AdminError, AdminResult};
pub use model::{DeleteAllResult, DeleteResult, KeyFailure, ObjectBody, ObjectPage, StoredObject};
pub use notify::{CollectingNotifier, Notice, NoticeVariant, Notifier, TracingNotifier};
pub use settings::ViewSettings;
pub use store::{ObjectStore, S3Store, StoreProfile};
pub use tree::{project, FileNode, FolderNode, Projection, TreeOptions, TreeView, VirtualNode};
pub use upload::UploadFile;

/// Installs a fmt subscriber filtered by `BUCKETVIEW_LOG` (default `info`).
/// Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("BUCKETVIEW_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Controller wired to S3 from `config`, logging notices through `tracing`.
pub fn connect(
    config: &AdminConfig,
    confirm: Arc<dyn ConfirmGate>,
) -> AdminResult<ListingController> {
    config.validate()?;
    let store = S3Store::new(&config.profile)?;
    Ok(ListingController::new(
        Arc::new(store),
        confirm,
        Arc::new(TracingNotifier),
        ListingOptions::from(config),
    ))
}
