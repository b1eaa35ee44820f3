//! Paginated listing, multi-select and mutations for one selected bucket.
//!
//! State lives behind a mutex that is never held across an `.await`, so the
//! futures returned here may interleave on one task. Each bucket selection
//! opens a new session; every operation captures the session it started in
//! and leaves the state alone if the session changed while it was waiting on
//! the store.

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{AdminConfig, DEFAULT_MAX_FOLDER_DEPTH, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::confirm::{
    delete_all_final_prompt, delete_all_warning_prompt, delete_selected_prompt, ConfirmGate,
};
use crate::download::{suggested_file_name, DownloadSink};
use crate::error::{AdminError, AdminResult};
use crate::model::{KeyFailure, StoredObject};
use crate::notify::{Notice, Notifier};
use crate::store::ObjectStore;
use crate::tree::{normalize_prefix, DEFAULT_SEPARATOR};
use crate::upload::{destination_key, validate_queue, UploadFile};

/// Everything the presentation layer renders for the current bucket.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingState {
    pub buckets: Vec<String>,
    pub bucket: Option<String>,
    /// Page arrival order, keys unique.
    pub objects: Vec<StoredObject>,
    /// Always a subset of the keys in `objects`.
    pub selected_keys: BTreeSet<String>,
    pub cursor: Option<String>,
    pub has_more: bool,
    pub loading: bool,
    /// The outstanding fetch replaces the listing instead of appending.
    pub loading_reset: bool,
    pub deleting: bool,
    pub uploading: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ListingPhase {
    Idle,
    Loading,
    LoadingMore,
    Busy,
    Ready,
}

impl ListingState {
    pub fn phase(&self) -> ListingPhase {
        if self.bucket.is_none() {
            ListingPhase::Idle
        } else if self.loading && self.loading_reset {
            ListingPhase::Loading
        } else if self.loading {
            ListingPhase::LoadingMore
        } else if self.deleting || self.uploading {
            ListingPhase::Busy
        } else {
            ListingPhase::Ready
        }
    }

    pub fn is_selected(&self, key: &str) -> bool {
        self.selected_keys.contains(key)
    }

    /// Selected keys in listing order.
    pub fn selected_in_order(&self) -> Vec<String> {
        self.objects
            .iter()
            .filter(|object| self.selected_keys.contains(&object.key))
            .map(|object| object.key.clone())
            .collect()
    }

    fn contains_key(&self, key: &str) -> bool {
        self.objects.iter().any(|object| object.key == key)
    }

    fn reset_for(&mut self, bucket: Option<String>) {
        self.bucket = bucket;
        self.objects.clear();
        self.selected_keys.clear();
        self.cursor = None;
        self.has_more = true;
        self.loading = false;
        self.loading_reset = false;
        self.deleting = false;
        self.uploading = false;
    }

    fn apply_page(&mut self, items: Vec<StoredObject>, next_cursor: Option<String>, reset: bool) {
        if reset {
            self.objects.clear();
        }
        let mut seen: HashSet<String> = self.objects.iter().map(|o| o.key.clone()).collect();
        for item in items {
            if seen.insert(item.key.clone()) {
                self.objects.push(item);
            }
        }
        if reset {
            let objects = &self.objects;
            self.selected_keys
                .retain(|key| objects.iter().any(|object| &object.key == key));
        }
        self.has_more = next_cursor.is_some();
        self.cursor = next_cursor;
    }

    fn remove_keys(&mut self, keys: &HashSet<&str>) {
        self.objects
            .retain(|object| !keys.contains(object.key.as_str()));
        self.selected_keys.retain(|key| !keys.contains(key.as_str()));
    }
}

/// Tunables for the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListingOptions {
    pub page_size: u16,
    pub max_folder_depth: usize,
}

impl Default for ListingOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_folder_depth: DEFAULT_MAX_FOLDER_DEPTH,
        }
    }
}

impl From<&AdminConfig> for ListingOptions {
    fn from(config: &AdminConfig) -> Self {
        Self {
            page_size: config.page_size,
            max_folder_depth: config.max_folder_depth,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    Loaded { count: usize, has_more: bool },
    /// No bucket selected; nothing was requested.
    NoBucket,
    /// A fetch of this session is still outstanding.
    Busy,
    /// Every page has been loaded already.
    Exhausted,
    /// The bucket changed or a reset fetch superseded this one while the
    /// page was in flight; the page was dropped.
    Stale,
}

/// Result of an operation guarded by the confirmation gate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Confirmed<T> {
    Cancelled,
    Done(T),
}

impl<T> Confirmed<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Confirmed::Cancelled)
    }

    pub fn done(self) -> Option<T> {
        match self {
            Confirmed::Done(value) => Some(value),
            Confirmed::Cancelled => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeleteReport {
    pub deleted: Vec<String>,
    pub failed: Vec<KeyFailure>,
    /// A fresh first page was requested because the view emptied.
    pub refetched: bool,
}

impl DeleteReport {
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeleteAllReport {
    pub count: u64,
    pub complete: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadReport {
    pub keys: Vec<String>,
    /// `"<prefix> folder"`, or the bucket name at the root.
    pub destination: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub saved: Vec<String>,
    pub failed: Vec<KeyFailure>,
}

#[derive(Debug, Default)]
struct Inner {
    state: ListingState,
    session: u64,
    /// Bumped by every fetch; only the latest may apply its page.
    fetch_generation: u64,
}

pub struct ListingController {
    store: Arc<dyn ObjectStore>,
    confirm: Arc<dyn ConfirmGate>,
    notifier: Arc<dyn Notifier>,
    options: ListingOptions,
    inner: Mutex<Inner>,
}

impl ListingController {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        confirm: Arc<dyn ConfirmGate>,
        notifier: Arc<dyn Notifier>,
        options: ListingOptions,
    ) -> Self {
        let options = ListingOptions {
            page_size: options.page_size.clamp(1, MAX_PAGE_SIZE),
            max_folder_depth: options.max_folder_depth.max(1),
        };
        Self {
            store,
            confirm,
            notifier,
            options,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn options(&self) -> ListingOptions {
        self.options
    }

    pub fn snapshot(&self) -> ListingState {
        self.lock().state.clone()
    }

    pub fn bucket(&self) -> Option<String> {
        self.lock().state.bucket.clone()
    }

    pub fn objects(&self) -> Vec<StoredObject> {
        self.lock().state.objects.clone()
    }

    pub fn selected_keys(&self) -> BTreeSet<String> {
        self.lock().state.selected_keys.clone()
    }

    pub fn has_more(&self) -> bool {
        self.lock().state.has_more
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` only if `session` is still current.
    fn in_session<R>(&self, session: u64, f: impl FnOnce(&mut ListingState) -> R) -> Option<R> {
        let mut inner = self.lock();
        if inner.session == session {
            Some(f(&mut inner.state))
        } else {
            None
        }
    }

    /// Like [`Self::in_session`], additionally requiring that no later fetch
    /// started.
    fn in_fetch<R>(
        &self,
        session: u64,
        generation: u64,
        f: impl FnOnce(&mut ListingState) -> R,
    ) -> Option<R> {
        let mut inner = self.lock();
        if inner.session == session && inner.fetch_generation == generation {
            Some(f(&mut inner.state))
        } else {
            None
        }
    }

    /// Reset fetch owed after a mutation. Returns whether the fresh first
    /// page was applied.
    async fn reload(&self, after: &'static str) -> bool {
        match self.fetch_page(true).await {
            Ok(FetchOutcome::Loaded { .. }) => true,
            Ok(outcome) => {
                debug!(after, ?outcome, "reload did not apply");
                false
            }
            Err(err) => {
                warn!(after, error = %err, "reload failed");
                false
            }
        }
    }

    fn fail<T>(&self, message: impl Into<String>, err: AdminError) -> AdminResult<T> {
        warn!(error = %err, "operation failed");
        self.notifier.notify(Notice::error(message));
        Err(err)
    }

    fn require_bucket(&self) -> AdminResult<(String, u64)> {
        let inner = self.lock();
        match inner.state.bucket.clone() {
            Some(bucket) => Ok((bucket, inner.session)),
            None => Err(AdminError::NoBucket),
        }
    }

    /// Loads the bucket list and selects the first bucket if none is active.
    pub async fn load_buckets(&self) -> AdminResult<Vec<String>> {
        let buckets = match self.store.list_buckets().await {
            Ok(buckets) => buckets,
            Err(err) => return self.fail("Failed to load buckets. Check your credentials.", err),
        };
        info!(count = buckets.len(), "buckets loaded");

        let first = {
            let mut inner = self.lock();
            inner.state.buckets = buckets.clone();
            match inner.state.bucket {
                None => buckets.first().cloned(),
                Some(_) => None,
            }
        };
        if let Some(first) = first {
            self.select_bucket(first).await?;
        }
        Ok(buckets)
    }

    /// Switches buckets: clears everything synchronously, then loads the
    /// first page. An empty name deselects.
    pub async fn select_bucket(&self, name: impl Into<String>) -> AdminResult<FetchOutcome> {
        let name = name.into();
        let bucket = (!name.trim().is_empty()).then_some(name);
        {
            let mut inner = self.lock();
            inner.session += 1;
            inner.state.reset_for(bucket.clone());
        }
        debug!(bucket = ?bucket, "bucket selected");
        self.fetch_page(true).await
    }

    /// Loads the first page (`reset`) or the page after the stored cursor.
    ///
    /// Appends are single-flight and return `Busy` while any fetch is
    /// outstanding. A reset always starts, and the fetch it overlaps ends
    /// up `Stale`.
    pub async fn fetch_page(&self, reset: bool) -> AdminResult<FetchOutcome> {
        let (bucket, cursor, session, generation, reset) = {
            let mut inner = self.lock();
            let Some(bucket) = inner.state.bucket.clone() else {
                return Ok(FetchOutcome::NoBucket);
            };
            if inner.state.loading && !reset {
                return Ok(FetchOutcome::Busy);
            }
            let reset = reset || (inner.state.cursor.is_none() && inner.state.objects.is_empty());
            if !reset && inner.state.cursor.is_none() {
                return Ok(FetchOutcome::Exhausted);
            }
            inner.fetch_generation += 1;
            inner.state.loading = true;
            inner.state.loading_reset = reset;
            let cursor = if reset {
                None
            } else {
                inner.state.cursor.clone()
            };
            (bucket, cursor, inner.session, inner.fetch_generation, reset)
        };

        let result = self
            .store
            .list_page(&bucket, "", cursor.as_deref(), self.options.page_size)
            .await;

        let applied = self.in_fetch(session, generation, |state| {
            state.loading = false;
            state.loading_reset = false;
            match result {
                Ok(page) => {
                    let count = page.items.len();
                    state.apply_page(page.items, page.next_cursor, reset);
                    Ok(FetchOutcome::Loaded {
                        count,
                        has_more: state.has_more,
                    })
                }
                Err(err) => Err(err),
            }
        });

        match applied {
            None => {
                debug!(bucket = %bucket, reset, "dropping superseded page");
                Ok(FetchOutcome::Stale)
            }
            Some(Ok(outcome)) => {
                debug!(bucket = %bucket, reset, ?outcome, "page loaded");
                Ok(outcome)
            }
            Some(Err(err)) => self.fail("Failed to load objects.", err),
        }
    }

    /// Flips selection of a loaded key. Returns whether it is now selected.
    pub fn toggle_select(&self, key: &str) -> bool {
        let mut inner = self.lock();
        let state = &mut inner.state;
        if state.selected_keys.remove(key) {
            return false;
        }
        if state.contains_key(key) {
            state.selected_keys.insert(key.to_string());
            true
        } else {
            false
        }
    }

    /// Selects every loaded key, or clears the selection if all already are.
    pub fn toggle_select_all(&self) {
        let mut inner = self.lock();
        let state = &mut inner.state;
        let all_selected = !state.objects.is_empty()
            && state
                .objects
                .iter()
                .all(|object| state.selected_keys.contains(&object.key));
        if all_selected {
            state.selected_keys.clear();
        } else {
            state.selected_keys = state.objects.iter().map(|o| o.key.clone()).collect();
        }
    }

    /// Select-all restricted to `keys`, e.g. the files visible at the
    /// current folder. Selections outside `keys` are left alone.
    pub fn toggle_select_visible(&self, keys: &[String]) {
        let mut inner = self.lock();
        let state = &mut inner.state;
        let visible: Vec<&String> = keys.iter().filter(|key| state.contains_key(key)).collect();
        if visible.is_empty() {
            return;
        }
        if visible.iter().all(|key| state.selected_keys.contains(*key)) {
            for key in visible {
                state.selected_keys.remove(key);
            }
        } else {
            state
                .selected_keys
                .extend(visible.into_iter().cloned());
        }
    }

    pub fn clear_selection(&self) {
        self.lock().state.selected_keys.clear();
    }

    /// Deletes the selected keys in one bulk request after confirmation.
    pub async fn delete_selected(&self) -> AdminResult<Confirmed<DeleteReport>> {
        let (bucket, keys) = {
            let inner = self.lock();
            let Some(bucket) = inner.state.bucket.clone() else {
                return Err(AdminError::NoBucket);
            };
            let keys = inner.state.selected_in_order();
            if keys.is_empty() {
                return Err(AdminError::NoKeys);
            }
            if inner.state.deleting {
                return Err(AdminError::Busy("delete"));
            }
            (bucket, keys)
        };

        if !self
            .confirm
            .confirm(delete_selected_prompt(keys.len(), &bucket))
            .await
        {
            return Ok(Confirmed::Cancelled);
        }

        let session = self.begin_delete(&bucket)?;
        let result = self.store.delete_objects(&bucket, &keys).await;

        let outcome = self.in_session(session, |state| {
            state.deleting = false;
            if let Ok(result) = &result {
                let deleted: HashSet<&str> = result.deleted.iter().map(String::as_str).collect();
                state.remove_keys(&deleted);
            }
            state.objects.is_empty() && state.has_more
        });

        let result = match result {
            Ok(result) => result,
            Err(err) => return self.fail("Failed to delete selected objects.", err),
        };

        let deleted = result.deleted.len();
        let failed = result.errors.len();
        if failed == 0 {
            info!(bucket = %bucket, deleted, "objects deleted");
            self.notifier
                .notify(Notice::success(format!("Deleted {deleted} objects from {bucket}")));
        } else if deleted == 0 {
            warn!(bucket = %bucket, failed, "no objects deleted");
            self.notifier.notify(Notice::error(format!(
                "Failed to delete {failed} objects from {bucket}"
            )));
        } else {
            warn!(bucket = %bucket, deleted, failed, "objects partially deleted");
            self.notifier.notify(Notice::warning(format!(
                "Deleted {deleted} objects from {bucket}; {failed} failed"
            )));
        }

        let refetched = outcome == Some(true) && self.reload("delete").await;

        Ok(Confirmed::Done(DeleteReport {
            deleted: result.deleted,
            failed: result.errors,
            refetched,
        }))
    }

    /// Deletes every object in the bucket after two confirmations.
    pub async fn delete_all_in_bucket(&self) -> AdminResult<Confirmed<DeleteAllReport>> {
        let (bucket, _) = self.require_bucket()?;
        if self.lock().state.deleting {
            return Err(AdminError::Busy("delete"));
        }

        if !self.confirm.confirm(delete_all_warning_prompt(&bucket)).await {
            return Ok(Confirmed::Cancelled);
        }
        if !self.confirm.confirm(delete_all_final_prompt(&bucket)).await {
            return Ok(Confirmed::Cancelled);
        }

        let session = self.begin_delete(&bucket)?;
        let result = self.store.delete_all(&bucket).await;
        let current = self
            .in_session(session, |state| state.deleting = false)
            .is_some();

        let result = match result {
            Ok(result) => result,
            Err(err) => return self.fail("Failed to delete all objects.", err),
        };

        if result.success {
            self.notifier.notify(Notice::success(format!(
                "All objects deleted successfully from {bucket}"
            )));
        } else {
            self.notifier.notify(Notice::warning(format!(
                "Deleted {} objects from {bucket}, but some could not be deleted",
                result.count
            )));
        }

        if current {
            self.reload("purge").await;
        }

        Ok(Confirmed::Done(DeleteAllReport {
            count: result.count,
            complete: result.success,
        }))
    }

    fn begin_delete(&self, bucket: &str) -> AdminResult<u64> {
        let mut inner = self.lock();
        if inner.state.bucket.as_deref() != Some(bucket) {
            return Err(AdminError::Config(format!(
                "bucket changed before deleting from {bucket}"
            )));
        }
        if inner.state.deleting {
            return Err(AdminError::Busy("delete"));
        }
        inner.state.deleting = true;
        Ok(inner.session)
    }

    /// Uploads `files` one after another under `prefix`. The first failure
    /// stops the queue.
    pub async fn upload_files(
        &self,
        files: Vec<UploadFile>,
        prefix: &str,
    ) -> AdminResult<UploadReport> {
        let (bucket, _) = self.require_bucket()?;
        if files.is_empty() {
            return Err(AdminError::NoFiles);
        }
        let prefix = normalize_prefix(prefix, DEFAULT_SEPARATOR);
        if let Err(err) = validate_queue(&files, self.options.max_folder_depth) {
            let message = format!("Cannot upload files: {err}");
            return self.fail(message, err);
        }

        let session = {
            let mut inner = self.lock();
            if inner.state.uploading {
                return Err(AdminError::Busy("upload"));
            }
            inner.state.uploading = true;
            inner.session
        };

        let total = files.len();
        let mut keys = Vec::with_capacity(total);
        for file in files {
            let key = destination_key(&prefix, &file);
            let content_type = file.content_type();
            match self
                .store
                .put_object(&bucket, &key, file.bytes, &content_type)
                .await
            {
                Ok(stored) => keys.push(stored),
                Err(err) => {
                    self.in_session(session, |state| state.uploading = false);
                    let uploaded = keys.len();
                    let message = format!(
                        "Failed to upload files. {uploaded} of {total} uploaded before {key} failed."
                    );
                    let err = AdminError::UploadAborted {
                        uploaded,
                        total,
                        key,
                        message: err.to_string(),
                    };
                    return self.fail(message, err);
                }
            }
        }

        let current = self
            .in_session(session, |state| state.uploading = false)
            .is_some();

        let destination = if prefix.is_empty() {
            bucket.clone()
        } else {
            format!("{prefix} folder")
        };
        info!(bucket = %bucket, count = keys.len(), destination = %destination, "files uploaded");
        self.notifier.notify(Notice::success(format!(
            "Uploaded {} files to {destination}",
            keys.len()
        )));

        if current {
            self.reload("upload").await;
        }

        Ok(UploadReport { keys, destination })
    }

    /// Hands every selected object to `sink`. One failure does not stop the
    /// others.
    pub async fn download_selected(&self, sink: &dyn DownloadSink) -> AdminResult<DownloadReport> {
        let (bucket, keys) = {
            let inner = self.lock();
            let Some(bucket) = inner.state.bucket.clone() else {
                return Err(AdminError::NoBucket);
            };
            (bucket, inner.state.selected_in_order())
        };
        if keys.is_empty() {
            return Err(AdminError::NoKeys);
        }

        let mut report = DownloadReport::default();
        for key in keys {
            let saved = match self.store.get_object(&bucket, &key).await {
                Ok(body) => sink.save(suggested_file_name(&key), body).await,
                Err(err) => Err(err),
            };
            match saved {
                Ok(()) => report.saved.push(key),
                Err(err) => {
                    warn!(bucket = %bucket, key = %key, error = %err, "download failed");
                    report.failed.push(KeyFailure {
                        key,
                        reason: err.to_string(),
                    });
                }
            }
        }

        if !report.failed.is_empty() {
            self.notifier.notify(Notice::error(format!(
                "Failed to download {} of {} files.",
                report.failed.len(),
                report.failed.len() + report.saved.len()
            )));
        }
        Ok(report)
    }
}

impl std::fmt::Debug for ListingController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListingController")
            .field("options", &self.options)
            .field("state", &self.lock().state)
            .finish()
    }
}
