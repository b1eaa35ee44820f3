//! User-visible, non-blocking notifications.

use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

const AUTO_DISMISS_AFTER: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NoticeVariant {
    Success,
    Info,
    Warning,
    Destructive,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub id: Uuid,
    pub title: Option<String>,
    pub message: String,
    pub variant: NoticeVariant,
    /// `None` keeps the notice until the user dismisses it.
    pub auto_dismiss: Option<Duration>,
}

impl Notice {
    pub fn new(variant: NoticeVariant, message: impl Into<String>) -> Self {
        let auto_dismiss = match variant {
            NoticeVariant::Destructive => None,
            _ => Some(AUTO_DISMISS_AFTER),
        };
        Self {
            id: Uuid::new_v4(),
            title: None,
            message: message.into(),
            variant,
            auto_dismiss,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeVariant::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeVariant::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeVariant::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeVariant::Destructive, message)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Receives notices produced by controller operations.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the `tracing` subscriber.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.variant {
            NoticeVariant::Destructive => tracing::error!(id = %notice.id, "{}", notice.message),
            NoticeVariant::Warning => tracing::warn!(id = %notice.id, "{}", notice.message),
            NoticeVariant::Success | NoticeVariant::Info => {
                tracing::info!(id = %notice.id, "{}", notice.message)
            }
        }
    }
}

/// Keeps notices in memory until drained.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<Notice> {
        match self.notices.lock() {
            Ok(mut notices) => std::mem::take(&mut *notices),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn dismiss(&self, id: Uuid) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.retain(|notice| notice.id != id);
        }
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, notice: Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice);
        }
    }
}
