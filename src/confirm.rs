//! Confirmation gate consulted before destructive operations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfirmVariant {
    #[default]
    Default,
    Destructive,
}

/// Prompt shown to the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmOptions {
    pub title: Option<String>,
    pub description: String,
    pub confirm_text: String,
    pub cancel_text: String,
    pub variant: ConfirmVariant,
}

impl ConfirmOptions {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            title: None,
            description: description.into(),
            confirm_text: "Continue".to_string(),
            cancel_text: "Cancel".to_string(),
            variant: ConfirmVariant::Default,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn confirm_text(mut self, text: impl Into<String>) -> Self {
        self.confirm_text = text.into();
        self
    }

    pub fn cancel_text(mut self, text: impl Into<String>) -> Self {
        self.cancel_text = text.into();
        self
    }

    pub fn destructive(mut self) -> Self {
        self.variant = ConfirmVariant::Destructive;
        self
    }
}

/// Suspends the caller until the user answers. Resolves exactly once;
/// `false` means the calling operation must stop without side effects.
#[async_trait]
pub trait ConfirmGate: Send + Sync {
    async fn confirm(&self, options: ConfirmOptions) -> bool;
}

/// Accepts every prompt. For scripted or headless use.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysConfirm;

#[async_trait]
impl ConfirmGate for AlwaysConfirm {
    async fn confirm(&self, _options: ConfirmOptions) -> bool {
        true
    }
}

/// Declines every prompt.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeverConfirm;

#[async_trait]
impl ConfirmGate for NeverConfirm {
    async fn confirm(&self, _options: ConfirmOptions) -> bool {
        false
    }
}

pub(crate) fn delete_selected_prompt(count: usize, bucket: &str) -> ConfirmOptions {
    ConfirmOptions::new(format!(
        "Are you sure you want to delete {count} objects from {bucket}?"
    ))
    .title("Delete Objects")
    .confirm_text("Delete")
    .destructive()
}

pub(crate) fn delete_all_warning_prompt(bucket: &str) -> ConfirmOptions {
    ConfirmOptions::new(format!(
        "This will delete ALL objects in bucket \"{bucket}\". This action cannot be undone."
    ))
    .title("Delete All Objects - Warning")
    .confirm_text("Continue")
    .destructive()
}

pub(crate) fn delete_all_final_prompt(bucket: &str) -> ConfirmOptions {
    ConfirmOptions::new(format!(
        "Are you absolutely sure? All data in \"{bucket}\" will be lost forever."
    ))
    .title("Final Confirmation")
    .confirm_text("Delete All")
    .destructive()
}
