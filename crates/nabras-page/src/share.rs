//! Share and copy actions.
//!
//! Native sharing is preferred; without it the link goes to the clipboard.

use async_trait::async_trait;
use nabras_common::NabrasError;
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::toast::{ToastKind, ToastManager};
use crate::PageError;

const SITE_TITLE: &str = "الأربعون النووية";

/// Native share sheet failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShareError {
    /// The visitor dismissed the share sheet.
    #[error("Share aborted")]
    Aborted,

    #[error("Share failed: {0}")]
    Failed(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Clipboard write failed: {0}")]
pub struct ClipboardError(pub String);

/// What gets shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePayload {
    pub title: String,
    pub url: Url,
}

impl SharePayload {
    pub fn new(title: impl Into<String>, url: Url) -> Self {
        Self {
            title: title.into(),
            url,
        }
    }

    /// Payload for a hadith page on `origin`.
    pub fn for_hadith(origin: &Url, id: u32, title: &str) -> Result<Self, PageError> {
        let url = origin.join(&format!("/hadith/{}", id)).map_err(|e| {
            NabrasError::config_with_source(format!("cannot build hadith URL on {}", origin), e)
        })?;
        Ok(Self {
            title: format!("{} - {}", title, SITE_TITLE),
            url,
        })
    }
}

/// A native share sheet.
#[async_trait]
pub trait ShareTarget: Send + Sync {
    async fn share(&self, payload: &SharePayload) -> Result<(), ShareError>;
}

/// The system clipboard.
#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Result of a share action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareOutcome {
    Shared,
    Aborted,
    ShareFailed,
    Copied,
    CopyFailed,
}

/// Share `payload` natively when `target` exists, otherwise copy its URL.
///
/// Only the clipboard path shows toasts.
pub async fn share_or_copy(
    payload: &SharePayload,
    target: Option<&dyn ShareTarget>,
    clipboard: &dyn Clipboard,
    toasts: &mut ToastManager,
) -> ShareOutcome {
    if let Some(target) = target {
        return match target.share(payload).await {
            Ok(()) => ShareOutcome::Shared,
            Err(ShareError::Aborted) => {
                debug!(url = %payload.url, "Share dismissed");
                ShareOutcome::Aborted
            }
            Err(e) => {
                error!(url = %payload.url, error = %e, "Error sharing");
                ShareOutcome::ShareFailed
            }
        };
    }

    match clipboard.write_text(payload.url.as_str()).await {
        Ok(()) => {
            toasts.show("تم نسخ الرابط إلى الحافظة", ToastKind::Success);
            ShareOutcome::Copied
        }
        Err(e) => {
            debug!(error = %e, "Link copy failed");
            toasts.show("فشل نسخ الرابط", ToastKind::Error);
            ShareOutcome::CopyFailed
        }
    }
}

/// Copy arbitrary text and toast the result.
pub async fn copy_text(text: &str, clipboard: &dyn Clipboard, toasts: &mut ToastManager) -> bool {
    match clipboard.write_text(text).await {
        Ok(()) => {
            toasts.show("تم نسخ النص بنجاح", ToastKind::Success);
            true
        }
        Err(e) => {
            debug!(error = %e, "Text copy failed");
            toasts.show("فشل نسخ النص", ToastKind::Error);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeClipboard {
        broken: bool,
        contents: Mutex<Option<String>>,
    }

    #[async_trait]
    impl Clipboard for FakeClipboard {
        async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
            if self.broken {
                return Err(ClipboardError("permission denied".to_string()));
            }
            *self.contents.lock().unwrap() = Some(text.to_string());
            Ok(())
        }
    }

    struct FakeShare(Result<(), ShareError>);

    #[async_trait]
    impl ShareTarget for FakeShare {
        async fn share(&self, _payload: &SharePayload) -> Result<(), ShareError> {
            self.0.clone()
        }
    }

    fn payload() -> SharePayload {
        let origin = Url::parse("https://nibras-hadith.onrender.com").unwrap();
        SharePayload::for_hadith(&origin, 7, "الدين النصيحة").unwrap()
    }

    #[test]
    fn test_hadith_payload() {
        let payload = payload();
        assert_eq!(payload.title, "الدين النصيحة - الأربعون النووية");
        assert_eq!(
            payload.url.as_str(),
            "https://nibras-hadith.onrender.com/hadith/7"
        );
    }

    #[tokio::test]
    async fn test_native_share_is_silent() {
        let clipboard = FakeClipboard::default();
        let mut toasts = ToastManager::new();

        let shared = FakeShare(Ok(()));
        let target: &dyn ShareTarget = &shared;
        let outcome = share_or_copy(&payload(), Some(target), &clipboard, &mut toasts).await;
        assert_eq!(outcome, ShareOutcome::Shared);

        let aborted = FakeShare(Err(ShareError::Aborted));
        let target: &dyn ShareTarget = &aborted;
        let outcome = share_or_copy(&payload(), Some(target), &clipboard, &mut toasts).await;
        assert_eq!(outcome, ShareOutcome::Aborted);

        let failed = FakeShare(Err(ShareError::Failed("no targets".to_string())));
        let target: &dyn ShareTarget = &failed;
        let outcome = share_or_copy(&payload(), Some(target), &clipboard, &mut toasts).await;
        assert_eq!(outcome, ShareOutcome::ShareFailed);

        assert!(toasts.active().is_empty());
        assert!(clipboard.contents.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_falls_back_to_clipboard() {
        let clipboard = FakeClipboard::default();
        let mut toasts = ToastManager::new();

        let outcome = share_or_copy(&payload(), None, &clipboard, &mut toasts).await;
        assert_eq!(outcome, ShareOutcome::Copied);
        assert_eq!(
            clipboard.contents.lock().unwrap().as_deref(),
            Some("https://nibras-hadith.onrender.com/hadith/7")
        );
        let toast = toasts.latest().unwrap();
        assert_eq!(toast.message, "تم نسخ الرابط إلى الحافظة");
        assert_eq!(toast.kind, ToastKind::Success);
    }

    #[tokio::test]
    async fn test_clipboard_failure_toasts_error() {
        let clipboard = FakeClipboard {
            broken: true,
            ..Default::default()
        };
        let mut toasts = ToastManager::new();

        let outcome = share_or_copy(&payload(), None, &clipboard, &mut toasts).await;
        assert_eq!(outcome, ShareOutcome::CopyFailed);
        assert_eq!(toasts.latest().unwrap().message, "فشل نسخ الرابط");

        assert!(!copy_text("نص", &clipboard, &mut toasts).await);
        assert_eq!(toasts.latest().unwrap().message, "فشل نسخ النص");
        assert_eq!(toasts.latest().unwrap().kind, ToastKind::Error);
    }

    #[tokio::test]
    async fn test_copy_text() {
        let clipboard = FakeClipboard::default();
        let mut toasts = ToastManager::new();

        assert!(copy_text("إنما الأعمال بالنيات", &clipboard, &mut toasts).await);
        assert_eq!(
            clipboard.contents.lock().unwrap().as_deref(),
            Some("إنما الأعمال بالنيات")
        );
        assert_eq!(toasts.latest().unwrap().message, "تم نسخ النص بنجاح");
    }
}
