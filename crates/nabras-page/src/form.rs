//! Comment form submit flow.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use http::StatusCode;
use tracing::{info, warn};

use crate::comments::{CommentClient, CommentSubmission, CommentThread};
use crate::render::CommentContainer;
use crate::toast::{ToastKind, ToastManager};

const SENDING_LABEL: &str = "جارٍ الإرسال...";
const POSTED: &str = "شكراً لمشاركتك! تم نشر تأملك";
const REJECTED: &str = "حدث خطأ في إضافة التعليق";
const CONNECTION_FAILED: &str = "حدث خطأ في الاتصال";

/// How a submission ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Accepted; the form was reset and the list reloaded.
    Posted,
    /// The server answered with a non-success status.
    Rejected(StatusCode),
    /// No answer at all.
    Failed,
}

/// Whether a form's submit button is disabled. Clones share the flag, so a
/// handle taken before `submit` sees the request in flight.
#[derive(Debug, Clone, Default)]
pub struct SubmitState(Arc<AtomicBool>);

impl SubmitState {
    pub fn is_submitting(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn set(&self, submitting: bool) {
        self.0.store(submitting, Ordering::SeqCst);
    }
}

/// State of a comment form and its submit button.
#[derive(Debug)]
pub struct CommentForm {
    thread: CommentThread,
    pub name: String,
    pub email: String,
    pub comment: String,
    submitting: SubmitState,
    button_label: String,
}

impl CommentForm {
    pub fn new(thread: CommentThread, button_label: impl Into<String>) -> Self {
        Self {
            thread,
            name: String::new(),
            email: String::new(),
            comment: String::new(),
            submitting: SubmitState::default(),
            button_label: button_label.into(),
        }
    }

    /// Set every field at once.
    pub fn fill(
        &mut self,
        name: impl Into<String>,
        email: impl Into<String>,
        comment: impl Into<String>,
    ) {
        self.name = name.into();
        self.email = email.into();
        self.comment = comment.into();
    }

    pub fn thread(&self) -> CommentThread {
        self.thread
    }

    /// Whether the submit button is disabled.
    pub fn is_submitting(&self) -> bool {
        self.submitting.is_submitting()
    }

    /// A handle on the submit button's disabled flag.
    pub fn submit_state(&self) -> SubmitState {
        self.submitting.clone()
    }

    pub fn button_label(&self) -> &str {
        &self.button_label
    }

    pub fn submission(&self) -> CommentSubmission {
        CommentSubmission::new(&self.name, &self.email, &self.comment)
    }

    /// Clear every field.
    pub fn reset(&mut self) {
        self.name.clear();
        self.email.clear();
        self.comment.clear();
    }

    /// Post the form once, then reload `container` on success.
    ///
    /// The button is disabled and relabelled while the POST is in flight and
    /// restored whatever the outcome.
    pub async fn submit(
        &mut self,
        client: &CommentClient,
        container: &mut CommentContainer,
        toasts: &mut ToastManager,
    ) -> SubmitOutcome {
        let idle_label = std::mem::replace(&mut self.button_label, SENDING_LABEL.to_string());
        self.submitting.set(true);

        let outcome = match client.submit(self.thread, &self.submission()).await {
            Ok(status) if status.is_success() => {
                info!(thread = ?self.thread, %status, "Comment posted");
                toasts.show(POSTED, ToastKind::Success);
                self.reset();
                // A failed reload already shows its message in the container.
                let _ = container.refresh(client).await;
                SubmitOutcome::Posted
            }
            Ok(status) => {
                warn!(thread = ?self.thread, %status, "Comment rejected");
                toasts.show(REJECTED, ToastKind::Error);
                SubmitOutcome::Rejected(status)
            }
            Err(e) => {
                warn!(thread = ?self.thread, error = %e, "Comment submit failed");
                toasts.show(CONNECTION_FAILED, ToastKind::Error);
                SubmitOutcome::Failed
            }
        };

        self.submitting.set(false);
        self.button_label = idle_label;
        outcome
    }
}
