//! # Nabras Page
//!
//! Page-side behaviors of the Nabras "Forty Hadiths" site, kept free of any
//! DOM so they can be driven from tests or any host shell.
//!
//! ## Features
//!
//! - **Comments**: JSON client for the comment API, the submit form flow and
//!   the render model of the comment list
//! - **Toasts**: transient notifications with a fixed lifetime
//! - **Theme**: light/dark preference persisted under a fixed key
//! - **Share**: native share with a clipboard fallback
//! - **Connectivity**: online/offline notices

use thiserror::Error;

pub mod comments;
pub mod form;
pub mod render;
pub mod share;
pub mod theme;
pub mod toast;

pub use comments::{ClientConfig, Comment, CommentClient, CommentSubmission, CommentThread};
pub use form::{CommentForm, SubmitOutcome, SubmitState};
pub use render::{escape_html, CommentCard, CommentContainer, ContainerContent};
pub use share::{
    copy_text, share_or_copy, Clipboard, ClipboardError, ShareError, ShareOutcome, SharePayload,
    ShareTarget,
};
pub use theme::{MemoryPreferences, PreferenceStore, Theme, ThemeController, THEME_KEY};
pub use toast::{Connectivity, Toast, ToastKind, ToastManager};

/// Errors raised by the page-side HTTP calls.
#[derive(Error, Debug)]
pub enum PageError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered {status}")]
    Status {
        url: String,
        status: http::StatusCode,
    },

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Common(#[from] nabras_common::NabrasError),
}
