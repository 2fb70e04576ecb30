//! Toast notifications and connectivity notices.

use std::time::{Duration, Instant};

use tracing::debug;

/// Default time a toast stays visible.
pub const TOAST_LIFETIME: Duration = Duration::from_millis(3000);

/// Toast severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ToastKind {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl ToastKind {
    /// Material icon name shown next to the message.
    pub fn icon(&self) -> &'static str {
        match self {
            ToastKind::Info => "info",
            ToastKind::Success => "check_circle",
            ToastKind::Warning => "warning",
            ToastKind::Error => "error",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToastKind::Info => "info",
            ToastKind::Success => "success",
            ToastKind::Warning => "warning",
            ToastKind::Error => "error",
        }
    }
}

/// A visible notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: u64,
    pub message: String,
    pub kind: ToastKind,
    pub shown_at: Instant,
    pub lifetime: Duration,
}

impl Toast {
    pub fn expires_at(&self) -> Instant {
        self.shown_at + self.lifetime
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at()
    }
}

/// Queue of visible toasts, oldest first.
#[derive(Debug)]
pub struct ToastManager {
    toasts: Vec<Toast>,
    lifetime: Duration,
    next_id: u64,
}

impl Default for ToastManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ToastManager {
    pub fn new() -> Self {
        Self::with_lifetime(TOAST_LIFETIME)
    }

    /// Manager whose toasts live for `lifetime`.
    pub fn with_lifetime(lifetime: Duration) -> Self {
        Self {
            toasts: Vec::new(),
            lifetime,
            next_id: 1,
        }
    }

    /// Show a toast now.
    pub fn show(&mut self, message: impl Into<String>, kind: ToastKind) -> u64 {
        self.show_at(message, kind, Instant::now())
    }

    /// Show a toast as of `now`.
    pub fn show_at(&mut self, message: impl Into<String>, kind: ToastKind, now: Instant) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        let message = message.into();
        debug!(id, kind = kind.as_str(), message = %message, "Toast shown");
        self.toasts.push(Toast {
            id,
            message,
            kind,
            shown_at: now,
            lifetime: self.lifetime,
        });
        id
    }

    /// Drop every toast whose lifetime elapsed by `now`. Returns how many went.
    pub fn expire(&mut self, now: Instant) -> usize {
        let before = self.toasts.len();
        self.toasts.retain(|toast| !toast.is_expired(now));
        before - self.toasts.len()
    }

    /// Remove one toast early.
    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.toasts.len();
        self.toasts.retain(|toast| toast.id != id);
        before != self.toasts.len()
    }

    /// Visible toasts in the order they were shown.
    pub fn active(&self) -> &[Toast] {
        &self.toasts
    }

    /// Most recent toast, if any.
    pub fn latest(&self) -> Option<&Toast> {
        self.toasts.last()
    }

    /// Announce a connectivity change.
    pub fn notify(&mut self, change: Connectivity) -> u64 {
        self.show(change.message(), change.kind())
    }
}

/// Browser connectivity change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Online,
    Offline,
}

impl Connectivity {
    pub fn message(&self) -> &'static str {
        match self {
            Connectivity::Online => "تم استعادة الاتصال بالإنترنت",
            Connectivity::Offline => "فقدت الاتصال بالإنترنت",
        }
    }

    pub fn kind(&self) -> ToastKind {
        match self {
            Connectivity::Online => ToastKind::Success,
            Connectivity::Offline => ToastKind::Warning,
        }
    }
}
