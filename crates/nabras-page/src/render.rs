//! Render model of a comment list element.

use std::fmt::Write as _;
use std::time::Duration;

use tracing::warn;

use crate::comments::{Comment, CommentClient, CommentThread};
use crate::PageError;

/// Stagger between consecutive card animations.
const CARD_STAGGER: Duration = Duration::from_millis(100);

const LOAD_FAILED: &str = "تعذر تحميل التعليقات حالياً.";

/// One rendered comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentCard {
    pub author: String,
    pub time: String,
    pub text: String,
    pub animation_delay: Duration,
}

impl CommentCard {
    fn new(index: usize, comment: &Comment) -> Self {
        Self {
            author: comment.name.clone(),
            time: comment.created_at.clone().unwrap_or_default(),
            text: comment.comment.clone(),
            animation_delay: CARD_STAGGER * index as u32,
        }
    }
}

/// What the container currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerContent {
    /// Nothing loaded yet.
    Pending,
    Cards(Vec<CommentCard>),
    /// The thread has no comments.
    Empty(&'static str),
    /// Loading failed.
    Error(&'static str),
}

/// The element holding a thread's comment list. Every render replaces its
/// content wholesale.
#[derive(Debug, Clone)]
pub struct CommentContainer {
    thread: CommentThread,
    content: ContainerContent,
}

impl CommentContainer {
    pub fn new(thread: CommentThread) -> Self {
        Self {
            thread,
            content: ContainerContent::Pending,
        }
    }

    pub fn thread(&self) -> CommentThread {
        self.thread
    }

    pub fn content(&self) -> &ContainerContent {
        &self.content
    }

    /// Cards currently shown; empty unless comments were rendered.
    pub fn cards(&self) -> &[CommentCard] {
        match &self.content {
            ContainerContent::Cards(cards) => cards,
            _ => &[],
        }
    }

    /// Replace the content with `comments`.
    pub fn render(&mut self, comments: &[Comment]) {
        self.content = if comments.is_empty() {
            ContainerContent::Empty(self.thread.empty_message())
        } else {
            ContainerContent::Cards(
                comments
                    .iter()
                    .enumerate()
                    .map(|(index, comment)| CommentCard::new(index, comment))
                    .collect(),
            )
        };
    }

    /// Replace the content with the load-failure message.
    pub fn render_error(&mut self) {
        self.content = ContainerContent::Error(LOAD_FAILED);
    }

    /// Load the thread and render the result. A failed load leaves the
    /// failure message in place and is returned to the caller.
    pub async fn refresh(&mut self, client: &CommentClient) -> Result<usize, PageError> {
        match client.load(self.thread).await {
            Ok(comments) => {
                self.render(&comments);
                Ok(comments.len())
            }
            Err(e) => {
                warn!(thread = ?self.thread, error = %e, "Comment load failed");
                self.render_error();
                Err(e)
            }
        }
    }

    /// Inner markup of the container element.
    pub fn to_html(&self) -> String {
        match &self.content {
            ContainerContent::Pending => String::new(),
            ContainerContent::Empty(message) => format!(
                r#"<div class="no-comments"><p>{}</p></div>"#,
                escape_html(message)
            ),
            ContainerContent::Error(message) => format!("<p>{}</p>", escape_html(message)),
            ContainerContent::Cards(cards) => {
                let mut html = String::new();
                for card in cards {
                    let _ = write!(
                        html,
                        concat!(
                            r#"<div class="comment-card" style="animation-delay: {}ms">"#,
                            r#"<div class="comment-header">"#,
                            r#"<span class="comment-author">{}</span>"#,
                            r#"<span class="comment-time">{}</span>"#,
                            "</div>",
                            r#"<p class="comment-text">{}</p>"#,
                            "</div>"
                        ),
                        card.animation_delay.as_millis(),
                        escape_html(&card.author),
                        escape_html(&card.time),
                        escape_html(&card.text),
                    );
                }
                html
            }
        }
    }
}

/// Escape text for use in element content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
