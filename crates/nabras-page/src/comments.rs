//! Comment API client.
//!
//! Hadith threads live under `/api/comments`, the general thread under
//! `/api/general-comments` (stored server-side as hadith 0).

use std::path::Path;
use std::time::Duration;

use http::StatusCode;
use nabras_common::NabrasError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};
use url::Url;

use crate::PageError;

/// A published comment as the API returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub name: String,
    pub comment: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Fields a visitor fills in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentSubmission {
    pub name: String,
    pub email: String,
    pub comment: String,
}

impl CommentSubmission {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            comment: comment.into(),
        }
    }
}

/// Wire body of a POST. The hadith id is only sent for hadith threads.
#[derive(Serialize)]
struct SubmissionBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    hadith_id: Option<u32>,
    #[serde(flatten)]
    submission: &'a CommentSubmission,
}

/// Which comment list a page shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommentThread {
    /// Comments on one hadith.
    Hadith(u32),
    /// The site-wide reflections thread.
    General,
}

impl CommentThread {
    /// Path listing the thread's comments.
    pub fn list_path(&self) -> String {
        match self {
            CommentThread::Hadith(id) => format!("/api/comments/{}", id),
            CommentThread::General => "/api/general-comments".to_string(),
        }
    }

    /// Path new comments are posted to.
    pub fn submit_path(&self) -> &'static str {
        match self {
            CommentThread::Hadith(_) => "/api/comments",
            CommentThread::General => "/api/general-comments",
        }
    }

    pub fn hadith_id(&self) -> Option<u32> {
        match self {
            CommentThread::Hadith(id) => Some(*id),
            CommentThread::General => None,
        }
    }

    /// Placeholder shown when the thread has no comments.
    pub fn empty_message(&self) -> &'static str {
        match self {
            CommentThread::Hadith(_) => "لا توجد تعليقات بعد. كن أول من يشارك تأمله!",
            CommentThread::General => "لا توجد تعليقات بعد.",
        }
    }
}

/// Comment client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Site the API is served from.
    pub base_url: Url,

    /// Request timeout in seconds. Unset waits forever.
    pub timeout_secs: Option<u64>,

    /// User agent string.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("https://nibras-hadith.onrender.com/")
                .expect("default base URL is a valid URL"),
            timeout_secs: Some(30),
            user_agent: format!("nabras-page/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Default configuration against another site.
    pub fn for_base_url(base_url: Url) -> Self {
        Self {
            base_url,
            ..Default::default()
        }
    }

    /// Parse a JSON document.
    pub fn from_json(json: &str) -> Result<Self, PageError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| NabrasError::config_with_source("invalid client config", e))?;
        if config.base_url.cannot_be_a_base() {
            return Err(NabrasError::config(format!(
                "base URL {} cannot carry paths",
                config.base_url
            ))
            .into());
        }
        Ok(config)
    }

    /// Load a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PageError> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(NabrasError::from)?;
        Self::from_json(&raw)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// JSON client for the comment API.
pub struct CommentClient {
    client: Client,
    config: ClientConfig,
}

impl CommentClient {
    /// Create a client.
    pub fn new(config: ClientConfig) -> Result<Self, PageError> {
        let mut builder = Client::builder().user_agent(config.user_agent.as_str());
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        info!(base_url = %config.base_url, "CommentClient initialized");

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> Result<Url, PageError> {
        self.config
            .base_url
            .join(path)
            .map_err(|e| NabrasError::config_with_source(format!("bad path {}", path), e).into())
    }

    /// Fetch every comment of `thread`, oldest first as the server orders them.
    pub async fn load(&self, thread: CommentThread) -> Result<Vec<Comment>, PageError> {
        let url = self.endpoint(&thread.list_path())?;
        debug!(url = %url, "Loading comments");

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PageError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.bytes().await?;
        let comments: Vec<Comment> = serde_json::from_slice(&body)?;
        trace!(url = %url, count = comments.len(), "Comments loaded");
        Ok(comments)
    }

    /// POST one submission and report the status the server answered with.
    pub async fn submit(
        &self,
        thread: CommentThread,
        submission: &CommentSubmission,
    ) -> Result<StatusCode, PageError> {
        let url = self.endpoint(thread.submit_path())?;
        let body = SubmissionBody {
            hadith_id: thread.hadith_id(),
            submission,
        };
        debug!(url = %url, ?thread, "Submitting comment");

        let response = self.client.post(url).json(&body).send().await?;
        Ok(response.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> CommentClient {
        let base = Url::parse(&server.uri()).unwrap();
        CommentClient::new(ClientConfig::for_base_url(base)).unwrap()
    }

    #[test]
    fn test_thread_paths() {
        assert_eq!(CommentThread::Hadith(7).list_path(), "/api/comments/7");
        assert_eq!(CommentThread::Hadith(7).submit_path(), "/api/comments");
        assert_eq!(CommentThread::General.list_path(), "/api/general-comments");
        assert_eq!(CommentThread::General.hadith_id(), None);
    }

    #[test]
    fn test_general_body_has_no_hadith_id() {
        let submission = CommentSubmission::new("Ali", "a@x.com", "Test");
        let body = serde_json::to_value(SubmissionBody {
            hadith_id: None,
            submission: &submission,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "name": "Ali", "email": "a@x.com", "comment": "Test" })
        );
    }

    #[test]
    fn test_config_from_json() {
        let config =
            ClientConfig::from_json(r#"{ "base_url": "http://127.0.0.1:8000/", "timeout_secs": null }"#)
                .unwrap();
        assert_eq!(config.base_url.port(), Some(8000));
        assert_eq!(config.timeout(), None);

        assert!(ClientConfig::from_json(r#"{ "base_url": "mailto:a@x.com" }"#).is_err());
    }

    #[tokio::test]
    async fn test_load_hadith_thread() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/comments/3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "name": "Sara", "comment": "جزاكم الله خيرا", "created_at": "منذ ساعة", "id": 4 }
            ])))
            .mount(&server)
            .await;

        let comments = client_for(&server)
            .await
            .load(CommentThread::Hadith(3))
            .await
            .unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].name, "Sara");
        assert_eq!(comments[0].created_at.as_deref(), Some("منذ ساعة"));
    }

    #[tokio::test]
    async fn test_load_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .load(CommentThread::General)
            .await
            .unwrap_err();
        assert!(matches!(err, PageError::Status { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn test_load_rejects_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .load(CommentThread::General)
            .await
            .unwrap_err();
        assert!(matches!(err, PageError::Decode(_)));
    }

    #[tokio::test]
    async fn test_submit_hadith_comment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/comments"))
            .and(body_json(serde_json::json!({
                "hadith_id": 12,
                "name": "Ali",
                "email": "a@x.com",
                "comment": "Test"
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let status = client_for(&server)
            .await
            .submit(
                CommentThread::Hadith(12),
                &CommentSubmission::new("Ali", "a@x.com", "Test"),
            )
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_submit_reports_rejection_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422))
            .mount(&server)
            .await;

        let status = client_for(&server)
            .await
            .submit(CommentThread::General, &CommentSubmission::default())
            .await
            .unwrap();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
