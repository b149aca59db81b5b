// TikTok Scraper API client (RapidAPI)
// For fetching the most recent video of a user

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::utils::formatters::video_url;

/// Latest upload of a TikTok account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestPost {
    pub video_id: String,
    pub url: String,
}

/// Errors from a single account lookup
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API responded with status {0}")]
    Status(reqwest::StatusCode),

    #[error("Malformed API response: {0}")]
    Decode(String),

    #[error("Lookup timed out after {0:?}")]
    Timeout(Duration),
}

/// Something that can tell us the newest post of a username
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// `Ok(None)` means the account has no videos
    async fn latest_post(&self, username: &str) -> Result<Option<LatestPost>, LookupError>;
}

/// RapidAPI backed TikTok client
pub struct TikTokClient {
    client: reqwest::Client,
    api_key: String,
    host: String,
}

impl TikTokClient {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            host: host.into(),
        }
    }

    fn posts_url(&self) -> String {
        format!("https://{}/user/posts", self.host)
    }
}

#[async_trait]
impl ContentSource for TikTokClient {
    async fn latest_post(&self, username: &str) -> Result<Option<LatestPost>, LookupError> {
        let response = self
            .client
            .get(self.posts_url())
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", &self.host)
            .query(&[("username", username)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status(status));
        }

        let body = response.text().await?;
        debug!("Fetched posts for {} ({} bytes)", username, body.len());

        parse_latest_post(username, &body)
    }
}

/// Pull `data.videos[0].id` out of a response body
pub fn parse_latest_post(username: &str, body: &str) -> Result<Option<LatestPost>, LookupError> {
    let parsed: PostsResponse =
        serde_json::from_str(body).map_err(|e| LookupError::Decode(e.to_string()))?;

    let videos = parsed.data.and_then(|d| d.videos).unwrap_or_default();
    let first = match videos.into_iter().next() {
        Some(video) => video,
        None => return Ok(None),
    };

    let video_id = match first.id {
        Value::String(s) if !s.is_empty() => s,
        Value::Number(n) => n.to_string(),
        other => {
            return Err(LookupError::Decode(format!(
                "unexpected video id {}",
                other
            )))
        }
    };

    Ok(Some(LatestPost {
        url: video_url(username, &video_id),
        video_id,
    }))
}

// API response structures
#[derive(Debug, Deserialize)]
struct PostsResponse {
    #[serde(default)]
    data: Option<PostsData>,
}

#[derive(Debug, Deserialize)]
struct PostsData {
    #[serde(default)]
    videos: Option<Vec<VideoItem>>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    #[serde(default)]
    id: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_first_video() {
        let body = r#"{"data":{"videos":[{"id":"v2","desc":"new"},{"id":"v1"}]}}"#;
        let post = parse_latest_post("alice", body).unwrap().unwrap();
        assert_eq!(post.video_id, "v2");
        assert_eq!(post.url, "https://www.tiktok.com/@alice/video/v2");
    }

    #[test]
    fn test_parse_numeric_id() {
        let body = r#"{"data":{"videos":[{"id":7301234567890123456}]}}"#;
        let post = parse_latest_post("bob", body).unwrap().unwrap();
        assert_eq!(post.video_id, "7301234567890123456");
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse_latest_post("a", r#"{"data":{"videos":[]}}"#).unwrap(), None);
        assert_eq!(parse_latest_post("a", r#"{"data":{}}"#).unwrap(), None);
        assert_eq!(parse_latest_post("a", r#"{}"#).unwrap(), None);
        assert_eq!(parse_latest_post("a", r#"{"data":{"videos":null}}"#).unwrap(), None);
        assert_eq!(parse_latest_post("a", r#"{"data":null}"#).unwrap(), None);
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            parse_latest_post("a", "<html>"),
            Err(LookupError::Decode(_))
        ));
        assert!(matches!(
            parse_latest_post("a", r#"{"data":{"videos":[{"title":"no id"}]}}"#),
            Err(LookupError::Decode(_))
        ));
    }
}
