// Discord delivery for new-video announcements

use std::sync::Arc;

use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Channel deleted, or the bot can no longer see it
    #[error("Channel {0} could not be resolved")]
    ChannelUnresolved(u64),

    #[error("Sending failed: {0}")]
    Send(String),
}

/// Posts a preformatted message into a channel
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, channel_id: u64, content: &str) -> Result<(), DeliveryError>;
}

pub struct DiscordNotifier {
    http: Arc<serenity::Http>,
}

impl DiscordNotifier {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, channel_id: u64, content: &str) -> Result<(), DeliveryError> {
        if channel_id == 0 {
            return Err(DeliveryError::ChannelUnresolved(channel_id));
        }

        serenity::ChannelId::new(channel_id)
            .say(&self.http, content)
            .await
            .map(|_| ())
            .map_err(|e| classify(channel_id, e))
    }
}

fn classify(channel_id: u64, error: serenity::Error) -> DeliveryError {
    let status = match &error {
        serenity::Error::Http(serenity::HttpError::UnsuccessfulRequest(response)) => {
            Some(response.status_code.as_u16())
        }
        _ => None,
    };
    classify_status(channel_id, status, error.to_string())
}

/// Unknown Channel / Missing Access count as an unresolved channel
fn classify_status(channel_id: u64, status: Option<u16>, reason: String) -> DeliveryError {
    match status {
        Some(403 | 404) => DeliveryError::ChannelUnresolved(channel_id),
        _ => DeliveryError::Send(reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_channel_statuses() {
        for status in [403, 404] {
            assert!(matches!(
                classify_status(7, Some(status), "gone".into()),
                DeliveryError::ChannelUnresolved(7)
            ));
        }
    }

    #[test]
    fn test_other_failures_are_send_errors() {
        assert!(matches!(
            classify_status(7, Some(500), "server error".into()),
            DeliveryError::Send(ref reason) if reason == "server error"
        ));
        assert!(matches!(
            classify_status(7, Some(429), "rate limited".into()),
            DeliveryError::Send(_)
        ));
        assert!(matches!(
            classify_status(7, None, "gateway closed".into()),
            DeliveryError::Send(_)
        ));
    }

    #[tokio::test]
    async fn test_zero_channel_is_unresolved() {
        let notifier = DiscordNotifier::new(Arc::new(serenity::Http::new("")));
        assert!(matches!(
            notifier.send(0, "hi").await,
            Err(DeliveryError::ChannelUnresolved(0))
        ));
    }
}
