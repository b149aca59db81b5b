// TikTok poller
// One serial pass over every watched account per interval

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::api::tiktok::{ContentSource, LatestPost, LookupError};
use crate::features::notifier::{DeliveryError, Notifier};
use crate::features::registry::{WatchRegistry, WatchTarget};
use crate::utils::formatters::format_notification;

/// What happened to one account during a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountOutcome {
    /// Account has no videos
    Empty,
    /// Latest video was already announced
    Unchanged,
    /// New video, marker advanced and message sent
    Notified { video_id: String },
    /// Entry was edited or removed while we were looking it up
    Stale,
    LookupFailed(String),
    /// Marker advanced but the message did not go out
    DeliveryFailed { video_id: String, reason: String },
    /// Marker could not be saved, nothing was sent
    PersistFailed(String),
}

impl AccountOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            AccountOutcome::LookupFailed(_)
                | AccountOutcome::DeliveryFailed { .. }
                | AccountOutcome::PersistFailed(_)
        )
    }
}

#[derive(Debug, Clone)]
pub struct AccountResult {
    pub guild_id: String,
    pub username: String,
    pub outcome: AccountOutcome,
}

/// Summary of one full pass
#[derive(Debug, Clone)]
pub struct PassReport {
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub results: Vec<AccountResult>,
}

impl PassReport {
    pub fn notified(&self) -> usize {
        self.count(|o| matches!(o, AccountOutcome::Notified { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(AccountOutcome::is_failure)
    }

    fn count(&self, pred: impl Fn(&AccountOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }
}

pub struct Poller {
    registry: Arc<WatchRegistry>,
    source: Arc<dyn ContentSource>,
    notifier: Arc<dyn Notifier>,
    lookup_timeout: Duration,
}

impl Poller {
    pub fn new(
        registry: Arc<WatchRegistry>,
        source: Arc<dyn ContentSource>,
        notifier: Arc<dyn Notifier>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            source,
            notifier,
            lookup_timeout,
        }
    }

    /// Run passes forever; the first one starts immediately
    pub async fn run(self, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Poller started, checking every {}s", period.as_secs());

        loop {
            ticker.tick().await;
            self.run_pass().await;
        }
    }

    /// Check every watched account once, strictly one after another
    pub async fn run_pass(&self) -> PassReport {
        let started_at = Utc::now();
        let clock = Instant::now();

        let targets = self.registry.snapshot().await;
        info!("🔁 Checking {} TikTok account(s)...", targets.len());

        let mut results = Vec::with_capacity(targets.len());
        for target in targets {
            let outcome = self.check_account(&target).await;
            results.push(AccountResult {
                guild_id: target.guild_id,
                username: target.entry.username,
                outcome,
            });
        }

        let report = PassReport {
            started_at,
            elapsed: clock.elapsed(),
            results,
        };

        info!(
            "Pass from {} done in {:?}: {} checked, {} notified, {} failed",
            report.started_at.format("%H:%M:%S"),
            report.elapsed,
            report.results.len(),
            report.notified(),
            report.failed()
        );
        for failure in report.results.iter().filter(|r| r.outcome.is_failure()) {
            debug!(
                "guild {} / {}: {:?}",
                failure.guild_id, failure.username, failure.outcome
            );
        }

        report
    }

    async fn check_account(&self, target: &WatchTarget) -> AccountOutcome {
        let username = &target.entry.username;

        let latest = match self.lookup(username).await {
            Ok(Some(post)) => post,
            Ok(None) => {
                debug!("{} has no videos", username);
                return AccountOutcome::Empty;
            }
            Err(e) => {
                warn!("⚠️ Lookup failed for {}: {}", username, e);
                return AccountOutcome::LookupFailed(e.to_string());
            }
        };

        if target.entry.last_video.as_deref() == Some(latest.video_id.as_str()) {
            return AccountOutcome::Unchanged;
        }

        // Marker first, then send
        match self.registry.advance_marker(target, &latest.video_id).await {
            Ok(true) => {}
            Ok(false) => return AccountOutcome::Stale,
            Err(e) => {
                warn!("⚠️ Could not save marker for {}: {}", username, e);
                return AccountOutcome::PersistFailed(e.to_string());
            }
        }

        let message = format_notification(username, &latest.url);
        match self.notifier.send(target.entry.channel_id, &message).await {
            Ok(()) => {
                info!(
                    "New video {} from {} announced in {}",
                    latest.video_id, username, target.entry.channel_id
                );
                AccountOutcome::Notified {
                    video_id: latest.video_id,
                }
            }
            Err(e) => {
                match &e {
                    DeliveryError::ChannelUnresolved(_) => {
                        debug!("Skipping {}: {}", username, e)
                    }
                    DeliveryError::Send(_) => warn!("⚠️ Delivery failed for {}: {}", username, e),
                }
                AccountOutcome::DeliveryFailed {
                    video_id: latest.video_id,
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn lookup(&self, username: &str) -> Result<Option<LatestPost>, LookupError> {
        tokio::time::timeout(self.lookup_timeout, self.source.latest_post(username))
            .await
            .unwrap_or(Err(LookupError::Timeout(self.lookup_timeout)))
    }
}
