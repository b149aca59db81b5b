// Guild watch configuration
// Matches the data.json document structure

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One watched TikTok account inside a guild
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct WatchEntry {
    /// TikTok username, stored without the leading `@`
    pub username: String,
    /// Channel the notification is posted into
    pub channel_id: u64,
    /// Id of the most recent video already announced
    pub last_video: Option<String>,
}

impl WatchEntry {
    pub fn new(username: impl Into<String>, channel_id: u64) -> Self {
        Self {
            username: username.into(),
            channel_id,
            last_video: None,
        }
    }

    /// Same account posting into the same channel
    pub fn same_target(&self, username: &str, channel_id: u64) -> bool {
        self.channel_id == channel_id && self.username.eq_ignore_ascii_case(username)
    }
}

/// Guild (Server) specific configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct GuildConfig {
    /// Channel used by `add` when none is given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_channel_id: Option<u64>,
    /// Watched accounts in insertion order
    #[serde(default)]
    pub distok_list: Vec<WatchEntry>,
}

/// Whole persisted state, keyed by guild id
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct RegistryData {
    #[serde(default)]
    pub guilds: BTreeMap<String, GuildConfig>,
}
