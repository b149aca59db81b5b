// Watch Registry
// Per-guild TikTok watch lists persisted to a single JSON file

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::models::guild::{GuildConfig, RegistryData, WatchEntry};
use crate::utils::config::MAX_ENTRIES_PER_GUILD;
use crate::utils::formatters::normalize_username;

/// Rejections shown to the admin who issued the command
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Bitte gib einen TikTok-Benutzernamen an.")]
    MissingUsername,

    #[error("Bitte gib einen Kanal an oder setze einen Standardkanal mit `/distok channel`.")]
    MissingChannel,

    #[error("`{0}` wird in diesem Kanal bereits beobachtet.")]
    AlreadyWatched(String),

    #[error("Maximal {} Einträge erlaubt.", MAX_ENTRIES_PER_GUILD)]
    LimitExceeded,

    #[error("Ungültiger Index.")]
    InvalidIndex,

    #[error("Bitte gib entweder einen neuen Benutzernamen oder Kanal an.")]
    NoChange,

    #[error("`{0}` steht nicht auf der Liste.")]
    NotFound(String),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Registry I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Registry JSON invalid: {0}")]
    Json(#[from] serde_json::Error),
}

/// How `remove_watch` picks its entry
#[derive(Debug, Clone)]
pub enum WatchSelector {
    /// 1-based position in the guild's list
    Position(usize),
    /// First entry with this username
    Username(String),
}

/// A watch entry as seen by the poller at snapshot time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    pub guild_id: String,
    /// 0-based position inside the guild's list
    pub position: usize,
    pub entry: WatchEntry,
}

/// File-backed registry, one mutex around the whole document
pub struct WatchRegistry {
    path: PathBuf,
    state: Mutex<RegistryData>,
}

impl WatchRegistry {
    /// Load the registry, treating a missing file as empty
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let path = path.into();

        let data = match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str::<RegistryData>(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No registry at {}, starting empty", path.display());
                RegistryData::default()
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            "Loaded registry with {} guild(s) from {}",
            data.guilds.len(),
            path.display()
        );

        Ok(Self {
            path,
            state: Mutex::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Watch a username, posting into `channel_id` or the guild default
    pub async fn add_watch(
        &self,
        guild_id: u64,
        username: &str,
        channel_id: Option<u64>,
    ) -> Result<WatchEntry, RegistryError> {
        let username = normalize_username(username);
        if username.is_empty() {
            return Err(ConfigError::MissingUsername.into());
        }

        self.mutate(|data| {
            let guild = guild_entry(data, guild_id);
            let channel_id = channel_id
                .or(guild.default_channel_id)
                .ok_or(ConfigError::MissingChannel)?;

            if guild.distok_list.len() >= MAX_ENTRIES_PER_GUILD {
                return Err(ConfigError::LimitExceeded);
            }
            if guild
                .distok_list
                .iter()
                .any(|e| e.same_target(&username, channel_id))
            {
                return Err(ConfigError::AlreadyWatched(username.clone()));
            }

            let entry = WatchEntry::new(username.clone(), channel_id);
            guild.distok_list.push(entry.clone());
            Ok(entry)
        })
        .await
    }

    pub async fn remove_watch(
        &self,
        guild_id: u64,
        selector: WatchSelector,
    ) -> Result<WatchEntry, RegistryError> {
        self.mutate(|data| {
            let list = match data.guilds.get_mut(&guild_id.to_string()) {
                Some(guild) => &mut guild.distok_list,
                None => {
                    return Err(match selector {
                        WatchSelector::Position(_) => ConfigError::InvalidIndex,
                        WatchSelector::Username(name) => ConfigError::NotFound(name),
                    })
                }
            };

            let position = match selector {
                WatchSelector::Position(index) => position_of(list, index)?,
                WatchSelector::Username(name) => {
                    let wanted = normalize_username(&name);
                    list.iter()
                        .position(|e| e.username.eq_ignore_ascii_case(&wanted))
                        .ok_or(ConfigError::NotFound(wanted))?
                }
            };

            Ok(list.remove(position))
        })
        .await
    }

    /// Change username and/or channel of an entry; the marker is kept
    pub async fn edit_watch(
        &self,
        guild_id: u64,
        index: usize,
        new_username: Option<&str>,
        new_channel_id: Option<u64>,
    ) -> Result<WatchEntry, RegistryError> {
        let new_username = new_username.map(normalize_username);
        if new_username.as_deref() == Some("") {
            return Err(ConfigError::MissingUsername.into());
        }
        if new_username.is_none() && new_channel_id.is_none() {
            return Err(ConfigError::NoChange.into());
        }

        self.mutate(|data| {
            let list = data
                .guilds
                .get_mut(&guild_id.to_string())
                .map(|g| &mut g.distok_list)
                .ok_or(ConfigError::InvalidIndex)?;
            let position = position_of(list, index)?;

            let username = new_username
                .clone()
                .unwrap_or_else(|| list[position].username.clone());
            let channel_id = new_channel_id.unwrap_or(list[position].channel_id);

            let clash = list
                .iter()
                .enumerate()
                .any(|(i, e)| i != position && e.same_target(&username, channel_id));
            if clash {
                return Err(ConfigError::AlreadyWatched(username));
            }

            let entry = &mut list[position];
            entry.username = username;
            entry.channel_id = channel_id;
            Ok(entry.clone())
        })
        .await
    }

    /// Entries of a guild in list order
    pub async fn list_watches(&self, guild_id: u64) -> Vec<WatchEntry> {
        let state = self.state.lock().await;
        state
            .guilds
            .get(&guild_id.to_string())
            .map(|g| g.distok_list.clone())
            .unwrap_or_default()
    }

    /// Set the channel used by `add_watch` when none is given
    pub async fn set_channel(&self, guild_id: u64, channel_id: u64) -> Result<(), RegistryError> {
        self.mutate(|data| {
            guild_entry(data, guild_id).default_channel_id = Some(channel_id);
            Ok(())
        })
        .await
    }

    pub async fn default_channel(&self, guild_id: u64) -> Option<u64> {
        let state = self.state.lock().await;
        state
            .guilds
            .get(&guild_id.to_string())
            .and_then(|g| g.default_channel_id)
    }

    /// Every watched entry across all guilds, in guild then list order
    pub async fn snapshot(&self) -> Vec<WatchTarget> {
        let state = self.state.lock().await;
        state
            .guilds
            .iter()
            .flat_map(|(guild_id, guild)| {
                guild
                    .distok_list
                    .iter()
                    .enumerate()
                    .map(move |(position, entry)| WatchTarget {
                        guild_id: guild_id.clone(),
                        position,
                        entry: entry.clone(),
                    })
            })
            .collect()
    }

    /// Record `video_id` as seen for the entry `target` was taken from.
    ///
    /// The entry is matched by username and channel, which are unique per
    /// guild; the snapshot position is only tried first. Returns `false`
    /// without touching anything when the entry was edited or removed.
    pub async fn advance_marker(
        &self,
        target: &WatchTarget,
        video_id: &str,
    ) -> Result<bool, RegistryError> {
        let mut state = self.state.lock().await;

        let position = match state
            .guilds
            .get(&target.guild_id)
            .and_then(|g| locate(&g.distok_list, target))
        {
            Some(position) => position,
            None => {
                debug!(
                    "{} in guild {} changed during pass, not advancing",
                    target.entry.username, target.guild_id
                );
                return Ok(false);
            }
        };

        let mut next = state.clone();
        if let Some(entry) = next
            .guilds
            .get_mut(&target.guild_id)
            .and_then(|g| g.distok_list.get_mut(position))
        {
            entry.last_video = Some(video_id.to_string());
        }

        write_atomic(&self.path, &next).await?;
        *state = next;
        Ok(true)
    }

    /// Apply `f` to a copy, persist it, then swap it in
    async fn mutate<T, F>(&self, f: F) -> Result<T, RegistryError>
    where
        F: FnOnce(&mut RegistryData) -> Result<T, ConfigError>,
    {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        let out = f(&mut next)?;

        write_atomic(&self.path, &next).await?;
        *state = next;
        Ok(out)
    }
}

fn guild_entry(data: &mut RegistryData, guild_id: u64) -> &mut GuildConfig {
    data.guilds.entry(guild_id.to_string()).or_default()
}

/// Current position of the entry a snapshot target refers to
fn locate(list: &[WatchEntry], target: &WatchTarget) -> Option<usize> {
    let is_target = |e: &WatchEntry| e.same_target(&target.entry.username, target.entry.channel_id);

    match list.get(target.position) {
        Some(entry) if is_target(entry) => Some(target.position),
        _ => list.iter().position(is_target),
    }
}

/// Convert a 1-based index into a list position
fn position_of(list: &[WatchEntry], index: usize) -> Result<usize, ConfigError> {
    if index == 0 || index > list.len() {
        return Err(ConfigError::InvalidIndex);
    }
    Ok(index - 1)
}

/// Write to a sibling temp file and rename it over `path`
async fn write_atomic(path: &Path, data: &RegistryData) -> Result<(), RegistryError> {
    let json = serde_json::to_string_pretty(data)?;

    let mut tmp: OsString = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;

    debug!("Persisted registry to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn fresh() -> (TempDir, WatchRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let registry = WatchRegistry::load(dir.path().join("data.json")).await.unwrap();
        (dir, registry)
    }

    fn config_err(result: Result<impl std::fmt::Debug, RegistryError>) -> ConfigError {
        match result {
            Err(RegistryError::Config(e)) => e,
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_add_and_list() {
        let (_dir, registry) = fresh().await;

        let entry = registry.add_watch(1, "@alice", Some(10)).await.unwrap();
        assert_eq!(entry.username, "alice");
        assert_eq!(entry.last_video, None);

        registry.add_watch(1, "bob", Some(11)).await.unwrap();
        let names: Vec<_> = registry
            .list_watches(1)
            .await
            .into_iter()
            .map(|e| e.username)
            .collect();
        assert_eq!(names, vec!["alice", "bob"]);
        assert!(registry.list_watches(2).await.is_empty());
    }

    #[tokio::test]
    async fn test_limit_is_ten() {
        let (_dir, registry) = fresh().await;

        for i in 0..10 {
            registry
                .add_watch(1, &format!("user{}", i), Some(5))
                .await
                .unwrap();
        }
        let err = config_err(registry.add_watch(1, "user10", Some(5)).await);
        assert_eq!(err, ConfigError::LimitExceeded);
        assert_eq!(registry.list_watches(1).await.len(), 10);

        // Other guilds have their own budget
        registry.add_watch(2, "user10", Some(5)).await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_only_per_channel() {
        let (_dir, registry) = fresh().await;

        registry.add_watch(1, "alice", Some(10)).await.unwrap();
        let err = config_err(registry.add_watch(1, "ALICE", Some(10)).await);
        assert_eq!(err, ConfigError::AlreadyWatched("ALICE".into()));

        registry.add_watch(1, "alice", Some(11)).await.unwrap();
        assert_eq!(registry.list_watches(1).await.len(), 2);
    }

    #[tokio::test]
    async fn test_add_requires_username_and_channel() {
        let (_dir, registry) = fresh().await;

        assert_eq!(
            config_err(registry.add_watch(1, " @ ", Some(1)).await),
            ConfigError::MissingUsername
        );
        assert_eq!(
            config_err(registry.add_watch(1, "alice", None).await),
            ConfigError::MissingChannel
        );
    }

    #[tokio::test]
    async fn test_set_channel_is_used_as_default() {
        let (_dir, registry) = fresh().await;

        registry.set_channel(1, 99).await.unwrap();
        assert_eq!(registry.default_channel(1).await, Some(99));

        let entry = registry.add_watch(1, "alice", None).await.unwrap();
        assert_eq!(entry.channel_id, 99);

        let entry = registry.add_watch(1, "bob", Some(5)).await.unwrap();
        assert_eq!(entry.channel_id, 5);
    }

    #[tokio::test]
    async fn test_remove_out_of_range() {
        let (_dir, registry) = fresh().await;
        registry.add_watch(1, "alice", Some(1)).await.unwrap();
        registry.add_watch(1, "bob", Some(1)).await.unwrap();

        for bad in [0, 3] {
            let err = config_err(registry.remove_watch(1, WatchSelector::Position(bad)).await);
            assert_eq!(err, ConfigError::InvalidIndex);
        }
        assert_eq!(registry.list_watches(1).await.len(), 2);

        let err = config_err(registry.remove_watch(7, WatchSelector::Position(1)).await);
        assert_eq!(err, ConfigError::InvalidIndex);
    }

    #[tokio::test]
    async fn test_remove_by_position_and_name() {
        let (_dir, registry) = fresh().await;
        for name in ["alice", "bob", "carol"] {
            registry.add_watch(1, name, Some(1)).await.unwrap();
        }

        let removed = registry
            .remove_watch(1, WatchSelector::Position(2))
            .await
            .unwrap();
        assert_eq!(removed.username, "bob");

        let removed = registry
            .remove_watch(1, WatchSelector::Username("@Carol".into()))
            .await
            .unwrap();
        assert_eq!(removed.username, "carol");

        let err = config_err(
            registry
                .remove_watch(1, WatchSelector::Username("dave".into()))
                .await,
        );
        assert_eq!(err, ConfigError::NotFound("dave".into()));

        let left = registry.list_watches(1).await;
        assert_eq!(left, vec![WatchEntry::new("alice", 1)]);
    }

    #[tokio::test]
    async fn test_edit_requires_a_field() {
        let (_dir, registry) = fresh().await;
        registry.add_watch(1, "alice", Some(1)).await.unwrap();

        let err = config_err(registry.edit_watch(1, 1, None, None).await);
        assert_eq!(err, ConfigError::NoChange);
        assert_eq!(registry.list_watches(1).await[0], WatchEntry::new("alice", 1));
    }

    #[tokio::test]
    async fn test_edit_keeps_marker() {
        let (_dir, registry) = fresh().await;
        registry.add_watch(1, "alice", Some(1)).await.unwrap();
        let target = registry.snapshot().await.remove(0);
        assert!(registry.advance_marker(&target, "v1").await.unwrap());

        let edited = registry.edit_watch(1, 1, None, Some(2)).await.unwrap();
        assert_eq!(edited.channel_id, 2);
        assert_eq!(edited.username, "alice");
        assert_eq!(edited.last_video.as_deref(), Some("v1"));

        let edited = registry.edit_watch(1, 1, Some("@alicia"), None).await.unwrap();
        assert_eq!(edited.username, "alicia");
        assert_eq!(edited.channel_id, 2);

        let err = config_err(registry.edit_watch(1, 2, Some("x"), None).await);
        assert_eq!(err, ConfigError::InvalidIndex);
    }

    #[tokio::test]
    async fn test_edit_rejects_clash() {
        let (_dir, registry) = fresh().await;
        registry.add_watch(1, "alice", Some(1)).await.unwrap();
        registry.add_watch(1, "bob", Some(1)).await.unwrap();

        let err = config_err(registry.edit_watch(1, 2, Some("alice"), None).await);
        assert_eq!(err, ConfigError::AlreadyWatched("alice".into()));
    }

    #[tokio::test]
    async fn test_round_trip_through_disk() {
        let (dir, registry) = fresh().await;
        registry.set_channel(2, 20).await.unwrap();
        for name in ["zed", "amy", "kim"] {
            registry.add_watch(1, name, Some(10)).await.unwrap();
        }
        registry.add_watch(2, "solo", None).await.unwrap();
        let target = registry.snapshot().await.remove(1);
        registry.advance_marker(&target, "v7").await.unwrap();

        let reloaded = WatchRegistry::load(dir.path().join("data.json")).await.unwrap();
        assert_eq!(
            *reloaded.state.lock().await,
            *registry.state.lock().await
        );
        let names: Vec<_> = reloaded
            .list_watches(1)
            .await
            .into_iter()
            .map(|e| e.username)
            .collect();
        assert_eq!(names, vec!["zed", "amy", "kim"]);
        assert_eq!(reloaded.list_watches(1).await[1].last_video.as_deref(), Some("v7"));
        assert_eq!(reloaded.default_channel(2).await, Some(20));
    }

    #[tokio::test]
    async fn test_failed_persist_keeps_state() {
        let dir = tempfile::tempdir().unwrap();
        let registry = WatchRegistry::load(dir.path().join("missing/data.json"))
            .await
            .unwrap();

        let result = registry.add_watch(1, "alice", Some(1)).await;
        assert!(matches!(result, Err(RegistryError::Io(_))));
        assert!(registry.list_watches(1).await.is_empty());
    }

    #[tokio::test]
    async fn test_advance_marker_skips_moved_entry() {
        let (_dir, registry) = fresh().await;
        registry.add_watch(1, "alice", Some(1)).await.unwrap();
        let target = registry.snapshot().await.remove(0);

        registry.edit_watch(1, 1, Some("bob"), None).await.unwrap();
        assert!(!registry.advance_marker(&target, "v1").await.unwrap());
        assert_eq!(registry.list_watches(1).await[0].last_video, None);

        registry.remove_watch(1, WatchSelector::Position(1)).await.unwrap();
        assert!(!registry.advance_marker(&target, "v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_advance_marker_follows_shifted_entry() {
        let (_dir, registry) = fresh().await;
        for name in ["alice", "bob", "carol"] {
            registry.add_watch(1, name, Some(1)).await.unwrap();
        }
        let targets = registry.snapshot().await;

        registry.remove_watch(1, WatchSelector::Position(1)).await.unwrap();

        assert!(registry.advance_marker(&targets[2], "c1").await.unwrap());
        assert!(!registry.advance_marker(&targets[0], "a1").await.unwrap());

        let entries = registry.list_watches(1).await;
        assert_eq!(entries[0].username, "bob");
        assert_eq!(entries[0].last_video, None);
        assert_eq!(entries[1].username, "carol");
        assert_eq!(entries[1].last_video.as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn test_load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(
            WatchRegistry::load(&path).await,
            Err(RegistryError::Json(_))
        ));
    }
}
