// Text formatting helpers for Discord output

use crate::models::guild::WatchEntry;

/// Public link to a TikTok video
pub fn video_url(username: &str, video_id: &str) -> String {
    format!("https://www.tiktok.com/@{}/video/{}", username, video_id)
}

/// Channel mention markup
pub fn channel_mention(channel_id: u64) -> String {
    format!("<#{}>", channel_id)
}

/// Announcement posted when a watched account uploads a new video
pub fn format_notification(username: &str, url: &str) -> String {
    format!(
        "**__Neues Tiktokvideo von {}__**\n\
         **Ihr wisst alle was zutun ist!**\n\
         > **Das Video liken ❤️**\n\
         > **Einen netten Kommentar schreiben ⌨️**\n\
         > **Das Video teilen ↪️**\n\
         > **Und dem Benutzer folgen ➕**\n\
         || @everyone ||\n\
         ** {} **",
        username, url
    )
}

/// Numbered watch list, one line per entry
pub fn format_watch_list(entries: &[WatchEntry]) -> String {
    if entries.is_empty() {
        return "📭 Keine TikTok-User/Channels eingetragen.".to_string();
    }

    let mut msg = String::from("**__DisTok List__**\n");
    for (i, entry) in entries.iter().enumerate() {
        msg.push_str(&format!(
            "{}. Tiktokuser: `{}`    Tiktokchannel: {}\n",
            i + 1,
            entry.username,
            channel_mention(entry.channel_id)
        ));
    }
    msg
}

/// Strip whitespace and a leading `@` from a username
pub fn normalize_username(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed.strip_prefix('@').unwrap_or(trimmed).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_url() {
        assert_eq!(
            video_url("alice", "v1"),
            "https://www.tiktok.com/@alice/video/v1"
        );
    }

    #[test]
    fn test_notification_contains_mention_and_url() {
        let msg = format_notification("alice", "https://www.tiktok.com/@alice/video/v1");
        assert!(msg.starts_with("**__Neues Tiktokvideo von alice__**"));
        assert!(msg.contains("@everyone"));
        assert!(msg.ends_with("** https://www.tiktok.com/@alice/video/v1 **"));
    }

    #[test]
    fn test_watch_list() {
        assert!(format_watch_list(&[]).contains("Keine"));

        let entries = vec![WatchEntry::new("alice", 1), WatchEntry::new("bob", 2)];
        let msg = format_watch_list(&entries);
        assert!(msg.contains("1. Tiktokuser: `alice`"));
        assert!(msg.contains("2. Tiktokuser: `bob`    Tiktokchannel: <#2>"));
    }

    #[test]
    fn test_normalize_username() {
        assert_eq!(normalize_username("  @alice "), "alice");
        assert_eq!(normalize_username("bob"), "bob");
        assert_eq!(normalize_username("@"), "");
    }
}
