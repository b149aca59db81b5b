// DisTok list command - manage watched TikTok accounts per server

use poise::serenity_prelude as serenity;
use tracing::{error, info};

use crate::features::registry::{RegistryError, WatchSelector};
use crate::utils::config::colors;
use crate::utils::formatters::{channel_mention, format_watch_list};
use crate::{Context, Error};

/// Manage the TikTok accounts watched in this server
#[poise::command(
    slash_command,
    guild_only,
    subcommands("add", "remove", "edit", "list", "channel")
)]
pub async fn distok(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Watch a TikTok account
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn add(
    ctx: Context<'_>,
    #[description = "TikTok Benutzername (ohne @)"] username: String,
    #[description = "Discord-Kanal (Standardkanal wenn leer)"]
    #[channel_types("Text", "News")]
    channel: Option<serenity::GuildChannel>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let result = ctx
        .data()
        .registry
        .add_watch(guild_id.get(), &username, channel.map(|c| c.id.get()))
        .await;

    match result {
        Ok(entry) => {
            info!(
                "Guild {} now watches {} -> {}",
                guild_id, entry.username, entry.channel_id
            );
            reply_embed(
                ctx,
                "Eintrag hinzugefügt",
                format!(
                    "✅ `{}` → {}",
                    entry.username,
                    channel_mention(entry.channel_id)
                ),
                colors::SUCCESS,
            )
            .await
        }
        Err(e) => reject(ctx, e).await,
    }
}

/// Stop watching an entry, by list position or username
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "Index zum Löschen (1-10)"]
    #[min = 1]
    #[max = 10]
    index: Option<u32>,
    #[description = "TikTok Benutzername"] username: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let selector = match (index, username) {
        (Some(index), _) => WatchSelector::Position(index as usize),
        (None, Some(name)) => WatchSelector::Username(name),
        (None, None) => WatchSelector::Position(0),
    };

    match ctx.data().registry.remove_watch(guild_id.get(), selector).await {
        Ok(removed) => {
            info!("Guild {} stopped watching {}", guild_id, removed.username);
            reply(ctx, format!("🗑️ Eintrag entfernt: `{}`", removed.username)).await
        }
        Err(e) => reject(ctx, e).await,
    }
}

/// Change the username or channel of an entry
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn edit(
    ctx: Context<'_>,
    #[description = "Index zum Bearbeiten (1-10)"]
    #[min = 1]
    #[max = 10]
    index: u32,
    #[description = "Neuer TikTok Benutzername"] username: Option<String>,
    #[description = "Neuer Discord-Kanal"]
    #[channel_types("Text", "News")]
    channel: Option<serenity::GuildChannel>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let result = ctx
        .data()
        .registry
        .edit_watch(
            guild_id.get(),
            index as usize,
            username.as_deref(),
            channel.map(|c| c.id.get()),
        )
        .await;

    match result {
        Ok(entry) => {
            reply(
                ctx,
                format!(
                    "✏️ Eintrag aktualisiert: `{}` → {}",
                    entry.username,
                    channel_mention(entry.channel_id)
                ),
            )
            .await
        }
        Err(e) => reject(ctx, e).await,
    }
}

/// Show the watched TikTok accounts
#[poise::command(slash_command, guild_only)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let entries = ctx.data().registry.list_watches(guild_id.get()).await;
    let mut msg = format_watch_list(&entries);

    if let Some(default) = ctx.data().registry.default_channel(guild_id.get()).await {
        msg.push_str(&format!("\nStandardkanal: {}", channel_mention(default)));
    }

    reply(ctx, msg).await
}

/// Set the default channel for new entries
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn channel(
    ctx: Context<'_>,
    #[description = "Discord-Kanal (#channel)"]
    #[channel_types("Text", "News")]
    channel: serenity::GuildChannel,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    match ctx
        .data()
        .registry
        .set_channel(guild_id.get(), channel.id.get())
        .await
    {
        Ok(()) => {
            info!("Guild {} default channel -> {}", guild_id, channel.id);
            reply_embed(
                ctx,
                "Konfiguration aktualisiert",
                format!("**Standardkanal** ist jetzt {}", channel_mention(channel.id.get())),
                colors::SUCCESS,
            )
            .await
        }
        Err(e) => reject(ctx, e).await,
    }
}

async fn reply(ctx: Context<'_>, text: String) -> Result<(), Error> {
    ctx.send(poise::CreateReply::default().content(text).ephemeral(true))
        .await?;
    Ok(())
}

async fn reply_embed(
    ctx: Context<'_>,
    title: &str,
    description: String,
    color: u32,
) -> Result<(), Error> {
    let embed = serenity::CreateEmbed::new()
        .title(title)
        .description(description)
        .color(color);
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Turn a registry error into a user-facing rejection
async fn reject(ctx: Context<'_>, err: RegistryError) -> Result<(), Error> {
    let text = match err {
        RegistryError::Config(e) => e.to_string(),
        other => {
            error!("Failed to save registry: {:?}", other);
            "Konfiguration konnte nicht gespeichert werden.".to_string()
        }
    };

    reply_embed(ctx, "Fehler", format!("❌ {}", text), colors::ERROR).await
}
