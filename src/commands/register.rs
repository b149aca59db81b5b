// Register command - re-sync slash commands with Discord

use tracing::info;

use crate::{Context, Error};

/// Re-register the slash commands
///
/// `d!register` registers globally, `d!register guild` only in this server
/// (guild registration shows up instantly, global can take a while).
#[poise::command(prefix_command, hide_in_help, owners_only)]
pub async fn register(
    ctx: Context<'_>,
    #[description = "global oder guild"] scope: Option<String>,
) -> Result<(), Error> {
    let commands = &ctx.framework().options().commands;

    match (scope.as_deref(), ctx.guild_id()) {
        (Some("guild"), Some(guild_id)) => {
            poise::builtins::register_in_guild(ctx.http(), commands, guild_id).await?;
            info!("Registered {} commands in guild {}", commands.len(), guild_id);
            ctx.say(format!(
                "✅ {} Befehle in diesem Server registriert.",
                commands.len()
            ))
            .await?;
        }
        (Some("guild"), None) => {
            ctx.say("❌ `guild` geht nur in einem Server.").await?;
        }
        _ => {
            poise::builtins::register_globally(ctx.http(), commands).await?;
            info!("Registered {} commands globally", commands.len());
            ctx.say(format!("✅ {} Befehle global registriert.", commands.len()))
                .await?;
        }
    }

    Ok(())
}
