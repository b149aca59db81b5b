// Help command - show usage guide

use poise::serenity_prelude as serenity;
use crate::{Context, Error};
use crate::utils::config::{colors, MAX_ENTRIES_PER_GUILD};

/// Show help and usage guide
#[poise::command(slash_command, prefix_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let interval_mins = ctx.data().poll_interval.as_secs() / 60;

    let embed = serenity::CreateEmbed::new()
        .title("📚 DisTok Bot - Hilfe")
        .description("Postet neue TikTok-Videos automatisch in deinen Server")
        .color(colors::PRIMARY)
        .field(
            "📋 Liste",
            "`/distok list` - Beobachtete Accounts anzeigen",
            false,
        )
        .field(
            "⚙️ Verwaltung (Admin)",
            "`/distok add` - Account hinzufügen\n\
            `/distok remove` - Eintrag per Index oder Name entfernen\n\
            `/distok edit` - Benutzername oder Kanal ändern\n\
            `/distok channel` - Standardkanal festlegen",
            false,
        )
        .field(
            "ℹ️ Limits",
            format!(
                "• Maximal {} Einträge pro Server\n\
                • Geprüft wird alle {} Minuten",
                MAX_ENTRIES_PER_GUILD,
                interval_mins.max(1)
            ),
            false,
        )
        .footer(serenity::CreateEmbedFooter::new(
            "Rust Edition • Built with Serenity & Poise",
        ));

    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}
