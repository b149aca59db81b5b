// DisTok Bot - Rust Edition
// Relays new TikTok videos into Discord channels

mod commands;
mod api;
mod features;
mod models;
mod utils;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use poise::serenity_prelude as serenity;
use tracing::{info, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::tiktok::TikTokClient;
use crate::features::notifier::DiscordNotifier;
use crate::features::poller::Poller;
use crate::features::registry::WatchRegistry;
use crate::utils::config::Settings;

/// User data shared across all commands
pub struct Data {
    pub registry: Arc<WatchRegistry>,
    pub poll_interval: Duration,
}

// Manual Debug impl since WatchRegistry holds a mutex
impl std::fmt::Debug for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Data")
            .field("registry", &self.registry.path())
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// Register all slash commands
fn get_commands() -> Vec<poise::Command<Data, Error>> {
    vec![
        commands::distok::distok(),
        commands::help::help(),
        commands::register::register(),
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "distok_rs=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;

    info!("Starting DisTok Bot (Rust Edition)...");

    // Registry must load, otherwise we would overwrite it with an empty one
    let registry = Arc::new(WatchRegistry::load(&settings.data_file).await?);

    // Build HTTP client for API calls
    let http_client = reqwest::Client::builder()
        .user_agent("DisTok-Bot/1.0")
        .build()?;
    let tiktok = Arc::new(TikTokClient::new(
        http_client,
        settings.rapidapi_key.clone(),
        settings.rapidapi_host.clone(),
    ));

    let poll_interval = settings.poll_interval;
    let lookup_timeout = settings.lookup_timeout;
    let data_registry = registry.clone();

    // Setup framework
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: get_commands(),
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some("d!".into()),
                ..Default::default()
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            error!("Command error: {:?}", error);
                            let _ = ctx.say(format!("❌ Fehler: {}", error)).await;
                        }
                        poise::FrameworkError::MissingUserPermissions { ctx, .. } => {
                            let _ = ctx
                                .send(
                                    poise::CreateReply::default()
                                        .content("❌ Nur Admins können diese Aktion ausführen.")
                                        .ephemeral(true),
                                )
                                .await;
                        }
                        err => {
                            error!("Framework error: {:?}", err);
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("✅ Bot online als {}", ready.user.name);
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                info!("Commands registered successfully!");

                let poller = Poller::new(
                    registry.clone(),
                    tiktok,
                    Arc::new(DiscordNotifier::new(ctx.http.clone())),
                    lookup_timeout,
                );
                tokio::spawn(poller.run(poll_interval));

                Ok(Data {
                    registry: data_registry,
                    poll_interval,
                })
            })
        })
        .build();

    // DMs carry message content without the privileged intent, so owners can d!register there
    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::DIRECT_MESSAGES;

    let mut client = serenity::ClientBuilder::new(&settings.discord_token, intents)
        .framework(framework)
        .await?;

    // Run with graceful shutdown
    let shard_manager = client.shard_manager.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to register Ctrl+C handler: {:?}", e);
            return;
        }
        info!("Shutting down...");
        shard_manager.shutdown_all().await;
    });

    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    info!("Goodbye!");
    Ok(())
}
