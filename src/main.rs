//! UFO Sighting Bot
//!
//! A Discord bot that posts fleeting UFO images at rare random intervals,
//! counts emoji reactions to them as alien "sightings" and keeps global and
//! per-server leaderboards. Includes an AI alien chat powered by Gemini.

mod alien;
mod bot;
mod commands;
mod config;
mod dedup;
mod poster;
mod storage;
mod tracker;

use config::Config;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "info,ufo_bot=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("UFO Sighting Bot starting...");

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("Please ensure DISCORD_TOKEN is set in the environment or .env file");
            std::process::exit(1);
        }
    };

    info!("Configuration loaded successfully");
    if let Some(guild_id) = config.guild_id {
        info!("Development mode: Commands will be registered to guild {}", guild_id);
    }

    // Create data directory for the JSON documents
    if let Err(e) = std::fs::create_dir_all(&config.data_dir) {
        error!("Failed to create data directory: {}", e);
        std::process::exit(1);
    }

    // Run the bot
    if let Err(e) = bot::run(config).await {
        error!("Bot error: {}", e);
        std::process::exit(1);
    }
}
