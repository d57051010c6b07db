//! Discord bot event handler
//!
//! Owns the shared state, registers slash commands on ready, supervises the
//! per-guild posting loops and turns reaction-added events into persisted
//! sightings.

use std::sync::Arc;
use std::time::Instant;

use serenity::all::{
    ActivityData, ChannelId, ChannelType, Client, Command, Context, CreateEmbed,
    CreateEmbedFooter, CreateMessage, EventHandler, GatewayIntents, Guild, GuildId, Http,
    Interaction, OnlineStatus, Reaction, Ready, Timestamp, UnavailableGuild,
};
use serenity::async_trait;
use tracing::{debug, error, info, warn};

use crate::alien::AlienChat;
use crate::commands;
use crate::config::Config;
use crate::dedup::ReactionDebouncer;
use crate::poster::PostLoops;
use crate::storage::{Store, DM_GUILD_KEY};
use crate::tracker::MessageTracker;

/// Bot state shared across handlers
pub struct BotState {
    pub config: Arc<Config>,
    pub store: Arc<Store>,
    pub debouncer: ReactionDebouncer,
    pub tracker: Arc<MessageTracker>,
    pub alien: Option<AlienChat>,
    pub post_loops: PostLoops,
    pub started_at: Instant,
}

impl BotState {
    /// Bot admins: the configured owner plus the persisted admin list.
    pub fn is_admin(&self, user_id: u64) -> bool {
        if self.config.owner_id == Some(user_id) {
            return true;
        }
        self.store.is_admin(user_id).unwrap_or_else(|e| {
            warn!("Failed to read admin list: {}", e);
            false
        })
    }

    pub fn is_banned(&self, user_id: u64) -> bool {
        self.store.is_banned(user_id).unwrap_or_else(|e| {
            warn!("Failed to read ban list: {}", e);
            false
        })
    }
}

/// Main event handler for the bot
pub struct Handler {
    pub state: Arc<BotState>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("Logged in as {}", ready.user.name);

        ctx.set_presence(
            Some(ActivityData::watching("for Aliens")),
            OnlineStatus::DoNotDisturb,
        );

        let definitions = commands::register_all();

        // If guild ID is set, register to specific guild (faster for dev)
        if let Some(guild_id) = self.state.config.guild_id {
            let guild = GuildId::new(guild_id);
            match guild.set_commands(&ctx.http, definitions).await {
                Ok(cmds) => info!("Registered {} guild commands", cmds.len()),
                Err(e) => error!("Failed to register guild commands: {}", e),
            }
        } else {
            match Command::set_global_commands(&ctx.http, definitions).await {
                Ok(cmds) => info!("Registered {} global commands", cmds.len()),
                Err(e) => error!("Failed to register global commands: {}", e),
            }
        }

        for guild in &ready.guilds {
            self.state.post_loops.start(
                guild.id.get(),
                ctx.http.clone(),
                self.state.store.clone(),
                self.state.tracker.clone(),
            );
        }
        info!("Posting loops running for {} guilds", self.state.post_loops.len());
    }

    async fn guild_create(&self, ctx: Context, guild: Guild, is_new: Option<bool>) {
        self.state.post_loops.start(
            guild.id.get(),
            ctx.http.clone(),
            self.state.store.clone(),
            self.state.tracker.clone(),
        );

        if is_new != Some(true) {
            return;
        }
        info!("Joined new guild {} ({})", guild.name, guild.id);

        let Some(channel_id) = welcome_channel(&guild) else {
            debug!("No writable text channel found in guild {}", guild.id);
            return;
        };
        if let Err(e) = channel_id
            .send_message(
                &ctx.http,
                CreateMessage::new().embed(commands::help::welcome_embed()),
            )
            .await
        {
            warn!("Failed to send welcome message in guild {}: {}", guild.id, e);
        }
    }

    async fn guild_delete(&self, _ctx: Context, incomplete: UnavailableGuild, _full: Option<Guild>) {
        // An unavailable guild is an outage, not a removal; keep its loop.
        if incomplete.unavailable {
            return;
        }
        info!("Removed from guild {}", incomplete.id);
        self.state.post_loops.stop(incomplete.id.get());
    }

    async fn reaction_add(&self, ctx: Context, reaction: Reaction) {
        let Some(user_id) = reaction.user_id else {
            return;
        };
        let bot_id = ctx.cache.current_user().id;
        if user_id == bot_id {
            return;
        }
        if self.state.is_banned(user_id.get()) {
            return;
        }

        let emoji = reaction.emoji.to_string();
        let message_id = reaction.message_id.get();
        if !self.state.debouncer.admit(user_id.get(), message_id, &emoji) {
            debug!("Dropped duplicate reaction from {} on {}", user_id, message_id);
            return;
        }

        // Only reactions to the bot's own image posts count. Tracked ids
        // cover recent posts, deleted ones included; anything else needs a
        // message fetch to confirm authorship.
        if !self.state.tracker.is_tracked(message_id) {
            match reaction.message(&ctx.http).await {
                Ok(message) if message.author.id == bot_id => {}
                Ok(_) => return,
                Err(e) => {
                    debug!("Cannot verify reacted message {}: {}", message_id, e);
                    return;
                }
            }
        }

        let guild_key = reaction
            .guild_id
            .map(|g| g.get().to_string())
            .unwrap_or_else(|| DM_GUILD_KEY.to_string());

        let total = match self.state.store.increment_sighting(&guild_key, user_id.get()) {
            Ok(total) => total,
            Err(e) => {
                error!("Failed to record sighting for {}: {}", user_id, e);
                return;
            }
        };
        info!(
            "Sighting recorded: user {} in {} via {} (total {})",
            user_id, guild_key, emoji, total
        );

        // Names come out of the cache before the log send awaits.
        let Some(guild_id) = reaction.guild_id else {
            return;
        };
        let guild_name = ctx
            .cache
            .guild(guild_id)
            .map(|g| g.name.clone())
            .unwrap_or_else(|| guild_id.to_string());
        let user_name = ctx
            .cache
            .user(user_id)
            .map(|u| u.display_name().to_string())
            .unwrap_or_else(|| format!("User {}", user_id));

        let state = self.state.clone();
        let http = ctx.http.clone();
        tokio::spawn(async move {
            log_sighting(&http, &state, &guild_name, &user_name, &emoji, message_id, total).await;
        });
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            let state = &self.state;
            let result = match command.data.name.as_str() {
                "help" => commands::help::handle_help(&ctx, &command, state).await,
                "helpadmin" => commands::help::handle_helpadmin(&ctx, &command, state).await,
                "setchannel" => commands::setup::handle_setchannel(&ctx, &command, state).await,
                "testimage" => commands::setup::handle_testimage(&ctx, &command, state).await,
                "usersightings" => {
                    commands::sightings::handle_usersightings(&ctx, &command, state).await
                }
                "localsightings" => {
                    commands::sightings::handle_localsightings(&ctx, &command, state).await
                }
                "globalsightings" => {
                    commands::sightings::handle_globalsightings(&ctx, &command, state).await
                }
                "alien" => commands::alien::handle_alien(&ctx, &command, state).await,
                "support" => commands::support::handle_support(&ctx, &command, state).await,
                "supportchannel" => {
                    commands::support::handle_supportchannel(&ctx, &command, state).await
                }
                "reply" => commands::support::handle_reply(&ctx, &command, state).await,
                "closeticket" => commands::support::handle_closeticket(&ctx, &command, state).await,
                "ticketstats" => commands::support::handle_ticketstats(&ctx, &command, state).await,
                "alltickets" => commands::support::handle_alltickets(&ctx, &command, state).await,
                "ban" => commands::ban::handle_ban(&ctx, &command, state).await,
                "unban" => commands::ban::handle_unban(&ctx, &command, state).await,
                "baninfo" => commands::ban::handle_baninfo(&ctx, &command, state).await,
                "banlist" => commands::ban::handle_banlist(&ctx, &command, state).await,
                "botinfo" => commands::admin::handle_botinfo(&ctx, &command, state).await,
                "sync" => commands::admin::handle_sync(&ctx, &command, state).await,
                "authorize" => commands::admin::handle_authorize(&ctx, &command, state).await,
                "deauthorize" => commands::admin::handle_deauthorize(&ctx, &command, state).await,
                "listauthorized" => {
                    commands::admin::handle_listauthorized(&ctx, &command, state).await
                }
                "setlogchannel" => {
                    commands::admin::handle_setlogchannel(&ctx, &command, state).await
                }
                "globalmessage" => {
                    commands::admin::handle_globalmessage(&ctx, &command, state).await
                }
                "testsetup" => commands::admin::handle_testsetup(&ctx, &command, state).await,
                _ => Ok(()),
            };

            if let Err(e) = result {
                error!("Command /{} error: {}", command.data.name, e);
            }
        }
    }
}

/// Channel names preferred for the welcome message.
const WELCOME_CHANNEL_NAMES: [&str; 4] = ["general", "announcements", "bot-commands", "welcome"];

/// Channel for the welcome message: a preferred-name text channel if one
/// exists, otherwise the topmost text channel.
fn welcome_channel(guild: &Guild) -> Option<ChannelId> {
    for name in WELCOME_CHANNEL_NAMES {
        if let Some(channel) = guild
            .channels
            .values()
            .find(|c| c.kind == ChannelType::Text && c.name == name)
        {
            return Some(channel.id);
        }
    }
    let mut text_channels: Vec<_> = guild
        .channels
        .values()
        .filter(|c| c.kind == ChannelType::Text)
        .collect();
    text_channels.sort_by_key(|c| c.position);
    text_channels.first().map(|c| c.id)
}

/// Sighting record for the global log channel. Guild sightings only; DM
/// reactions are counted but not logged.
async fn log_sighting(
    http: &Arc<Http>,
    state: &BotState,
    guild_name: &str,
    user_name: &str,
    emoji: &str,
    message_id: u64,
    total: u64,
) {
    let log_channel = match state.store.global_log_channel() {
        Ok(Some(id)) => id,
        Ok(None) => return,
        Err(e) => {
            warn!("Failed to read global log channel: {}", e);
            return;
        }
    };

    let embed = CreateEmbed::new()
        .title("👽 New UFO Sighting!")
        .colour(0x00ff41)
        .timestamp(Timestamp::now())
        .field("👤 Spotter", format!("**{}**", user_name), true)
        .field("🏛️ Server", guild_name, true)
        .field("✨ Reaction", emoji, true)
        .field("📊 Their Total", total.to_string(), true)
        .field("🔗 Message ID", format!("`{}`", message_id), true)
        .footer(CreateEmbedFooter::new("UFO Sighting Tracking System"));

    if let Err(e) = ChannelId::new(log_channel)
        .send_message(http, CreateMessage::new().embed(embed))
        .await
    {
        warn!("Failed to log sighting to global channel: {}", e);
    }
}

/// Create and run the Discord bot
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Arc::new(config);
    let store = Arc::new(Store::new(config.data_dir.clone()));

    let alien = config.gemini_api_key.clone().map(AlienChat::new);
    if alien.is_none() {
        warn!("GEMINI_API_KEY not set; /alien will report the array offline");
    }

    let state = Arc::new(BotState {
        config: config.clone(),
        store,
        debouncer: ReactionDebouncer::new(),
        tracker: Arc::new(MessageTracker::new()),
        alien,
        post_loops: PostLoops::new(),
        started_at: Instant::now(),
    });

    let handler = Handler {
        state: state.clone(),
    };

    let intents = GatewayIntents::non_privileged();
    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await?;

    info!("Starting bot...");
    client.start().await?;

    Ok(())
}
