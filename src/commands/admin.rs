//! Bot administration commands: /botinfo, /sync, /authorize, /deauthorize,
//! /listauthorized, /setlogchannel, /globalmessage, /testsetup

use std::time::Duration;

use serenity::all::{
    ChannelId, ChannelType, Command, CommandInteraction, CommandOptionType, Context,
    CreateCommand, CreateCommandOption, CreateEmbed, CreateEmbedFooter,
    CreateInteractionResponseFollowup, CreateMessage, GuildId, Timestamp,
};
use sysinfo::System;
use tracing::warn;

use crate::bot::BotState;
use crate::commands::{
    self, help, option_channel_id, option_str, option_user_id, respond, respond_embed,
    CommandResult,
};

pub fn register() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new("botinfo").description("Display bot information (Admin only)"),
        CreateCommand::new("sync").description("Manually sync slash commands (Admin only)"),
        CreateCommand::new("authorize")
            .description("Add user to admin list (Admin only)")
            .add_option(
                CreateCommandOption::new(CommandOptionType::User, "user", "The user to authorize")
                    .required(true),
            ),
        CreateCommand::new("deauthorize")
            .description("Remove user from admin list (Admin only)")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::User,
                    "user",
                    "The user to deauthorize",
                )
                .required(true),
            ),
        CreateCommand::new("listauthorized").description("List all admin users (Admin only)"),
        CreateCommand::new("setlogchannel")
            .description("Set global logging channel for ALL servers (Admin only)")
            .add_option(CreateCommandOption::new(
                CommandOptionType::Channel,
                "channel",
                "Channel for logs (defaults to this one)",
            )),
        CreateCommand::new("globalmessage")
            .description("Send a message to all servers (Admin only)")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "message",
                    "The announcement to broadcast",
                )
                .required(true),
            ),
        CreateCommand::new("testsetup")
            .description("Replay the welcome setup message (Admin only)"),
    ]
}

async fn deny_admin(ctx: &Context, command: &CommandInteraction) -> CommandResult {
    respond(
        ctx,
        command,
        "❌ You need admin permissions to use this command.",
        true,
    )
    .await?;
    Ok(())
}

/// Human-readable uptime, largest two units.
fn format_uptime(uptime: Duration) -> String {
    let total = uptime.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

pub async fn handle_botinfo(
    ctx: &Context,
    command: &CommandInteraction,
    state: &BotState,
) -> CommandResult {
    if !state.is_admin(command.user.id.get()) {
        return deny_admin(ctx, command).await;
    }

    let uptime = format_uptime(state.started_at.elapsed());

    let mut sys = System::new_all();
    sys.refresh_all();
    let memory_mb = sysinfo::get_current_pid()
        .ok()
        .and_then(|pid| sys.process(pid))
        .map(|process| process.memory() / 1_048_576)
        .unwrap_or(0);
    let platform = format!(
        "{} {}",
        System::name().unwrap_or_else(|| "Unknown".to_string()),
        System::os_version().unwrap_or_default()
    );

    let counts = state.store.load_counts()?;
    let total_sightings: u64 = counts
        .values()
        .flat_map(|users| users.values())
        .sum();
    let configured_channels = state
        .store
        .server_config()?
        .guilds
        .values()
        .filter(|cfg| cfg.channel_id.is_some())
        .count();

    let embed = CreateEmbed::new()
        .title("🛸 UFO Sighting Bot Info")
        .colour(0x00ff41)
        .timestamp(Timestamp::now())
        .field("⏰ Uptime", uptime, true)
        .field("🖥️ Platform", platform, true)
        .field("💾 Memory Usage", format!("{} MB", memory_mb), true)
        .field("🏛️ Servers", ctx.cache.guild_count().to_string(), true)
        .field("👥 Cached Users", ctx.cache.user_count().to_string(), true)
        .field("📡 Active Post Loops", state.post_loops.len().to_string(), true)
        .field("👽 Total Sightings", total_sightings.to_string(), true)
        .field(
            "📺 Configured Channels",
            configured_channels.to_string(),
            true,
        )
        .footer(CreateEmbedFooter::new(format!(
            "Requested by {}",
            command.user.display_name()
        )));

    respond_embed(ctx, command, embed, true).await?;
    Ok(())
}

pub async fn handle_sync(
    ctx: &Context,
    command: &CommandInteraction,
    state: &BotState,
) -> CommandResult {
    if !state.is_admin(command.user.id.get()) {
        return deny_admin(ctx, command).await;
    }

    command.defer_ephemeral(&ctx.http).await?;

    let definitions = commands::register_all();
    let count = definitions.len();
    let scope = match state.config.guild_id {
        Some(guild_id) => {
            GuildId::new(guild_id)
                .set_commands(&ctx.http, definitions)
                .await?;
            format!("guild {}", guild_id)
        }
        None => {
            Command::set_global_commands(&ctx.http, definitions).await?;
            "global".to_string()
        }
    };

    command
        .create_followup(
            &ctx.http,
            CreateInteractionResponseFollowup::new()
                .content(format!("✅ Synced {} commands ({}).", count, scope))
                .ephemeral(true),
        )
        .await?;
    Ok(())
}

pub async fn handle_authorize(
    ctx: &Context,
    command: &CommandInteraction,
    state: &BotState,
) -> CommandResult {
    if !state.is_admin(command.user.id.get()) {
        return deny_admin(ctx, command).await;
    }

    let options = command.data.options();
    let Some(user_id) = option_user_id(&options, "user") else {
        respond(ctx, command, "❌ A user is required.", true).await?;
        return Ok(());
    };

    if state.store.add_admin(user_id)? {
        respond(
            ctx,
            command,
            &format!("✅ <@{}> has been added to the admin list.", user_id),
            true,
        )
        .await?;
    } else {
        respond(
            ctx,
            command,
            &format!("ℹ️ <@{}> is already an admin.", user_id),
            true,
        )
        .await?;
    }
    Ok(())
}

pub async fn handle_deauthorize(
    ctx: &Context,
    command: &CommandInteraction,
    state: &BotState,
) -> CommandResult {
    if !state.is_admin(command.user.id.get()) {
        return deny_admin(ctx, command).await;
    }

    let options = command.data.options();
    let Some(user_id) = option_user_id(&options, "user") else {
        respond(ctx, command, "❌ A user is required.", true).await?;
        return Ok(());
    };

    if state.store.remove_admin(user_id)? {
        respond(
            ctx,
            command,
            &format!("✅ <@{}> has been removed from the admin list.", user_id),
            true,
        )
        .await?;
    } else {
        respond(
            ctx,
            command,
            &format!("ℹ️ <@{}> is not in the admin list.", user_id),
            true,
        )
        .await?;
    }
    Ok(())
}

pub async fn handle_listauthorized(
    ctx: &Context,
    command: &CommandInteraction,
    state: &BotState,
) -> CommandResult {
    if !state.is_admin(command.user.id.get()) {
        return deny_admin(ctx, command).await;
    }

    let admins = state.store.admin_users()?;
    let mut lines = Vec::new();
    if let Some(owner_id) = state.config.owner_id {
        lines.push(format!("• <@{}> (`{}`) — owner", owner_id, owner_id));
    }
    for user_id in &admins {
        lines.push(format!("• <@{}> (`{}`)", user_id, user_id));
    }

    let embed = if lines.is_empty() {
        CreateEmbed::new()
            .title("🔑 Authorized Admins")
            .description("No admin users are configured.")
            .colour(0xff9900)
    } else {
        CreateEmbed::new()
            .title("🔑 Authorized Admins")
            .description(lines.join("\n"))
            .colour(0x00ff41)
            .footer(CreateEmbedFooter::new(format!("Total: {}", lines.len())))
    };

    respond_embed(ctx, command, embed, true).await?;
    Ok(())
}

pub async fn handle_setlogchannel(
    ctx: &Context,
    command: &CommandInteraction,
    state: &BotState,
) -> CommandResult {
    if !state.is_admin(command.user.id.get()) {
        return deny_admin(ctx, command).await;
    }

    let options = command.data.options();
    let channel_id =
        option_channel_id(&options, "channel").unwrap_or_else(|| command.channel_id.get());

    state.store.set_global_log_channel(channel_id)?;

    let embed = CreateEmbed::new()
        .title("📋 Global Log Channel Set")
        .description(format!(
            "Bot activity from **ALL servers** will now be logged to <#{}>",
            channel_id
        ))
        .colour(0x00ff41)
        .timestamp(Timestamp::now())
        .field(
            "📊 What gets logged:",
            "• 👽 Reaction sightings from all servers\n• 🛸 UFO image posts from all servers\n• Server names included in logs",
            false,
        )
        .footer(CreateEmbedFooter::new(format!(
            "Set by {}",
            command.user.display_name()
        )));

    respond_embed(ctx, command, embed, true).await?;

    let test_embed = CreateEmbed::new()
        .title("🌍 Global Logging Activated")
        .description("This channel is now receiving UFO Sighting Bot logs from all servers.")
        .colour(0x4169E1)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new("UFO Sighting Bot Global Logs"));

    if let Err(e) = ChannelId::new(channel_id)
        .send_message(&ctx.http, CreateMessage::new().embed(test_embed))
        .await
    {
        warn!("Cannot send to log channel {}: {}", channel_id, e);
        command
            .create_followup(
                &ctx.http,
                CreateInteractionResponseFollowup::new()
                    .content(format!(
                        "⚠️ I could not send a test message to <#{}>. Check my permissions there.",
                        channel_id
                    ))
                    .ephemeral(true),
            )
            .await?;
    }
    Ok(())
}

/// Channel names tried, in order, when a guild has no configured channel.
const FALLBACK_CHANNEL_NAMES: [&str; 4] = ["general", "announcements", "bot-commands", "ufo"];

async fn broadcast_channel_for(
    ctx: &Context,
    state: &BotState,
    guild_id: GuildId,
) -> Option<ChannelId> {
    if let Ok(Some(cfg)) = state.store.guild_config(guild_id.get()) {
        if let Some(log_channel) = cfg.log_channel_id {
            return Some(ChannelId::new(log_channel));
        }
        if let Some(post_channel) = cfg.channel_id {
            return Some(ChannelId::new(post_channel));
        }
    }

    let channels = guild_id.channels(&ctx.http).await.ok()?;
    for name in FALLBACK_CHANNEL_NAMES {
        if let Some(channel) = channels
            .values()
            .find(|c| c.kind == ChannelType::Text && c.name == name)
        {
            return Some(channel.id);
        }
    }
    channels
        .values()
        .find(|c| c.kind == ChannelType::Text)
        .map(|c| c.id)
}

pub async fn handle_globalmessage(
    ctx: &Context,
    command: &CommandInteraction,
    state: &BotState,
) -> CommandResult {
    if !state.is_admin(command.user.id.get()) {
        return deny_admin(ctx, command).await;
    }

    let options = command.data.options();
    let Some(message) = option_str(&options, "message") else {
        respond(ctx, command, "❌ A message is required.", true).await?;
        return Ok(());
    };
    let message = message.to_string();

    command.defer_ephemeral(&ctx.http).await?;

    let announcement = CreateEmbed::new()
        .title("📢 Announcement from UFO Sighting Bot")
        .description(&message)
        .colour(0x4169E1)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(
            "This message was sent to all servers",
        ));

    let guild_ids: Vec<GuildId> = ctx.cache.guilds();
    let mut sent = 0usize;
    let mut failed = 0usize;

    for guild_id in guild_ids {
        match broadcast_channel_for(ctx, state, guild_id).await {
            Some(channel_id) => {
                match channel_id
                    .send_message(&ctx.http, CreateMessage::new().embed(announcement.clone()))
                    .await
                {
                    Ok(_) => sent += 1,
                    Err(e) => {
                        warn!("Broadcast to guild {} failed: {}", guild_id, e);
                        failed += 1;
                    }
                }
            }
            None => failed += 1,
        }
    }

    let summary = CreateEmbed::new()
        .title("📤 Global Message Sent")
        .colour(if failed == 0 { 0x00ff41 } else { 0xff9900 })
        .timestamp(Timestamp::now())
        .field("✅ Delivered", sent.to_string(), true)
        .field("❌ Failed", failed.to_string(), true)
        .field("💬 Message", &message, false);

    command
        .create_followup(
            &ctx.http,
            CreateInteractionResponseFollowup::new()
                .embed(summary)
                .ephemeral(true),
        )
        .await?;
    Ok(())
}

pub async fn handle_testsetup(
    ctx: &Context,
    command: &CommandInteraction,
    state: &BotState,
) -> CommandResult {
    if !state.is_admin(command.user.id.get()) {
        return deny_admin(ctx, command).await;
    }

    respond_embed(ctx, command, help::welcome_embed(), true).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_picks_largest_two_units() {
        assert_eq!(format_uptime(Duration::from_secs(42)), "42s");
        assert_eq!(format_uptime(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_uptime(Duration::from_secs(3_661)), "1h 1m");
        assert_eq!(format_uptime(Duration::from_secs(90_000)), "1d 1h");
    }
}
