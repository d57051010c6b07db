//! Bot-level ban commands: /ban, /unban, /baninfo, /banlist
//!
//! These gate on the invoker's guild administrator permission rather than
//! the bot admin list, matching the rest of the moderation surface.

use serenity::all::{
    CommandInteraction, CommandOptionType, Context, CreateCommand, CreateCommandOption,
    CreateEmbed, CreateEmbedFooter, Permissions, Timestamp,
};

use crate::bot::BotState;
use crate::commands::{
    option_member_permissions, option_str, option_user_id, respond_embed, CommandResult,
};

pub fn register() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new("ban")
            .description("Ban user from using bot (admin)")
            .add_option(
                CreateCommandOption::new(CommandOptionType::User, "user", "The user to ban")
                    .required(true),
            )
            .add_option(CreateCommandOption::new(
                CommandOptionType::String,
                "reason",
                "Reason for the ban (optional)",
            )),
        CreateCommand::new("unban")
            .description("Unban user from using bot (admin)")
            .add_option(
                CreateCommandOption::new(CommandOptionType::User, "user", "The user to unban")
                    .required(true),
            ),
        CreateCommand::new("baninfo")
            .description("Show a user's ban record (admin)")
            .add_option(
                CreateCommandOption::new(CommandOptionType::User, "user", "The user to look up")
                    .required(true),
            ),
        CreateCommand::new("banlist").description("List all users banned from the bot (admin)"),
    ]
}

fn invoker_is_guild_admin(command: &CommandInteraction) -> bool {
    command
        .member
        .as_ref()
        .and_then(|member| member.permissions)
        .map(|perms| perms.administrator())
        .unwrap_or(false)
}

/// Fellow guild administrators are off limits for bot bans.
fn target_may_be_banned(target_permissions: Option<Permissions>) -> bool {
    !target_permissions
        .map(|perms| perms.administrator())
        .unwrap_or(false)
}

async fn deny_permission(ctx: &Context, command: &CommandInteraction) -> CommandResult {
    let embed = CreateEmbed::new()
        .title("❌ Permission Denied")
        .description("You need administrator permissions to use this command.")
        .colour(0xff0000);
    respond_embed(ctx, command, embed, true).await?;
    Ok(())
}

pub async fn handle_ban(
    ctx: &Context,
    command: &CommandInteraction,
    state: &BotState,
) -> CommandResult {
    if !invoker_is_guild_admin(command) {
        return deny_permission(ctx, command).await;
    }

    let options = command.data.options();
    let Some(user_id) = option_user_id(&options, "user") else {
        return deny_permission(ctx, command).await;
    };
    let reason = option_str(&options, "reason").unwrap_or("No reason provided");

    if !target_may_be_banned(option_member_permissions(&options, "user")) {
        let embed = CreateEmbed::new()
            .title("🛡️ Cannot Ban Administrator")
            .description(format!(
                "<@{}> has administrator permissions and cannot be banned from the bot.",
                user_id
            ))
            .colour(0xff9900);
        respond_embed(ctx, command, embed, true).await?;
        return Ok(());
    }

    if state.store.is_banned(user_id)? {
        let embed = CreateEmbed::new()
            .title("⚠️ Already Banned")
            .description(format!(
                "<@{}> is already banned from using the bot.",
                user_id
            ))
            .colour(0xff9900);
        respond_embed(ctx, command, embed, true).await?;
        return Ok(());
    }

    state.store.ban(user_id, reason, command.user.id.get())?;

    let embed = CreateEmbed::new()
        .title("🔨 User Banned")
        .description(format!(
            "<@{}> has been banned from using the UFO Sighting Bot.",
            user_id
        ))
        .colour(0xff0000)
        .timestamp(Timestamp::now())
        .field("Reason", reason, false)
        .field("Banned by", format!("<@{}>", command.user.id), true)
        .footer(CreateEmbedFooter::new(format!("User ID: {}", user_id)));

    respond_embed(ctx, command, embed, false).await?;
    Ok(())
}

pub async fn handle_unban(
    ctx: &Context,
    command: &CommandInteraction,
    state: &BotState,
) -> CommandResult {
    if !invoker_is_guild_admin(command) {
        return deny_permission(ctx, command).await;
    }

    let options = command.data.options();
    let Some(user_id) = option_user_id(&options, "user") else {
        return deny_permission(ctx, command).await;
    };

    let Some(ban_info) = state.store.ban_info(user_id)? else {
        let embed = CreateEmbed::new()
            .title("⚠️ Not Banned")
            .description(format!("<@{}> is not currently banned.", user_id))
            .colour(0xff9900);
        respond_embed(ctx, command, embed, true).await?;
        return Ok(());
    };

    state.store.unban(user_id)?;

    let embed = CreateEmbed::new()
        .title("✅ User Unbanned")
        .description(format!(
            "<@{}> has been unbanned and can now use the UFO Sighting Bot.",
            user_id
        ))
        .colour(0x00ff00)
        .timestamp(Timestamp::now())
        .field("Unbanned by", format!("<@{}>", command.user.id), true)
        .field("Original Ban Reason", ban_info.reason, false)
        .footer(CreateEmbedFooter::new(format!("User ID: {}", user_id)));

    respond_embed(ctx, command, embed, false).await?;
    Ok(())
}

pub async fn handle_baninfo(
    ctx: &Context,
    command: &CommandInteraction,
    state: &BotState,
) -> CommandResult {
    if !invoker_is_guild_admin(command) {
        return deny_permission(ctx, command).await;
    }

    let options = command.data.options();
    let Some(user_id) = option_user_id(&options, "user") else {
        return deny_permission(ctx, command).await;
    };

    let embed = match state.store.ban_info(user_id)? {
        Some(info) => CreateEmbed::new()
            .title("🔎 Ban Record")
            .description(format!("<@{}> is banned from using the bot.", user_id))
            .colour(0xff6600)
            .field("Reason", info.reason, false)
            .field("Banned by", format!("<@{}>", info.banned_by), true)
            .field("Banned at", info.timestamp, true)
            .footer(CreateEmbedFooter::new(format!("User ID: {}", user_id))),
        None => CreateEmbed::new()
            .title("🔎 Ban Record")
            .description(format!("<@{}> is not banned.", user_id))
            .colour(0x00ff41),
    };

    respond_embed(ctx, command, embed, true).await?;
    Ok(())
}

pub async fn handle_banlist(
    ctx: &Context,
    command: &CommandInteraction,
    state: &BotState,
) -> CommandResult {
    if !invoker_is_guild_admin(command) {
        return deny_permission(ctx, command).await;
    }

    let banned = state.store.banned_users()?;
    let embed = if banned.is_empty() {
        CreateEmbed::new()
            .title("🔨 Banned Users")
            .description("No users are currently banned.")
            .colour(0x00ff41)
    } else {
        let lines: Vec<String> = banned
            .iter()
            .map(|(user_id, entry)| format!("• <@{}> (`{}`) — {}", user_id, user_id, entry.reason))
            .collect();
        CreateEmbed::new()
            .title("🔨 Banned Users")
            .description(lines.join("\n"))
            .colour(0xff6600)
            .footer(CreateEmbedFooter::new(format!("Total: {} banned", banned.len())))
    };

    respond_embed(ctx, command, embed, true).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn administrators_cannot_be_banned() {
        assert!(!target_may_be_banned(Some(Permissions::ADMINISTRATOR)));
        assert!(!target_may_be_banned(Some(
            Permissions::ADMINISTRATOR | Permissions::SEND_MESSAGES
        )));
    }

    #[test]
    fn regular_members_can_be_banned() {
        assert!(target_may_be_banned(Some(Permissions::SEND_MESSAGES)));
        assert!(target_may_be_banned(Some(Permissions::empty())));
        // No member data resolved (user not in the guild): best-effort allow.
        assert!(target_may_be_banned(None));
    }
}
