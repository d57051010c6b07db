//! Channel setup and testing commands: /setchannel, /testimage

use serenity::all::{
    CommandInteraction, Context, CreateCommand, CreateInteractionResponseFollowup,
};

use crate::bot::BotState;
use crate::commands::{respond, CommandResult};
use crate::poster;
use crate::storage::DM_GUILD_KEY;

pub fn register() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new("setchannel").description("Set this channel for image messages"),
        CreateCommand::new("testimage")
            .description("Send a test image that deletes after 4 seconds (Admin only)"),
    ]
}

fn invoker_can_manage_guild(command: &CommandInteraction) -> bool {
    command
        .member
        .as_ref()
        .and_then(|member| member.permissions)
        .map(|perms| perms.manage_guild())
        .unwrap_or(false)
}

pub async fn handle_setchannel(
    ctx: &Context,
    command: &CommandInteraction,
    state: &BotState,
) -> CommandResult {
    let Some(guild_id) = command.guild_id else {
        respond(ctx, command, "❌ This command must be used in a server.", true).await?;
        return Ok(());
    };

    if !invoker_can_manage_guild(command) {
        respond(
            ctx,
            command,
            "❌ You need the Manage Server permission to use this command.",
            true,
        )
        .await?;
        return Ok(());
    }

    state
        .store
        .set_post_channel(guild_id.get(), command.channel_id.get())?;

    respond(
        ctx,
        command,
        &format!(
            "✅ This channel (<#{}>) has been set for image messages.",
            command.channel_id
        ),
        true,
    )
    .await?;
    Ok(())
}

pub async fn handle_testimage(
    ctx: &Context,
    command: &CommandInteraction,
    state: &BotState,
) -> CommandResult {
    if !state.is_admin(command.user.id.get()) {
        respond(
            ctx,
            command,
            "❌ You need admin permissions to use this command.",
            true,
        )
        .await?;
        return Ok(());
    }

    command.defer_ephemeral(&ctx.http).await?;

    let guild_key = command
        .guild_id
        .map(|g| g.get().to_string())
        .unwrap_or_else(|| DM_GUILD_KEY.to_string());

    let result = poster::post_test_image(
        &ctx.http,
        &state.tracker,
        command.channel_id.get(),
        &guild_key,
    )
    .await;

    let content = match result {
        Ok(()) => "✅ Test image sent, reacted, and deleted.".to_string(),
        Err(e) => format!("❌ Failed: {}", e),
    };

    command
        .create_followup(
            &ctx.http,
            CreateInteractionResponseFollowup::new()
                .content(content)
                .ephemeral(true),
        )
        .await?;
    Ok(())
}
