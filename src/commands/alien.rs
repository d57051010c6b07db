//! /alien chat command, backed by the Gemini client in [`crate::alien`].

use serenity::all::{
    CommandInteraction, CommandOptionType, Context, CreateCommand, CreateCommandOption,
    CreateEmbed, CreateEmbedFooter, CreateInteractionResponseFollowup, Timestamp,
};
use tracing::warn;

use crate::bot::BotState;
use crate::commands::{option_str, respond, respond_embed, CommandResult};

const MAX_MESSAGE_LEN: usize = 500;

/// Limit is in characters, not bytes, so emoji-heavy messages are not
/// penalized.
fn exceeds_limit(message: &str) -> bool {
    message.chars().count() > MAX_MESSAGE_LEN
}

pub fn register() -> Vec<CreateCommand> {
    vec![CreateCommand::new("alien")
        .description("Chat with an alien using AI")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "message",
                "What do you want to say to the alien?",
            )
            .required(true),
        )]
}

pub async fn handle_alien(
    ctx: &Context,
    command: &CommandInteraction,
    state: &BotState,
) -> CommandResult {
    if state.is_banned(command.user.id.get()) {
        let embed = CreateEmbed::new()
            .title("🚫 Access Denied")
            .description("You are banned from using this bot.")
            .colour(0xff0000);
        respond_embed(ctx, command, embed, true).await?;
        return Ok(());
    }

    let Some(alien) = &state.alien else {
        respond(
            ctx,
            command,
            "📡 **Quantum Communication Array Offline**\n\nThe alien communication system is not configured. Contact an administrator.",
            true,
        )
        .await?;
        return Ok(());
    };

    let options = command.data.options();
    let Some(message) = option_str(&options, "message") else {
        respond(ctx, command, "❌ A message is required.", true).await?;
        return Ok(());
    };

    if exceeds_limit(message) {
        respond(
            ctx,
            command,
            "⚡ **Signal Too Strong**\n\nYour transmission exceeds 500 characters. The quantum array cannot process it. Please shorten your message.",
            true,
        )
        .await?;
        return Ok(());
    }

    // Gemini round trips take a while; the response stays public so the
    // whole channel can watch the conversation.
    command.defer(&ctx.http).await?;

    match alien.chat(message).await {
        Ok(response) => {
            let embed = CreateEmbed::new()
                .title("👽 Intergalactic Communication")
                .colour(0x00ff41)
                .timestamp(Timestamp::now())
                .field("📡 YOUR MESSAGE:", message, false)
                .field("🛸 ALIEN RESPONSE:", response, false)
                .footer(CreateEmbedFooter::new(format!(
                    "Communication with {} • Signal: Strong",
                    command.user.display_name()
                )));
            command
                .create_followup(
                    &ctx.http,
                    CreateInteractionResponseFollowup::new().embed(embed),
                )
                .await?;
        }
        Err(e) => {
            warn!("Alien chat failed: {}", e);
            command
                .create_followup(
                    &ctx.http,
                    CreateInteractionResponseFollowup::new().content(e.transmission_notice()),
                )
                .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_counts_characters_not_bytes() {
        // 300 chars but 1200 bytes; must pass.
        assert!(!exceeds_limit(&"👽".repeat(300)));
        assert!(!exceeds_limit(&"a".repeat(500)));
        assert!(exceeds_limit(&"a".repeat(501)));
        assert!(exceeds_limit(&"👽".repeat(501)));
    }
}
