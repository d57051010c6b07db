//! Support ticket commands: /support, /supportchannel, /reply, /closeticket,
//! /ticketstats, /alltickets
//!
//! A ticket is open until an admin replies (which DMs the opener and deletes
//! the ticket) or the owner closes it. There is no archive of closed tickets.

use serenity::all::{
    ChannelId, CommandInteraction, CommandOptionType, Context, CreateCommand,
    CreateCommandOption, CreateEmbed, CreateEmbedFooter, CreateMessage, Timestamp, UserId,
};

use crate::bot::BotState;
use crate::commands::{option_channel_id, option_str, respond, respond_embed, CommandResult};
use crate::storage::TicketStatus;

pub fn register() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new("support")
            .description("Get help")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "message",
                    "Describe your problem or question",
                )
                .required(true),
            ),
        CreateCommand::new("supportchannel")
            .description("Set support channel")
            .add_option(CreateCommandOption::new(
                CommandOptionType::Channel,
                "channel",
                "Channel to receive support requests (defaults to this one)",
            )),
        CreateCommand::new("reply")
            .description("Reply to ticket")
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, "ticket_id", "The ticket ID")
                    .required(true),
            )
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, "response", "Your response")
                    .required(true),
            ),
        CreateCommand::new("closeticket")
            .description("Close support ticket")
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, "ticket_id", "The ticket ID")
                    .required(true),
            ),
        CreateCommand::new("ticketstats").description("View ticket stats"),
        CreateCommand::new("alltickets").description("View all tickets"),
    ]
}

pub async fn handle_support(
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

    let options = command.data.options();
    let Some(message) = option_str(&options, "message") else {
        respond(ctx, command, "❌ A message is required.", true).await?;
        return Ok(());
    };

    let Some(support_channel_id) = state.store.support_channel()? else {
        respond(
            ctx,
            command,
            "❌ No support channel has been configured. Please contact an administrator.",
            true,
        )
        .await?;
        return Ok(());
    };

    let guild_name = command
        .guild_id
        .and_then(|id| ctx.cache.guild(id).map(|g| g.name.clone()))
        .unwrap_or_else(|| "Direct Message".to_string());

    let ticket_id = state.store.create_ticket(
        command.user.id.get(),
        command.user.display_name(),
        command.guild_id.map(|id| id.get()),
        &guild_name,
        message,
    )?;

    let support_embed = CreateEmbed::new()
        .title("🎫 New Support Request")
        .colour(0xff6600)
        .timestamp(Timestamp::now())
        .field("📋 Ticket ID", format!("`{}`", ticket_id), true)
        .field(
            "👤 User",
            format!("**{}**\n`{}`", command.user.display_name(), command.user.id),
            true,
        )
        .field("🏛️ Server", guild_name, true)
        .field("💬 Message", message, false)
        .field(
            "📝 Reply Instructions",
            format!("Use `/reply {} <your response>` to respond to this ticket.", ticket_id),
            false,
        )
        .footer(CreateEmbedFooter::new("UFO Sighting Bot Support System"));

    let send_result = ChannelId::new(support_channel_id)
        .send_message(&ctx.http, CreateMessage::new().embed(support_embed))
        .await;

    match send_result {
        Ok(_) => {
            let user_embed = CreateEmbed::new()
                .title("✅ Support Request Sent")
                .description("Your support request has been sent to the administrators.")
                .colour(0x00ff41)
                .timestamp(Timestamp::now())
                .field("🎫 Ticket ID", format!("`{}`", ticket_id), true)
                .field("⏰ Status", "Open - Awaiting Response", true)
                .field("💬 Your Message", message, false)
                .footer(CreateEmbedFooter::new(
                    "You will receive a DM when an admin responds",
                ));
            respond_embed(ctx, command, user_embed, true).await?;
        }
        Err(e) => {
            respond(
                ctx,
                command,
                &format!("❌ An error occurred while sending your support request: {}", e),
                true,
            )
            .await?;
        }
    }
    Ok(())
}

pub async fn handle_supportchannel(
    ctx: &Context,
    command: &CommandInteraction,
    state: &BotState,
) -> CommandResult {
    if !state.is_admin(command.user.id.get()) {
        respond(
            ctx,
            command,
            "❌ You need admin permissions to set the support channel.",
            true,
        )
        .await?;
        return Ok(());
    }

    let Some(guild_id) = command.guild_id else {
        respond(ctx, command, "❌ This command must be used in a server.", true).await?;
        return Ok(());
    };

    let options = command.data.options();
    let channel_id =
        option_channel_id(&options, "channel").unwrap_or_else(|| command.channel_id.get());

    state.store.set_support_channel(guild_id.get(), channel_id)?;

    let embed = CreateEmbed::new()
        .title("🎫 Support Channel Set")
        .description(format!("Support requests will now be sent to <#{}>", channel_id))
        .colour(0x00ff41)
        .timestamp(Timestamp::now())
        .field(
            "📋 What gets sent here:",
            "• User support requests\n• Ticket IDs for replies\n• User and server information\n• Timestamps",
            false,
        )
        .field(
            "📝 How to reply:",
            "Use `/reply <ticket_id> <your response>` to respond to support tickets.",
            false,
        )
        .footer(CreateEmbedFooter::new(format!(
            "Set by {}",
            command.user.display_name()
        )));

    respond_embed(ctx, command, embed, true).await?;

    // Best-effort activation notice; a failure only means the bot lacks
    // permission in the chosen channel.
    let test_embed = CreateEmbed::new()
        .title("🎫 Support Channel Activated")
        .description("This channel is now receiving UFO Sighting Bot support requests.")
        .colour(0x4169E1)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new("UFO Sighting Bot Support System"));

    if let Err(e) = ChannelId::new(channel_id)
        .send_message(&ctx.http, CreateMessage::new().embed(test_embed))
        .await
    {
        tracing::warn!("Cannot send to support channel {}: {}", channel_id, e);
    }
    Ok(())
}

pub async fn handle_reply(
    ctx: &Context,
    command: &CommandInteraction,
    state: &BotState,
) -> CommandResult {
    if !state.is_admin(command.user.id.get()) {
        respond(
            ctx,
            command,
            "❌ You need admin permissions to reply to support tickets.",
            true,
        )
        .await?;
        return Ok(());
    }

    let options = command.data.options();
    let (Some(ticket_id), Some(response)) = (
        option_str(&options, "ticket_id"),
        option_str(&options, "response"),
    ) else {
        respond(ctx, command, "❌ Ticket ID and response are required.", true).await?;
        return Ok(());
    };

    let Some(ticket) = state.store.get_ticket(ticket_id)? else {
        respond(
            ctx,
            command,
            &format!("❌ Ticket `{}` not found. Please check the ticket ID.", ticket_id),
            true,
        )
        .await?;
        return Ok(());
    };

    if ticket.status != TicketStatus::Open {
        respond(
            ctx,
            command,
            &format!(
                "❌ Ticket `{}` is already closed. Use `/alltickets` to see open tickets.",
                ticket_id
            ),
            true,
        )
        .await?;
        return Ok(());
    }

    let Ok(user) = ctx.http.get_user(UserId::new(ticket.user_id)).await else {
        respond(
            ctx,
            command,
            &format!(
                "❌ Could not find user for ticket `{}`. They may have left Discord.",
                ticket_id
            ),
            true,
        )
        .await?;
        return Ok(());
    };

    let user_embed = CreateEmbed::new()
        .title("📬 Support Response Received")
        .colour(0x00ff41)
        .timestamp(Timestamp::now())
        .field("🎫 Ticket ID", format!("`{}`", ticket_id), true)
        .field("💬 Your Original Message", &ticket.message, false)
        .field("📝 Admin Response", response, false)
        .field(
            "🔄 Need More Help?",
            "Use `/support <message>` to create a new support request if you need further assistance.",
            false,
        )
        .footer(CreateEmbedFooter::new(format!(
            "Responded by {}",
            command.user.display_name()
        )));

    match user
        .direct_message(&ctx.http, CreateMessage::new().embed(user_embed))
        .await
    {
        Ok(_) => {
            // The ticket is resolved once the reply lands; no archive kept.
            state.store.delete_ticket(ticket_id)?;

            let admin_embed = CreateEmbed::new()
                .title("✅ Reply Sent Successfully")
                .description(format!(
                    "Your response has been sent to **{}** via DM.",
                    ticket.user_name
                ))
                .colour(0x00ff41)
                .timestamp(Timestamp::now())
                .field("🎫 Ticket ID", format!("`{}`", ticket_id), true)
                .field("👤 User", format!("**{}**", ticket.user_name), true)
                .field("📝 Your Response", response, false)
                .footer(CreateEmbedFooter::new("Ticket has been marked as closed"));
            respond_embed(ctx, command, admin_embed, true).await?;
        }
        Err(_) => {
            respond(
                ctx,
                command,
                &format!(
                    "❌ Could not send DM to **{}**. They may have DMs disabled or have blocked the bot.",
                    ticket.user_name
                ),
                true,
            )
            .await?;
        }
    }
    Ok(())
}

pub async fn handle_closeticket(
    ctx: &Context,
    command: &CommandInteraction,
    state: &BotState,
) -> CommandResult {
    let options = command.data.options();
    let Some(ticket_id) = option_str(&options, "ticket_id") else {
        respond(ctx, command, "❌ A ticket ID is required.", true).await?;
        return Ok(());
    };

    let Some(ticket) = state.store.get_ticket(ticket_id)? else {
        respond(ctx, command, &format!("❌ Ticket `{}` not found.", ticket_id), true).await?;
        return Ok(());
    };

    if ticket.user_id != command.user.id.get() {
        respond(ctx, command, "❌ You can only close your own tickets.", true).await?;
        return Ok(());
    }

    if state.store.delete_ticket(ticket_id)? {
        respond(
            ctx,
            command,
            &format!("✅ Your ticket `{}` has been closed and deleted.", ticket_id),
            true,
        )
        .await?;
    } else {
        respond(
            ctx,
            command,
            &format!("❌ Failed to close ticket `{}`.", ticket_id),
            true,
        )
        .await?;
    }
    Ok(())
}

pub async fn handle_ticketstats(
    ctx: &Context,
    command: &CommandInteraction,
    state: &BotState,
) -> CommandResult {
    if !state.is_admin(command.user.id.get()) {
        respond(
            ctx,
            command,
            "❌ You need admin permissions to view ticket statistics.",
            true,
        )
        .await?;
        return Ok(());
    }

    let (total, open) = state.store.ticket_counts()?;
    let open_tickets = state.store.open_tickets()?;

    let mut embed = CreateEmbed::new()
        .title("📊 Support Ticket Statistics")
        .colour(0x4169E1)
        .timestamp(Timestamp::now())
        .field("📈 Total Tickets", total.to_string(), true)
        .field("🟢 Open Tickets", open.to_string(), true)
        .field("🔴 Closed Tickets", (total - open).to_string(), true);

    if !open_tickets.is_empty() {
        let recent: Vec<String> = open_tickets
            .iter()
            .take(5)
            .map(|(id, ticket)| format!("`{}` - **{}**", id, ticket.user_name))
            .collect();
        embed = embed.field("🕐 Recent Open Tickets", recent.join("\n"), false);
    }

    embed = embed.footer(CreateEmbedFooter::new(
        "Use /reply <ticket_id> <response> to respond to tickets",
    ));

    respond_embed(ctx, command, embed, true).await?;
    Ok(())
}

/// Ticket message preview for list embeds. Counts and cuts by character,
/// never mid-codepoint.
fn summarize_message(message: &str) -> String {
    if message.chars().count() <= 100 {
        return message.to_string();
    }
    let mut summary: String = message.chars().take(97).collect();
    summary.push_str("...");
    summary
}

pub async fn handle_alltickets(
    ctx: &Context,
    command: &CommandInteraction,
    state: &BotState,
) -> CommandResult {
    if !state.is_admin(command.user.id.get()) {
        respond(
            ctx,
            command,
            "❌ You need admin permissions to view all tickets.",
            true,
        )
        .await?;
        return Ok(());
    }

    let open_tickets = state.store.open_tickets()?;
    if open_tickets.is_empty() {
        respond(ctx, command, "📭 No open support tickets.", true).await?;
        return Ok(());
    }

    let summaries: Vec<String> = open_tickets
        .iter()
        .map(|(id, ticket)| {
            format!(
                "**`{}`** - {}\n*{}*",
                id,
                ticket.user_name,
                summarize_message(&ticket.message)
            )
        })
        .collect();

    let mut embed = CreateEmbed::new()
        .title("🎫 All Open Support Tickets")
        .colour(0xFF6B35)
        .timestamp(Timestamp::now());

    for (i, chunk) in summaries.chunks(5).enumerate() {
        let start = i * 5 + 1;
        let end = (start + chunk.len()).saturating_sub(1);
        embed = embed.field(
            format!("Tickets ({}-{})", start, end),
            chunk.join("\n\n"),
            false,
        );
    }

    embed = embed.footer(CreateEmbedFooter::new(format!(
        "Total open tickets: {} | Use /reply <ticket_id> <response>",
        open_tickets.len()
    )));

    respond_embed(ctx, command, embed, true).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_messages_pass_through_unchanged() {
        assert_eq!(summarize_message("help"), "help");
        let exactly_hundred = "x".repeat(100);
        assert_eq!(summarize_message(&exactly_hundred), exactly_hundred);
    }

    #[test]
    fn multibyte_near_the_cut_does_not_panic() {
        // 97 chars but 103 bytes; must come back whole.
        let message = format!("{}👽👽", "a".repeat(95));
        assert_eq!(summarize_message(&message), message);
    }

    #[test]
    fn long_messages_are_cut_by_character() {
        let message = "👽".repeat(120);
        let summary = summarize_message(&message);
        assert_eq!(summary.chars().count(), 100);
        assert!(summary.ends_with("..."));
        assert!(summary.starts_with("👽"));
    }
}
