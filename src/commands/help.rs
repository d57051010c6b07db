//! Help commands: /help, /helpadmin

use serenity::all::{
    CommandInteraction, Context, CreateCommand, CreateEmbed, CreateEmbedFooter, Timestamp,
};

use crate::bot::BotState;
use crate::commands::{respond_embed, CommandResult};

pub fn register() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new("help").description("Show commands"),
        CreateCommand::new("helpadmin").description("Show admin commands"),
    ]
}

/// Welcome embed shown on guild join and replayed by /testsetup.
pub fn welcome_embed() -> CreateEmbed {
    CreateEmbed::new()
        .title("🛸 Welcome to UFO Sighting Bot!")
        .description(
            "Thanks for adding me to your server! Let's get you set up to start tracking alien encounters.",
        )
        .colour(0x00ff41)
        .timestamp(Timestamp::now())
        .field(
            "🚀 Quick Setup",
            "To get started, an admin needs to run `/setchannel` in the channel where you want UFO images to appear.",
            false,
        )
        .field(
            "📋 What I Do",
            "• Send random UFO images at random intervals\n\
             • Track 👽 reactions as \"sightings\"\n\
             • Provide leaderboards for top alien spotters\n\
             • Offer admin tools for bot management",
            false,
        )
        .field(
            "🔧 Essential Commands",
            "**Setup:**\n\
             `/setchannel` - Set the UFO images channel\n\
             `/help` - View all available commands\n\n\
             **For Users:**\n\
             `/localsightings` - Server leaderboard\n\
             `/globalsightings` - Global leaderboard\n\
             `/support` - Get help or report issues",
            false,
        )
        .field(
            "🎯 How It Works",
            "1. Set a channel with `/setchannel`\n\
             2. I'll start posting UFO images randomly\n\
             3. Users react with 👽 to log sightings\n\
             4. Check leaderboards to see top spotters!",
            false,
        )
        .footer(CreateEmbedFooter::new(
            "Need help? Use /support or /help • Ready to start? Use /setchannel!",
        ))
}

pub async fn handle_help(
    ctx: &Context,
    command: &CommandInteraction,
    _state: &BotState,
) -> CommandResult {
    let user_commands = [
        "`/usersightings` - See your UFO sightings across all servers (or check another user)",
        "`/localsightings` - See your UFO sightings in this server",
        "`/globalsightings` - See your total sightings across all servers",
        "`/alien <message>` - Chat with an alien using AI",
        "`/support <message>` - Send a support request to administrators",
        "`/closeticket <ticket_id>` - Close one of your own support tickets",
        "`/help` - Show this help message",
        "`/helpadmin` - Show admin commands (if you're an admin)",
    ];

    let mut embed = CreateEmbed::new()
        .title("UFO Sighting Bot Commands")
        .description("Here are all the commands you can use:")
        .colour(0x00ff41)
        .timestamp(Timestamp::now())
        .field("🛸 User Commands", user_commands.join("\n"), false)
        .field(
            "ℹ️ How it works",
            "React to UFO images with any emoji to track your sightings!\nUse `/usersightings` to see your progress across all servers.",
            false,
        );

    if command.guild_id.is_some() {
        embed = embed.field(
            "⚙️ Setup Commands",
            "`/setchannel` - Set this channel for UFO image messages",
            false,
        );
    }

    embed = embed.footer(CreateEmbedFooter::new(format!(
        "Requested by {}",
        command.user.display_name()
    )));

    respond_embed(ctx, command, embed, true).await?;
    Ok(())
}

pub async fn handle_helpadmin(
    ctx: &Context,
    command: &CommandInteraction,
    state: &BotState,
) -> CommandResult {
    if !state.is_admin(command.user.id.get()) {
        let embed = CreateEmbed::new()
            .title("Access Denied")
            .description("You need admin permissions to view admin commands.")
            .colour(0xff0000);
        respond_embed(ctx, command, embed, true).await?;
        return Ok(());
    }

    let admin_commands = [
        "`/botinfo` - Display bot system information and stats",
        "`/sync` - Manually re-sync slash commands",
        "`/authorize <user>` - Add user to the admin list",
        "`/deauthorize <user>` - Remove user from the admin list",
        "`/listauthorized` - List all admin users",
        "`/setlogchannel [channel]` - Set global logging channel (logs all servers)",
        "`/supportchannel [channel]` - Set channel for support requests",
        "`/reply <ticket_id> <response>` - Reply to a support ticket",
        "`/ticketstats` - View support ticket statistics",
        "`/alltickets` - View all open support tickets",
        "`/ban <user> [reason]` - Ban a user from using the bot",
        "`/unban <user>` - Unban a user from using the bot",
        "`/baninfo <user>` - Show a user's ban record",
        "`/banlist` - List all banned users",
        "`/globalmessage <message>` - Send a message to all servers",
        "`/testimage` - Send a test UFO image",
        "`/testsetup` - Replay the welcome setup message",
    ];

    let embed = CreateEmbed::new()
        .title("UFO Sighting Bot - Admin Commands")
        .description("Administrative commands:")
        .colour(0xff6600)
        .timestamp(Timestamp::now())
        .field("🔧 Admin Commands", admin_commands.join("\n"), false)
        .field(
            "ℹ️ Admin Info",
            "Admin commands require special permissions.\nContact the bot owner if you need access.",
            false,
        )
        .footer(CreateEmbedFooter::new(format!(
            "Admin help requested by {}",
            command.user.display_name()
        )));

    respond_embed(ctx, command, embed, true).await?;
    Ok(())
}
