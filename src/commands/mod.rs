//! Slash command modules
//!
//! Each module registers its commands and exposes `handle_*` functions that
//! the event handler dispatches to by command name.

pub mod admin;
pub mod alien;
pub mod ban;
pub mod help;
pub mod setup;
pub mod sightings;
pub mod support;

use serenity::all::{
    CommandInteraction, Context, CreateCommand, CreateEmbed, CreateInteractionResponse,
    CreateInteractionResponseMessage, Permissions, ResolvedOption, ResolvedValue,
};

pub type CommandResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// All slash commands, registered together in `ready`.
pub fn register_all() -> Vec<CreateCommand> {
    let mut commands = Vec::new();
    commands.extend(admin::register());
    commands.extend(alien::register());
    commands.extend(ban::register());
    commands.extend(help::register());
    commands.extend(setup::register());
    commands.extend(sightings::register());
    commands.extend(support::register());
    commands
}

/// Send a plain text response.
pub(crate) async fn respond(
    ctx: &Context,
    command: &CommandInteraction,
    content: &str,
    ephemeral: bool,
) -> Result<(), serenity::Error> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(ephemeral),
            ),
        )
        .await
}

/// Send an embed response.
pub(crate) async fn respond_embed(
    ctx: &Context,
    command: &CommandInteraction,
    embed: CreateEmbed,
    ephemeral: bool,
) -> Result<(), serenity::Error> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .embed(embed)
                    .ephemeral(ephemeral),
            ),
        )
        .await
}

pub(crate) fn option_str<'a>(options: &'a [ResolvedOption<'a>], name: &str) -> Option<&'a str> {
    options.iter().find_map(|opt| match (&opt.value, opt.name) {
        (ResolvedValue::String(value), n) if n == name => Some(*value),
        _ => None,
    })
}

pub(crate) fn option_user_id(options: &[ResolvedOption<'_>], name: &str) -> Option<u64> {
    options.iter().find_map(|opt| match (&opt.value, opt.name) {
        (ResolvedValue::User(user, _), n) if n == name => Some(user.id.get()),
        _ => None,
    })
}

pub(crate) fn option_channel_id(options: &[ResolvedOption<'_>], name: &str) -> Option<u64> {
    options.iter().find_map(|opt| match (&opt.value, opt.name) {
        (ResolvedValue::Channel(channel), n) if n == name => Some(channel.id.get()),
        _ => None,
    })
}

/// Guild permissions of a resolved user option, when the interaction came
/// from a guild and the user is a member there.
pub(crate) fn option_member_permissions(
    options: &[ResolvedOption<'_>],
    name: &str,
) -> Option<Permissions> {
    options.iter().find_map(|opt| match (&opt.value, opt.name) {
        (ResolvedValue::User(_, Some(member)), n) if n == name => member.permissions,
        _ => None,
    })
}
