//! Sighting leaderboard commands: /usersightings, /localsightings, /globalsightings

use serenity::all::{
    CommandInteraction, CommandOptionType, Context, CreateCommand, CreateCommandOption,
    CreateEmbed, CreateEmbedFooter, GuildId, Timestamp, UserId,
};
use std::collections::HashMap;

use crate::bot::BotState;
use crate::commands::{option_user_id, respond, respond_embed, CommandResult};
use crate::storage::ReactionCounts;

pub fn register() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new("usersightings")
            .description("View UFO reaction counts for yourself or another user")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::User,
                    "user",
                    "The user to check sightings for (leave empty for your own sightings)",
                )
                .required(false),
            ),
        CreateCommand::new("localsightings")
            .description("See how many alien sightings you have reacted to in this server"),
        CreateCommand::new("globalsightings")
            .description("See your total alien sightings across all servers"),
    ]
}

/// Counts for one scope sorted by count descending.
fn sorted_desc(counts: &HashMap<String, u64>) -> Vec<(String, u64)> {
    let mut sorted: Vec<(String, u64)> = counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    sorted
}

/// 1-based rank of the user in a sorted leaderboard, if present.
fn rank_of(sorted: &[(String, u64)], user_id: &str) -> Option<usize> {
    sorted.iter().position(|(uid, _)| uid == user_id).map(|i| i + 1)
}

/// Per-user totals summed across every guild.
fn global_totals(counts: &ReactionCounts) -> HashMap<String, u64> {
    let mut totals: HashMap<String, u64> = HashMap::new();
    for guild_counts in counts.values() {
        for (user_id, count) in guild_counts {
            *totals.entry(user_id.clone()).or_insert(0) += count;
        }
    }
    totals
}

fn medal(position: usize) -> String {
    match position {
        1 => "🥇".to_string(),
        2 => "🥈".to_string(),
        3 => "🥉".to_string(),
        other => format!("{}.", other),
    }
}

fn spotter_footer(count: u64) -> &'static str {
    match count {
        0 => "Start your UFO hunting journey!",
        1..=4 => "Keep watching the skies!",
        5..=9 => "You're getting good at this!",
        10..=19 => "You're becoming quite the UFO expert!",
        20..=49 => "Impressive dedication to the truth!",
        _ => "You are a true believer!",
    }
}

fn display_name_for(ctx: &Context, guild_id: Option<GuildId>, user_id: &str) -> String {
    let Ok(id) = user_id.parse::<u64>() else {
        return "Unknown User".to_string();
    };
    if let Some(guild_id) = guild_id {
        if let Some(guild) = ctx.cache.guild(guild_id) {
            if let Some(member) = guild.members.get(&UserId::new(id)) {
                return member.display_name().to_string();
            }
        }
    }
    ctx.cache
        .user(UserId::new(id))
        .map(|u| u.display_name().to_string())
        .unwrap_or_else(|| "Unknown User".to_string())
}

fn guild_name_for(ctx: &Context, guild_id: &str) -> String {
    guild_id
        .parse::<u64>()
        .ok()
        .and_then(|id| ctx.cache.guild(GuildId::new(id)).map(|g| g.name.clone()))
        .unwrap_or_else(|| format!("Server {}", guild_id))
}

fn leaderboard_lines(
    ctx: &Context,
    guild_id: Option<GuildId>,
    entries: &[(String, u64)],
    highlight_user: &str,
) -> Vec<String> {
    entries
        .iter()
        .enumerate()
        .map(|(i, (uid, count))| {
            let name = display_name_for(ctx, guild_id, uid);
            let emoji = medal(i + 1);
            if uid == highlight_user {
                format!("{} **{}** - **{}** sightings", emoji, name, count)
            } else {
                format!("{} {} - {} sightings", emoji, name, count)
            }
        })
        .collect()
}

pub async fn handle_usersightings(
    ctx: &Context,
    command: &CommandInteraction,
    state: &BotState,
) -> CommandResult {
    let options = command.data.options();
    let target_id = option_user_id(&options, "user").unwrap_or_else(|| command.user.id.get());
    let target_key = target_id.to_string();
    let target_name = display_name_for(ctx, command.guild_id, &target_key);

    let counts = state.store.load_counts()?;

    let mut total = 0u64;
    let mut breakdown = Vec::new();
    for (guild_id, guild_counts) in &counts {
        if let Some(count) = guild_counts.get(&target_key) {
            total += count;
            breakdown.push((guild_name_for(ctx, guild_id), *count));
        }
    }
    breakdown.sort_by(|a, b| b.1.cmp(&a.1));

    let mut embed = CreateEmbed::new()
        .title(format!("👽 UFO Sightings for {}", target_name))
        .timestamp(Timestamp::now());

    if total == 0 {
        embed = embed
            .description(format!(
                "No UFO sightings found for <@{}>.\nReact with 👽 or any emoji to UFO images to start tracking!",
                target_id
            ))
            .colour(0x666666);
    } else {
        embed = embed
            .description(format!("Total sightings across all servers: **{}**", total))
            .colour(0x00ff00)
            .field(
                "📊 Summary",
                format!(
                    "🛸 **{}** total sightings\n🏠 **{}** server{}",
                    total,
                    breakdown.len(),
                    if breakdown.len() == 1 { "" } else { "s" }
                ),
                false,
            );

        let mut details: Vec<String> = breakdown
            .iter()
            .take(10)
            .map(|(name, count)| format!("**{}**: {} sightings", name, count))
            .collect();
        if breakdown.len() > 10 {
            details.push(format!("... and {} more servers", breakdown.len() - 10));
        }
        embed = embed.field("🌍 Server Breakdown", details.join("\n"), false);
    }

    embed = embed.footer(CreateEmbedFooter::new(
        "Use /usersightings @user to check someone else's sightings",
    ));

    respond_embed(ctx, command, embed, false).await?;
    Ok(())
}

pub async fn handle_localsightings(
    ctx: &Context,
    command: &CommandInteraction,
    state: &BotState,
) -> CommandResult {
    let Some(guild_id) = command.guild_id else {
        respond(ctx, command, "❌ This command must be used in a server.", true).await?;
        return Ok(());
    };

    let guild_key = guild_id.get().to_string();
    let user_key = command.user.id.get().to_string();

    let counts = state.store.load_counts()?;
    let guild_counts = counts.get(&guild_key).cloned().unwrap_or_default();
    let user_count = guild_counts.get(&user_key).copied().unwrap_or(0);

    let sorted = sorted_desc(&guild_counts);
    let rank = rank_of(&sorted, &user_key);
    let top_10 = &sorted[..sorted.len().min(10)];

    let user_stats = if user_count == 0 {
        "**No sightings yet**\nStart reacting to UFO images to track your progress".to_string()
    } else {
        let rank_text = rank.map(|r| format!("#{}", r)).unwrap_or_else(|| "Unranked".to_string());
        format!("**{}** sightings spotted\nServer rank: **{}**", user_count, rank_text)
    };

    let mut embed = CreateEmbed::new()
        .title("UFO Sighting Record")
        .colour(0x00ff41)
        .timestamp(Timestamp::now())
        .field(
            format!("{}'s Sightings", command.user.display_name()),
            user_stats,
            false,
        );

    if top_10.is_empty() {
        embed = embed.field(
            "Server Leaderboard",
            "No sightings recorded yet in this server.",
            false,
        );
    } else {
        let lines = leaderboard_lines(ctx, Some(guild_id), top_10, &user_key);
        embed = embed.field("Server Leaderboard", lines.join("\n"), false);
    }

    let total_server: u64 = guild_counts.values().sum();
    let server_stats = if total_server > 0 {
        let percentage = user_count as f64 / total_server as f64 * 100.0;
        format!(
            "**{}** total server sightings\n**{}** active users\nYou've spotted **{:.1}%** of all UFOs here",
            total_server,
            guild_counts.len(),
            percentage
        )
    } else {
        "Be the first to spot a UFO in this server".to_string()
    };
    embed = embed
        .field("Server Statistics", server_stats, false)
        .footer(CreateEmbedFooter::new(spotter_footer(user_count)));

    respond_embed(ctx, command, embed, true).await?;
    Ok(())
}

pub async fn handle_globalsightings(
    ctx: &Context,
    command: &CommandInteraction,
    state: &BotState,
) -> CommandResult {
    let user_key = command.user.id.get().to_string();
    let counts = state.store.load_counts()?;

    let mut total = 0u64;
    let mut breakdown = Vec::new();
    for (guild_id, guild_counts) in &counts {
        if let Some(count) = guild_counts.get(&user_key).copied().filter(|c| *c > 0) {
            total += count;
            breakdown.push((guild_name_for(ctx, guild_id), count));
        }
    }
    breakdown.sort_by(|a, b| b.1.cmp(&a.1));

    let totals = global_totals(&counts);
    let sorted = sorted_desc(&totals);
    let rank = rank_of(&sorted, &user_key);
    let top_15 = &sorted[..sorted.len().min(15)];

    let user_stats = if total == 0 {
        "**No global sightings yet**\nExplore multiple servers to start tracking".to_string()
    } else {
        let rank_text = rank.map(|r| format!("#{}", r)).unwrap_or_else(|| "Unranked".to_string());
        format!(
            "**{}** total sightings across all servers\nGlobal rank: **{}**",
            total, rank_text
        )
    };

    let mut embed = CreateEmbed::new()
        .title("Global UFO Sighting Record")
        .colour(0x4169E1)
        .timestamp(Timestamp::now())
        .field(
            format!("{}'s Global Stats", command.user.display_name()),
            user_stats,
            false,
        );

    if !breakdown.is_empty() {
        let mut lines: Vec<String> = breakdown
            .iter()
            .take(3)
            .map(|(name, count)| format!("**{}**: {} sightings", name, count))
            .collect();
        if breakdown.len() > 3 {
            lines.push("...".to_string());
        }
        embed = embed.field("Sightings by Server (Top 3)", lines.join("\n"), false);
    }

    if top_15.is_empty() {
        embed = embed.field("Global Leaderboard", "No global sightings recorded yet.", false);
    } else {
        let lines = leaderboard_lines(ctx, command.guild_id, top_15, &user_key);
        embed = embed.field("Global Leaderboard", lines.join("\n"), false);
    }

    let total_global: u64 = totals.values().sum();
    let global_stats = if total_global > 0 {
        let percentage = total as f64 / total_global as f64 * 100.0;
        format!(
            "**{}** total global sightings\n**{}** active alien hunters\n**{}** servers with activity\nYou've witnessed **{:.1}%** of all UFO encounters",
            total_global,
            totals.len(),
            counts.len(),
            percentage
        )
    } else {
        "Be the first to discover UFOs across servers".to_string()
    };
    embed = embed
        .field("Global Statistics", global_stats, false)
        .footer(CreateEmbedFooter::new(format!(
            "Requested by {}",
            command.user.display_name()
        )));

    respond_embed(ctx, command, embed, true).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts_fixture() -> ReactionCounts {
        let mut counts = ReactionCounts::new();
        counts.insert(
            "100".to_string(),
            HashMap::from([("1".to_string(), 5), ("2".to_string(), 12)]),
        );
        counts.insert(
            "200".to_string(),
            HashMap::from([("1".to_string(), 3), ("3".to_string(), 12)]),
        );
        counts
    }

    #[test]
    fn global_totals_sum_across_guilds() {
        let totals = global_totals(&counts_fixture());
        assert_eq!(totals["1"], 8);
        assert_eq!(totals["2"], 12);
        assert_eq!(totals["3"], 12);
    }

    #[test]
    fn sorting_and_rank_are_stable_on_ties() {
        let totals = global_totals(&counts_fixture());
        let sorted = sorted_desc(&totals);
        // Ties break by user id so ranks are deterministic.
        assert_eq!(sorted[0], ("2".to_string(), 12));
        assert_eq!(sorted[1], ("3".to_string(), 12));
        assert_eq!(rank_of(&sorted, "1"), Some(3));
        assert_eq!(rank_of(&sorted, "99"), None);
    }

    #[test]
    fn medals_for_podium_only() {
        assert_eq!(medal(1), "🥇");
        assert_eq!(medal(2), "🥈");
        assert_eq!(medal(3), "🥉");
        assert_eq!(medal(4), "4.");
    }

    #[test]
    fn footer_tiers() {
        assert_eq!(spotter_footer(0), "Start your UFO hunting journey!");
        assert_eq!(spotter_footer(7), "You're getting good at this!");
        assert_eq!(spotter_footer(100), "You are a true believer!");
    }
}
