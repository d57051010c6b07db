//! Per-guild UFO image posting loops
//!
//! One long-lived task per guild posts a random UFO image at rare, random
//! intervals, reacts to it, deletes it after a short hold and keeps the
//! message id tracked through a grace window so late reactions still count.
//! Tasks are supervised by guild id: started at startup and on guild join,
//! cancelled on guild leave. A failed send or delete never kills the loop.

use crate::storage::Store;
use crate::tracker::MessageTracker;
use dashmap::DashMap;
use rand::seq::SliceRandom;
use serenity::all::{ChannelId, CreateEmbed, CreateEmbedFooter, CreateMessage, Http, ReactionType, Timestamp};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// UFO image URLs posted by the loops.
const IMAGE_URLS: &[&str] = &[
    "https://s.hdnux.com/photos/01/25/20/06/22348185/4/rawImage.jpg",
    "https://brobible.com/wp-content/uploads/2023/08/ufo-over-city-clouds.png",
    "https://api.time.com/wp-content/uploads/2016/02/150222-ufo-sightings-06.jpg",
    "https://www.washingtonpost.com/news/morning-mix/wp-content/uploads/sites/21/2015/01/UFO-04-1024x666.jpg",
    "https://hips.hearstapps.com/hmg-prod/images/vintage-old-black-and-white-ufo-photo-royalty-free-image-1677115000.jpg?resize=1200:*",
];

/// Rare-encounter intervals between posts, in seconds.
const INTERVALS: &[u64] = &[20 * 60, 30 * 60, 60 * 60, 2 * 60 * 60];

/// How long a posted image stays visible.
const POST_VISIBLE: Duration = Duration::from_secs(4);
/// How long a message id stays tracked after deletion.
pub const TRACK_GRACE: Duration = Duration::from_secs(60);
/// Backoff when a guild has no usable posting channel.
const CONFIG_RETRY: Duration = Duration::from_secs(30);

/// Marker emoji the bot adds to its own posts. Cosmetic only; counting
/// accepts any emoji.
pub const MARKER_EMOJI: &str = "👽";

pub fn random_image_url() -> &'static str {
    let mut rng = rand::thread_rng();
    IMAGE_URLS.choose(&mut rng).copied().unwrap_or(IMAGE_URLS[0])
}

fn random_interval() -> Duration {
    let mut rng = rand::thread_rng();
    Duration::from_secs(INTERVALS.choose(&mut rng).copied().unwrap_or(INTERVALS[0]))
}

/// Supervisor for the per-guild posting tasks.
pub struct PostLoops {
    tasks: DashMap<u64, JoinHandle<()>>,
}

impl PostLoops {
    pub fn new() -> Self {
        Self {
            tasks: DashMap::new(),
        }
    }

    /// Start the loop for a guild. Idempotent: a live loop is left alone.
    pub fn start(
        &self,
        guild_id: u64,
        http: Arc<Http>,
        store: Arc<Store>,
        tracker: Arc<MessageTracker>,
    ) {
        if let Some(existing) = self.tasks.get(&guild_id) {
            if !existing.is_finished() {
                return;
            }
        }
        info!("Starting posting loop for guild {}", guild_id);
        let handle = tokio::spawn(run_guild_loop(guild_id, http, store, tracker));
        self.tasks.insert(guild_id, handle);
    }

    /// Cancel the loop for a guild the bot has left.
    pub fn stop(&self, guild_id: u64) {
        if let Some((_, handle)) = self.tasks.remove(&guild_id) {
            handle.abort();
            info!("Stopped posting loop for guild {}", guild_id);
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Default for PostLoops {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_guild_loop(
    guild_id: u64,
    http: Arc<Http>,
    store: Arc<Store>,
    tracker: Arc<MessageTracker>,
) {
    loop {
        // Config is re-read every cycle so reconfiguration takes effect
        // without a restart.
        let channel_id = match store.guild_config(guild_id) {
            Ok(entry) => entry.and_then(|e| e.channel_id),
            Err(e) => {
                warn!("Failed to read config for guild {}: {}", guild_id, e);
                None
            }
        };

        let Some(channel_id) = channel_id else {
            sleep(CONFIG_RETRY).await;
            continue;
        };

        if http.get_channel(ChannelId::new(channel_id)).await.is_err() {
            debug!("Channel {} for guild {} unresolvable", channel_id, guild_id);
            sleep(CONFIG_RETRY).await;
            continue;
        }

        sleep(random_interval()).await;

        if let Err(e) = post_cycle(&http, &store, &tracker, guild_id, channel_id).await {
            warn!("Posting failed in guild {}: {}", guild_id, e);
        }
    }
}

/// Post one image: send, track, react, hold, delete, grace, untrack.
async fn post_cycle(
    http: &Arc<Http>,
    store: &Arc<Store>,
    tracker: &Arc<MessageTracker>,
    guild_id: u64,
    channel_id: u64,
) -> serenity::Result<()> {
    let image_url = random_image_url();
    let channel = ChannelId::new(channel_id);
    let message = channel
        .send_message(http, CreateMessage::new().content(image_url))
        .await?;
    let message_id = message.id.get();

    // Tracked before any further await so a reaction racing the deletion
    // below is always attributable.
    tracker.track(message_id, &guild_id.to_string());
    info!(
        "Posted UFO image in guild {} (message {}), now tracking reactions",
        guild_id, message_id
    );

    log_image_sent(http, store, guild_id, channel_id, message_id, image_url).await;

    if let Err(e) = message.react(http, ReactionType::Unicode(MARKER_EMOJI.to_string())).await {
        warn!("Failed to react to own post {}: {}", message_id, e);
    }

    sleep(POST_VISIBLE).await;

    if let Err(e) = message.delete(http).await {
        warn!("Failed to delete post {}: {}", message_id, e);
    }

    // Keep the id around for late reaction delivery.
    sleep(TRACK_GRACE).await;
    tracker.untrack(message_id);
    debug!("Untracked message {} after grace window", message_id);

    Ok(())
}

/// Send a test image that follows the same track/react/delete sequence,
/// untracking in the background so the caller is not held for the grace
/// window.
pub async fn post_test_image(
    http: &Arc<Http>,
    tracker: &Arc<MessageTracker>,
    channel_id: u64,
    guild_key: &str,
) -> serenity::Result<()> {
    let image_url = random_image_url();
    let message = ChannelId::new(channel_id)
        .send_message(http, CreateMessage::new().content(image_url))
        .await?;
    let message_id = message.id.get();
    tracker.track(message_id, guild_key);
    info!("Test image sent (message {}), now tracking reactions", message_id);

    if let Err(e) = message.react(http, ReactionType::Unicode(MARKER_EMOJI.to_string())).await {
        warn!("Failed to react to test image {}: {}", message_id, e);
    }

    sleep(POST_VISIBLE).await;

    // Scheduled before the delete so the id is reclaimed even when the
    // delete fails.
    schedule_untrack(tracker.clone(), message_id);
    message.delete(http).await?;

    Ok(())
}

/// Untrack a message id once the grace window elapses, without holding up
/// the caller.
fn schedule_untrack(tracker: Arc<MessageTracker>, message_id: u64) {
    tokio::spawn(async move {
        sleep(TRACK_GRACE).await;
        tracker.untrack(message_id);
    });
}

/// Fire-and-forget image-sent record to the global log channel.
async fn log_image_sent(
    http: &Arc<Http>,
    store: &Arc<Store>,
    guild_id: u64,
    channel_id: u64,
    message_id: u64,
    image_url: &str,
) {
    let log_channel = match store.global_log_channel() {
        Ok(Some(id)) => id,
        Ok(None) => return,
        Err(e) => {
            warn!("Failed to read global log channel: {}", e);
            return;
        }
    };

    let embed = CreateEmbed::new()
        .title("🛸 UFO Image Sent")
        .description("Bot sent a UFO image to track alien sightings")
        .colour(0x9370DB)
        .timestamp(Timestamp::now())
        .field("📺 Channel", format!("<#{}>", channel_id), true)
        .field("🏛️ Server", format!("`{}`", guild_id), true)
        .field("🔗 Message ID", format!("`{}`", message_id), true)
        .field("🖼️ Image URL", format!("[View Image]({})", image_url), false)
        .thumbnail(image_url)
        .footer(CreateEmbedFooter::new("UFO Image Deployment System"));

    if let Err(e) = ChannelId::new(log_channel)
        .send_message(http, CreateMessage::new().embed(embed))
        .await
    {
        warn!("Failed to log image send to global channel: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_drawn_from_rare_encounter_set() {
        for _ in 0..50 {
            let interval = random_interval();
            assert!(INTERVALS.contains(&interval.as_secs()));
        }
    }

    #[test]
    fn image_url_drawn_from_known_set() {
        for _ in 0..20 {
            assert!(IMAGE_URLS.contains(&random_image_url()));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_untrack_releases_id_after_grace() {
        let tracker = Arc::new(MessageTracker::new());
        tracker.track(7, "100");
        schedule_untrack(tracker.clone(), 7);

        // Still attributable inside the grace window.
        sleep(TRACK_GRACE - Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        assert!(tracker.is_tracked(7));

        sleep(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert!(!tracker.is_tracked(7));
    }

    #[tokio::test]
    async fn start_is_idempotent_and_stop_cancels() {
        let loops = PostLoops::new();
        let http = Arc::new(Http::new(""));
        let store = Arc::new(Store::new(std::env::temp_dir().join("ufo-bot-loop-test")));
        let tracker = Arc::new(MessageTracker::new());

        loops.start(1, http.clone(), store.clone(), tracker.clone());
        loops.start(1, http.clone(), store.clone(), tracker.clone());
        assert_eq!(loops.len(), 1);

        loops.start(2, http, store, tracker);
        assert_eq!(loops.len(), 2);

        loops.stop(1);
        assert_eq!(loops.len(), 1);
        loops.stop(2);
        assert!(loops.is_empty());
    }
}
