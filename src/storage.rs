//! JSON persistence for the bot's five data documents
//!
//! Guild config, sighting counts, admin list, ban list and support tickets
//! each live in their own pretty-printed JSON file under the data directory.
//! Every mutation re-reads the file fresh, applies the change and writes the
//! whole document back under a per-file mutex, so interleaved handler and
//! posting-loop tasks cannot lose an update. Writes go to a temp file first
//! and are renamed into place.

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CONFIG_FILE: &str = "config.json";
const REACTIONS_FILE: &str = "reactions.json";
const AUTH_FILE: &str = "authorized_users.json";
const BANS_FILE: &str = "banned_users.json";
const TICKETS_FILE: &str = "tickets.json";

/// Guild key used for reactions delivered outside a guild.
pub const DM_GUILD_KEY: &str = "dm";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Sighting counts: guild id (or "dm") -> user id -> count.
pub type ReactionCounts = HashMap<String, HashMap<String, u64>>;

/// Per-guild channel configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support_channel_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_channel_id: Option<u64>,
}

/// On-disk guild entry. Older deployments stored a bare channel id; both
/// shapes parse and are normalized to the record shape on the next write.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GuildConfigShape {
    Legacy(u64),
    Record(GuildConfig),
}

impl GuildConfigShape {
    fn normalize(self) -> GuildConfig {
        match self {
            GuildConfigShape::Legacy(channel_id) => GuildConfig {
                channel_id: Some(channel_id),
                ..Default::default()
            },
            GuildConfigShape::Record(record) => record,
        }
    }
}

/// The whole config document: guild entries plus one global key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerConfig {
    pub global_log_channel_id: Option<u64>,
    pub guilds: HashMap<String, GuildConfig>,
}

impl ServerConfig {
    fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let mut config = ServerConfig::default();
        if let Value::Object(map) = value {
            for (key, entry) in map {
                if key == "global_log_channel_id" {
                    config.global_log_channel_id = serde_json::from_value(entry)?;
                } else {
                    let shape: GuildConfigShape = serde_json::from_value(entry)?;
                    config.guilds.insert(key, shape.normalize());
                }
            }
        }
        Ok(config)
    }

    fn to_value(&self) -> Result<Value, serde_json::Error> {
        let mut map = serde_json::Map::new();
        if let Some(id) = self.global_log_channel_id {
            map.insert("global_log_channel_id".to_string(), Value::from(id));
        }
        for (guild_id, entry) in &self.guilds {
            map.insert(guild_id.clone(), serde_json::to_value(entry)?);
        }
        Ok(Value::Object(map))
    }
}

/// Admin user list document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AdminList {
    #[serde(default)]
    admin_users: Vec<u64>,
}

/// A bot-level ban record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BanEntry {
    pub reason: String,
    pub banned_by: u64,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Open,
    Closed,
}

/// A support ticket. Closed tickets are deleted rather than archived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub user_id: u64,
    pub user_name: String,
    pub guild_id: Option<u64>,
    pub guild_name: String,
    pub message: String,
    pub timestamp: String,
    pub status: TicketStatus,
}

/// File-backed store with one mutex per document.
pub struct Store {
    dir: PathBuf,
    config_lock: Mutex<()>,
    counts_lock: Mutex<()>,
    auth_lock: Mutex<()>,
    bans_lock: Mutex<()>,
    tickets_lock: Mutex<()>,
}

impl Store {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            dir: dir.into(),
            config_lock: Mutex::new(()),
            counts_lock: Mutex::new(()),
            auth_lock: Mutex::new(()),
            bans_lock: Mutex::new(()),
            tickets_lock: Mutex::new(()),
        }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    // --- server config ---

    pub fn server_config(&self) -> Result<ServerConfig, StorageError> {
        let _guard = self.config_lock.lock();
        self.read_server_config()
    }

    pub fn guild_config(&self, guild_id: u64) -> Result<Option<GuildConfig>, StorageError> {
        Ok(self.server_config()?.guilds.remove(&guild_id.to_string()))
    }

    pub fn set_post_channel(&self, guild_id: u64, channel_id: u64) -> Result<(), StorageError> {
        self.update_guild(guild_id, |entry| entry.channel_id = Some(channel_id))
    }

    pub fn set_support_channel(&self, guild_id: u64, channel_id: u64) -> Result<(), StorageError> {
        self.update_guild(guild_id, |entry| entry.support_channel_id = Some(channel_id))
    }

    pub fn set_global_log_channel(&self, channel_id: u64) -> Result<(), StorageError> {
        let _guard = self.config_lock.lock();
        let mut config = self.read_server_config()?;
        config.global_log_channel_id = Some(channel_id);
        self.write_server_config(&config)
    }

    pub fn global_log_channel(&self) -> Result<Option<u64>, StorageError> {
        Ok(self.server_config()?.global_log_channel_id)
    }

    /// First support channel configured in any guild.
    pub fn support_channel(&self) -> Result<Option<u64>, StorageError> {
        Ok(self
            .server_config()?
            .guilds
            .values()
            .find_map(|entry| entry.support_channel_id))
    }

    fn update_guild(
        &self,
        guild_id: u64,
        apply: impl FnOnce(&mut GuildConfig),
    ) -> Result<(), StorageError> {
        let _guard = self.config_lock.lock();
        let mut config = self.read_server_config()?;
        apply(config.guilds.entry(guild_id.to_string()).or_default());
        self.write_server_config(&config)
    }

    fn read_server_config(&self) -> Result<ServerConfig, StorageError> {
        let path = self.path(CONFIG_FILE);
        if !path.exists() {
            return Ok(ServerConfig::default());
        }
        let raw: Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        Ok(ServerConfig::from_value(raw)?)
    }

    fn write_server_config(&self, config: &ServerConfig) -> Result<(), StorageError> {
        write_json(&self.path(CONFIG_FILE), &config.to_value()?)
    }

    // --- sighting counts ---

    pub fn load_counts(&self) -> Result<ReactionCounts, StorageError> {
        let _guard = self.counts_lock.lock();
        read_json(&self.path(REACTIONS_FILE))
    }

    /// Increment the (guild, user) counter by exactly one and return the new
    /// total. The on-disk document is the mutation base, not any cache.
    pub fn increment_sighting(&self, guild_key: &str, user_id: u64) -> Result<u64, StorageError> {
        let _guard = self.counts_lock.lock();
        let path = self.path(REACTIONS_FILE);
        let mut counts: ReactionCounts = read_json(&path)?;
        let counter = counts
            .entry(guild_key.to_string())
            .or_default()
            .entry(user_id.to_string())
            .or_insert(0);
        *counter += 1;
        let total = *counter;
        write_json(&path, &counts)?;
        Ok(total)
    }

    // --- admin list ---

    pub fn admin_users(&self) -> Result<Vec<u64>, StorageError> {
        let _guard = self.auth_lock.lock();
        let list: AdminList = read_json(&self.path(AUTH_FILE))?;
        Ok(list.admin_users)
    }

    pub fn is_admin(&self, user_id: u64) -> Result<bool, StorageError> {
        Ok(self.admin_users()?.contains(&user_id))
    }

    /// Returns false if the user was already an admin.
    pub fn add_admin(&self, user_id: u64) -> Result<bool, StorageError> {
        let _guard = self.auth_lock.lock();
        let path = self.path(AUTH_FILE);
        let mut list: AdminList = read_json(&path)?;
        if list.admin_users.contains(&user_id) {
            return Ok(false);
        }
        list.admin_users.push(user_id);
        write_json(&path, &list)?;
        Ok(true)
    }

    /// Returns false if the user was not an admin.
    pub fn remove_admin(&self, user_id: u64) -> Result<bool, StorageError> {
        let _guard = self.auth_lock.lock();
        let path = self.path(AUTH_FILE);
        let mut list: AdminList = read_json(&path)?;
        let before = list.admin_users.len();
        list.admin_users.retain(|id| *id != user_id);
        if list.admin_users.len() == before {
            return Ok(false);
        }
        write_json(&path, &list)?;
        Ok(true)
    }

    // --- bans ---

    pub fn is_banned(&self, user_id: u64) -> Result<bool, StorageError> {
        Ok(self.ban_info(user_id)?.is_some())
    }

    pub fn ban_info(&self, user_id: u64) -> Result<Option<BanEntry>, StorageError> {
        let _guard = self.bans_lock.lock();
        let mut bans: HashMap<String, BanEntry> = read_json(&self.path(BANS_FILE))?;
        Ok(bans.remove(&user_id.to_string()))
    }

    pub fn ban(&self, user_id: u64, reason: &str, banned_by: u64) -> Result<(), StorageError> {
        let _guard = self.bans_lock.lock();
        let path = self.path(BANS_FILE);
        let mut bans: HashMap<String, BanEntry> = read_json(&path)?;
        bans.insert(
            user_id.to_string(),
            BanEntry {
                reason: reason.to_string(),
                banned_by,
                timestamp: Utc::now().to_rfc3339(),
            },
        );
        write_json(&path, &bans)
    }

    /// Returns false if the user was not banned.
    pub fn unban(&self, user_id: u64) -> Result<bool, StorageError> {
        let _guard = self.bans_lock.lock();
        let path = self.path(BANS_FILE);
        let mut bans: HashMap<String, BanEntry> = read_json(&path)?;
        if bans.remove(&user_id.to_string()).is_none() {
            return Ok(false);
        }
        write_json(&path, &bans)?;
        Ok(true)
    }

    pub fn banned_users(&self) -> Result<Vec<(u64, BanEntry)>, StorageError> {
        let _guard = self.bans_lock.lock();
        let bans: HashMap<String, BanEntry> = read_json(&self.path(BANS_FILE))?;
        let mut entries: Vec<(u64, BanEntry)> = bans
            .into_iter()
            .filter_map(|(id, entry)| id.parse().ok().map(|id| (id, entry)))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        Ok(entries)
    }

    // --- support tickets ---

    pub fn create_ticket(
        &self,
        user_id: u64,
        user_name: &str,
        guild_id: Option<u64>,
        guild_name: &str,
        message: &str,
    ) -> Result<String, StorageError> {
        let _guard = self.tickets_lock.lock();
        let path = self.path(TICKETS_FILE);
        let mut tickets: HashMap<String, Ticket> = read_json(&path)?;
        let ticket_id: String = uuid::Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(8)
            .collect();
        tickets.insert(
            ticket_id.clone(),
            Ticket {
                user_id,
                user_name: user_name.to_string(),
                guild_id,
                guild_name: guild_name.to_string(),
                message: message.to_string(),
                timestamp: Utc::now().to_rfc3339(),
                status: TicketStatus::Open,
            },
        );
        write_json(&path, &tickets)?;
        Ok(ticket_id)
    }

    pub fn get_ticket(&self, ticket_id: &str) -> Result<Option<Ticket>, StorageError> {
        let _guard = self.tickets_lock.lock();
        let mut tickets: HashMap<String, Ticket> = read_json(&self.path(TICKETS_FILE))?;
        Ok(tickets.remove(ticket_id))
    }

    /// Returns false if no such ticket existed.
    pub fn delete_ticket(&self, ticket_id: &str) -> Result<bool, StorageError> {
        let _guard = self.tickets_lock.lock();
        let path = self.path(TICKETS_FILE);
        let mut tickets: HashMap<String, Ticket> = read_json(&path)?;
        if tickets.remove(ticket_id).is_none() {
            return Ok(false);
        }
        write_json(&path, &tickets)?;
        Ok(true)
    }

    pub fn open_tickets(&self) -> Result<Vec<(String, Ticket)>, StorageError> {
        let _guard = self.tickets_lock.lock();
        let tickets: HashMap<String, Ticket> = read_json(&self.path(TICKETS_FILE))?;
        let mut open: Vec<(String, Ticket)> = tickets
            .into_iter()
            .filter(|(_, ticket)| ticket.status == TicketStatus::Open)
            .collect();
        open.sort_by(|a, b| a.1.timestamp.cmp(&b.1.timestamp));
        Ok(open)
    }

    /// (total, open) ticket counts.
    pub fn ticket_counts(&self) -> Result<(usize, usize), StorageError> {
        let _guard = self.tickets_lock.lock();
        let tickets: HashMap<String, Ticket> = read_json(&self.path(TICKETS_FILE))?;
        let open = tickets
            .values()
            .filter(|ticket| ticket.status == TicketStatus::Open)
            .count();
        Ok((tickets.len(), open))
    }
}

fn read_json<T: serde::de::DeserializeOwned + Default>(path: &Path) -> Result<T, StorageError> {
    if !path.exists() {
        return Ok(T::default());
    }
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_string_pretty(value)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> Store {
        let dir = std::env::temp_dir()
            .join("ufo-bot-tests")
            .join(uuid::Uuid::new_v4().simple().to_string());
        Store::new(dir)
    }

    #[test]
    fn increment_bumps_exactly_one_counter() {
        let store = temp_store();
        assert_eq!(store.increment_sighting("100", 1).unwrap(), 1);
        assert_eq!(store.increment_sighting("100", 1).unwrap(), 2);
        assert_eq!(store.increment_sighting("100", 2).unwrap(), 1);
        assert_eq!(store.increment_sighting(DM_GUILD_KEY, 1).unwrap(), 1);

        let counts = store.load_counts().unwrap();
        assert_eq!(counts["100"]["1"], 2);
        assert_eq!(counts["100"]["2"], 1);
        assert_eq!(counts[DM_GUILD_KEY]["1"], 1);
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn legacy_guild_entry_parses_and_normalizes_on_write() {
        let store = temp_store();
        let raw = r#"{
            "global_log_channel_id": 789,
            "111": 456,
            "222": { "channel_id": 1, "support_channel_id": 2 }
        }"#;
        fs::create_dir_all(&store.dir).unwrap();
        fs::write(store.path(CONFIG_FILE), raw).unwrap();

        let config = store.server_config().unwrap();
        assert_eq!(config.global_log_channel_id, Some(789));
        assert_eq!(config.guilds["111"].channel_id, Some(456));
        assert_eq!(config.guilds["222"].support_channel_id, Some(2));

        // Any write rewrites legacy entries in the record shape.
        store.set_post_channel(333, 9).unwrap();
        let raw: Value =
            serde_json::from_str(&fs::read_to_string(store.path(CONFIG_FILE)).unwrap()).unwrap();
        assert!(raw["111"].is_object());
        assert_eq!(raw["111"]["channel_id"], 456);
        assert_eq!(raw["global_log_channel_id"], 789);

        // Round trip is lossless.
        assert_eq!(store.guild_config(111).unwrap().unwrap().channel_id, Some(456));
        assert_eq!(store.guild_config(333).unwrap().unwrap().channel_id, Some(9));
    }

    #[test]
    fn support_channel_finds_first_configured() {
        let store = temp_store();
        assert_eq!(store.support_channel().unwrap(), None);
        store.set_support_channel(50, 777).unwrap();
        assert_eq!(store.support_channel().unwrap(), Some(777));
    }

    #[test]
    fn admin_list_add_and_remove() {
        let store = temp_store();
        assert!(!store.is_admin(5).unwrap());
        assert!(store.add_admin(5).unwrap());
        assert!(!store.add_admin(5).unwrap());
        assert!(store.is_admin(5).unwrap());
        assert_eq!(store.admin_users().unwrap(), vec![5]);
        assert!(store.remove_admin(5).unwrap());
        assert!(!store.remove_admin(5).unwrap());
    }

    #[test]
    fn ban_round_trip() {
        let store = temp_store();
        assert!(!store.is_banned(9).unwrap());
        store.ban(9, "spamming reactions", 1).unwrap();
        assert!(store.is_banned(9).unwrap());
        let info = store.ban_info(9).unwrap().unwrap();
        assert_eq!(info.reason, "spamming reactions");
        assert_eq!(info.banned_by, 1);
        assert_eq!(store.banned_users().unwrap().len(), 1);
        assert!(store.unban(9).unwrap());
        assert!(!store.unban(9).unwrap());
        assert!(!store.is_banned(9).unwrap());
    }

    #[test]
    fn ticket_lifecycle() {
        let store = temp_store();
        let id = store
            .create_ticket(42, "zorp", Some(100), "Area 51", "bot ate my sighting")
            .unwrap();
        assert_eq!(id.len(), 8);

        let ticket = store.get_ticket(&id).unwrap().unwrap();
        assert_eq!(ticket.user_id, 42);
        assert_eq!(ticket.guild_name, "Area 51");
        assert_eq!(ticket.status, TicketStatus::Open);

        let open = store.open_tickets().unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].0, id);
        assert_eq!(store.ticket_counts().unwrap(), (1, 1));

        assert!(store.delete_ticket(&id).unwrap());
        assert!(!store.delete_ticket(&id).unwrap());
        assert!(store.get_ticket(&id).unwrap().is_none());
        assert!(store.open_tickets().unwrap().is_empty());
    }

    #[test]
    fn dm_tickets_have_no_guild() {
        let store = temp_store();
        let id = store
            .create_ticket(7, "probe", None, "Direct Message", "hello")
            .unwrap();
        let ticket = store.get_ticket(&id).unwrap().unwrap();
        assert_eq!(ticket.guild_id, None);
    }
}
