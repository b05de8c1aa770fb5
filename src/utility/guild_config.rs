
use crate::utility::error::{EngineError, Result};
use crate::utility::mixed::parse_duration;
use crate::utility::regex_manager;
use crate::utility::traits::Singleton;
use crate::databases::*;


/// Per-guild rule toggles, thresholds and channel/role wiring. Assembled
/// lazily from the config rows, absent keys fall back to these defaults.
/// Configs are never deleted, a guild with no rows behaves like the default.
#[derive(Debug, Clone)]
pub struct GuildConfig {
    pub guild_id: u64,
    pub profanity_filter: bool,
    pub link_filter: bool,
    pub caps_threshold: f64,
    pub spam_messages: usize,
    pub spam_window: i64,
    pub anti_alt_hours: i64,
    pub join_burst_cap: usize,
    pub sla_minutes: i64,
    pub mute_seconds: i64,
    pub xp_rate: f64,
    pub xp_voice_rate: f64,
    pub staff_role_id: u64,
    pub mute_role_id: u64,
    pub log_channel_id: u64,
    pub welcome_channel_id: u64,
    pub autorole_id: u64,
    pub ticket_category_id: u64,
    pub transcript_channel_id: u64,
    pub custom_words: Vec<String>,
    pub regex_filters: Vec<String>,
}

const VALUE_KEYS: [&str; 18] = [
    "profanity_filter",
    "link_filter",
    "caps_threshold",
    "spam_messages",
    "spam_window",
    "anti_alt_hours",
    "join_burst_cap",
    "sla_minutes",
    "mute_duration",
    "xp_rate",
    "xp_voice_rate",
    "staff_role_id",
    "mute_role_id",
    "log_channel_id",
    "welcome_channel_id",
    "autorole_id",
    "ticket_category_id",
    "transcript_channel_id",
];

impl GuildConfig {

    pub async fn load(guild_id: u64) -> GuildConfig {
        let db = ConfigDB::get_instance().lock().await;
        GuildConfig {
            guild_id: guild_id,
            profanity_filter: value_or(&db, guild_id, "profanity_filter", true).await,
            link_filter: value_or(&db, guild_id, "link_filter", false).await,
            caps_threshold: value_or(&db, guild_id, "caps_threshold", 0.8).await,
            spam_messages: value_or(&db, guild_id, "spam_messages", 6).await,
            spam_window: value_or(&db, guild_id, "spam_window", 8).await,
            anti_alt_hours: value_or(&db, guild_id, "anti_alt_hours", 24).await,
            join_burst_cap: value_or(&db, guild_id, "join_burst_cap", 10).await,
            sla_minutes: value_or(&db, guild_id, "sla_minutes", 60).await,
            mute_seconds: duration_or(&db, guild_id, "mute_duration", 24 * 60 * 60).await,
            xp_rate: value_or(&db, guild_id, "xp_rate", 1.0).await,
            xp_voice_rate: value_or(&db, guild_id, "xp_voice_rate", 1.0).await,
            staff_role_id: value_or(&db, guild_id, "staff_role_id", 0).await,
            mute_role_id: value_or(&db, guild_id, "mute_role_id", 0).await,
            log_channel_id: value_or(&db, guild_id, "log_channel_id", 0).await,
            welcome_channel_id: value_or(&db, guild_id, "welcome_channel_id", 0).await,
            autorole_id: value_or(&db, guild_id, "autorole_id", 0).await,
            ticket_category_id: value_or(&db, guild_id, "ticket_category_id", 0).await,
            transcript_channel_id: value_or(&db, guild_id, "transcript_channel_id", 0).await,
            custom_words: list_values(&db, guild_id, "badwords").await,
            regex_filters: list_values(&db, guild_id, "regexes").await,
        }
    }

    /// Staff-gated setter for a single threshold or wiring key. Out-of-range
    /// ratios and malformed values are rejected without touching state; spam
    /// counters and windows are clamped to their minimums instead.
    pub async fn set(guild_id: u64, key: &str, value: &str, actor_is_staff: bool) -> Result<()> {
        if !actor_is_staff {
            return Err(EngineError::precondition("configuration changes are staff only"));
        }
        if !VALUE_KEYS.contains(&key) {
            return Err(EngineError::configuration(format!("unknown setting '{}'", key)));
        }

        let stored = match key {
            "profanity_filter" | "link_filter" => {
                let flag = value.parse::<bool>()
                    .map_err(|_| EngineError::configuration(format!("'{}' expects true or false", key)))?;
                flag.to_string()
            }
            "caps_threshold" => {
                let ratio = value.parse::<f64>()
                    .map_err(|_| EngineError::configuration("caps_threshold expects a number"))?;
                if !(0.1..=1.0).contains(&ratio) {
                    return Err(EngineError::configuration("caps_threshold must be within 0.1 and 1.0"));
                }
                ratio.to_string()
            }
            "xp_rate" | "xp_voice_rate" => {
                let rate = value.parse::<f64>()
                    .map_err(|_| EngineError::configuration(format!("'{}' expects a number", key)))?;
                rate.clamp(0.1, 5.0).to_string()
            }
            "spam_messages" | "spam_window" | "join_burst_cap" => {
                let count = value.parse::<i64>()
                    .map_err(|_| EngineError::configuration(format!("'{}' expects an integer", key)))?;
                count.max(2).to_string()
            }
            "sla_minutes" => {
                let minutes = value.parse::<i64>()
                    .map_err(|_| EngineError::configuration("sla_minutes expects an integer"))?;
                minutes.max(1).to_string()
            }
            "anti_alt_hours" => {
                let hours = value.parse::<i64>()
                    .map_err(|_| EngineError::configuration("anti_alt_hours expects an integer"))?;
                hours.max(0).to_string()
            }
            "mute_duration" => {
                // stored as the raw duration string, validated here
                parse_duration(value)?;
                value.trim().to_lowercase()
            }
            _ => {
                // remaining keys are role/channel ids
                value.parse::<u64>()
                    .map_err(|_| EngineError::configuration(format!("'{}' expects an id", key)))?
                    .to_string()
            }
        };

        ConfigDB::get_instance().lock().await
            .set(&scoped(guild_id, key), &stored).await
    }

    pub async fn add_custom_word(guild_id: u64, word: &str, actor_is_staff: bool) -> Result<()> {
        if !actor_is_staff {
            return Err(EngineError::precondition("configuration changes are staff only"));
        }
        let word = word.trim().to_lowercase();
        if word.is_empty() {
            return Err(EngineError::configuration("cannot block an empty word"));
        }
        ConfigDB::get_instance().lock().await
            .append(&scoped(guild_id, "badwords"), &word).await
    }

    pub async fn add_regex_filter(guild_id: u64, pattern: &str, actor_is_staff: bool) -> Result<()> {
        if !actor_is_staff {
            return Err(EngineError::precondition("configuration changes are staff only"));
        }
        if regex_manager::compile_filter(pattern.to_string()).is_none() {
            return Err(EngineError::configuration(format!("'{}' is not a valid pattern", pattern)));
        }
        ConfigDB::get_instance().lock().await
            .append(&scoped(guild_id, "regexes"), pattern).await
    }

    /// Role granted when a user reaches `level`, 0 when none is configured.
    pub async fn level_role(guild_id: u64, level: i64) -> u64 {
        let key = scoped(guild_id, &format!("level_role:{}", level));
        let entry = ConfigDB::get_instance().lock().await.get(&key).await;
        match entry {
            Ok(Some(entry)) => entry.value.parse().unwrap_or(0),
            _ => 0,
        }
    }

    pub async fn set_level_role(guild_id: u64, level: i64, role_id: u64, actor_is_staff: bool) -> Result<()> {
        if !actor_is_staff {
            return Err(EngineError::precondition("configuration changes are staff only"));
        }
        let key = scoped(guild_id, &format!("level_role:{}", level.max(1)));
        ConfigDB::get_instance().lock().await
            .set(&key, &role_id.to_string()).await
    }
}

fn scoped(guild_id: u64, key: &str) -> String {
    format!("{}:{}", guild_id, key)
}

async fn value_or<T: std::str::FromStr>(db: &ConfigDB, guild_id: u64, key: &str, default: T) -> T {
    match db.get(&scoped(guild_id, key)).await {
        Ok(Some(entry)) => entry.value.parse().unwrap_or(default),
        _ => default,
    }
}

async fn duration_or(db: &ConfigDB, guild_id: u64, key: &str, default: i64) -> i64 {
    match db.get(&scoped(guild_id, key)).await {
        Ok(Some(entry)) => parse_duration(&entry.value).unwrap_or(default),
        _ => default,
    }
}

async fn list_values(db: &ConfigDB, guild_id: u64, key: &str) -> Vec<String> {
    match db.get_all(&scoped(guild_id, key)).await {
        Ok(entries) => entries.into_iter().map(|entry| entry.value).collect(),
        Err(_) => Vec::new(),
    }
}


#[cfg(test)]
mod tests {

    use super::*;
    use rand::Rng;

    fn fresh_guild() -> u64 {
        rand::rng().random_range(1_000_000..u64::MAX / 2)
    }

    #[tokio::test]
    async fn defaults_apply_when_absent() {
        let config = GuildConfig::load(fresh_guild()).await;
        assert!(config.profanity_filter);
        assert!(!config.link_filter);
        assert_eq!(config.spam_messages, 6);
        assert_eq!(config.spam_window, 8);
        assert_eq!(config.sla_minutes, 60);
        assert!((config.caps_threshold - 0.8).abs() < 1e-9);
        assert!(config.custom_words.is_empty());
    }

    #[tokio::test]
    async fn setters_clamp_and_persist() {
        let guild = fresh_guild();
        GuildConfig::set(guild, "spam_messages", "0", true).await.unwrap();
        GuildConfig::set(guild, "spam_window", "1", true).await.unwrap();
        GuildConfig::set(guild, "xp_rate", "99.0", true).await.unwrap();
        let config = GuildConfig::load(guild).await;
        assert_eq!(config.spam_messages, 2);
        assert_eq!(config.spam_window, 2);
        assert!((config.xp_rate - 5.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn out_of_range_caps_threshold_is_rejected() {
        let guild = fresh_guild();
        let result = GuildConfig::set(guild, "caps_threshold", "1.5", true).await;
        assert!(matches!(result, Err(EngineError::Configuration(_))));
        let config = GuildConfig::load(guild).await;
        assert!((config.caps_threshold - 0.8).abs() < 1e-9, "rejected set must not mutate");
    }

    #[tokio::test]
    async fn unknown_keys_and_malformed_values_are_rejected() {
        let guild = fresh_guild();
        assert!(matches!(
            GuildConfig::set(guild, "definitely_not_a_key", "1", true).await,
            Err(EngineError::Configuration(_))));
        assert!(matches!(
            GuildConfig::set(guild, "profanity_filter", "maybe", true).await,
            Err(EngineError::Configuration(_))));
    }

    #[tokio::test]
    async fn mute_duration_round_trips_and_rejects_garbage() {
        let guild = fresh_guild();
        assert_eq!(GuildConfig::load(guild).await.mute_seconds, 24 * 60 * 60);

        GuildConfig::set(guild, "mute_duration", "90m", true).await.unwrap();
        assert_eq!(GuildConfig::load(guild).await.mute_seconds, 5_400);

        let result = GuildConfig::set(guild, "mute_duration", "soon", true).await;
        assert!(matches!(result, Err(EngineError::Configuration(_))));
        assert_eq!(GuildConfig::load(guild).await.mute_seconds, 5_400);
    }

    #[tokio::test]
    async fn non_staff_cannot_mutate() {
        let guild = fresh_guild();
        let result = GuildConfig::set(guild, "link_filter", "true", false).await;
        assert!(matches!(result, Err(EngineError::Precondition(_))));
        assert!(!GuildConfig::load(guild).await.link_filter);
    }

    #[tokio::test]
    async fn word_and_regex_lists_keep_insertion_order() {
        let guild = fresh_guild();
        GuildConfig::add_custom_word(guild, "Foo", true).await.unwrap();
        GuildConfig::add_custom_word(guild, "bar", true).await.unwrap();
        GuildConfig::add_regex_filter(guild, r"free\s+nitro", true).await.unwrap();
        GuildConfig::add_regex_filter(guild, r"discord\.gg/\w+", true).await.unwrap();

        let config = GuildConfig::load(guild).await;
        assert_eq!(config.custom_words, vec!["foo", "bar"]);
        assert_eq!(config.regex_filters, vec![r"free\s+nitro", r"discord\.gg/\w+"]);

        let invalid = GuildConfig::add_regex_filter(guild, "([broken", true).await;
        assert!(matches!(invalid, Err(EngineError::Configuration(_))));
    }
}
