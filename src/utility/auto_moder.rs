
use crate::utility::error::Result;
use crate::utility::gateway::Gateway;
use crate::utility::guild_config::GuildConfig;
use crate::utility::logger::Logger;
use crate::utility::scheduler::{Scheduler, DeferredPayload};
use crate::utility::traits::Singleton;
use crate::databases::*;
use crate::impl_singleton;


const ESCALATION_WARNINGS: usize = 3;

#[cfg(feature = "auto_moderation")]
pub struct AutoModerator {}

#[cfg(feature = "auto_moderation")]
impl AutoModerator {

    pub fn new() -> Self {
        AutoModerator {}
    }

    /// Records a warning for a blocked message and escalates when the user
    /// reaches three warnings since their last mute.
    pub async fn perform_warn(&self, gateway: &dyn Gateway, config: &GuildConfig,
                              user_id: u64, reason: &str, context: &str, now: i64) -> Result<()> {
        let key = format!("{}:{}", config.guild_id, user_id);
        let log = ModLog::new("0".to_string(), format!("{} ('{}')", reason, context));
        WarningsDB::get_instance().lock().await
            .append(&key, &log.into()).await?;
        self.check_warnings(gateway, config, user_id, now).await
    }

    pub async fn check_warnings(&self, gateway: &dyn Gateway, config: &GuildConfig,
                                user_id: u64, now: i64) -> Result<()> {

        let key = format!("{}:{}", config.guild_id, user_id);

        // only warnings issued after the last mute count towards the ladder
        let last_mute = MutesDB::get_instance().lock().await
            .get_last(&key, 1).await?;
        let last_mute_timestamp = last_mute.first().map(|log| log.timestamp).unwrap_or(0);

        let recent_warnings: Vec<ModLog> = WarningsDB::get_instance().lock().await
            .get_all(&key).await?
            .into_iter()
            .filter(|warning| warning.timestamp > last_mute_timestamp)
            .collect();

        if recent_warnings.len() < ESCALATION_WARNINGS {
            return Ok(());
        }

        let until = now + config.mute_seconds;
        if config.mute_role_id != 0 {
            // role based mute with a durable reversal row, so a restart
            // between now and the expiry still lifts it
            if let Err(err) = gateway.assign_role(config.guild_id, user_id, config.mute_role_id).await {
                Logger::err_long("Failed to assign mute role", &err.to_string());
            }
            Scheduler::schedule(DeferredPayload::Unmute {
                guild_id: config.guild_id,
                user_id: user_id,
                role_id: config.mute_role_id,
            }, until).await?;
        } else {
            // platform-native restriction expires on its own
            if let Err(err) = gateway.restrict_member(config.guild_id, user_id, until).await {
                Logger::err_long("Failed to restrict member", &err.to_string());
            }
        }

        let reasons = recent_warnings.iter()
            .take(ESCALATION_WARNINGS)
            .enumerate()
            .map(|(i, warning)| format!("{}: '{}'", i + 1, warning.reason))
            .collect::<Vec<String>>()
            .join(", ");
        let mute_log = ModLog::new("0".to_string(), format!("Automatically muted ({})", reasons));
        MutesDB::get_instance().lock().await
            .append(&key, &mute_log.into()).await?;

        if config.log_channel_id != 0 {
            let description = format!(
                "<@{}> was automatically muted after {} warnings.", user_id, ESCALATION_WARNINGS);
            if let Err(err) = gateway.send_log(config.log_channel_id, "Automatic Mute", &description).await {
                Logger::err_long("Failed to announce mute", &err.to_string());
            }
        }
        Ok(())
    }
}

#[cfg(feature = "auto_moderation")]
impl_singleton!(AutoModerator);
