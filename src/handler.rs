
use serenity::async_trait;
use serenity::model::channel::Message;
use serenity::model::user::User;
use serenity::model::guild::Member;
use serenity::model::voice::VoiceState;
use serenity::all::{ChannelId, MessageId, GuildId, MessageUpdateEvent};
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use difference::{Difference, Changeset};

use std::sync::atomic::{AtomicBool, Ordering};

use crate::utility::*;


pub struct Handler {
    sweeps_started: AtomicBool,
}

impl Handler {

    pub fn new() -> Handler {
        Handler {
            sweeps_started: AtomicBool::new(false),
        }
    }

    async fn log_to_guild(&self, gateway: &DiscordGateway, config: &GuildConfig,
                          title: &str, description: &str) {
        if config.log_channel_id == 0 {
            return;
        }
        if let Err(err) = gateway.send_log(config.log_channel_id, title, description).await {
            Logger::err_long("Failed to write guild log", &err.to_string());
        }
    }
}

#[async_trait]
impl EventHandler for Handler {

    async fn ready(&self, ctx: Context, _ready: Ready) {

        Logger::info("Gateway session ready");

        // reconnects re-deliver ready, the sweeps must only start once
        if self.sweeps_started.swap(true, Ordering::SeqCst) {
            return;
        }

        let resolver = Resolver::new(ctx, None);
        spawn(scheduler_sweep_loop(resolver.clone(), "reminder", scheduler::REMINDER_SWEEP_SECONDS)).await;
        spawn(scheduler_sweep_loop(resolver.clone(), "broadcast", scheduler::BROADCAST_SWEEP_SECONDS)).await;
        spawn(scheduler_sweep_loop(resolver.clone(), "lift", scheduler::LIFT_SWEEP_SECONDS)).await;
        spawn(scheduler_sweep_loop(resolver.clone(), "channel_delete", scheduler::CHANNEL_SWEEP_SECONDS)).await;

        #[cfg(feature = "tickets")]
        {
            spawn(sla_sweep_loop(resolver.clone())).await;
            spawn(auto_close_loop(resolver.clone())).await;
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {

        if msg.author.bot {
            return;
        }
        let guild_id = match msg.guild_id {
            Some(guild_id) => guild_id.get(),
            None => return,
        };

        let resolver = Resolver::new(ctx, msg.guild_id);
        let gateway = DiscordGateway::new(resolver.clone());
        let config = GuildConfig::load(guild_id).await;
        let author_id = msg.author.id.get();
        let now = chrono::Utc::now().timestamp();

        #[cfg(feature = "auto_moderation")]
        {
            let exempt = resolver.is_staff(author_id).await;
            let verdict = ChatFilter::get_instance().lock().await
                .apply(&config, author_id, &msg.content, exempt, now).await;

            if !verdict.is_fine() {
                let reason = verdict.filter_type.to_string();
                if let Err(err) = gateway.delete_message(msg.channel_id.get(), msg.id.get()).await {
                    Logger::err_long("Failed to delete blocked message", &err.to_string());
                }
                self.log_to_guild(&gateway, &config, "AutoMod",
                    &format!("Blocked message from <@{}> `>` {}", author_id, reason)).await;

                let warned = AutoModerator::get_instance().lock().await
                    .perform_warn(&gateway, &config, author_id, &reason, &verdict.context, now).await;
                if let Err(err) = warned {
                    Logger::err_long("Failed to record warning", &err.to_string());
                }
                return;
            }
        }

        let change = LevelingEngine::get_instance().lock().await
            .award_message_xp(guild_id, author_id, config.xp_rate).await;
        match change {
            Ok(Some(change)) => {
                if let Err(err) = gateway.send_message(msg.channel_id.get(),
                    &format!("<@{}> leveled up to **{}**.", author_id, change.new_level)).await {
                    Logger::err_long("Failed to announce level up", &err.to_string());
                }
                let reward = GuildConfig::level_role(guild_id, change.new_level).await;
                if reward != 0 {
                    if let Err(err) = gateway.assign_role(guild_id, author_id, reward).await {
                        Logger::err_long("Failed to grant level role", &err.to_string());
                    }
                }
            }
            Ok(None) => {}
            Err(err) => Logger::err_long("Failed to award message xp", &err.to_string()),
        }
    }

    async fn guild_member_addition(&self, ctx: Context, new_member: Member) {

        let guild_id = new_member.guild_id.get();
        let user_id = new_member.user.id.get();
        let resolver = Resolver::new(ctx, Some(new_member.guild_id));
        let gateway = DiscordGateway::new(resolver);
        let config = GuildConfig::load(guild_id).await;
        let now = chrono::Utc::now().timestamp();

        let burst = RateLimiter::get_instance().lock().await
            .record_join(guild_id, now);
        if burst > config.join_burst_cap {
            self.log_to_guild(&gateway, &config, "Anti-Raid",
                &format!("Join burst detected `>` {} joins within 60s", burst)).await;
        }

        let account_age_hours = (now - new_member.user.created_at().unix_timestamp()) / 3600;
        if account_age_hours < config.anti_alt_hours {
            let until = now + 2 * 3600;
            match gateway.restrict_member(guild_id, user_id, until).await {
                Ok(()) => {
                    self.log_to_guild(&gateway, &config, "Anti-Alt",
                        &format!("Restricted <@{}> `>` account is {}h old", user_id, account_age_hours)).await;
                }
                Err(err) => Logger::err_long("Failed to restrict young account", &err.to_string()),
            }
        }

        if config.autorole_id != 0 {
            if let Err(err) = gateway.assign_role(guild_id, user_id, config.autorole_id).await {
                Logger::err_long("Failed to assign autorole", &err.to_string());
            }
        }

        if config.welcome_channel_id != 0 {
            if let Err(err) = gateway.send_message(config.welcome_channel_id,
                &format!("Welcome <@{}>!", user_id)).await {
                Logger::err_long("Failed to send welcome", &err.to_string());
            }
        }
    }

    async fn guild_member_removal(&self,
                                  ctx: Context,
                                  guild_id: GuildId,
                                  user: User,
                                  _member_data_if_available: Option<Member>,
    ) {
        let resolver = Resolver::new(ctx, Some(guild_id));
        let gateway = DiscordGateway::new(resolver);
        let config = GuildConfig::load(guild_id.get()).await;
        self.log_to_guild(&gateway, &config, "Member Left",
            &format!("{} ({}) left the guild", user.name, user.id)).await;
    }

    async fn voice_state_update(&self, _ctx: Context, old: Option<VoiceState>, new: VoiceState) {

        let guild_id = match new.guild_id {
            Some(guild_id) => guild_id.get(),
            None => return,
        };
        let user_id = new.user_id.get();
        let now = chrono::Utc::now().timestamp();
        let was_connected = old.as_ref().and_then(|state| state.channel_id).is_some();
        let is_connected = new.channel_id.is_some();

        if !was_connected && is_connected {
            LevelingEngine::get_instance().lock().await
                .voice_connect(guild_id, user_id, now);
        } else if was_connected && !is_connected {
            let config = GuildConfig::load(guild_id).await;
            let flushed = LevelingEngine::get_instance().lock().await
                .voice_disconnect(guild_id, user_id, now, config.xp_voice_rate).await;
            if let Err(err) = flushed {
                Logger::err_long("Failed to flush voice session", &err.to_string());
            }
        }
    }

    async fn message_delete(&self,
                            ctx: Context,
                            channel_id: ChannelId,
                            deleted_message_id: MessageId,
                            guild_id: Option<GuildId>,
    ) {
        let guild_id = match guild_id {
            Some(guild_id) => guild_id,
            None => return,
        };
        let config = GuildConfig::load(guild_id.get()).await;
        // blocked messages are logged by the pipeline already; this records
        // plain deletions for the audit trail
        let resolver = Resolver::new(ctx, Some(guild_id));
        let gateway = DiscordGateway::new(resolver);
        self.log_to_guild(&gateway, &config, "Message Deleted",
            &format!("Message {} removed in <#{}>", deleted_message_id, channel_id.get())).await;
    }

    async fn message_update(&self,
                            ctx: Context,
                            old_if_available: Option<Message>,
                            new: Option<Message>,
                            event: MessageUpdateEvent,
    ) {
        let guild_id = match event.guild_id {
            Some(guild_id) => guild_id,
            None => return,
        };
        let new_message = match new {
            Some(new_message) => new_message,
            None => return,
        };
        if new_message.author.bot {
            return;
        }

        let diff_string = match old_if_available {
            Some(old_message) => {
                if old_message.content == new_message.content {
                    return;
                }
                let changeset = Changeset::new(&old_message.content, &new_message.content, " ");
                let mut diff = vec!["```diff".to_string()];
                changeset.diffs.iter().for_each(|difference| {
                    let line = match difference {
                        Difference::Same(text) => text.to_string(),
                        Difference::Add(text) => format!("+ {}", text),
                        Difference::Rem(text) => format!("- {}", text),
                    };
                    diff.push(line);
                });
                diff.push("```".to_string());
                diff.join("\n")
            }
            None => format!("Edited to: {}", new_message.content),
        };

        let resolver = Resolver::new(ctx, Some(guild_id));
        let gateway = DiscordGateway::new(resolver);
        let config = GuildConfig::load(guild_id.get()).await;
        self.log_to_guild(&gateway, &config, "Message Edited",
            &format!("<@{}> edited a message in <#{}>\n{}",
                new_message.author.id, event.channel_id.get(), diff_string)).await;
    }
}
