
use serde::{Serialize, Deserialize};
use futures::stream::StreamExt;

use crate::utility::error::{EngineError, Result};
use crate::utility::gateway::Gateway;
use crate::utility::logger::Logger;
use crate::utility::traits::Singleton;
use crate::databases::*;


/// Sweep cadences per action category, in seconds.
pub const REMINDER_SWEEP_SECONDS: u64 = 30;
pub const BROADCAST_SWEEP_SECONDS: u64 = 30;
pub const LIFT_SWEEP_SECONDS: u64 = 30;
pub const CHANNEL_SWEEP_SECONDS: u64 = 10;
pub const SLA_SWEEP_SECONDS: u64 = 120;
pub const AUTO_CLOSE_SWEEP_SECONDS: u64 = 300;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeferredPayload {
    Reminder { guild_id: u64, channel_id: u64, user_id: u64, message: String },
    Broadcast { guild_id: u64, channel_id: u64, content: String },
    Unban { guild_id: u64, user_id: u64 },
    Unmute { guild_id: u64, user_id: u64, role_id: u64 },
    ChannelDelete { guild_id: u64, channel_id: u64 },
}

impl DeferredPayload {

    /// Categories sweep independently, restriction reversals share one.
    pub fn category(&self) -> &'static str {
        match self {
            DeferredPayload::Reminder { .. } => "reminder",
            DeferredPayload::Broadcast { .. } => "broadcast",
            DeferredPayload::Unban { .. } => "lift",
            DeferredPayload::Unmute { .. } => "lift",
            DeferredPayload::ChannelDelete { .. } => "channel_delete",
        }
    }
}

/// Durable deferred actions. `schedule` persists a row with a wall-clock
/// target; the per-category sweeps execute whatever is due, which also
/// covers rows whose target passed while the process was down.
pub struct Scheduler {}

impl Scheduler {

    pub async fn schedule(payload: DeferredPayload, fire_at: i64) -> Result<()> {
        let category = payload.category();
        let encoded = serde_json::to_string(&payload)
            .map_err(|err| EngineError::SchedulerExecution(err.to_string()))?;
        let log = DeferredLog::new(category.to_string(), fire_at, encoded);
        DeferredDB::get_instance().lock().await
            .append(category, &log.into()).await
    }

    /// Executes every due action of the category. The row is consumed before
    /// the attempt: a failing execution is logged and never retried.
    pub async fn sweep(gateway: &dyn Gateway, category: &str, now: i64) -> Result<usize> {
        let due: Vec<DeferredLog> = DeferredDB::get_instance().lock().await
            .get_all(category).await?
            .into_iter()
            .filter(|action| action.is_due(now))
            .collect();

        let mut fired = 0;
        let mut payloads = Vec::new();
        for action in due {
            DeferredDB::get_instance().lock().await
                .delete_by_id(action.id).await?;
            fired += 1;

            match serde_json::from_str::<DeferredPayload>(&action.payload) {
                Ok(payload) => payloads.push(payload),
                Err(err) => {
                    Logger::err_long("Dropping malformed deferred action", &err.to_string());
                }
            }
        }

        futures::stream::iter(payloads)
            .for_each_concurrent(None, |payload| async move {
                if let Err(err) = Self::execute(gateway, &payload).await {
                    Logger::err_long("Deferred action failed", &err.to_string());
                }
            }).await;

        #[cfg(feature = "debug")]
        if fired > 0 {
            Logger::info_long("Fired deferred actions", &format!("{} ({})", fired, category));
        }

        Ok(fired)
    }

    async fn execute(gateway: &dyn Gateway, payload: &DeferredPayload) -> Result<()> {
        match payload {
            DeferredPayload::Reminder { channel_id, user_id, message, .. } => {
                let content = format!("<@{}> Reminder: {}", user_id, message);
                gateway.send_message(*channel_id, &content).await
            }
            DeferredPayload::Broadcast { channel_id, content, .. } => {
                gateway.send_message(*channel_id, content).await
            }
            DeferredPayload::Unban { guild_id, user_id } => {
                gateway.unban_member(*guild_id, *user_id).await
            }
            DeferredPayload::Unmute { guild_id, user_id, role_id } => {
                gateway.remove_role(*guild_id, *user_id, *role_id).await
            }
            DeferredPayload::ChannelDelete { channel_id, .. } => {
                gateway.delete_channel(*channel_id).await
            }
        }
    }
}


#[cfg(test)]
mod tests {

    use super::*;
    use crate::utility::testing::{deferred_lock, RecordingGateway};

    async fn clear_category(category: &str) {
        DeferredDB::get_instance().lock().await
            .delete(category).await.unwrap();
    }

    #[tokio::test]
    async fn past_due_actions_fire_once() {
        let _guard = deferred_lock();
        clear_category("reminder").await;
        let gateway = RecordingGateway::new();

        // target already in the past at sweep time, fires immediately
        Scheduler::schedule(DeferredPayload::Reminder {
            guild_id: 1, channel_id: 42, user_id: 7,
            message: "stretch your legs".to_string(),
        }, 100).await.unwrap();

        let fired = Scheduler::sweep(&gateway, "reminder", 1_000).await.unwrap();
        assert_eq!(fired, 1);
        let sent = gateway.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 42);
        assert!(sent[0].1.contains("stretch your legs"));
        drop(sent);

        // the row is gone, nothing amplifies
        let fired = Scheduler::sweep(&gateway, "reminder", 2_000).await.unwrap();
        assert_eq!(fired, 0);
    }

    #[tokio::test]
    async fn future_actions_wait_for_their_target() {
        let _guard = deferred_lock();
        clear_category("broadcast").await;
        let gateway = RecordingGateway::new();

        Scheduler::schedule(DeferredPayload::Broadcast {
            guild_id: 1, channel_id: 9, content: "movie night".to_string(),
        }, 5_000).await.unwrap();

        assert_eq!(Scheduler::sweep(&gateway, "broadcast", 4_999).await.unwrap(), 0);
        assert!(gateway.sent.lock().unwrap().is_empty());

        assert_eq!(Scheduler::sweep(&gateway, "broadcast", 5_000).await.unwrap(), 1);
        assert_eq!(gateway.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_executions_are_consumed_not_retried() {
        let _guard = deferred_lock();
        clear_category("lift").await;
        let gateway = RecordingGateway::new();
        gateway.fail_calls.store(true, std::sync::atomic::Ordering::SeqCst);

        Scheduler::schedule(DeferredPayload::Unban { guild_id: 3, user_id: 8 }, 10).await.unwrap();
        assert_eq!(Scheduler::sweep(&gateway, "lift", 100).await.unwrap(), 1);

        // row was consumed despite the failure
        gateway.fail_calls.store(false, std::sync::atomic::Ordering::SeqCst);
        assert_eq!(Scheduler::sweep(&gateway, "lift", 200).await.unwrap(), 0);
        assert!(gateway.unbanned.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn categories_sweep_independently() {
        let _guard = deferred_lock();
        clear_category("channel_delete").await;
        clear_category("reminder").await;
        let gateway = RecordingGateway::new();

        Scheduler::schedule(DeferredPayload::ChannelDelete { guild_id: 1, channel_id: 77 }, 10).await.unwrap();
        // a reminder sweep never touches channel deletions
        Scheduler::sweep(&gateway, "reminder", 100).await.unwrap();
        assert!(gateway.deleted_channels.lock().unwrap().is_empty());

        Scheduler::sweep(&gateway, "channel_delete", 100).await.unwrap();
        assert_eq!(*gateway.deleted_channels.lock().unwrap(), [77]);
    }
}
