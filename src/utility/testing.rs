
use serenity::async_trait;
use once_cell::sync::Lazy;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::utility::error::{EngineError, Result};
use crate::utility::gateway::Gateway;


/// Tests that clear or sweep deferred-action categories serialize on this
/// lock so parallel test threads do not consume each other's rows.
pub static DEFERRED_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub fn deferred_lock() -> MutexGuard<'static, ()> {
    DEFERRED_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Gateway stub that records every outbound action. `fail_calls` makes every
/// call report a collaborator failure instead.
pub struct RecordingGateway {
    pub sent: Mutex<Vec<(u64, String)>>,
    pub logs: Mutex<Vec<(u64, String, String)>>,
    pub deleted_messages: Mutex<Vec<(u64, u64)>>,
    pub created_channels: Mutex<Vec<(u64, String)>>,
    pub deleted_channels: Mutex<Vec<u64>>,
    pub assigned_roles: Mutex<Vec<(u64, u64, u64)>>,
    pub removed_roles: Mutex<Vec<(u64, u64, u64)>>,
    pub restricted: Mutex<Vec<(u64, u64, i64)>>,
    pub unbanned: Mutex<Vec<(u64, u64)>>,
    pub transcripts: Mutex<Vec<(u64, String)>>,
    pub activity: Mutex<HashMap<u64, i64>>,
    pub fail_calls: AtomicBool,
    next_channel_id: AtomicU64,
}

impl RecordingGateway {

    pub fn new() -> RecordingGateway {
        RecordingGateway {
            sent: Mutex::new(Vec::new()),
            logs: Mutex::new(Vec::new()),
            deleted_messages: Mutex::new(Vec::new()),
            created_channels: Mutex::new(Vec::new()),
            deleted_channels: Mutex::new(Vec::new()),
            assigned_roles: Mutex::new(Vec::new()),
            removed_roles: Mutex::new(Vec::new()),
            restricted: Mutex::new(Vec::new()),
            unbanned: Mutex::new(Vec::new()),
            transcripts: Mutex::new(Vec::new()),
            activity: Mutex::new(HashMap::new()),
            fail_calls: AtomicBool::new(false),
            // random base keeps allocated channel ids unique across tests
            next_channel_id: AtomicU64::new(rand::Rng::random_range(&mut rand::rng(), 1_000_000..u64::MAX / 4)),
        }
    }

    pub fn set_activity(&self, channel_id: u64, timestamp: i64) {
        self.activity.lock().unwrap().insert(channel_id, timestamp);
    }

    fn check(&self) -> Result<()> {
        if self.fail_calls.load(Ordering::SeqCst) {
            return Err(EngineError::collaborator("gateway unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl Gateway for RecordingGateway {

    async fn send_message(&self, channel_id: u64, content: &str) -> Result<()> {
        self.check()?;
        self.sent.lock().unwrap().push((channel_id, content.to_string()));
        Ok(())
    }

    async fn send_log(&self, channel_id: u64, title: &str, description: &str) -> Result<()> {
        self.check()?;
        self.logs.lock().unwrap().push((channel_id, title.to_string(), description.to_string()));
        Ok(())
    }

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<()> {
        self.check()?;
        self.deleted_messages.lock().unwrap().push((channel_id, message_id));
        Ok(())
    }

    async fn create_ticket_channel(&self, guild_id: u64, name: &str, _opener_id: u64,
                                   _staff_role_id: u64, _category_id: u64) -> Result<u64> {
        self.check()?;
        let channel_id = self.next_channel_id.fetch_add(1, Ordering::SeqCst);
        self.created_channels.lock().unwrap().push((guild_id, name.to_string()));
        Ok(channel_id)
    }

    async fn delete_channel(&self, channel_id: u64) -> Result<()> {
        self.check()?;
        self.deleted_channels.lock().unwrap().push(channel_id);
        Ok(())
    }

    async fn assign_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> Result<()> {
        self.check()?;
        self.assigned_roles.lock().unwrap().push((guild_id, user_id, role_id));
        Ok(())
    }

    async fn remove_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> Result<()> {
        self.check()?;
        self.removed_roles.lock().unwrap().push((guild_id, user_id, role_id));
        Ok(())
    }

    async fn restrict_member(&self, guild_id: u64, user_id: u64, until: i64) -> Result<()> {
        self.check()?;
        self.restricted.lock().unwrap().push((guild_id, user_id, until));
        Ok(())
    }

    async fn unban_member(&self, guild_id: u64, user_id: u64) -> Result<()> {
        self.check()?;
        self.unbanned.lock().unwrap().push((guild_id, user_id));
        Ok(())
    }

    async fn last_activity(&self, channel_id: u64) -> Result<Option<i64>> {
        self.check()?;
        Ok(self.activity.lock().unwrap().get(&channel_id).copied())
    }

    async fn export_transcript(&self, _channel_id: u64) -> Result<Vec<String>> {
        self.check()?;
        Ok(vec![
            "[100] opener: hello I need help".to_string(),
            "[160] staff: looking into it".to_string(),
        ])
    }

    async fn send_transcript(&self, channel_id: u64, filename: &str, _content: String) -> Result<()> {
        self.check()?;
        self.transcripts.lock().unwrap().push((channel_id, filename.to_string()));
        Ok(())
    }
}
