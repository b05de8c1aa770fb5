
use uuid::Uuid;
use ring::digest;

use crate::utility::error::{EngineError, Result};
use crate::utility::gateway::Gateway;
use crate::utility::guild_config::GuildConfig;
use crate::utility::logger::Logger;
use crate::utility::scheduler::{Scheduler, DeferredPayload};
use crate::utility::traits::Singleton;
use crate::databases::*;
use crate::impl_singleton;


const CHANNEL_DELETE_GRACE_SECONDS: i64 = 5;
const AUTO_CLOSE_IDLE_SECONDS: i64 = 72 * 60 * 60;

#[cfg(feature = "tickets")]
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum TicketType {
    Support,
    Report,
    Appeal,
}

#[cfg(feature = "tickets")]
impl Into<String> for TicketType {
    fn into(self) -> String {
        match self {
            TicketType::Support => "support".to_string(),
            TicketType::Report => "report".to_string(),
            TicketType::Appeal => "appeal".to_string(),
        }
    }
}

#[cfg(feature = "tickets")]
impl From<String> for TicketType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "report" => TicketType::Report,
            "appeal" => TicketType::Appeal,
            _ => TicketType::Support,
        }
    }
}

/// Drives the ticket state machine over persisted records. A ticket is open
/// from creation until a staff or system close; `closed` is terminal. The
/// SLA and auto-close sweeps re-validate the status before acting, so a
/// manual close needs no cancellation of scheduled checks.
#[cfg(feature = "tickets")]
pub struct TicketHandler {}

#[cfg(feature = "tickets")]
impl TicketHandler {

    pub fn new() -> Self {
        TicketHandler {}
    }

    fn key(guild_id: u64, channel_id: u64) -> String {
        format!("{}:{}", guild_id, channel_id)
    }

    fn guild_of(ticket: &TicketLog) -> u64 {
        ticket.key.split(':').next()
            .and_then(|guild| guild.parse().ok())
            .unwrap_or(0)
    }

    /// Opens a ticket for `opener_id`. At most one ticket per (guild, opener)
    /// may be open; a second request is rejected without side effects.
    pub async fn open_ticket(&self, gateway: &dyn Gateway, config: &GuildConfig,
                             opener_id: u64, ticket_type: TicketType, now: i64) -> Result<TicketLog> {

        let open_already = TicketsDB::get_instance().lock().await
            .query_prefix(&format!("{}:", config.guild_id)).await?
            .into_iter()
            .any(|ticket| ticket.is_open() && ticket.opener_id == opener_id);
        if open_already {
            return Err(EngineError::precondition(
                format!("user {} already has an open ticket", opener_id)));
        }

        let type_name: String = ticket_type.into();
        let channel_name = format!("{}-{}", type_name, opener_id);
        let channel_id = gateway.create_ticket_channel(
            config.guild_id, &channel_name, opener_id,
            config.staff_role_id, config.ticket_category_id).await?;

        let ticket = TicketLog::new(
            channel_id, opener_id, type_name.clone(), "open".to_string(),
            0, now, 0, Uuid::new_v4().to_string());
        TicketsDB::get_instance().lock().await
            .set(&Self::key(config.guild_id, channel_id), &ticket.clone().into()).await?;

        if let Err(err) = gateway.send_message(channel_id,
            &format!("Ticket opened by <@{}> ({}).", opener_id, type_name)).await {
            Logger::err_long("Failed to greet ticket", &err.to_string());
        }

        #[cfg(feature = "debug")]
        Logger::info_long("Opened ticket", &Self::key(config.guild_id, channel_id));

        Ok(ticket)
    }

    /// Staff-only; re-assignment simply overwrites.
    pub async fn assign_ticket(&self, guild_id: u64, channel_id: u64,
                               staff_id: u64, actor_is_staff: bool) -> Result<()> {
        if !actor_is_staff {
            return Err(EngineError::precondition("assigning tickets is staff only"));
        }
        let key = Self::key(guild_id, channel_id);
        let db = TicketsDB::get_instance().lock().await;
        let mut ticket = db.get(&key).await?
            .ok_or(EngineError::precondition("this channel is not a ticket"))?;
        if !ticket.is_open() {
            return Err(EngineError::precondition("ticket is already closed"));
        }
        ticket.assigned_staff_id = staff_id;
        db.set(&key, &ticket.into()).await
    }

    /// Closes the ticket, exports the transcript to the archival channel and
    /// schedules the channel deletion after a short grace delay. Closing an
    /// already-closed ticket is rejected and re-exports nothing.
    pub async fn close_ticket(&self, gateway: &dyn Gateway, config: &GuildConfig,
                              channel_id: u64, reason: &str,
                              actor_is_staff: bool, now: i64) -> Result<()> {

        if !actor_is_staff {
            return Err(EngineError::precondition("closing tickets is staff only"));
        }

        let key = Self::key(config.guild_id, channel_id);
        let ticket = {
            let db = TicketsDB::get_instance().lock().await;
            let mut ticket = db.get(&key).await?
                .ok_or(EngineError::precondition("this channel is not a ticket"))?;
            if !ticket.is_open() {
                return Err(EngineError::precondition("ticket is already closed"));
            }
            ticket.status = "closed".to_string();
            ticket.closed_at = now;
            db.set(&key, &ticket.clone().into()).await?;
            ticket
        };

        self.export_transcript(gateway, config, &ticket, reason).await;

        // one audit note per closure, appended as its own row
        let note = Note::new(format!("ticket {} ({}) closed: {}", ticket.uuid, ticket.ticket_type, reason));
        NotesDB::get_instance().lock().await
            .append(&format!("{}:{}", config.guild_id, ticket.opener_id), &note.into()).await?;

        Scheduler::schedule(DeferredPayload::ChannelDelete {
            guild_id: config.guild_id,
            channel_id: channel_id,
        }, now + CHANNEL_DELETE_GRACE_SECONDS).await?;

        if let Err(err) = gateway.send_message(channel_id,
            &format!("Ticket closed: {}. This channel will be removed shortly.", reason)).await {
            Logger::err_long("Failed to announce close", &err.to_string());
        }

        #[cfg(feature = "debug")]
        Logger::info_long("Closed ticket", &key);

        Ok(())
    }

    async fn export_transcript(&self, gateway: &dyn Gateway, config: &GuildConfig,
                               ticket: &TicketLog, reason: &str) {
        if config.transcript_channel_id == 0 {
            return;
        }
        let lines = match gateway.export_transcript(ticket.channel_id).await {
            Ok(lines) => lines,
            Err(err) => {
                Logger::err_long("Failed to read ticket history", &err.to_string());
                return;
            }
        };
        let content = lines.join("\n");
        let checksum = digest::digest(&digest::SHA256, content.as_bytes());
        let checksum = checksum.as_ref().iter()
            .map(|byte| format!("{:02x}", byte))
            .collect::<String>();

        let filename = format!("ticket-{}.txt", ticket.uuid);
        if let Err(err) = gateway.send_transcript(config.transcript_channel_id, &filename, content).await {
            Logger::err_long("Failed to export transcript", &err.to_string());
            return;
        }
        let summary = format!(
            "Transcript for ticket of <@{}> ({}) closed: {}. sha256 {}",
            ticket.opener_id, ticket.ticket_type, reason, checksum);
        if let Err(err) = gateway.send_message(config.transcript_channel_id, &summary).await {
            Logger::err_long("Failed to announce transcript", &err.to_string());
        }
    }

    /// Escalates every open, unassigned ticket older than the guild's SLA.
    /// There is no dedupe flag: the notice repeats on every sweep until the
    /// ticket is assigned or closed. Returns the escalated channel ids.
    pub async fn sla_sweep(&self, gateway: &dyn Gateway, now: i64) -> Result<Vec<u64>> {
        let tickets = TicketsDB::get_instance().lock().await
            .query_prefix("").await?;
        let mut escalated = Vec::new();

        for ticket in tickets {
            if !ticket.is_open() || ticket.assigned_staff_id != 0 {
                continue;
            }
            let guild_id = Self::guild_of(&ticket);
            let config = GuildConfig::load(guild_id).await;
            if now - ticket.created_at < config.sla_minutes * 60 {
                continue;
            }
            let ping = match config.staff_role_id {
                0 => "Staff".to_string(),
                role => format!("<@&{}>", role),
            };
            let notice = format!("{} SLA warning: this ticket is still waiting for assignment.", ping);
            if let Err(err) = gateway.send_message(ticket.channel_id, &notice).await {
                Logger::err_long("Failed to escalate ticket", &err.to_string());
                continue;
            }
            escalated.push(ticket.channel_id);
        }
        Ok(escalated)
    }

    /// Closes open tickets whose channel has been idle for 72 hours.
    pub async fn auto_close_sweep(&self, gateway: &dyn Gateway, now: i64) -> Result<Vec<u64>> {
        let tickets = TicketsDB::get_instance().lock().await
            .query_prefix("").await?;
        let mut closed = Vec::new();

        for ticket in tickets {
            if !ticket.is_open() {
                continue;
            }
            let last = match gateway.last_activity(ticket.channel_id).await {
                Ok(Some(last)) => last,
                Ok(None) => continue,
                Err(err) => {
                    Logger::err_long("Failed to read channel activity", &err.to_string());
                    continue;
                }
            };
            if now - last < AUTO_CLOSE_IDLE_SECONDS {
                continue;
            }
            let guild_id = Self::guild_of(&ticket);
            let config = GuildConfig::load(guild_id).await;
            match self.close_ticket(gateway, &config, ticket.channel_id,
                                    "auto-closed after 72h of inactivity", true, now).await {
                Ok(()) => closed.push(ticket.channel_id),
                Err(err) => Logger::err_long("Failed to auto-close ticket", &err.to_string()),
            }
        }
        Ok(closed)
    }
}

#[cfg(feature = "tickets")]
impl_singleton!(TicketHandler);
