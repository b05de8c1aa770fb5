
use tokio::runtime::Runtime;
use tokio::time::{sleep, Duration};

use std::thread;

use crate::utility::gateway::DiscordGateway;
use crate::utility::logger::Logger;
use crate::utility::mixed::BoxedFuture;
use crate::utility::resolver::Resolver;
use crate::utility::scheduler::*;
#[cfg(feature = "tickets")]
use crate::utility::ticket_handler::TicketHandler;
#[cfg(feature = "tickets")]
use crate::utility::traits::Singleton;


pub async fn spawn(thread: BoxedFuture<'static, ()>) {
    thread::spawn(move || {
        let runtime = Runtime::new().unwrap();
        runtime.block_on(thread);
    });
}

/// One loop per deferred-action category; cadences are independent and the
/// first pass right after startup also drains anything that came due while
/// the process was down.
pub fn scheduler_sweep_loop<'a>(resolver: Resolver, category: &'static str,
                                interval: u64) -> BoxedFuture<'a, ()> {
    Box::pin(async move {
        let gateway = DiscordGateway::new(resolver);
        loop {
            let now = chrono::Utc::now().timestamp();
            if let Err(err) = Scheduler::sweep(&gateway, category, now).await {
                Logger::err_long("Deferred sweep failed", &err.to_string());
            }
            sleep(Duration::from_secs(interval)).await;
        }
    })
}

#[cfg(feature = "tickets")]
pub fn sla_sweep_loop<'a>(resolver: Resolver) -> BoxedFuture<'a, ()> {
    Box::pin(async move {
        let gateway = DiscordGateway::new(resolver);
        loop {
            sleep(Duration::from_secs(SLA_SWEEP_SECONDS)).await;
            let now = chrono::Utc::now().timestamp();
            let escalated = TicketHandler::get_instance().lock().await
                .sla_sweep(&gateway, now).await;
            match escalated {
                Ok(channels) if !channels.is_empty() => {
                    Logger::warn_long("SLA escalations", &channels.len().to_string());
                }
                Ok(_) => {}
                Err(err) => Logger::err_long("SLA sweep failed", &err.to_string()),
            }
        }
    })
}

#[cfg(feature = "tickets")]
pub fn auto_close_loop<'a>(resolver: Resolver) -> BoxedFuture<'a, ()> {
    Box::pin(async move {
        let gateway = DiscordGateway::new(resolver);
        loop {
            sleep(Duration::from_secs(AUTO_CLOSE_SWEEP_SECONDS)).await;
            let now = chrono::Utc::now().timestamp();
            let closed = TicketHandler::get_instance().lock().await
                .auto_close_sweep(&gateway, now).await;
            match closed {
                Ok(channels) if !channels.is_empty() => {
                    Logger::info_long("Auto-closed tickets", &channels.len().to_string());
                }
                Ok(_) => {}
                Err(err) => Logger::err_long("Auto-close sweep failed", &err.to_string()),
            }
        }
    })
}
