
pub mod error;
pub mod logger;
pub mod traits;
pub mod mixed;
pub mod regex_manager;
pub mod guild_config;
pub mod rate_limiter;
pub mod leveling;
pub mod scheduler;
pub mod gateway;
pub mod resolver;
pub mod threads;
#[cfg(feature = "auto_moderation")]
pub mod chat_filter;
#[cfg(feature = "auto_moderation")]
pub mod auto_moder;
#[cfg(feature = "tickets")]
pub mod ticket_handler;
#[cfg(test)]
pub mod testing;

pub use error::{EngineError, Result};
pub use logger::Logger;
pub use traits::{Singleton, ToMessage};
pub use mixed::{BoxedFuture, parse_duration, caps_ratio};
pub use regex_manager::RegexManager;
pub use guild_config::GuildConfig;
pub use rate_limiter::RateLimiter;
pub use leveling::{LevelingEngine, LevelChange};
pub use scheduler::{Scheduler, DeferredPayload};
pub use gateway::{Gateway, DiscordGateway};
pub use resolver::Resolver;
pub use threads::*;
#[cfg(feature = "auto_moderation")]
pub use chat_filter::{ChatFilter, Filter, FilterType};
#[cfg(feature = "auto_moderation")]
pub use auto_moder::AutoModerator;
#[cfg(feature = "tickets")]
pub use ticket_handler::{TicketHandler, TicketType};
