
use serenity::prelude::{Client, GatewayIntents};
use strum::IntoEnumIterator;
use anyhow::Context as _;

use utility::logger::Logger;
use handler::Handler;
use databases::*;

mod handler;
mod utility;
mod databases;


#[tokio::main]
async fn main() -> anyhow::Result<()> {

    // touch every database file up front so schema problems surface at
    // startup instead of inside an event handler
    for identifier in DB::iter() {
        let _ = Database::new(identifier);
    }
    Logger::info("Databases ready");

    let token = std::env::var("DISCORD_TOKEN")
        .context("DISCORD_TOKEN is required")?;

    let intents = GatewayIntents::GUILD_MESSAGES        |
                  GatewayIntents::MESSAGE_CONTENT       |
                  GatewayIntents::GUILD_MEMBERS         |
                  GatewayIntents::GUILD_VOICE_STATES;
    let mut client = Client::builder(token, intents)
        .event_handler(Handler::new())
        .await
        .context("Error creating client")?;

    Logger::info("Starting gateway client");
    client.start().await.context("Gateway client stopped")?;
    Ok(())
}
