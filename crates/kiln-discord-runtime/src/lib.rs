//! Discord gateway binding for the Kiln session runtime.
//!
//! Thin by design: converts serenity message events into the runtime's
//! transport-agnostic [`InboundMessage`], adapts outbound sends, and keeps
//! every policy decision inside `kiln-session`.

use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use async_trait::async_trait;
use serenity::all::{ChannelId, Client, Context, EventHandler, GatewayIntents, Message, Ready};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, info};

use kiln_session::{ChatTransport, InboundMessage, SupportSessionRuntime};

#[derive(Debug, Clone)]
/// Gateway connection settings.
pub struct DiscordRuntimeConfig {
    pub token: String,
}

struct SerenityTransport {
    http: Arc<serenity::http::Http>,
}

#[async_trait]
impl ChatTransport for SerenityTransport {
    async fn send_typing(&self, channel_id: &str) -> Result<()> {
        let channel = parse_channel_id(channel_id)?;
        channel
            .broadcast_typing(&self.http)
            .await
            .context("failed to send typing indicator")?;
        Ok(())
    }

    async fn reply(&self, channel_id: &str, text: &str) -> Result<()> {
        let channel = parse_channel_id(channel_id)?;
        channel
            .say(&self.http, text)
            .await
            .context("failed to deliver reply")?;
        Ok(())
    }
}

fn parse_channel_id(raw: &str) -> Result<ChannelId> {
    let value: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("invalid channel id '{raw}'"))?;
    if value == 0 {
        bail!("channel id cannot be zero");
    }
    Ok(ChannelId::new(value))
}

struct SupportBotHandler {
    runtime: Arc<AsyncMutex<SupportSessionRuntime>>,
}

#[async_trait]
impl EventHandler for SupportBotHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(bot = %ready.user.name, "discord gateway ready");
    }

    async fn message(&self, ctx: Context, message: Message) {
        let event = InboundMessage {
            channel_id: message.channel_id.to_string(),
            author_id: message.author.id.to_string(),
            author_is_bot: message.author.bot,
            content: message.content.clone(),
        };
        let transport = SerenityTransport {
            http: ctx.http.clone(),
        };

        let mut runtime = self.runtime.lock().await;
        match runtime.handle_message(&event, &transport).await {
            Ok(outcome) => debug!(?outcome, channel_id = %event.channel_id, "inbound message handled"),
            Err(error) => error!(%error, channel_id = %event.channel_id, "failed to handle inbound message"),
        }
    }
}

/// Connects to the Discord gateway and dispatches message events into the
/// session runtime until the connection ends or the process is stopped.
pub async fn run_discord_runtime(
    config: DiscordRuntimeConfig,
    runtime: Arc<AsyncMutex<SupportSessionRuntime>>,
) -> Result<()> {
    let intents =
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.token, intents)
        .event_handler(SupportBotHandler { runtime })
        .await
        .context("failed to build discord client")?;

    client
        .start()
        .await
        .context("discord gateway connection terminated")?;
    Ok(())
}
