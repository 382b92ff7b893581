// ABOUTME: Gateway event loop bridging a chat connector to the relay coordinator
// ABOUTME: Filters, routes commands, and forwards replies in chunks

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::commands::{parse_message, Command, ParseResult, RelayCommand};
use crate::config::RelayConfig;
use crate::relay::RelayCoordinator;
use crate::traits::{ChatConnector, InboundMessage};
use crate::utils::{chunk_text, CHUNK_BOUNDARY};

/// Pause between chunks so platforms deliver them in order
const CHUNK_PAUSE: Duration = Duration::from_millis(500);

/// Consumes a connector's inbound stream and drives the coordinator.
///
/// Generic over the connector so platform bindings and the bundled console
/// connector share one loop.
pub struct Gateway<C: ChatConnector> {
    connector: Arc<C>,
    coordinator: Arc<RelayCoordinator>,
    relay: RelayConfig,
}

impl<C: ChatConnector> Gateway<C> {
    pub fn new(connector: Arc<C>, coordinator: Arc<RelayCoordinator>, relay: RelayConfig) -> Self {
        Self {
            connector,
            coordinator,
            relay,
        }
    }

    /// Run until the stream ends or `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let mut events = self.connector.event_stream().await?;
        tracing::info!("Gateway started, waiting for messages");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Gateway shutting down");
                    break;
                }
                msg = events.next() => {
                    match msg {
                        Some(msg) => self.handle_message(msg, &cancel).await,
                        None => {
                            tracing::info!("Event stream closed");
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Route one inbound message. Public so tests can drive the gateway
    /// without a live stream.
    pub async fn handle_message(&self, msg: InboundMessage, cancel: &CancellationToken) {
        if self.connector.is_self(&msg.caller_id) {
            return;
        }

        if let Some(scope) = &self.relay.channel_scope {
            if *scope != msg.channel_id {
                tracing::debug!(
                    channel_id = %msg.channel_id,
                    "Ignoring message outside the configured channel"
                );
                return;
            }
        }

        match parse_message(&msg.text, &self.relay.command_prefix) {
            ParseResult::Ignore => {}
            ParseResult::Command(cmd) => {
                tracing::info!(command = %cmd.name, caller = %msg.caller_name, "Handling command");
                let reply = self.handle_command(&cmd).await;
                self.send_reply(&msg.channel_id, &reply).await;
            }
            ParseResult::Message(body) => {
                tracing::info!(
                    caller = %msg.caller_name,
                    chars = body.len(),
                    "Relaying message"
                );
                let reply = self
                    .coordinator
                    .relay(&body, &msg.caller_id, &msg.caller_name, cancel)
                    .await;
                self.send_reply(&msg.channel_id, &reply).await;
            }
        }
    }

    async fn handle_command(&self, cmd: &Command) -> String {
        match cmd.as_relay() {
            RelayCommand::Reconnect => self.coordinator.reconnect().await,
            RelayCommand::Identity(name) => self.coordinator.change_identity(&name).await,
            RelayCommand::Status => self.coordinator.status().await,
            RelayCommand::Help => self.help_text(),
            RelayCommand::Unknown(name) => {
                format!(
                    "Unknown command: {name}. Try `{} help`.",
                    self.relay.command_prefix
                )
            }
        }
    }

    fn help_text(&self) -> String {
        let prefix = &self.relay.command_prefix;
        format!(
            "**Commands**\n\
             `{prefix} reconnect` - drop and re-establish the surface session\n\
             `{prefix} identity <name>` - switch the responding identity\n\
             `{prefix} status` - show connection state and active identity\n\
             `{prefix} help` - this message\n\
             Anything else is relayed as-is. Start a message with `!!` to \
             relay text that looks like a command."
        )
    }

    /// Forward a reply, splitting it under the transport limit. A silent
    /// gateway reads as a hang from the chat side, so empty replies become a
    /// placeholder.
    async fn send_reply(&self, channel_id: &str, text: &str) {
        let text = if text.trim().is_empty() {
            "*(empty response)*"
        } else {
            text
        };

        let chunks = chunk_text(text, CHUNK_BOUNDARY);
        let total = chunks.len();
        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(CHUNK_PAUSE).await;
            }
            if let Err(e) = self.connector.send(channel_id, chunk).await {
                tracing::error!(
                    error = %e,
                    chunk = i + 1,
                    total,
                    "Failed to send reply chunk"
                );
                break;
            }
        }
    }
}
