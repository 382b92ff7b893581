// ABOUTME: Console chat connector reading stdin lines and printing replies
// ABOUTME: Smallest ChatConnector for local runs and smoke testing

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use tavern_core::traits::{ChatConnector, EventStream, InboundMessage};

const CONSOLE_CHANNEL: &str = "console";
const CONSOLE_USER: &str = "console-user";

/// Drives the gateway from the terminal: each stdin line is one inbound
/// message, replies are printed to stdout.
pub struct ConsoleConnector;

#[async_trait]
impl ChatConnector for ConsoleConnector {
    async fn event_stream(&self) -> Result<EventStream> {
        let (tx, rx) = mpsc::channel::<String>(16);

        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if tx.send(line).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to read stdin");
                        break;
                    }
                }
            }
        });

        let stream = ReceiverStream::new(rx).map(|line| InboundMessage {
            text: line,
            caller_id: CONSOLE_USER.to_string(),
            caller_name: CONSOLE_USER.to_string(),
            channel_id: CONSOLE_CHANNEL.to_string(),
        });
        Ok(Box::pin(stream))
    }

    async fn send(&self, _channel_id: &str, text: &str) -> Result<()> {
        println!("{text}");
        Ok(())
    }

    fn bot_user_id(&self) -> &str {
        "console-bridge"
    }
}
