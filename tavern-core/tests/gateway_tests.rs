// ABOUTME: Integration tests for the gateway event loop
// ABOUTME: Uses a mock ChatConnector recording outbound sends

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use tavern_core::config::Config;
use tavern_core::gateway::Gateway;
use tavern_core::relay::RelayCoordinator;
use tavern_core::traits::{
    ChatConnector, EventStream, InboundMessage, ResponseUnit, SurfaceAdapter, SurfaceDriver,
};

/// Mock connector that records sent messages and replays scripted inbound
/// messages as its stream
struct MockConnector {
    bot_id: String,
    inbound: Mutex<Vec<InboundMessage>>,
    sent: Mutex<Vec<(String, String)>>,
}

impl MockConnector {
    fn new() -> Self {
        Self {
            bot_id: "bridge-bot".to_string(),
            inbound: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatConnector for MockConnector {
    async fn event_stream(&self) -> anyhow::Result<EventStream> {
        let messages: Vec<InboundMessage> = self.inbound.lock().unwrap().drain(..).collect();
        Ok(Box::pin(tokio_stream::iter(messages)))
    }

    async fn send(&self, channel_id: &str, text: &str) -> anyhow::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((channel_id.to_string(), text.to_string()));
        Ok(())
    }

    fn bot_user_id(&self) -> &str {
        &self.bot_id
    }
}

/// Surface mock with one canned reply per submission
struct EchoSurface {
    reply: String,
    units: Mutex<Vec<ResponseUnit>>,
}

#[async_trait]
impl SurfaceAdapter for EchoSurface {
    async fn list_units(&self) -> anyhow::Result<Vec<ResponseUnit>> {
        Ok(self.units.lock().unwrap().clone())
    }

    async fn is_producing(&self) -> anyhow::Result<bool> {
        Ok(false)
    }

    async fn input_ready(&self) -> anyhow::Result<bool> {
        Ok(true)
    }

    async fn clear_input(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn submit_text(&self, text: &str) -> anyhow::Result<()> {
        let mut units = self.units.lock().unwrap();
        let position = units.len();
        units.push(ResponseUnit {
            speaker: Some("User".to_string()),
            text: text.to_string(),
            position,
            element_id: Some(format!("mes-{position}")),
        });
        units.push(ResponseUnit {
            speaker: Some("Assistant".to_string()),
            text: self.reply.clone(),
            position: position + 1,
            element_id: Some(format!("mes-{}", position + 1)),
        });
        Ok(())
    }

    async fn identity_entries(&self) -> anyhow::Result<Vec<String>> {
        Ok(vec!["Assistant".to_string()])
    }

    async fn activate_identity(&self, _index: usize) -> anyhow::Result<()> {
        Ok(())
    }

    async fn close(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

struct EchoDriver {
    reply: String,
}

#[async_trait]
impl SurfaceDriver for EchoDriver {
    async fn open(&self, _endpoint: &str) -> anyhow::Result<Box<dyn SurfaceAdapter>> {
        Ok(Box::new(EchoSurface {
            reply: self.reply.clone(),
            units: Mutex::new(Vec::new()),
        }))
    }
}

fn gateway_with_reply(reply: &str, config: Config) -> (Arc<MockConnector>, Gateway<MockConnector>) {
    let connector = Arc::new(MockConnector::new());
    let driver = Arc::new(EchoDriver {
        reply: reply.to_string(),
    });
    let coordinator = Arc::new(RelayCoordinator::new(driver, &config));
    let relay = config.relay;
    (
        connector.clone(),
        Gateway::new(connector, coordinator, relay),
    )
}

fn msg(text: &str, caller_id: &str, channel_id: &str) -> InboundMessage {
    InboundMessage {
        text: text.to_string(),
        caller_id: caller_id.to_string(),
        caller_name: format!("name-{caller_id}"),
        channel_id: channel_id.to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_message_is_relayed_and_reply_forwarded() {
    let (connector, gateway) = gateway_with_reply("A fine evening to you.", Config::default());
    let cancel = CancellationToken::new();

    gateway
        .handle_message(msg("Hello there", "u1", "chan-1"), &cancel)
        .await;

    let sent = connector.sent();
    assert_eq!(
        sent,
        vec![("chan-1".to_string(), "A fine evening to you.".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_own_messages_are_ignored() {
    let (connector, gateway) = gateway_with_reply("never sent", Config::default());
    let cancel = CancellationToken::new();

    gateway
        .handle_message(msg("Hello", "bridge-bot", "chan-1"), &cancel)
        .await;

    assert!(connector.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_channel_scope_filters_other_channels() {
    let mut config = Config::default();
    config.relay.channel_scope = Some("chan-1".to_string());
    let (connector, gateway) = gateway_with_reply("scoped reply", config);
    let cancel = CancellationToken::new();

    gateway
        .handle_message(msg("Hello", "u1", "chan-2"), &cancel)
        .await;
    assert!(connector.sent().is_empty());

    gateway
        .handle_message(msg("Hello", "u1", "chan-1"), &cancel)
        .await;
    assert_eq!(connector.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_status_command_is_routed_not_relayed() {
    let (connector, gateway) = gateway_with_reply("never sent", Config::default());
    let cancel = CancellationToken::new();

    gateway
        .handle_message(msg("!tavern status", "u1", "chan-1"), &cancel)
        .await;

    let sent = connector.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1, "Not connected to the surface.");
}

#[tokio::test(start_paused = true)]
async fn test_help_and_unknown_commands() {
    let (connector, gateway) = gateway_with_reply("never sent", Config::default());
    let cancel = CancellationToken::new();

    gateway
        .handle_message(msg("!help", "u1", "chan-1"), &cancel)
        .await;
    gateway
        .handle_message(msg("!frobnicate", "u1", "chan-1"), &cancel)
        .await;

    let sent = connector.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].1.contains("Commands"));
    assert!(sent[1].1.contains("Unknown command: frobnicate"));
}

#[tokio::test(start_paused = true)]
async fn test_escaped_bang_message_is_relayed() {
    let (connector, gateway) = gateway_with_reply("relayed fine", Config::default());
    let cancel = CancellationToken::new();

    gateway
        .handle_message(msg("!!literally starts with a bang", "u1", "chan-1"), &cancel)
        .await;

    let sent = connector.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1, "relayed fine");
}

#[tokio::test(start_paused = true)]
async fn test_long_reply_is_chunked_under_the_transport_limit() {
    let long_reply = "lorem ".repeat(500);
    let (connector, gateway) = gateway_with_reply(long_reply.trim(), Config::default());
    let cancel = CancellationToken::new();

    gateway
        .handle_message(msg("tell me everything", "u1", "chan-1"), &cancel)
        .await;

    let sent = connector.sent();
    assert!(sent.len() >= 2, "expected chunking, got {} sends", sent.len());
    for (_, chunk) in &sent {
        assert!(chunk.len() <= 1990);
        assert!(!chunk.is_empty());
    }
    let rejoined = sent
        .iter()
        .map(|(_, c)| c.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    assert_eq!(rejoined, long_reply.trim());
}

#[tokio::test(start_paused = true)]
async fn test_run_drains_stream_and_exits_on_close() {
    let (connector, gateway) = gateway_with_reply("ack", Config::default());
    connector
        .inbound
        .lock()
        .unwrap()
        .push(msg("first", "u1", "chan-1"));
    connector
        .inbound
        .lock()
        .unwrap()
        .push(msg("second", "u2", "chan-1"));

    gateway.run(CancellationToken::new()).await.unwrap();

    let sent = connector.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|(_, t)| t == "ack"));
}
