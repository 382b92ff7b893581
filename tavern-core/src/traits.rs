// ABOUTME: Capability traits for the surface adapter and chat connector seams
// ABOUTME: The engine is written against these; concrete bindings live outside the crate

use anyhow::Result;
use async_trait::async_trait;
use std::pin::Pin;
use tokio_stream::Stream;

// =============================================================================
// Surface-Side Types
// =============================================================================

/// One rendered turn in the surface's transcript, snapshotted at poll time.
///
/// Snapshots are read-only and re-resolved fresh on every poll tick; the
/// engine never holds live element handles across ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseUnit {
    /// Speaker attribute as rendered, if the unit carries one
    pub speaker: Option<String>,
    /// Visible text content
    pub text: String,
    /// Index in rendering order (oldest = 0)
    pub position: usize,
    /// Stable element id, if the surface exposes one
    pub element_id: Option<String>,
}

impl ResponseUnit {
    /// Trimmed speaker comparison against an expected identity name
    pub fn speaker_is(&self, expected: &str) -> bool {
        self.speaker
            .as_deref()
            .is_some_and(|s| s.trim() == expected.trim())
    }
}

// =============================================================================
// Surface Adapter (capability set over the externally-driven UI)
// =============================================================================

/// Minimal capability interface over the externally-driven surface.
///
/// This is the only seam that touches the rendered UI. Implementations must
/// resolve elements fresh on every call rather than caching handles, since
/// the surface re-renders continuously while a response streams in.
#[async_trait]
pub trait SurfaceAdapter: Send + Sync {
    /// Snapshot all transcript units in rendering order, oldest first.
    ///
    /// Individual units that become unreadable mid-snapshot (concurrent
    /// re-render) are skipped, not errored.
    async fn list_units(&self) -> Result<Vec<ResponseUnit>>;

    /// Whether the producing-output indicator is currently visible
    async fn is_producing(&self) -> Result<bool>;

    /// Whether the input control is present (used as the liveness signal)
    async fn input_ready(&self) -> Result<bool>;

    /// Clear the input control
    async fn clear_input(&self) -> Result<()>;

    /// Type text into the input control and submit it
    async fn submit_text(&self, text: &str) -> Result<()>;

    /// Open the identity selector and list entry names in display order
    async fn identity_entries(&self) -> Result<Vec<String>>;

    /// Activate the identity-selector entry at the given index
    async fn activate_identity(&self, index: usize) -> Result<()>;

    /// Release everything behind the handle. Must be safe to call twice.
    async fn close(&self) -> Result<()>;
}

/// Factory producing adapter handles, resolved once at startup.
///
/// The engine never sees which concrete driver backs the handle.
#[async_trait]
pub trait SurfaceDriver: Send + Sync {
    /// Open a fresh adapter handle against the surface endpoint
    async fn open(&self, endpoint: &str) -> Result<Box<dyn SurfaceAdapter>>;
}

// =============================================================================
// Chat Connector (collaborator surface, implemented outside the engine)
// =============================================================================

/// Inbound relay request from a chat platform
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Message body
    pub text: String,
    /// Platform-specific caller id (keys the persona mapping)
    pub caller_id: String,
    /// Display name of the caller
    pub caller_name: String,
    /// Channel the message arrived in
    pub channel_id: String,
}

/// Boxed stream of inbound messages
pub type EventStream = Pin<Box<dyn Stream<Item = InboundMessage> + Send>>;

/// The chat-platform collaborator the gateway is written against.
///
/// Any platform binding (or the bundled console connector) satisfying this
/// set is substitutable.
#[async_trait]
pub trait ChatConnector: Send + Sync {
    /// Receive inbound messages as a stream
    async fn event_stream(&self) -> Result<EventStream>;

    /// Send one already-chunked piece of text to a channel
    async fn send(&self, channel_id: &str, text: &str) -> Result<()>;

    /// The bridge's own user id on this platform
    fn bot_user_id(&self) -> &str;

    /// Check if a caller id is the bridge itself
    fn is_self(&self, caller_id: &str) -> bool {
        caller_id == self.bot_user_id()
    }
}
