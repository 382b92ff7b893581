// ABOUTME: Platform-agnostic session and response-synchronization engine
// ABOUTME: Relays chat messages to a browser-rendered surface and back

pub mod commands;
pub mod config;
pub mod detector;
pub mod error;
pub mod gateway;
pub mod marker;
pub mod relay;
pub mod session;
pub mod traits;
pub mod utils;

// Re-export the surface and connector seams for convenient access
pub use traits::{
    // Surface side
    ResponseUnit, SurfaceAdapter, SurfaceDriver,
    // Chat side
    ChatConnector, EventStream, InboundMessage,
};

pub use config::Config;
pub use detector::{await_response, DetectOutcome, DetectorConfig};
pub use error::{ConnectError, SelectError, SubmitError};
pub use gateway::Gateway;
pub use marker::Marker;
pub use relay::RelayCoordinator;
pub use session::{ConnectionState, Session};
