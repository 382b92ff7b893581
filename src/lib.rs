// ABOUTME: Root library module exposing the concrete bindings
// ABOUTME: Provides the CDP surface adapter and the console connector

// Binding-specific modules (stay local)
pub mod console;
pub mod surface;

// Re-export the platform-agnostic engine from tavern-core
pub use tavern_core::commands;
pub use tavern_core::config;
pub use tavern_core::detector;
pub use tavern_core::gateway;
pub use tavern_core::relay;
pub use tavern_core::session;
pub use tavern_core::traits;
pub use tavern_core::utils;

pub use tavern_core::{Config, Gateway, Marker, RelayCoordinator};
