// ABOUTME: Configuration parsing from TOML file with sensible defaults throughout
// ABOUTME: One explicit Config struct passed into constructors; no process-wide globals

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub surface: SurfaceConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

/// Which browser family backs the CDP adapter.
///
/// Resolved to one concrete adapter at startup; the engine itself only ever
/// sees the `SurfaceDriver` trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Chrome,
    Edge,
    Chromium,
}

impl Default for DriverKind {
    fn default() -> Self {
        DriverKind::Chrome
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub driver: DriverKind,
    /// Optional explicit path to the browser executable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_path: Option<String>,
    #[serde(default)]
    pub headless: bool,
    /// Bound on waiting for the input control to appear after navigation
    #[serde(default = "default_liveness_timeout_secs")]
    pub liveness_timeout_secs: u64,
    /// Pause after identity activation while the transcript swaps out
    #[serde(default = "default_settle_millis")]
    pub settle_millis: u64,
    #[serde(default)]
    pub selectors: Selectors,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            driver: DriverKind::default(),
            driver_path: None,
            headless: false,
            liveness_timeout_secs: default_liveness_timeout_secs(),
            settle_millis: default_settle_millis(),
            selectors: Selectors::default(),
        }
    }
}

impl SurfaceConfig {
    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_secs(self.liveness_timeout_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_millis)
    }
}

/// CSS selectors the CDP adapter drives the surface through.
///
/// Defaults match a typical chat transcript UI; override per deployment when
/// the surface's markup differs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selectors {
    #[serde(default = "default_unit_selector")]
    pub unit: String,
    #[serde(default = "default_unit_text_selector")]
    pub unit_text: String,
    #[serde(default = "default_input_selector")]
    pub input: String,
    #[serde(default = "default_producing_selector")]
    pub producing: String,
    #[serde(default = "default_identity_open_selector")]
    pub identity_open: String,
    #[serde(default = "default_identity_item_selector")]
    pub identity_item: String,
    #[serde(default = "default_identity_name_selector")]
    pub identity_name: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            unit: default_unit_selector(),
            unit_text: default_unit_text_selector(),
            input: default_input_selector(),
            producing: default_producing_selector(),
            identity_open: default_identity_open_selector(),
            identity_item: default_identity_item_selector(),
            identity_name: default_identity_name_selector(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_identity")]
    pub default_identity: String,
    #[serde(default = "default_response_timeout_secs")]
    pub response_timeout_secs: u64,
    #[serde(default = "default_poll_interval_millis")]
    pub poll_interval_millis: u64,
    /// When set, inbound messages from other channels are ignored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_scope: Option<String>,
    /// Whether to issue a /persona substitution before each payload
    #[serde(default)]
    pub persona_mode: bool,
    /// Prefix for chat commands (e.g. "!tavern status")
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
    #[serde(default)]
    pub personas: PersonaConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            default_identity: default_identity(),
            response_timeout_secs: default_response_timeout_secs(),
            poll_interval_millis: default_poll_interval_millis(),
            channel_scope: None,
            persona_mode: false,
            command_prefix: default_command_prefix(),
            personas: PersonaConfig::default(),
        }
    }
}

impl RelayConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_millis)
    }
}

/// Caller-id to persona-name mapping, read-only at runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    #[serde(default = "default_persona")]
    pub default: String,
    #[serde(default)]
    pub map: HashMap<String, String>,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            default: default_persona(),
            map: HashMap::new(),
        }
    }
}

impl PersonaConfig {
    /// Resolve a caller id to a persona name, falling back to the default
    pub fn resolve(&self, caller_id: &str) -> &str {
        self.map
            .get(caller_id)
            .map(String::as_str)
            .unwrap_or(&self.default)
    }
}

fn default_endpoint() -> String {
    "http://localhost:8000".to_string()
}

fn default_liveness_timeout_secs() -> u64 {
    30
}

fn default_settle_millis() -> u64 {
    2000
}

fn default_identity() -> String {
    "Assistant".to_string()
}

fn default_response_timeout_secs() -> u64 {
    60
}

fn default_poll_interval_millis() -> u64 {
    500
}

fn default_persona() -> String {
    "User".to_string()
}

fn default_command_prefix() -> String {
    "!tavern".to_string()
}

fn default_unit_selector() -> String {
    ".mes".to_string()
}

fn default_unit_text_selector() -> String {
    ".mes_text".to_string()
}

fn default_input_selector() -> String {
    "#send_textarea".to_string()
}

fn default_producing_selector() -> String {
    ".typing_indicator".to_string()
}

fn default_identity_open_selector() -> String {
    ".character_select".to_string()
}

fn default_identity_item_selector() -> String {
    ".character_select_item".to_string()
}

fn default_identity_name_selector() -> String {
    ".ch_name".to_string()
}

const DEFAULT_CONFIG_PATH: &str = "tavern.toml";

impl Config {
    /// Load configuration from an explicit path, or `./tavern.toml`.
    ///
    /// A missing file yields the built-in defaults; a present but malformed
    /// file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using built-in defaults"
            );
            return Ok(Self::default());
        }

        tracing::info!(path = %path.display(), "Loading configuration");
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str::<Config>(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.surface.endpoint, "http://localhost:8000");
        assert_eq!(config.surface.driver, DriverKind::Chrome);
        assert!(!config.surface.headless);
        assert_eq!(config.surface.liveness_timeout(), Duration::from_secs(30));
        assert_eq!(config.relay.default_identity, "Assistant");
        assert_eq!(config.relay.response_timeout(), Duration::from_secs(60));
        assert_eq!(config.relay.poll_interval(), Duration::from_millis(500));
        assert!(!config.relay.persona_mode);
        assert!(config.relay.channel_scope.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_str = r##"
            [surface]
            endpoint = "http://tavern.local:8000"
            driver = "edge"
            headless = true
            liveness_timeout_secs = 10

            [surface.selectors]
            input = "#custom_input"

            [relay]
            default_identity = "Nova"
            response_timeout_secs = 90
            channel_scope = "1234"
            persona_mode = true

            [relay.personas]
            default = "Guest"
            [relay.personas.map]
            "42" = "Echo"
        "##;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.surface.endpoint, "http://tavern.local:8000");
        assert_eq!(config.surface.driver, DriverKind::Edge);
        assert!(config.surface.headless);
        assert_eq!(config.surface.selectors.input, "#custom_input");
        // Unset selectors keep their defaults
        assert_eq!(config.surface.selectors.unit, ".mes");
        assert_eq!(config.relay.default_identity, "Nova");
        assert_eq!(config.relay.channel_scope.as_deref(), Some("1234"));
        assert!(config.relay.persona_mode);
        assert_eq!(config.relay.personas.resolve("42"), "Echo");
        assert_eq!(config.relay.personas.resolve("99"), "Guest");
    }

    #[test]
    fn test_empty_config_parses_to_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.relay.default_identity, "Assistant");
        assert_eq!(config.surface.selectors.producing, ".typing_indicator");
    }

    #[test]
    fn test_persona_resolve_default() {
        let personas = PersonaConfig::default();
        assert_eq!(personas.resolve("anyone"), "User");
    }

    #[test]
    fn test_driver_kind_rejects_unknown() {
        let result: Result<Config, _> = toml::from_str("[surface]\ndriver = \"firefox\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_round_trip() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.surface.endpoint, config.surface.endpoint);
        assert_eq!(parsed.relay.default_identity, config.relay.default_identity);
    }
}
