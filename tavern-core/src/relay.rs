// ABOUTME: Dispatch coordinator serializing relay requests against the single session
// ABOUTME: Always answers with a human-readable string; failures never propagate as panics

use crate::config::{Config, RelayConfig};
use crate::detector::{await_response, DetectOutcome, DetectorConfig};
use crate::error::SubmitError;
use crate::session::Session;
use crate::traits::{SurfaceAdapter, SurfaceDriver};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Pause after a persona command while the surface processes it
const PERSONA_SETTLE: Duration = Duration::from_millis(500);

/// Serializes all traffic against the one session.
///
/// The mutex is the explicit single-flight guarantee: the surface has one
/// input control and one transcript, so interleaved sends would corrupt
/// response attribution. tokio's mutex queues waiters fairly, which gives
/// strict submission order.
pub struct RelayCoordinator {
    session: Mutex<Session>,
    relay: RelayConfig,
}

impl RelayCoordinator {
    pub fn new(driver: Arc<dyn SurfaceDriver>, config: &Config) -> Self {
        let session = Session::new(
            driver,
            config.surface.clone(),
            config.relay.default_identity.clone(),
        );
        Self {
            session: Mutex::new(session),
            relay: config.relay.clone(),
        }
    }

    fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            timeout: self.relay.response_timeout(),
            poll_interval: self.relay.poll_interval(),
        }
    }

    /// Relay one message and wait for the attributable reply.
    ///
    /// Always returns a string for the caller to forward verbatim; failures
    /// are encoded as explanatory text. Honors `cancel` mid-poll; a
    /// cancelled relay leaves the session at the last confirmed marker.
    pub async fn relay(
        &self,
        text: &str,
        caller_id: &str,
        caller_name: &str,
        cancel: &CancellationToken,
    ) -> String {
        let mut session = self.session.lock().await;

        if !session.is_ready() {
            tracing::warn!("Session not ready, attempting to connect");
            if let Err(e) = session.connect().await {
                return format!("Error: could not connect to the surface: {e}");
            }
        }

        if self.relay.persona_mode {
            // Best-effort: persona substitution only affects attribution
            // metadata, so its failure is logged, never escalated
            self.apply_persona(&session, caller_id, caller_name).await;
        }

        // Anchor the marker before the send; the detector's speaker scan
        // skips the caller's own echoed unit, and refreshing after the send
        // could race a fast reply and anchor past it
        session.refresh_marker().await;

        tracing::info!(
            caller = %caller_name,
            len = text.len(),
            "Submitting message to surface"
        );
        let submitted = match session.adapter() {
            Some(adapter) => submit(adapter, text).await,
            None => Err(SubmitError(anyhow::anyhow!("no adapter handle"))),
        };
        if let Err(e) = submitted {
            tracing::error!(error = %e, "Submit failed, marking session disconnected");
            session.disconnect().await;
            return format!("Error interacting with the surface: {e}");
        }

        let expected = session
            .active_identity()
            .unwrap_or(self.relay.default_identity.as_str())
            .to_string();
        let last_marker = session.last_marker().cloned();
        let config = self.detector_config();

        let outcome = match session.adapter() {
            Some(adapter) => {
                await_response(adapter, last_marker.as_ref(), &expected, &config, cancel).await
            }
            None => DetectOutcome::TimedOut,
        };

        match outcome {
            DetectOutcome::Response { text, marker } => {
                session.set_marker(marker);
                tracing::info!(len = text.len(), "Response relayed");
                text
            }
            DetectOutcome::TimedOut => {
                // Session stays Ready; the next relay reuses it
                format!("{expected} did not reply within the configured timeout.")
            }
            DetectOutcome::Cancelled => "The request was cancelled before a reply arrived.".to_string(),
        }
    }

    async fn apply_persona(&self, session: &Session, caller_id: &str, caller_name: &str) {
        let persona = self.relay.personas.resolve(caller_id);
        tracing::info!(caller = %caller_name, persona = %persona, "Applying persona substitution");

        let Some(adapter) = session.adapter() else {
            return;
        };
        let command = format!("/persona {persona}");
        if let Err(SubmitError(e)) = submit(adapter, &command).await {
            tracing::warn!(error = %e, persona = %persona, "Persona substitution failed");
            return;
        }
        tokio::time::sleep(PERSONA_SETTLE).await;
        // Some surfaces leave the command text sitting in the input
        if let Err(e) = adapter.clear_input().await {
            tracing::debug!(error = %e, "Could not re-clear input after persona command");
        }
    }

    /// Tear down and re-establish the session with the last-known identity
    pub async fn reconnect(&self) -> String {
        let mut session = self.session.lock().await;
        session.disconnect().await;
        match session.connect().await {
            Ok(()) => format!(
                "Reconnected to the surface with identity '{}'.",
                session.preferred_identity()
            ),
            Err(e) => format!("Reconnect failed: {e}"),
        }
    }

    /// Switch the active identity, connecting first if necessary
    pub async fn change_identity(&self, name: &str) -> String {
        let mut session = self.session.lock().await;
        if !session.is_ready() {
            if let Err(e) = session.connect().await {
                return format!("Error: could not connect to the surface: {e}");
            }
        }
        match session.select_identity(name).await {
            Ok(()) => format!("Identity changed to '{}'.", name.trim()),
            Err(e) => format!("Could not change identity: {e}"),
        }
    }

    /// Human-readable connection status
    pub async fn status(&self) -> String {
        let session = self.session.lock().await;
        match session.active_identity() {
            Some(identity) if session.is_ready() => format!(
                "Connected to the surface.\nIdentity: {}\nPersona mode: {}",
                identity,
                if self.relay.persona_mode {
                    "enabled"
                } else {
                    "disabled"
                }
            ),
            _ => "Not connected to the surface.".to_string(),
        }
    }

    /// Release the session's adapter handle (shutdown path)
    pub async fn shutdown(&self) {
        let mut session = self.session.lock().await;
        session.disconnect().await;
    }
}

async fn submit(adapter: &dyn SurfaceAdapter, text: &str) -> Result<(), SubmitError> {
    adapter.clear_input().await.map_err(SubmitError)?;
    adapter.submit_text(text).await.map_err(SubmitError)
}
