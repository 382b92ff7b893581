// ABOUTME: Session lifecycle over the surface adapter: connect, identity selection, teardown
// ABOUTME: Owns the only live adapter handle and the last-confirmed response marker

use crate::config::SurfaceConfig;
use crate::error::{ConnectError, SelectError};
use crate::marker::Marker;
use crate::traits::{SurfaceAdapter, SurfaceDriver};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// How often the liveness wait re-checks for the input control
const LIVENESS_POLL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    SelectingIdentity,
    Ready,
}

/// Owns connection state, the active identity, and the current marker.
///
/// Exactly one live session exists per process; the dispatch coordinator
/// serializes all access. A failed connect or identity selection always
/// tears the adapter handle down before returning, so no partially-open
/// handle survives.
pub struct Session {
    driver: Arc<dyn SurfaceDriver>,
    surface: SurfaceConfig,
    state: ConnectionState,
    adapter: Option<Box<dyn SurfaceAdapter>>,
    active_identity: Option<String>,
    /// Identity to use on the next (re)connect. Survives disconnect so a
    /// reconnect-on-failure reuses the last-known identity.
    preferred_identity: String,
    last_marker: Option<Marker>,
}

impl Session {
    pub fn new(
        driver: Arc<dyn SurfaceDriver>,
        surface: SurfaceConfig,
        initial_identity: impl Into<String>,
    ) -> Self {
        Self {
            driver,
            surface,
            state: ConnectionState::Disconnected,
            adapter: None,
            active_identity: None,
            preferred_identity: initial_identity.into(),
            last_marker: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ConnectionState::Ready
    }

    pub fn active_identity(&self) -> Option<&str> {
        self.active_identity.as_deref()
    }

    pub fn preferred_identity(&self) -> &str {
        &self.preferred_identity
    }

    pub fn last_marker(&self) -> Option<&Marker> {
        self.last_marker.as_ref()
    }

    pub fn set_marker(&mut self, marker: Marker) {
        self.last_marker = Some(marker);
    }

    /// Borrow the adapter handle for one dispatch. None unless connected.
    pub fn adapter(&self) -> Option<&dyn SurfaceAdapter> {
        self.adapter.as_deref()
    }

    /// Establish the adapter handle, wait for surface liveness, and select
    /// the preferred identity.
    pub async fn connect(&mut self) -> Result<(), ConnectError> {
        if self.is_ready() {
            tracing::debug!("Already connected");
            return Ok(());
        }

        self.state = ConnectionState::Connecting;
        tracing::info!(endpoint = %self.surface.endpoint, "Connecting to surface");

        let adapter = match self.driver.open(&self.surface.endpoint).await {
            Ok(a) => a,
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                return Err(ConnectError::Unreachable(e));
            }
        };
        self.adapter = Some(adapter);

        // Liveness: the input control appearing is the signal that the
        // surface finished loading
        let timeout = self.surface.liveness_timeout();
        let deadline = Instant::now() + timeout;
        loop {
            let ready = match self.adapter() {
                Some(adapter) => adapter.input_ready().await.unwrap_or(false),
                None => false,
            };
            if ready {
                break;
            }
            if Instant::now() >= deadline {
                tracing::error!(
                    endpoint = %self.surface.endpoint,
                    "Surface input control never appeared"
                );
                self.teardown().await;
                return Err(ConnectError::LivenessTimeout(timeout));
            }
            tokio::time::sleep(LIVENESS_POLL).await;
        }

        let identity = self.preferred_identity.clone();
        if let Err(e) = self.do_select(&identity).await {
            self.teardown().await;
            return Err(ConnectError::Select(e));
        }

        self.state = ConnectionState::Ready;
        tracing::info!(
            identity = %self.preferred_identity,
            "Connected and identity selected"
        );
        Ok(())
    }

    /// Explicit identity change on a live session.
    ///
    /// A failure invalidates the session (adapter torn down, state
    /// Disconnected); the next relay reconnects with the preferred identity.
    pub async fn select_identity(&mut self, name: &str) -> Result<(), SelectError> {
        match self.do_select(name).await {
            Ok(()) => {
                self.state = ConnectionState::Ready;
                Ok(())
            }
            Err(e) => {
                self.teardown().await;
                Err(e)
            }
        }
    }

    async fn do_select(&mut self, name: &str) -> Result<(), SelectError> {
        self.state = ConnectionState::SelectingIdentity;
        let wanted = name.trim().to_string();
        tracing::info!(identity = %wanted, "Selecting identity");

        let adapter = self
            .adapter
            .as_deref()
            .ok_or_else(|| SelectError::Selector(anyhow::anyhow!("no adapter handle")))?;

        let entries = adapter
            .identity_entries()
            .await
            .map_err(SelectError::Selector)?;

        // Exact, whitespace-trimmed comparison only. A partial-match
        // fallback would turn typos into silently wrong identities.
        let index = entries
            .iter()
            .position(|entry| entry.trim() == wanted)
            .ok_or_else(|| SelectError::NotFound(name.to_string()))?;

        adapter
            .activate_identity(index)
            .await
            .map_err(SelectError::Selector)?;

        // Identity changes can swap the entire visible transcript
        tokio::time::sleep(self.surface.settle()).await;

        self.active_identity = Some(wanted.clone());
        self.preferred_identity = wanted;
        self.refresh_marker().await;
        Ok(())
    }

    /// Recompute the marker from the currently visible units so existing
    /// content is never mistaken for a new response.
    pub async fn refresh_marker(&mut self) {
        let Some(adapter) = self.adapter.as_deref() else {
            return;
        };
        match adapter.list_units().await {
            Ok(units) => {
                self.last_marker = Marker::from_last(&units);
                tracing::debug!(marker = ?self.last_marker, "Marker refreshed");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not refresh marker");
            }
        }
    }

    /// Idempotent; safe to call from any state including never-connected.
    pub async fn disconnect(&mut self) {
        if self.adapter.is_some() {
            tracing::info!("Disconnecting from surface");
        }
        self.teardown().await;
    }

    async fn teardown(&mut self) {
        if let Some(adapter) = self.adapter.take() {
            if let Err(e) = adapter.close().await {
                tracing::warn!(error = %e, "Error closing surface adapter");
            }
        }
        self.state = ConnectionState::Disconnected;
        self.active_identity = None;
        self.last_marker = None;
    }
}
