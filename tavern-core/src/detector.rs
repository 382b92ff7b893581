// ABOUTME: Response-detection poll loop over the surface adapter
// ABOUTME: Two independent predicates per tick: producing signal, then anchored unit scan

use crate::marker::Marker;
use crate::traits::{ResponseUnit, SurfaceAdapter};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Total budget for one detection
    pub timeout: Duration,
    /// Pause between poll ticks
    pub poll_interval: Duration,
}

/// Outcome of one detection loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectOutcome {
    /// A new, attributable response was found
    Response { text: String, marker: Marker },
    /// No attributable response within the budget; not connection-breaking
    TimedOut,
    /// The external cancellation signal fired mid-poll
    Cancelled,
}

/// Poll until the surface has produced a new response attributable to
/// `expected_speaker`, strictly after the unit `last_marker` denotes.
///
/// Every tick re-resolves the unit list fresh; no element state is carried
/// across ticks. The producing-output signal suppresses completion for the
/// tick it is asserted on, even if a matching unit is momentarily visible —
/// absence of the signal is necessary but not sufficient, since it may never
/// appear for very fast responses or may flicker.
pub async fn await_response(
    adapter: &dyn SurfaceAdapter,
    last_marker: Option<&Marker>,
    expected_speaker: &str,
    config: &DetectorConfig,
    cancel: &CancellationToken,
) -> DetectOutcome {
    let deadline = Instant::now() + config.timeout;
    tracing::debug!(
        speaker = %expected_speaker,
        timeout = ?config.timeout,
        "Waiting for response"
    );

    loop {
        if cancel.is_cancelled() {
            tracing::debug!("Detection cancelled");
            return DetectOutcome::Cancelled;
        }

        let producing = adapter.is_producing().await.unwrap_or(false);
        if !producing {
            match adapter.list_units().await {
                Ok(units) => {
                    if let Some(found) = scan_after_marker(&units, last_marker, expected_speaker) {
                        let text = found.text.trim();
                        // A unit can render before its text streams in;
                        // empty text means not-yet-complete
                        if !text.is_empty() {
                            return DetectOutcome::Response {
                                text: text.to_string(),
                                marker: Marker::from_unit(found),
                            };
                        }
                    }
                }
                Err(e) => {
                    // Transient re-renders under continuous polling are
                    // expected; skip the tick, never escalate
                    tracing::debug!(error = %e, "Transient scan fault, skipping tick");
                }
            }
        }

        if Instant::now() >= deadline {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(config.poll_interval) => {}
            _ = cancel.cancelled() => return DetectOutcome::Cancelled,
        }
    }

    // Last chance: a response can render in the instant between the final
    // poll and expiry. Accept the newest unit iff it matches the speaker
    // and denotes a different unit than the stored marker.
    if let Ok(units) = adapter.list_units().await {
        if let Some(newest) = units.last() {
            if newest.speaker_is(expected_speaker) {
                let marker = Marker::from_unit(newest);
                if last_marker != Some(&marker) {
                    let text = newest.text.trim();
                    if !text.is_empty() {
                        tracing::info!("Response found in last-chance rescan after timeout");
                        return DetectOutcome::Response {
                            text: text.to_string(),
                            marker,
                        };
                    }
                }
            }
        }
    }

    tracing::warn!(speaker = %expected_speaker, "Timed out waiting for response");
    DetectOutcome::TimedOut
}

/// Find the first unit strictly after the marker position whose trimmed
/// speaker matches. Earliest-after-marker wins, never newest-overall: when a
/// burst arrives, an identity-neutral greeting must not shadow the target
/// reply. A stale marker means "no last-known position" and the scan
/// restarts from the beginning.
fn scan_after_marker<'a>(
    units: &'a [ResponseUnit],
    marker: Option<&Marker>,
    expected_speaker: &str,
) -> Option<&'a ResponseUnit> {
    let start = match marker {
        Some(m) => match m.resolve(units) {
            Some(index) => index + 1,
            None => {
                tracing::debug!("Last-known marker not resolvable, scanning from start");
                0
            }
        },
        None => 0,
    };

    units
        .iter()
        .skip(start)
        .find(|u| u.speaker_is(expected_speaker))
}
