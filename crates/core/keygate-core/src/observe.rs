//! Observability sink injected into every backend at construction.
//!
//! Backends report protocol events through a [`BackendObserver`] instead of
//! reaching for a global logger, so the embedding broker decides where the
//! events end up.

use crate::error::BackendError;
use crate::identity::TeamKind;
use std::sync::Arc;

pub type SharedObserver = Arc<dyn BackendObserver>;

/// A completed HTTP round trip with a provider.
#[derive(Debug, Clone, Copy)]
pub struct HttpExchange<'a> {
    pub team: TeamKind,
    pub method: &'a str,
    pub url: &'a str,
    pub status: u16,
}

/// Receives protocol events from backends. Every method defaults to a no-op.
pub trait BackendObserver: Send + Sync {
    fn http_exchange(&self, _exchange: &HttpExchange<'_>) {}

    /// A stored key could not be parsed and was left out of a listing.
    fn malformed_key(&self, _team: TeamKind, _key_id: &str, _error: &BackendError) {}

    /// A handshake was aborted with an authentication error.
    fn authentication_rejected(&self, _team: TeamKind, _reason: &str) {}

    /// A live authorization check errored and was treated as a denial.
    fn authorization_failed_closed(&self, _team: TeamKind, _error: &BackendError) {}
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl BackendObserver for NoopObserver {}

/// Emits events as structured `tracing` records.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl BackendObserver for TracingObserver {
    fn http_exchange(&self, exchange: &HttpExchange<'_>) {
        tracing::debug!(
            team = %exchange.team,
            method = exchange.method,
            url = exchange.url,
            status = exchange.status,
            "provider request completed"
        );
    }

    fn malformed_key(&self, team: TeamKind, key_id: &str, error: &BackendError) {
        tracing::warn!(%team, key_id, %error, "skipping unparsable stored public key");
    }

    fn authentication_rejected(&self, team: TeamKind, reason: &str) {
        tracing::info!(%team, reason, "authentication rejected");
    }

    fn authorization_failed_closed(&self, team: TeamKind, error: &BackendError) {
        tracing::warn!(%team, %error, "authorization check failed, denying access");
    }
}

impl TracingObserver {
    pub fn shared() -> SharedObserver {
        Arc::new(Self)
    }
}

/// Collects events in memory so tests can assert on them.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub exchanges: std::sync::Mutex<Vec<(String, String, u16)>>,
    pub malformed_keys: std::sync::Mutex<Vec<String>>,
    pub rejections: std::sync::Mutex<Vec<String>>,
    pub failed_closed: std::sync::Mutex<Vec<String>>,
}

#[cfg(any(test, feature = "test-util"))]
impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn exchange_count(&self) -> usize {
        self.exchanges.lock().unwrap().len()
    }

    pub fn malformed_key_ids(&self) -> Vec<String> {
        self.malformed_keys.lock().unwrap().clone()
    }
}

#[cfg(any(test, feature = "test-util"))]
impl BackendObserver for RecordingObserver {
    fn http_exchange(&self, exchange: &HttpExchange<'_>) {
        self.exchanges.lock().unwrap().push((
            exchange.method.to_string(),
            exchange.url.to_string(),
            exchange.status,
        ));
    }

    fn malformed_key(&self, _team: TeamKind, key_id: &str, _error: &BackendError) {
        self.malformed_keys.lock().unwrap().push(key_id.to_string());
    }

    fn authentication_rejected(&self, _team: TeamKind, reason: &str) {
        self.rejections.lock().unwrap().push(reason.to_string());
    }

    fn authorization_failed_closed(&self, _team: TeamKind, error: &BackendError) {
        self.failed_closed.lock().unwrap().push(error.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_observer_collects_events() {
        let observer = RecordingObserver::new();
        let shared: SharedObserver = observer.clone();

        shared.http_exchange(&HttpExchange {
            team: TeamKind::GitHub,
            method: "GET",
            url: "https://api.github.com/user",
            status: 200,
        });
        shared.malformed_key(
            TeamKind::Stash,
            "42",
            &BackendError::InvalidPublicKey("bad".to_string()),
        );
        shared.authentication_rejected(TeamKind::GitHub, "state mismatch");

        assert_eq!(observer.exchange_count(), 1);
        assert_eq!(observer.malformed_key_ids(), vec!["42".to_string()]);
        assert_eq!(observer.rejections.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_noop_and_tracing_observers_accept_events() {
        let error = BackendError::authentication("nope");
        for observer in [
            Arc::new(NoopObserver) as SharedObserver,
            TracingObserver::shared(),
        ] {
            observer.authentication_rejected(TeamKind::Stash, "nope");
            observer.authorization_failed_closed(TeamKind::GitHub, &error);
        }
    }
}
