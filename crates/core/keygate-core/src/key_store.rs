//! KeyStore capability: a principal's public keys on a remote service.

use crate::error::BackendResult;
use crate::identity::{Identity, TeamKind};
use crate::observe::BackendObserver;
use crate::public_key::PublicKey;
use async_trait::async_trait;
use std::collections::HashSet;

/// Lists, registers and deregisters public keys for an [`Identity`].
///
/// Every operation first checks that the identity belongs to the same team
/// kind and installation as this store; if it does not, nothing is sent and
/// the call is a no-op (an empty listing for `list_keys`).
///
/// Concurrent mutations for the same principal are not serialized here. A
/// `deregister` racing another call's listing can cause that listing to miss
/// or double-report a key; ordering is up to the remote provider.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Fails with `BackendError::DuplicatePublicKey` when the provider
    /// already holds the key.
    async fn register(&self, identity: &Identity, public_key: &PublicKey) -> BackendResult<()>;

    /// Every key on file, fully drained across all pages. Entries that fail
    /// to parse are skipped and reported to the observer.
    async fn list_keys(&self, identity: &Identity) -> BackendResult<HashSet<PublicKey>>;

    /// Deletes the first stored key equal to `public_key`; silently does
    /// nothing when there is none.
    async fn deregister(&self, identity: &Identity, public_key: &PublicKey) -> BackendResult<()>;
}

/// A key entry as the provider stores it, normalized across providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredKey {
    /// Provider-native id used to delete the entry.
    pub id: String,
    /// OpenSSH line as stored remotely.
    pub text: String,
}

impl StoredKey {
    pub fn new(id: impl ToString, text: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            text: text.into(),
        }
    }

    /// Parse the stored line, reporting failures instead of returning them.
    pub fn parse(&self, team: TeamKind, observer: &dyn BackendObserver) -> Option<PublicKey> {
        match PublicKey::parse_line(&self.text) {
            Ok(key) => Some(key),
            Err(error) => {
                observer.malformed_key(team, &self.id, &error);
                None
            }
        }
    }

    /// All well-formed keys among `stored`.
    pub fn collect(
        stored: &[StoredKey],
        team: TeamKind,
        observer: &dyn BackendObserver,
    ) -> HashSet<PublicKey> {
        stored
            .iter()
            .filter_map(|entry| entry.parse(team, observer))
            .collect()
    }

    /// The first entry structurally equal to `public_key`.
    pub fn find<'a>(
        stored: &'a [StoredKey],
        public_key: &PublicKey,
        team: TeamKind,
        observer: &dyn BackendObserver,
    ) -> Option<&'a StoredKey> {
        stored
            .iter()
            .find(|entry| entry.parse(team, observer).as_ref() == Some(public_key))
    }
}
