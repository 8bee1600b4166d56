//! Core traits and types shared by every keygate backend.
//!
//! A backend pairs a [`Team`], which authenticates a principal against an
//! external organization service, with a [`KeyStore`], which manages that
//! principal's SSH public keys on the same service. Both capabilities work on
//! an [`Identity`] produced by a successful [`Team::authenticate`] call.

mod error;
pub mod http;
mod identity;
mod key_store;
pub mod observe;
mod public_key;
mod team;

pub use error::{BackendError, BackendResult};
pub use identity::{Credential, Identity, TeamKind};
pub use key_store::{KeyStore, StoredKey};
pub use observe::{BackendObserver, NoopObserver, SharedObserver, TracingObserver};
pub use public_key::PublicKey;
pub use team::{AuthenticationContinuation, CallbackParams, ContinuationState, Team};

#[cfg(any(test, feature = "test-util"))]
pub use observe::RecordingObserver;
