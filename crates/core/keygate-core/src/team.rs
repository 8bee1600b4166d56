//! Team capability: authenticate a principal and re-check their access.

use crate::error::BackendResult;
use crate::identity::{Identity, TeamKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use url::Url;

/// State that must survive the browser redirect between
/// [`Team::request_authentication`] and [`Team::authenticate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContinuationState {
    /// Anti-forgery nonce the provider echoes back in the callback.
    Nonce { nonce: String },
    /// Short-lived request token obtained before the redirect.
    RequestToken { token: String, secret: String },
}

/// Where to send the browser, and what to keep until it comes back.
///
/// The caller stores `state` (typically in its session) and hands it to
/// [`Team::authenticate`] exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationContinuation {
    pub authorize_url: String,
    pub state: ContinuationState,
}

/// Query parameters the provider attached to the callback redirect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    params: HashMap<String, String>,
}

impl CallbackParams {
    /// Parse a raw, form-encoded query string (without the leading `?`).
    pub fn from_query(query: &str) -> Self {
        url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect()
    }

    pub fn from_url(url: &Url) -> Self {
        url.query_pairs().into_owned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CallbackParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            params: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Verifies a principal's membership against one external provider.
///
/// Implementations hold immutable configuration only and may be shared
/// freely between concurrent callers.
#[async_trait]
pub trait Team: Send + Sync {
    fn kind(&self) -> TeamKind;

    /// Begin the handshake.
    ///
    /// Stateless providers use `nonce` as the anti-forgery token (generating
    /// one when `None`). Stateful providers ignore it and fetch a request
    /// token instead.
    async fn request_authentication(
        &self,
        redirect_url: &str,
        nonce: Option<&str>,
    ) -> BackendResult<AuthenticationContinuation>;

    /// Complete the handshake with the state saved from
    /// [`Team::request_authentication`] and the provider's callback.
    async fn authenticate(
        &self,
        state: &ContinuationState,
        redirect_url: &str,
        callback: &CallbackParams,
    ) -> BackendResult<Identity>;

    /// Re-verify against the live provider that `identity` still grants
    /// access to this team. Fails closed: any error yields `false`.
    async fn authorize(&self, identity: &Identity) -> bool;

    /// Group memberships of the principal; empty when the provider has no
    /// group concept.
    async fn list_groups(&self, identity: &Identity) -> BackendResult<BTreeSet<String>>;
}
