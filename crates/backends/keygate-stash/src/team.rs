//! Users of one Bitbucket Server installation as a team.

use crate::client::StashClient;
use crate::config::StashConfig;
use crate::oauth1::{RequestSigner, RsaSha1Signer, TokenRef};
use crate::types::TokenPair;
use async_trait::async_trait;
use keygate_core::http;
use keygate_core::{
    AuthenticationContinuation, BackendError, BackendResult, CallbackParams, ContinuationState,
    Credential, Identity, SharedObserver, Team, TeamKind,
};
use reqwest::Method;
use std::collections::BTreeSet;
use std::sync::Arc;
use url::Url;

/// Admits every user of the configured installation.
///
/// The handshake is stateful: the request token and its secret returned in
/// the continuation must be handed back to [`Team::authenticate`].
#[derive(Clone)]
pub struct StashTeam {
    config: StashConfig,
    client: StashClient,
}

impl StashTeam {
    /// Parses the configured RSA key and signs with RSA-SHA1.
    pub fn new(config: StashConfig) -> BackendResult<Self> {
        let signer = RsaSha1Signer::from_pem(&config.consumer_key, &config.rsa_key)?;
        Self::with_signer(config, Arc::new(signer))
    }

    pub fn with_signer(config: StashConfig, signer: Arc<dyn RequestSigner>) -> BackendResult<Self> {
        let client = StashClient::new(signer)?;
        Ok(Self { config, client })
    }

    /// Use a caller-configured transport (TLS, proxies, timeouts).
    pub fn with_client(config: StashConfig, http: reqwest::Client) -> BackendResult<Self> {
        let signer = RsaSha1Signer::from_pem(&config.consumer_key, &config.rsa_key)?;
        let client = StashClient::with_client(http, Arc::new(signer));
        Ok(Self { config, client })
    }

    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.client = self.client.with_observer(observer);
        self
    }

    pub fn config(&self) -> &StashConfig {
        &self.config
    }

    /// The configured server URL without a trailing slash; a deserialized
    /// config keeps whatever was written.
    pub fn server_url(&self) -> &str {
        self.config.server_url.trim_end_matches('/')
    }

    pub fn client(&self) -> &StashClient {
        &self.client
    }

    /// Whether `identity` was issued by this installation. The identifier is
    /// the user's profile URL, so it must sit under `server_url`.
    pub fn owns(&self, identity: &Identity) -> bool {
        identity.team_kind == TeamKind::Stash
            && identity
                .identifier
                .strip_prefix(self.server_url())
                .is_some_and(|rest| rest.starts_with('/'))
    }

    async fn complete(
        &self,
        state: &ContinuationState,
        callback: &CallbackParams,
    ) -> BackendResult<Identity> {
        let ContinuationState::RequestToken { token, secret } = state else {
            return Err(BackendError::authentication(
                "continuation state does not carry a request token",
            ));
        };

        if callback.get("oauth_token") != Some(token.as_str()) {
            return Err(BackendError::authentication(
                "callback oauth_token does not match the request token",
            ));
        }

        let request_token = TokenRef { token, secret };
        let response = self
            .client
            .call(
                Method::POST,
                &self.config.access_token_endpoint(),
                Some(request_token),
            )
            .await?;
        if !response.status().is_success() {
            return Err(BackendError::authentication(format!(
                "request token was not authorized (HTTP {})",
                response.status().as_u16()
            )));
        }
        let access = TokenPair::from_form(&response.text().await?)
            .map_err(|e| BackendError::authentication(e.to_string()))?;

        let access_token = TokenRef {
            token: &access.token,
            secret: &access.secret,
        };
        let response = self
            .client
            .call(Method::GET, &self.config.whoami_endpoint(), Some(access_token))
            .await?;
        let response = http::ensure_success(response).await?;
        let whoami = response.text().await?;
        let login = whoami.trim();
        if login.is_empty() {
            return Err(BackendError::authentication(
                "whoami returned no user for the access token",
            ));
        }

        Ok(Identity::new(
            TeamKind::Stash,
            self.config.user_profile_url(login),
            Credential::pair(access.token, access.secret),
        ))
    }
}

#[async_trait]
impl Team for StashTeam {
    fn kind(&self) -> TeamKind {
        TeamKind::Stash
    }

    /// Obtains a request token. `nonce` is not used; the request token itself
    /// binds the callback to this handshake.
    async fn request_authentication(
        &self,
        redirect_url: &str,
        _nonce: Option<&str>,
    ) -> BackendResult<AuthenticationContinuation> {
        let response = self
            .client
            .call(Method::POST, &self.config.request_token_endpoint(), None)
            .await?;
        let response = http::ensure_success(response).await?;
        let request_token = TokenPair::from_form(&response.text().await?)?;

        let mut url = Url::parse(&self.config.authorize_endpoint())?;
        url.query_pairs_mut()
            .append_pair("oauth_token", &request_token.token)
            .append_pair("oauth_callback", redirect_url);

        Ok(AuthenticationContinuation {
            authorize_url: url.into(),
            state: ContinuationState::RequestToken {
                token: request_token.token,
                secret: request_token.secret,
            },
        })
    }

    async fn authenticate(
        &self,
        state: &ContinuationState,
        _redirect_url: &str,
        callback: &CallbackParams,
    ) -> BackendResult<Identity> {
        let result = self.complete(state, callback).await;
        if let Err(BackendError::Authentication(reason)) = &result {
            self.client
                .observer()
                .authentication_rejected(TeamKind::Stash, reason);
        }
        result
    }

    /// Any user of the installation is a member; no request is made.
    async fn authorize(&self, identity: &Identity) -> bool {
        self.owns(identity)
    }

    async fn list_groups(&self, _identity: &Identity) -> BackendResult<BTreeSet<String>> {
        Ok(BTreeSet::new())
    }
}
