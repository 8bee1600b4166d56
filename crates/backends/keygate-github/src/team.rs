//! GitHub organization membership as a team.

use crate::client::GitHubApi;
use crate::config::{self, GitHubConfig, SCOPES};
use crate::types::{GitHubOrg, GitHubTeam, GitHubUser, TokenResponse};
use async_trait::async_trait;
use keygate_core::http::{self, APPLICATION_JSON, ContentType, FORM_URLENCODED};
use keygate_core::{
    AuthenticationContinuation, BackendError, BackendResult, CallbackParams, ContinuationState,
    Credential, Identity, SharedObserver, Team, TeamKind,
};
use reqwest::header::ACCEPT;
use std::collections::BTreeSet;
use url::Url;
use uuid::Uuid;

/// Admits GitHub users who belong to the configured organization.
#[derive(Clone)]
pub struct GitHubOrganization {
    config: GitHubConfig,
    api: GitHubApi,
}

impl GitHubOrganization {
    pub fn new(config: GitHubConfig) -> BackendResult<Self> {
        let api = GitHubApi::new(&config.api_url)?;
        Ok(Self { config, api })
    }

    pub fn with_client(config: GitHubConfig, http: reqwest::Client) -> Self {
        let api = GitHubApi::with_client(http, &config.api_url);
        Self { config, api }
    }

    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.api = self.api.with_observer(observer);
        self
    }

    pub fn config(&self) -> &GitHubConfig {
        &self.config
    }

    pub fn api(&self) -> &GitHubApi {
        &self.api
    }

    /// Exchange the authorization code for an access token.
    async fn exchange_code(&self, code: &str, redirect_url: &str) -> BackendResult<String> {
        let endpoint = self.config.access_token_endpoint();
        let response = self
            .api
            .http()
            .post(&endpoint)
            .header(ACCEPT, APPLICATION_JSON)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", redirect_url),
            ])
            .send()
            .await?;
        http::observe(self.api.observer().as_ref(), TeamKind::GitHub, "POST", &response);
        if !response.status().is_success() {
            return Err(BackendError::authentication(format!(
                "{} rejected the code exchange (HTTP {})",
                endpoint,
                response.status().as_u16()
            )));
        }

        let token = match ContentType::of(&response) {
            Some(ct) if ct.is(FORM_URLENCODED) => TokenResponse::from_form(&response.text().await?),
            Some(ct) if ct.is(APPLICATION_JSON) => serde_json::from_str(&response.text().await?)?,
            other => {
                return Err(BackendError::authentication(format!(
                    "{} sent unsupported content type: {}",
                    endpoint,
                    other.as_ref().map(ContentType::as_str).unwrap_or("(none)")
                )));
            }
        };

        let reason = token.rejection_reason();
        token
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| BackendError::authentication(reason))
    }

    async fn complete(
        &self,
        state: &ContinuationState,
        redirect_url: &str,
        callback: &CallbackParams,
    ) -> BackendResult<Identity> {
        let ContinuationState::Nonce { nonce } = state else {
            return Err(BackendError::authentication(
                "continuation state does not carry a nonce",
            ));
        };

        if let Some(error) = callback.get("error") {
            let description = callback.get("error_description").unwrap_or("No description");
            return Err(BackendError::authentication(format!(
                "{}: {}",
                error, description
            )));
        }

        let code = callback
            .get("code")
            .ok_or_else(|| BackendError::authentication("callback is missing the code"))?;
        if callback.get("state") != Some(nonce.as_str()) {
            return Err(BackendError::authentication(
                "callback state does not match the issued nonce",
            ));
        }

        let access_token = self.exchange_code(code, redirect_url).await?;
        let user: GitHubUser = self.api.get_json(&access_token, "/user").await?;
        let identity = Identity::new(
            TeamKind::GitHub,
            self.config.profile_url(&user.login),
            Credential::bearer(access_token),
        );

        if self.authorize(&identity).await {
            Ok(identity)
        } else {
            Err(BackendError::authentication(format!(
                "@{} user is not a member of @{} organization",
                user.login, self.config.org_login
            )))
        }
    }

    /// Live membership check. A body that is not an organization list
    /// (GitHub sometimes answers `{"error": ...}`) fails to decode and so
    /// counts as an error.
    async fn is_member(&self, access_token: &str) -> BackendResult<bool> {
        let orgs: Vec<GitHubOrg> = self.api.get_all_pages(access_token, "/user/orgs").await?;
        Ok(orgs.iter().any(|org| org.login == self.config.org_login))
    }
}

/// The bearer token of a GitHub identity issued by the installation at
/// `web_url`; `None` for anything else, so no request is made with it.
pub(crate) fn bearer_token<'a>(web_url: &str, identity: &'a Identity) -> Option<&'a str> {
    config::login_at(web_url, identity)?;
    identity.credential.as_bearer()
}

#[async_trait]
impl Team for GitHubOrganization {
    fn kind(&self) -> TeamKind {
        TeamKind::GitHub
    }

    async fn request_authentication(
        &self,
        redirect_url: &str,
        nonce: Option<&str>,
    ) -> BackendResult<AuthenticationContinuation> {
        let nonce = nonce
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut url = Url::parse(&self.config.authorize_endpoint())?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", redirect_url)
            .append_pair("scope", SCOPES)
            .append_pair("state", &nonce);

        Ok(AuthenticationContinuation {
            authorize_url: url.into(),
            state: ContinuationState::Nonce { nonce },
        })
    }

    async fn authenticate(
        &self,
        state: &ContinuationState,
        redirect_url: &str,
        callback: &CallbackParams,
    ) -> BackendResult<Identity> {
        let result = self.complete(state, redirect_url, callback).await;
        if let Err(BackendError::Authentication(reason)) = &result {
            self.api
                .observer()
                .authentication_rejected(TeamKind::GitHub, reason);
        }
        result
    }

    async fn authorize(&self, identity: &Identity) -> bool {
        let Some(access_token) = bearer_token(&self.config.web_url, identity) else {
            return false;
        };

        match self.is_member(access_token).await {
            Ok(member) => member,
            Err(error) => {
                self.api
                    .observer()
                    .authorization_failed_closed(TeamKind::GitHub, &error);
                false
            }
        }
    }

    async fn list_groups(&self, identity: &Identity) -> BackendResult<BTreeSet<String>> {
        let Some(access_token) = bearer_token(&self.config.web_url, identity) else {
            return Ok(BTreeSet::new());
        };

        let teams: Vec<GitHubTeam> = self.api.get_all_pages(access_token, "/user/teams").await?;
        Ok(teams
            .into_iter()
            .filter(|team| team.organization.login == self.config.org_login)
            .map(|team| team.slug)
            .collect())
    }
}
