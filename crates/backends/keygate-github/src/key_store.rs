//! GitHub account public keys as a key store.

use crate::client::GitHubApi;
use crate::team::{GitHubOrganization, bearer_token};
use crate::types::GitHubKey;
use async_trait::async_trait;
use keygate_core::http::{self, ApiErrorPayload};
use keygate_core::{
    BackendError, BackendResult, Identity, KeyStore, PublicKey, SharedObserver, StoredKey,
    TeamKind,
};
use reqwest::StatusCode;
use serde_json::json;
use std::collections::HashSet;

const KEYS_PATH: &str = "/user/keys";
const KEY_IN_USE: &str = "key is already in use";

/// Uses the GitHub account's public keys as the key store.
///
/// Only identities whose identifier is a profile URL under `web_url` are
/// served; their tokens are never sent to `api_url` otherwise.
#[derive(Clone)]
pub struct GitHubKeyStore {
    web_url: String,
    api: GitHubApi,
}

impl GitHubKeyStore {
    pub fn new(web_url: impl Into<String>, api_url: impl Into<String>) -> BackendResult<Self> {
        Ok(Self::with_api(web_url, GitHubApi::new(api_url)?))
    }

    pub fn with_api(web_url: impl Into<String>, api: GitHubApi) -> Self {
        Self {
            web_url: web_url.into(),
            api,
        }
    }

    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.api = self.api.with_observer(observer);
        self
    }

    async fn stored_keys(&self, access_token: &str) -> BackendResult<Vec<StoredKey>> {
        let keys: Vec<GitHubKey> = self.api.get_all_pages(access_token, KEYS_PATH).await?;
        Ok(keys
            .into_iter()
            .map(|key| StoredKey::new(key.id, key.key))
            .collect())
    }
}

impl From<&GitHubOrganization> for GitHubKeyStore {
    /// Share the team's installation, HTTP client and observer.
    fn from(team: &GitHubOrganization) -> Self {
        Self::with_api(&team.config().web_url, team.api().clone())
    }
}

#[async_trait]
impl KeyStore for GitHubKeyStore {
    async fn register(&self, identity: &Identity, public_key: &PublicKey) -> BackendResult<()> {
        let Some(access_token) = bearer_token(&self.web_url, identity) else {
            return Ok(());
        };

        let title = if public_key.comment().is_empty() {
            public_key.algorithm()
        } else {
            public_key.comment()
        };
        let body = json!({
            "title": title,
            "key": public_key.to_string(),
        });
        let response = self.api.post_json(access_token, KEYS_PATH, &body).await?;

        let status = response.status();
        if status == StatusCode::UNPROCESSABLE_ENTITY || status == StatusCode::CONFLICT {
            let url = response.url().to_string();
            let text = response.text().await?;
            let payload = ApiErrorPayload::parse(&text);
            if status == StatusCode::CONFLICT || payload.has_message(KEY_IN_USE) {
                return Err(BackendError::DuplicatePublicKey(
                    payload.first_message().unwrap_or(KEY_IN_USE).to_string(),
                ));
            }
            return Err(BackendError::UnexpectedStatus {
                url,
                status: status.as_u16(),
                body: text,
            });
        }

        let response = http::ensure_success(response).await?;
        http::discard_body(response).await
    }

    async fn list_keys(&self, identity: &Identity) -> BackendResult<HashSet<PublicKey>> {
        let Some(access_token) = bearer_token(&self.web_url, identity) else {
            return Ok(HashSet::new());
        };

        let stored = self.stored_keys(access_token).await?;
        Ok(StoredKey::collect(
            &stored,
            TeamKind::GitHub,
            self.api.observer().as_ref(),
        ))
    }

    async fn deregister(&self, identity: &Identity, public_key: &PublicKey) -> BackendResult<()> {
        let Some(access_token) = bearer_token(&self.web_url, identity) else {
            return Ok(());
        };

        let stored = self.stored_keys(access_token).await?;
        let observer = self.api.observer().as_ref();
        match StoredKey::find(&stored, public_key, TeamKind::GitHub, observer) {
            Some(entry) => {
                self.api
                    .delete(access_token, &format!("{}/{}", KEYS_PATH, entry.id))
                    .await
            }
            None => Ok(()),
        }
    }
}
