//! Bitbucket Server account SSH keys as a key store.

use crate::oauth1::TokenRef;
use crate::team::StashTeam;
use crate::types::KeyPage;
use async_trait::async_trait;
use keygate_core::http::{self, ApiErrorPayload};
use keygate_core::{
    BackendError, BackendResult, Identity, KeyStore, PublicKey, StoredKey, TeamKind,
};
use reqwest::{Method, StatusCode};
use serde_json::json;
use std::collections::HashSet;

/// Uses the user's SSH keys on Bitbucket Server as the key store.
#[derive(Clone)]
pub struct StashKeyStore {
    team: StashTeam,
}

impl StashKeyStore {
    /// Shares the team's signer, HTTP client and observer.
    pub fn new(team: StashTeam) -> Self {
        Self { team }
    }

    /// The access token of an identity issued by this installation.
    fn access_token<'a>(&self, identity: &'a Identity) -> Option<TokenRef<'a>> {
        if !self.team.owns(identity) {
            return None;
        }
        identity.credential.as_pair().map(TokenRef::from)
    }

    /// Every stored entry, page by page until `isLastPage`.
    async fn stored_keys(&self, token: TokenRef<'_>) -> BackendResult<Vec<StoredKey>> {
        let endpoint = self.team.config().keys_endpoint();
        let mut stored = Vec::new();
        let mut start = 0;

        loop {
            let url = format!("{}?start={}", endpoint, start);
            let response = self.team.client().call(Method::GET, &url, Some(token)).await?;
            let response = http::ensure_success(response).await?;
            let page: KeyPage = http::read_json(response).await?;

            stored.extend(
                page.values
                    .into_iter()
                    .map(|key| StoredKey::new(key.id, key.text)),
            );
            if page.is_last_page {
                return Ok(stored);
            }
            start = match page.next_page_start {
                Some(next) if next > start => next,
                Some(next) => {
                    return Err(BackendError::UnexpectedResponse(format!(
                        "{} points back to nextPageStart {}",
                        url, next
                    )));
                }
                None => {
                    return Err(BackendError::UnexpectedResponse(format!(
                        "{} is not the last page but has no nextPageStart",
                        url
                    )));
                }
            };
        }
    }
}

impl From<&StashTeam> for StashKeyStore {
    fn from(team: &StashTeam) -> Self {
        Self::new(team.clone())
    }
}

#[async_trait]
impl KeyStore for StashKeyStore {
    async fn register(&self, identity: &Identity, public_key: &PublicKey) -> BackendResult<()> {
        let Some(token) = self.access_token(identity) else {
            return Ok(());
        };

        let body = json!({ "text": public_key.to_string() });
        let response = self
            .team
            .client()
            .send(
                Method::POST,
                &self.team.config().keys_endpoint(),
                Some(token),
                Some(&body),
            )
            .await?;

        if response.status() == StatusCode::CONFLICT {
            let payload = ApiErrorPayload::parse(&response.text().await?);
            return Err(BackendError::DuplicatePublicKey(
                payload
                    .first_message()
                    .unwrap_or("this key is already registered")
                    .to_string(),
            ));
        }

        let response = http::ensure_success(response).await?;
        http::discard_body(response).await
    }

    async fn list_keys(&self, identity: &Identity) -> BackendResult<HashSet<PublicKey>> {
        let Some(token) = self.access_token(identity) else {
            return Ok(HashSet::new());
        };

        let stored = self.stored_keys(token).await?;
        Ok(StoredKey::collect(
            &stored,
            TeamKind::Stash,
            self.team.client().observer().as_ref(),
        ))
    }

    async fn deregister(&self, identity: &Identity, public_key: &PublicKey) -> BackendResult<()> {
        let Some(token) = self.access_token(identity) else {
            return Ok(());
        };

        let stored = self.stored_keys(token).await?;
        let observer = self.team.client().observer().as_ref();
        let Some(entry) = StoredKey::find(&stored, public_key, TeamKind::Stash, observer) else {
            return Ok(());
        };

        let response = self
            .team
            .client()
            .call(
                Method::DELETE,
                &self.team.config().key_endpoint(&entry.id),
                Some(token),
            )
            .await?;
        let response = http::ensure_success(response).await?;
        http::discard_body(response).await
    }
}
