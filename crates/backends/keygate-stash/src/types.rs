//! Bitbucket Server wire types.

use keygate_core::{BackendError, BackendResult};
use serde::{Deserialize, Serialize};

/// A token pair from the request-token or access-token endpoint, sent as
/// `oauth_token=...&oauth_token_secret=...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub token: String,
    pub secret: String,
}

impl TokenPair {
    pub fn from_form(body: &str) -> BackendResult<Self> {
        let mut token = None;
        let mut secret = None;
        for (name, value) in url::form_urlencoded::parse(body.trim().as_bytes()) {
            match name.as_ref() {
                "oauth_token" => token = Some(value.into_owned()),
                "oauth_token_secret" => secret = Some(value.into_owned()),
                _ => {}
            }
        }

        match (token, secret) {
            (Some(token), Some(secret)) if !token.is_empty() => Ok(Self { token, secret }),
            _ => Err(BackendError::UnexpectedResponse(format!(
                "token response lacks oauth_token/oauth_token_secret: {}",
                body
            ))),
        }
    }
}

/// One page of `GET /rest/ssh/1.0/keys`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPage {
    #[serde(default)]
    pub values: Vec<StashKey>,
    pub is_last_page: bool,
    #[serde(default)]
    pub next_page_start: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StashKey {
    pub id: u64,
    pub text: String,
    #[serde(default)]
    pub label: Option<String>,
}
