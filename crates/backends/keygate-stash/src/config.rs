//! Bitbucket Server backend configuration.

use serde::{Deserialize, Serialize};

/// Application link credentials for one Bitbucket Server installation.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StashConfig {
    /// Root URL of the installation, e.g. `https://stash.example.com`
    pub server_url: String,
    /// Consumer key of the incoming application link
    pub consumer_key: String,
    /// PEM private key whose public half is registered with the link
    pub rsa_key: String,
}

impl StashConfig {
    pub fn new(
        server_url: impl Into<String>,
        consumer_key: impl Into<String>,
        rsa_key: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into().trim_end_matches('/').to_string(),
            consumer_key: consumer_key.into(),
            rsa_key: rsa_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.server_url.trim_end_matches('/'), path)
    }

    pub fn request_token_endpoint(&self) -> String {
        self.url("/plugins/servlet/oauth/request-token")
    }

    pub fn authorize_endpoint(&self) -> String {
        self.url("/plugins/servlet/oauth/authorize")
    }

    pub fn access_token_endpoint(&self) -> String {
        self.url("/plugins/servlet/oauth/access-token")
    }

    pub fn whoami_endpoint(&self) -> String {
        self.url("/plugins/servlet/applinks/whoami")
    }

    /// Profile URL, used as the identity identifier.
    pub fn user_profile_url(&self, login: &str) -> String {
        self.url(&format!("/users/{}", login))
    }

    pub fn keys_endpoint(&self) -> String {
        self.url("/rest/ssh/1.0/keys")
    }

    pub fn key_endpoint(&self, id: &str) -> String {
        self.url(&format!("/rest/ssh/1.0/keys/{}", id))
    }
}

impl std::fmt::Debug for StashConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StashConfig")
            .field("server_url", &self.server_url)
            .field("consumer_key", &self.consumer_key)
            .field("rsa_key", &"<redacted>")
            .finish()
    }
}
