//! GitHub backend configuration.

use keygate_core::{Identity, TeamKind};
use serde::{Deserialize, Serialize};

/// Scopes needed to read organization membership and manage account keys.
pub const SCOPES: &str = "read:org,admin:public_key";

/// OAuth application credentials and the organization users must belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Organization account name, e.g. `rust-lang` in https://github.com/rust-lang
    pub org_login: String,
    /// Base URL of the web endpoints (authorization and token exchange)
    #[serde(default = "default_web_url")]
    pub web_url: String,
    /// Base URL of the REST API
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_web_url() -> String {
    "https://github.com".to_string()
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

impl GitHubConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        org_login: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            org_login: org_login.into(),
            web_url: default_web_url(),
            api_url: default_api_url(),
        }
    }

    /// Point at a GitHub Enterprise installation or a test server.
    pub fn with_urls(mut self, web_url: impl Into<String>, api_url: impl Into<String>) -> Self {
        self.web_url = web_url.into().trim_end_matches('/').to_string();
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn authorize_endpoint(&self) -> String {
        format!("{}/login/oauth/authorize", self.web_url.trim_end_matches('/'))
    }

    pub fn access_token_endpoint(&self) -> String {
        format!("{}/login/oauth/access_token", self.web_url.trim_end_matches('/'))
    }

    /// Profile URL of `login` on this installation, used as the identity
    /// identifier so a token is never replayed against another installation.
    pub fn profile_url(&self, login: &str) -> String {
        profile_url(&self.web_url, login)
    }

    /// The login of a GitHub identity issued by this installation.
    pub fn login_of<'a>(&self, identity: &'a Identity) -> Option<&'a str> {
        login_at(&self.web_url, identity)
    }
}

pub(crate) fn profile_url(web_url: &str, login: &str) -> String {
    format!("{}/{}", web_url.trim_end_matches('/'), login)
}

pub(crate) fn login_at<'a>(web_url: &str, identity: &'a Identity) -> Option<&'a str> {
    if identity.team_kind != TeamKind::GitHub {
        return None;
    }
    let login = identity
        .identifier
        .strip_prefix(web_url.trim_end_matches('/'))?
        .strip_prefix('/')?;
    (!login.is_empty() && !login.contains('/')).then_some(login)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GitHubConfig::new("id", "secret", "acme");
        assert_eq!(
            config.authorize_endpoint(),
            "https://github.com/login/oauth/authorize"
        );
        assert_eq!(
            config.access_token_endpoint(),
            "https://github.com/login/oauth/access_token"
        );
        assert_eq!(config.api_url, "https://api.github.com");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: GitHubConfig = serde_json::from_value(serde_json::json!({
            "client_id": "id",
            "client_secret": "secret",
            "org_login": "acme"
        }))
        .unwrap();
        assert_eq!(config.web_url, "https://github.com");

        let config = config.with_urls("https://ghe.example.com/", "https://ghe.example.com/api/v3/");
        assert_eq!(
            config.authorize_endpoint(),
            "https://ghe.example.com/login/oauth/authorize"
        );
        assert_eq!(config.api_url, "https://ghe.example.com/api/v3");
    }

    #[test]
    fn test_login_of_is_bound_to_installation() {
        let config: GitHubConfig = serde_json::from_value(serde_json::json!({
            "client_id": "id",
            "client_secret": "secret",
            "org_login": "acme",
            "web_url": "https://ghe.example.com/"
        }))
        .unwrap();
        let bearer = |identifier: &str| {
            Identity::new(TeamKind::GitHub, identifier, keygate_core::Credential::bearer("t"))
        };

        assert_eq!(config.profile_url("alice"), "https://ghe.example.com/alice");
        assert_eq!(
            config.login_of(&bearer("https://ghe.example.com/alice")),
            Some("alice")
        );
        assert_eq!(config.login_of(&bearer("https://github.com/alice")), None);
        assert_eq!(config.login_of(&bearer("https://ghe.example.com.evil/alice")), None);
        assert_eq!(config.login_of(&bearer("https://ghe.example.com/")), None);
        assert_eq!(config.login_of(&bearer("https://ghe.example.com/a/b")), None);
        assert_eq!(config.login_of(&bearer("alice")), None);

        let stash = Identity::new(
            TeamKind::Stash,
            "https://ghe.example.com/alice",
            keygate_core::Credential::pair("t", "s"),
        );
        assert_eq!(config.login_of(&stash), None);
    }
}
