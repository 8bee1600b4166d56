//! GitHub wire types.

use serde::{Deserialize, Serialize};

/// Token exchange result, either JSON or form-encoded on the wire.
///
/// GitHub answers a rejected code with HTTP 200 and an `error` field, so
/// `access_token` is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl TokenResponse {
    pub fn from_form(body: &str) -> Self {
        let mut response = Self::default();
        for (name, value) in url::form_urlencoded::parse(body.as_bytes()) {
            let value = Some(value.into_owned());
            match name.as_ref() {
                "access_token" => response.access_token = value,
                "token_type" => response.token_type = value,
                "scope" => response.scope = value,
                "error" => response.error = value,
                "error_description" => response.error_description = value,
                _ => {}
            }
        }
        response
    }

    pub fn rejection_reason(&self) -> String {
        match (&self.error, &self.error_description) {
            (Some(error), Some(description)) => format!("{}: {}", error, description),
            (Some(error), None) => error.clone(),
            _ => "token response carries no access_token".to_string(),
        }
    }
}

/// `GET /user`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// One entry of `GET /user/orgs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubOrg {
    pub login: String,
}

/// One entry of `GET /user/teams`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubTeam {
    pub slug: String,
    pub organization: GitHubOrg,
}

/// One entry of `GET /user/keys`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubKey {
    pub id: u64,
    pub key: String,
    #[serde(default)]
    pub title: Option<String>,
}
