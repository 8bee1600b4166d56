//! Authenticated principals and the credentials they carry.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of team implementations an [`Identity`] can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamKind {
    /// GitHub organization, stateless OAuth2 handshake.
    GitHub,
    /// Bitbucket Server (formerly Stash), stateful OAuth 1.0a handshake.
    Stash,
}

impl fmt::Display for TeamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamKind::GitHub => write!(f, "github"),
            TeamKind::Stash => write!(f, "stash"),
        }
    }
}

/// Access credential held by an identity. The shape is fixed by the
/// [`TeamKind`] that issued it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credential {
    Bearer { token: String },
    TokenSecretPair { token: String, secret: String },
}

impl Credential {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }

    pub fn pair(token: impl Into<String>, secret: impl Into<String>) -> Self {
        Self::TokenSecretPair {
            token: token.into(),
            secret: secret.into(),
        }
    }

    pub fn as_bearer(&self) -> Option<&str> {
        match self {
            Self::Bearer { token } => Some(token),
            Self::TokenSecretPair { .. } => None,
        }
    }

    pub fn as_pair(&self) -> Option<(&str, &str)> {
        match self {
            Self::TokenSecretPair { token, secret } => Some((token, secret)),
            Self::Bearer { .. } => None,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearer { .. } => f.debug_struct("Bearer").finish_non_exhaustive(),
            Self::TokenSecretPair { .. } => {
                f.debug_struct("TokenSecretPair").finish_non_exhaustive()
            }
        }
    }
}

/// A principal authenticated by a team.
///
/// An identity is only meaningful to teams and key stores of the same
/// [`TeamKind`] and configuration. The broker owns its persistence; nothing
/// is recorded remotely when one is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub team_kind: TeamKind,
    /// Provider-scoped principal id, e.g. a login name or a profile URL.
    pub identifier: String,
    pub credential: Credential,
}

impl Identity {
    pub fn new(team_kind: TeamKind, identifier: impl Into<String>, credential: Credential) -> Self {
        Self {
            team_kind,
            identifier: identifier.into(),
            credential,
        }
    }
}
