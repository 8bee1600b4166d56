//! OpenSSH public keys compared by algorithm and key material.

use crate::error::{BackendError, BackendResult};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A parsed SSH public key.
///
/// Two keys are equal when their algorithm and material match; the comment is
/// for display only and never takes part in equality or hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicKey {
    algorithm: String,
    /// Base64 of the canonical SSH wire encoding.
    material: String,
    comment: String,
}

impl PublicKey {
    /// Parse an OpenSSH public key line, `<algorithm> <base64> [comment]`.
    pub fn parse_line(line: &str) -> BackendResult<Self> {
        let parsed = ssh_key::PublicKey::from_openssh(line.trim())
            .map_err(|e| BackendError::InvalidPublicKey(e.to_string()))?;
        let blob = parsed
            .to_bytes()
            .map_err(|e| BackendError::InvalidPublicKey(e.to_string()))?;

        Ok(Self {
            algorithm: parsed.algorithm().as_str().to_string(),
            material: STANDARD.encode(blob),
            comment: parsed.comment().to_string(),
        })
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn material(&self) -> &str {
        &self.material
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.algorithm == other.algorithm && self.material == other.material
    }
}

impl Eq for PublicKey {}

impl Hash for PublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.algorithm.hash(state);
        self.material.hash(state);
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.algorithm, self.material)?;
        if !self.comment.is_empty() {
            write!(f, " {}", self.comment)?;
        }
        Ok(())
    }
}

impl FromStr for PublicKey {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_line(s)
    }
}

impl TryFrom<String> for PublicKey {
    type Error = BackendError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_line(&value)
    }
}

impl From<PublicKey> for String {
    fn from(key: PublicKey) -> Self {
        key.to_string()
    }
}
