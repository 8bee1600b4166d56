//! GitHub backend for keygate.
//!
//! [`GitHubOrganization`] authenticates users through GitHub's OAuth2 web
//! flow and admits members of one organization. [`GitHubKeyStore`] manages
//! the authenticated user's account public keys.
//!
//! The handshake is stateless: the only thing the caller must keep across
//! the redirect is the anti-forgery nonce returned in the continuation.

mod client;
mod config;
mod key_store;
mod team;
mod types;


pub use client::GitHubApi;
pub use config::GitHubConfig;
pub use key_store::GitHubKeyStore;
pub use team::GitHubOrganization;
pub use types::{GitHubKey, GitHubUser, TokenResponse};
