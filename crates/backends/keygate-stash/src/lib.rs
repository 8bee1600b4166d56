//! Bitbucket Server (formerly Stash) backend for keygate.
//!
//! [`StashTeam`] authenticates users through the OAuth 1.0a three-legged
//! flow of an application link, signing every request with RSA-SHA1.
//! [`StashKeyStore`] manages the user's account SSH keys through the
//! `rest/ssh/1.0` API.

mod client;
mod config;
mod key_store;
pub mod oauth1;
mod team;
mod types;


pub use client::StashClient;
pub use config::StashConfig;
pub use key_store::StashKeyStore;
pub use oauth1::{RequestSigner, RsaSha1Signer};
pub use team::StashTeam;
pub use types::{KeyPage, StashKey, TokenPair};
