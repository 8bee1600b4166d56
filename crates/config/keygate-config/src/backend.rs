//! The configured team and key store pair.

use crate::error::ConfigResult;
use crate::settings::{Settings, TeamSettings};
use keygate_core::{KeyStore, SharedObserver, Team, TeamKind};
use keygate_github::{GitHubKeyStore, GitHubOrganization};
use keygate_stash::{StashKeyStore, StashTeam};

/// A team backend together with the key store that shares its client.
#[derive(Clone)]
pub enum Backend {
    GitHub {
        team: GitHubOrganization,
        key_store: GitHubKeyStore,
    },
    Stash {
        team: StashTeam,
        key_store: StashKeyStore,
    },
}

impl Backend {
    pub fn from_settings(settings: &Settings, observer: SharedObserver) -> ConfigResult<Self> {
        match &settings.team {
            TeamSettings::GitHub(config) => {
                let team = GitHubOrganization::new(config.clone())?.with_observer(observer);
                let key_store = GitHubKeyStore::from(&team);
                Ok(Self::GitHub { team, key_store })
            }
            TeamSettings::Stash(stash) => {
                let team = StashTeam::new(stash.to_config()?)?.with_observer(observer);
                let key_store = StashKeyStore::from(&team);
                Ok(Self::Stash { team, key_store })
            }
        }
    }

    pub fn kind(&self) -> TeamKind {
        self.team().kind()
    }

    pub fn team(&self) -> &dyn Team {
        match self {
            Self::GitHub { team, .. } => team,
            Self::Stash { team, .. } => team,
        }
    }

    pub fn key_store(&self) -> &dyn KeyStore {
        match self {
            Self::GitHub { key_store, .. } => key_store,
            Self::Stash { key_store, .. } => key_store,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keygate_core::NoopObserver;
    use std::sync::Arc;

    const PEM: &str = include_str!("../../../backends/keygate-stash/testdata/consumer_key.pem");

    #[test]
    fn test_github_backend() {
        let settings = Settings::from_toml(
            r#"
            [team]
            kind = "github"
            client_id = "abc"
            client_secret = "shh"
            org_login = "acme"
            "#,
        )
        .unwrap();

        let backend = Backend::from_settings(&settings, Arc::new(NoopObserver)).unwrap();
        assert_eq!(backend.kind(), TeamKind::GitHub);
        assert!(matches!(backend, Backend::GitHub { .. }));
    }

    #[test]
    fn test_stash_backend_from_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("stash.pem");
        std::fs::write(&key_path, PEM).unwrap();

        let settings = Settings::from_toml(&format!(
            "[team]\nkind = \"stash\"\nserver_url = \"https://stash.example.com\"\n\
             consumer_key = \"keygate\"\nrsa_key_path = {:?}\n",
            key_path.display().to_string()
        ))
        .unwrap();

        let backend = Backend::from_settings(&settings, Arc::new(NoopObserver)).unwrap();
        assert_eq!(backend.kind(), TeamKind::Stash);
        let Backend::Stash { team, .. } = &backend else {
            panic!("expected stash backend");
        };
        assert_eq!(team.server_url(), "https://stash.example.com");
    }

    #[test]
    fn test_stash_backend_rejects_bad_key() {
        let settings = Settings::from_toml(
            r#"
            [team]
            kind = "stash"
            server_url = "https://stash.example.com"
            consumer_key = "keygate"
            rsa_key = "not a pem"
            "#,
        )
        .unwrap();

        let err = Backend::from_settings(&settings, Arc::new(NoopObserver))
            .err()
            .unwrap();
        assert!(matches!(err, crate::ConfigError::Backend(_)));
    }
}
