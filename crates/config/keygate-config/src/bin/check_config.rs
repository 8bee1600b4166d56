//! Load the keygate configuration, build the backend, and report.

use anyhow::{Context, Result};
use keygate_config::{Backend, Settings, TeamSettings};
use keygate_core::TracingObserver;
use tracing::info;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load().context("Failed to load configuration")?;
    keygate_config::init_tracing(&settings.logging);

    match &settings.team {
        TeamSettings::GitHub(github) => info!(
            org = %github.org_login,
            web_url = %github.web_url,
            api_url = %github.api_url,
            "GitHub organization team"
        ),
        TeamSettings::Stash(stash) => info!(
            server_url = %stash.server_url,
            consumer_key = %stash.consumer_key,
            "Bitbucket Server team"
        ),
    }

    let backend = Backend::from_settings(&settings, TracingObserver::shared())
        .context("Failed to construct backend")?;
    info!(kind = %backend.kind(), log_filter = %settings.logging.log_filter(), "Configuration OK");
    Ok(())
}
