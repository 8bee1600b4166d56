//! OAuth1-signed HTTP access to Bitbucket Server.

use crate::oauth1::{self, RequestSigner, TokenRef};
use keygate_core::http;
use keygate_core::{BackendResult, SharedObserver, TeamKind, TracingObserver};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, Response};
use serde::Serialize;
use std::sync::Arc;
use url::Url;

const USER_AGENT: &str = concat!("keygate/", env!("CARGO_PKG_VERSION"));

/// Signs every request with the consumer key, and with the user's access
/// token when one is given.
#[derive(Clone)]
pub struct StashClient {
    http: Client,
    signer: Arc<dyn RequestSigner>,
    observer: SharedObserver,
}

impl StashClient {
    pub fn new(signer: Arc<dyn RequestSigner>) -> BackendResult<Self> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self::with_client(http, signer))
    }

    pub fn with_client(http: Client, signer: Arc<dyn RequestSigner>) -> Self {
        Self {
            http,
            signer,
            observer: TracingObserver::shared(),
        }
    }

    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn observer(&self) -> &SharedObserver {
        &self.observer
    }

    /// Send a signed request. The raw response is returned; status handling
    /// is up to the caller.
    pub async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        token: Option<TokenRef<'_>>,
        json: Option<&B>,
    ) -> BackendResult<Response> {
        let url = Url::parse(url)?;
        let authorization =
            oauth1::authorization_header(self.signer.as_ref(), method.as_str(), &url, token)?;

        let mut request = self
            .http
            .request(method.clone(), url)
            .header(AUTHORIZATION, authorization);
        if let Some(body) = json {
            request = request.header(ACCEPT, http::APPLICATION_JSON).json(body);
        }

        let response = request.send().await?;
        http::observe(
            self.observer.as_ref(),
            TeamKind::Stash,
            method.as_str(),
            &response,
        );
        Ok(response)
    }

    /// Signed request without a body.
    pub async fn call(
        &self,
        method: Method,
        url: &str,
        token: Option<TokenRef<'_>>,
    ) -> BackendResult<Response> {
        self.send::<()>(method, url, token, None).await
    }
}
