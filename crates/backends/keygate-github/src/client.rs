//! Authenticated access to the GitHub REST API.

use keygate_core::http::{self, APPLICATION_JSON};
use keygate_core::{BackendError, BackendResult, SharedObserver, TeamKind, TracingObserver};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, LINK};
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;

const USER_AGENT: &str = concat!("keygate/", env!("CARGO_PKG_VERSION"));

/// Page size requested from list endpoints; the `Link` header drives
/// iteration regardless of what the server actually returns.
const PER_PAGE: u32 = 100;

/// Thin client for the REST API, shared by the team and the key store.
#[derive(Clone)]
pub struct GitHubApi {
    http: Client,
    api_url: String,
    observer: SharedObserver,
}

impl GitHubApi {
    pub fn new(api_url: impl Into<String>) -> BackendResult<Self> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self::with_client(http, api_url))
    }

    /// Use a caller-configured transport (TLS, pooling, timeouts).
    pub fn with_client(http: Client, api_url: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            observer: TracingObserver::shared(),
        }
    }

    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn observer(&self) -> &SharedObserver {
        &self.observer
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    fn authorized(&self, builder: RequestBuilder, access_token: &str) -> RequestBuilder {
        builder
            .header(AUTHORIZATION, format!("token {}", access_token))
            .header(ACCEPT, APPLICATION_JSON)
    }

    async fn send(&self, method: &str, builder: RequestBuilder) -> BackendResult<Response> {
        let response = builder.send().await?;
        http::observe(self.observer.as_ref(), TeamKind::GitHub, method, &response);
        Ok(response)
    }

    /// `GET` a JSON document.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        access_token: &str,
        path: &str,
    ) -> BackendResult<T> {
        let request = self.authorized(self.http.get(self.url(path)), access_token);
        let response = self.send("GET", request).await?;
        let response = http::ensure_success(response).await?;
        http::read_json(response).await
    }

    /// `GET` every page of a list endpoint, following `Link: rel="next"`.
    /// A `next` link back to an already fetched page is an error.
    pub async fn get_all_pages<T: DeserializeOwned>(
        &self,
        access_token: &str,
        path: &str,
    ) -> BackendResult<Vec<T>> {
        let mut items = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(format!("{}?per_page={}", self.url(path), PER_PAGE));

        while let Some(url) = next {
            if !visited.insert(url.clone()) {
                return Err(BackendError::UnexpectedResponse(format!(
                    "pagination of {} revisits {}",
                    path, url
                )));
            }
            let request = self.authorized(self.http.get(&url), access_token);
            let response = self.send("GET", request).await?;
            let response = http::ensure_success(response).await?;
            next = next_page(response.headers());
            let page: Vec<T> = http::read_json(response).await?;
            items.extend(page);
        }

        Ok(items)
    }

    /// `POST` a JSON body. The raw response is returned so callers can
    /// interpret error statuses themselves.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        access_token: &str,
        path: &str,
        body: &B,
    ) -> BackendResult<Response> {
        let request = self
            .authorized(self.http.post(self.url(path)), access_token)
            .json(body);
        self.send("POST", request).await
    }

    /// `DELETE` a resource. Success responses have no body to parse.
    pub async fn delete(&self, access_token: &str, path: &str) -> BackendResult<()> {
        let request = self.authorized(self.http.delete(self.url(path)), access_token);
        let response = self.send("DELETE", request).await?;
        let response = http::ensure_success(response).await?;
        http::discard_body(response).await
    }
}

/// Target of the `rel="next"` entry in a `Link` header.
fn next_page(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;
    link.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts.next()?.trim();
        let is_next = parts.any(|param| {
            param
                .trim()
                .strip_prefix("rel=")
                .map(|rel| rel.trim_matches('"').split_whitespace().any(|r| r == "next"))
                .unwrap_or(false)
        });
        is_next.then(|| {
            target
                .trim_start_matches('<')
                .trim_end_matches('>')
                .to_string()
        })
    })
}
