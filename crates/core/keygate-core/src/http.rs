//! Response handling shared by the HTTP backends.
//!
//! A body is only parsed as JSON after its `Content-Type` has been checked,
//! and text is decoded with the charset the header names (UTF-8 when absent).

use crate::error::{BackendError, BackendResult};
use crate::identity::TeamKind;
use crate::observe::{BackendObserver, HttpExchange};
use reqwest::Response;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde::de::DeserializeOwned;

pub const APPLICATION_JSON: &str = "application/json";
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// A parsed `Content-Type` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    pub mime: String,
    pub charset: Option<String>,
    raw: String,
}

impl ContentType {
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split(';');
        let mime = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
        let charset = parts.find_map(|param| {
            let (name, value) = param.split_once('=')?;
            name.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches('"').to_string())
        });

        Self {
            mime,
            charset,
            raw: raw.to_string(),
        }
    }

    pub fn of(response: &Response) -> Option<Self> {
        response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(Self::parse)
    }

    pub fn is(&self, mime: &str) -> bool {
        self.mime == mime
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Report a finished exchange to the observer.
pub fn observe(observer: &dyn BackendObserver, team: TeamKind, method: &str, response: &Response) {
    observer.http_exchange(&HttpExchange {
        team,
        method,
        url: response.url().as_str(),
        status: response.status().as_u16(),
    });
}

/// Pass through 2xx responses; turn anything else into
/// [`BackendError::UnexpectedStatus`] carrying the body text.
pub async fn ensure_success(response: Response) -> BackendResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(BackendError::UnexpectedStatus {
        url,
        status: status.as_u16(),
        body,
    })
}

/// Parse a JSON body after validating its content type.
pub async fn read_json<T: DeserializeOwned>(response: Response) -> BackendResult<T> {
    match ContentType::of(&response) {
        Some(content_type) if content_type.is(APPLICATION_JSON) => {}
        other => {
            return Err(BackendError::UnexpectedContentType {
                url: response.url().to_string(),
                content_type: other
                    .map(|ct| ct.as_str().to_string())
                    .unwrap_or_else(|| "(none)".to_string()),
            });
        }
    }

    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

/// Drain and drop a body that carries nothing of interest, such as the
/// response to a `DELETE`.
pub async fn discard_body(response: Response) -> BackendResult<()> {
    response.bytes().await?;
    Ok(())
}

/// Error payload shape shared by the GitHub and Bitbucket REST APIs:
/// `{"message": ..., "errors": [{"field": ..., "message": ...}]}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorPayload {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Vec<ApiErrorEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorEntry {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiErrorPayload {
    /// Lenient parse; an unreadable body yields an empty payload.
    pub fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    /// The first entry message, falling back to the top-level message.
    pub fn first_message(&self) -> Option<&str> {
        self.errors
            .iter()
            .find_map(|entry| entry.message.as_deref())
            .or(self.message.as_deref())
    }

    pub fn has_message(&self, message: &str) -> bool {
        self.errors
            .iter()
            .any(|entry| entry.message.as_deref() == Some(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_content_type_parse() {
        let ct = ContentType::parse("Application/JSON; charset=\"ISO-8859-1\"");
        assert!(ct.is(APPLICATION_JSON));
        assert_eq!(ct.charset.as_deref(), Some("ISO-8859-1"));

        let ct = ContentType::parse("application/x-www-form-urlencoded");
        assert!(ct.is(FORM_URLENCODED));
        assert_eq!(ct.charset, None);
    }

    #[test]
    fn test_error_payload_messages() {
        let payload = ApiErrorPayload::parse(
            r#"{"message":"Validation Failed","errors":[{"resource":"PublicKey","field":"key","message":"key is already in use"}]}"#,
        );
        assert_eq!(payload.first_message(), Some("key is already in use"));
        assert!(payload.has_message("key is already in use"));

        let payload = ApiErrorPayload::parse(r#"{"message":"Bad credentials"}"#);
        assert_eq!(payload.first_message(), Some("Bad credentials"));

        assert_eq!(ApiErrorPayload::parse("<html>").first_message(), None);
    }

    #[tokio::test]
    async fn test_read_json_requires_json_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(r#"{"login":"alice"}"#, "application/json; charset=utf-8"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/html"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<p>hi</p>", "text/html"))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();

        let response = client.get(format!("{}/json", server.uri())).send().await.unwrap();
        let value: Value = read_json(response).await.unwrap();
        assert_eq!(value["login"], "alice");

        let response = client.get(format!("{}/html", server.uri())).send().await.unwrap();
        let result = read_json::<Value>(response).await;
        assert!(matches!(
            result,
            Err(BackendError::UnexpectedContentType { content_type, .. }) if content_type == "text/html"
        ));
    }

    #[tokio::test]
    async fn test_ensure_success_reports_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("nope"))
            .mount(&server)
            .await;

        let response = reqwest::get(server.uri()).await.unwrap();
        match ensure_success(response).await {
            Err(BackendError::UnexpectedStatus { status, body, .. }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "nope");
            }
            other => panic!("Expected UnexpectedStatus, got {:?}", other.map(|_| ())),
        }
    }
}
