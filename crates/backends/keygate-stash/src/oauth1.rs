//! OAuth 1.0a request signing (RFC 5849).
//!
//! Only the parts Bitbucket Server needs are implemented: the
//! `Authorization: OAuth ...` header form, RSA-SHA1 signatures, and query
//! parameters folded into the signature base string. Request bodies are
//! JSON and therefore never part of the base string.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use keygate_core::{BackendError, BackendResult};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use rsa::RsaPrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use sha1::Sha1;
use url::Url;
use uuid::Uuid;

/// Everything except the RFC 3986 unreserved characters.
const OAUTH_RESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub fn encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_RESERVED).to_string()
}

/// Produces `oauth_signature` values for a consumer.
pub trait RequestSigner: Send + Sync {
    fn consumer_key(&self) -> &str;

    /// The `oauth_signature_method` value.
    fn signature_method(&self) -> &'static str;

    /// Sign a base string. `token_secret` is the secret of the token the
    /// request is made with, if any; RSA-SHA1 does not use it.
    fn sign(&self, base_string: &str, token_secret: Option<&str>) -> BackendResult<String>;
}

/// RSA-SHA1 signer holding the consumer's private key.
#[derive(Clone)]
pub struct RsaSha1Signer {
    consumer_key: String,
    key: SigningKey<Sha1>,
}

impl RsaSha1Signer {
    pub fn new(consumer_key: impl Into<String>, private_key: RsaPrivateKey) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            key: SigningKey::<Sha1>::new(private_key),
        }
    }

    /// Load a PEM private key, PKCS#8 (`BEGIN PRIVATE KEY`) or PKCS#1
    /// (`BEGIN RSA PRIVATE KEY`).
    pub fn from_pem(consumer_key: impl Into<String>, pem: &str) -> BackendResult<Self> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| BackendError::Signing(format!("invalid RSA private key: {}", e)))?;
        Ok(Self::new(consumer_key, private_key))
    }
}

impl std::fmt::Debug for RsaSha1Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaSha1Signer")
            .field("consumer_key", &self.consumer_key)
            .finish_non_exhaustive()
    }
}

impl RequestSigner for RsaSha1Signer {
    fn consumer_key(&self) -> &str {
        &self.consumer_key
    }

    fn signature_method(&self) -> &'static str {
        "RSA-SHA1"
    }

    fn sign(&self, base_string: &str, _token_secret: Option<&str>) -> BackendResult<String> {
        let signature = self
            .key
            .try_sign(base_string.as_bytes())
            .map_err(|e| BackendError::Signing(e.to_string()))?;
        Ok(STANDARD.encode(signature.to_bytes()))
    }
}

/// A token and its secret, as issued by the request-token or access-token
/// endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenRef<'a> {
    pub token: &'a str,
    pub secret: &'a str,
}

impl<'a> From<(&'a str, &'a str)> for TokenRef<'a> {
    fn from((token, secret): (&'a str, &'a str)) -> Self {
        Self { token, secret }
    }
}

/// `scheme://host[:port]/path` with the default port omitted.
fn base_string_uri(url: &Url) -> String {
    let mut uri = format!(
        "{}://{}",
        url.scheme(),
        url.host_str().unwrap_or_default().to_ascii_lowercase()
    );
    if let Some(port) = url.port() {
        uri.push_str(&format!(":{}", port));
    }
    uri.push_str(url.path());
    uri
}

/// The signature base string over `params`, which must already contain the
/// query parameters of `url`.
pub fn signature_base_string(method: &str, url: &Url, params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(name, value)| (encode(name), encode(value)))
        .collect();
    encoded.sort();

    let normalized = encoded
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(&base_string_uri(url)),
        encode(&normalized)
    )
}

/// Build the `Authorization` header for a request.
pub fn authorization_header(
    signer: &dyn RequestSigner,
    method: &str,
    url: &Url,
    token: Option<TokenRef<'_>>,
) -> BackendResult<String> {
    let nonce = Uuid::new_v4().simple().to_string();
    let timestamp = chrono::Utc::now().timestamp().to_string();
    authorization_header_with(signer, method, url, token, &nonce, &timestamp)
}

fn authorization_header_with(
    signer: &dyn RequestSigner,
    method: &str,
    url: &Url,
    token: Option<TokenRef<'_>>,
    nonce: &str,
    timestamp: &str,
) -> BackendResult<String> {
    let mut protocol: Vec<(String, String)> = vec![
        ("oauth_consumer_key".into(), signer.consumer_key().into()),
        ("oauth_nonce".into(), nonce.into()),
        ("oauth_signature_method".into(), signer.signature_method().into()),
        ("oauth_timestamp".into(), timestamp.into()),
        ("oauth_version".into(), "1.0".into()),
    ];
    if let Some(token) = token {
        protocol.push(("oauth_token".into(), token.token.into()));
    }

    let mut params = protocol.clone();
    params.extend(url.query_pairs().into_owned());
    let base_string = signature_base_string(method, url, &params);
    let signature = signer.sign(&base_string, token.map(|t| t.secret))?;
    protocol.push(("oauth_signature".into(), signature));

    let fields = protocol
        .iter()
        .map(|(name, value)| format!("{}=\"{}\"", encode(name), encode(value)))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!("OAuth {}", fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::RsaPublicKey;
    use rsa::pkcs1v15::{Signature, VerifyingKey};
    use rsa::signature::Verifier;

    const PEM: &str = include_str!("../testdata/consumer_key.pem");

    fn header_fields(header: &str) -> Vec<(String, String)> {
        header
            .strip_prefix("OAuth ")
            .unwrap()
            .split(", ")
            .map(|field| {
                let (name, value) = field.split_once('=').unwrap();
                let value = value.trim_matches('"');
                let value = percent_encoding::percent_decode_str(value)
                    .decode_utf8()
                    .unwrap();
                (name.to_string(), value.into_owned())
            })
            .collect()
    }

    #[test]
    fn test_encode_keeps_only_unreserved() {
        assert_eq!(encode("abcXYZ019-._~"), "abcXYZ019-._~");
        assert_eq!(encode("a b+c/d"), "a%20b%2Bc%2Fd");
        assert_eq!(encode("=%3D"), "%3D%253D");
        assert_eq!(encode("é"), "%C3%A9");
    }

    #[test]
    fn test_base_string_matches_rfc5849_example() {
        // Section 3.4.1.1, with the form body parameters passed explicitly.
        let url = Url::parse("http://EXAMPLE.COM:80/request?b5=%3D%253D&a3=a&c%40=&a2=r%20b")
            .unwrap();
        let mut params: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        for (name, value) in [
            ("c2", ""),
            ("a3", "2 q"),
            ("oauth_consumer_key", "9djdj82h48djs9d2"),
            ("oauth_token", "kkk9d7dh3k39sjv7"),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", "137131201"),
            ("oauth_nonce", "7d8f3e4a"),
        ] {
            params.push((name.to_string(), value.to_string()));
        }

        assert_eq!(
            signature_base_string("post", &url, &params),
            "POST&http%3A%2F%2Fexample.com%2Frequest&a2%3Dr%2520b%26a3%3D2%2520q\
             %26a3%3Da%26b5%3D%253D%25253D%26c%2540%3D%26c2%3D%26oauth_consumer_\
             key%3D9djdj82h48djs9d2%26oauth_nonce%3D7d8f3e4a%26oauth_signature_m\
             ethod%3DHMAC-SHA1%26oauth_timestamp%3D137131201%26oauth_token%3Dkkk\
             9d7dh3k39sjv7"
        );
    }

    #[test]
    fn test_base_string_uri_keeps_non_default_port() {
        let url = Url::parse("https://Stash.Example.com:8443/rest/ssh/1.0/keys?start=25").unwrap();
        assert_eq!(
            base_string_uri(&url),
            "https://stash.example.com:8443/rest/ssh/1.0/keys"
        );
    }

    #[test]
    fn test_rsa_signature_verifies_with_public_key() {
        let signer = RsaSha1Signer::from_pem("keygate", PEM).unwrap();
        let signature = signer.sign("GET&x&y", None).unwrap();
        let bytes = STANDARD.decode(signature).unwrap();

        let private_key = RsaPrivateKey::from_pkcs8_pem(PEM).unwrap();
        let verifying = VerifyingKey::<Sha1>::new(RsaPublicKey::from(&private_key));
        let signature = Signature::try_from(bytes.as_slice()).unwrap();
        assert!(verifying.verify(b"GET&x&y", &signature).is_ok());
        assert!(verifying.verify(b"GET&x&z", &signature).is_err());
    }

    #[test]
    fn test_invalid_pem_is_a_signing_error() {
        let err = RsaSha1Signer::from_pem("keygate", "not a key").unwrap_err();
        assert!(matches!(err, BackendError::Signing(_)));
    }

    #[test]
    fn test_authorization_header_signs_query_and_token() {
        let signer = RsaSha1Signer::from_pem("keygate", PEM).unwrap();
        let url = Url::parse("https://stash.example.com/rest/ssh/1.0/keys?start=2").unwrap();
        let token = TokenRef::from(("access-token", "access-secret"));

        let header =
            authorization_header_with(&signer, "GET", &url, Some(token), "n0nce", "1700000000")
                .unwrap();
        let fields = header_fields(&header);
        let get = |name: &str| {
            fields
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str())
                .unwrap()
        };

        assert_eq!(get("oauth_consumer_key"), "keygate");
        assert_eq!(get("oauth_signature_method"), "RSA-SHA1");
        assert_eq!(get("oauth_token"), "access-token");
        assert_eq!(get("oauth_nonce"), "n0nce");
        assert_eq!(get("oauth_version"), "1.0");
        assert!(fields.iter().all(|(name, _)| name != "start"));

        let expected_base = signature_base_string(
            "GET",
            &url,
            &[
                ("oauth_consumer_key".into(), "keygate".into()),
                ("oauth_nonce".into(), "n0nce".into()),
                ("oauth_signature_method".into(), "RSA-SHA1".into()),
                ("oauth_timestamp".into(), "1700000000".into()),
                ("oauth_version".into(), "1.0".into()),
                ("oauth_token".into(), "access-token".into()),
                ("start".into(), "2".into()),
            ],
        );
        let private_key = RsaPrivateKey::from_pkcs8_pem(PEM).unwrap();
        let verifying = VerifyingKey::<Sha1>::new(RsaPublicKey::from(&private_key));
        let bytes = STANDARD.decode(get("oauth_signature")).unwrap();
        let signature = Signature::try_from(bytes.as_slice()).unwrap();
        assert!(verifying.verify(expected_base.as_bytes(), &signature).is_ok());
    }

    #[test]
    fn test_fresh_nonce_per_request() {
        let signer = RsaSha1Signer::from_pem("keygate", PEM).unwrap();
        let url = Url::parse("https://stash.example.com/plugins/servlet/oauth/request-token")
            .unwrap();
        let first = authorization_header(&signer, "POST", &url, None).unwrap();
        let second = authorization_header(&signer, "POST", &url, None).unwrap();
        assert_ne!(first, second);
        assert!(!first.contains("oauth_token="));
    }
}
