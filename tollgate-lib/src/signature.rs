//! Canonical request identities.
//!
//! A [`Signature`] has the form `METHOD:url:digest`, where `digest` is the
//! lowercase hex SHA-256 of the serialized request body, or empty when the
//! request has no body. Two requests with the same signature are considered
//! the same request and share a single transport call.
//!
//! Bodies are serialized canonically: object keys are sorted recursively, so
//! `{"a":1,"b":2}` and `{"b":2,"a":1}` sign identically.

use std::fmt;
use std::sync::Arc;

use http::Method;
use ring::digest::{SHA256, digest};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{ErrorKind, Result};

/// How the body part of a signature is derived
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Digest {
    /// Hex-encoded SHA-256 of the canonical body
    #[default]
    Sha256,
    /// The canonical body itself. Used where hashing is unavailable;
    /// signatures get long but stay exact.
    Raw,
}

/// Configuration for signature generation
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureConfig {
    /// Digest used for request bodies
    #[serde(default)]
    pub digest: Digest,
}

/// Deterministic identity of a request, used as the deduplication key
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature(Arc<str>);

impl Signature {
    /// Signature of a request without a body
    #[must_use]
    pub fn of(method: &Method, url: &str) -> Self {
        Self(format!("{}:{url}:", method.as_str().to_uppercase()).into())
    }

    /// Build the signature of a request with a SHA-256 body digest.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Serialization`] if `body` cannot be represented
    /// as JSON.
    pub fn new<B>(url: &str, method: &Method, body: Option<&B>) -> Result<Self>
    where
        B: Serialize + ?Sized,
    {
        Self::with_digest(url, method, body, Digest::Sha256)
    }

    /// Build the signature of a request using the given [`Digest`].
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Serialization`] if `body` cannot be represented
    /// as JSON.
    pub fn with_digest<B>(url: &str, method: &Method, body: Option<&B>, mode: Digest) -> Result<Self>
    where
        B: Serialize + ?Sized,
    {
        let Some(body) = body else {
            return Ok(Self::of(method, url));
        };
        let serialized = canonical_json(body)?;
        let digest = match mode {
            Digest::Sha256 => hex::encode(digest(&SHA256, serialized.as_bytes())),
            Digest::Raw => serialized,
        };
        Ok(Self(
            format!("{}:{url}:{digest}", method.as_str().to_uppercase()).into(),
        ))
    }

    /// The signature as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Shorthand for [`Signature::new`]
///
/// # Errors
///
/// Returns [`ErrorKind::Serialization`] if `body` cannot be represented as
/// JSON.
pub fn make_signature<B>(url: &str, method: &Method, body: Option<&B>) -> Result<Signature>
where
    B: Serialize + ?Sized,
{
    Signature::new(url, method, body)
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.0)
    }
}

impl From<&str> for Signature {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

impl From<String> for Signature {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}

/// Serialize `body` with object keys in sorted order at every level
fn canonical_json<B: Serialize + ?Sized>(body: &B) -> Result<String> {
    let value = serde_json::to_value(body).map_err(|e| ErrorKind::Serialization(Arc::new(e)))?;
    serde_json::to_string(&sort_keys(value)).map_err(|e| ErrorKind::Serialization(Arc::new(e)))
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect::<Map<_, _>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    const URL: &str = "https://api.example.com/articles";

    #[test]
    fn test_signature_without_body() {
        let signature = Signature::new::<Value>(URL, &Method::GET, None).unwrap();
        assert_eq!(signature.as_str(), "GET:https://api.example.com/articles:");
        assert_eq!(signature, Signature::of(&Method::GET, URL));
    }

    #[test]
    fn test_signature_with_body_is_sha256_hex() {
        let body = json!({"title": "hello"});
        let signature = make_signature(URL, &Method::POST, Some(&body)).unwrap();

        let expected = hex::encode(digest(&SHA256, br#"{"title":"hello"}"#));
        assert_eq!(
            signature.as_str(),
            format!("POST:{URL}:{expected}").as_str()
        );
        assert_eq!(expected.len(), 64);
    }

    #[test]
    fn test_signature_is_deterministic() {
        let body = json!({"page": 2, "filter": ["a", "b"]});
        let first = make_signature(URL, &Method::POST, Some(&body)).unwrap();
        let second = make_signature(URL, &Method::POST, Some(&body.clone())).unwrap();
        assert_eq!(first, second);
    }

    #[rstest]
    #[case(json!({"page": 1}), json!({"page": 2}))]
    #[case(json!({"page": 1}), json!([1]))]
    #[case(json!("a"), json!("b"))]
    #[case(json!({"q": {"x": 1}}), json!({"q": {"x": "1"}}))]
    fn test_different_bodies_sign_differently(#[case] a: Value, #[case] b: Value) {
        let a = make_signature(URL, &Method::POST, Some(&a)).unwrap();
        let b = make_signature(URL, &Method::POST, Some(&b)).unwrap();
        assert_ne!(a, b);
    }

    #[rstest]
    #[case(Method::GET, Method::POST)]
    #[case(Method::PUT, Method::DELETE)]
    fn test_method_is_part_of_signature(#[case] a: Method, #[case] b: Method) {
        assert_ne!(Signature::of(&a, URL), Signature::of(&b, URL));
    }

    #[test]
    fn test_key_order_does_not_matter() {
        let a: Value = serde_json::from_str(r#"{"b": 2, "a": {"y": 1, "x": 0}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"a": {"x": 0, "y": 1}, "b": 2}"#).unwrap();
        assert_eq!(
            make_signature(URL, &Method::POST, Some(&a)).unwrap(),
            make_signature(URL, &Method::POST, Some(&b)).unwrap()
        );
    }

    #[test]
    fn test_struct_bodies_are_signed_canonically() {
        #[derive(Serialize)]
        struct Query {
            zeta: u8,
            alpha: u8,
        }

        let signature = Signature::with_digest(
            URL,
            &Method::POST,
            Some(&Query { zeta: 1, alpha: 2 }),
            Digest::Raw,
        )
        .unwrap();
        assert_eq!(
            signature.as_str(),
            format!(r#"POST:{URL}:{{"alpha":2,"zeta":1}}"#).as_str()
        );
    }

    #[test]
    fn test_raw_digest() {
        let signature =
            Signature::with_digest(URL, &Method::PATCH, Some(&json!([1, 2])), Digest::Raw).unwrap();
        assert_eq!(signature.to_string(), format!("PATCH:{URL}:[1,2]"));
    }

    #[test]
    fn test_digest_config_from_toml() {
        let config: SignatureConfig = toml::from_str(r#"digest = "raw""#).unwrap();
        assert_eq!(config.digest, Digest::Raw);
        let config: SignatureConfig = toml::from_str("").unwrap();
        assert_eq!(config.digest, Digest::Sha256);
    }
}
