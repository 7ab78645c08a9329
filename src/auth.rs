use axum::http::HeaderMap;
use sha2::{Digest, Sha256};

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    Missing,
    Invalid,
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Missing => "missing_api_key",
            AuthError::Invalid => "invalid_api_key",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AuthError::Missing => "missing API key: send x-api-key or Authorization: Bearer <key>",
            AuthError::Invalid => "invalid API key",
        }
    }
}

/// Accept the key from `x-api-key` or a bearer token.
///
/// Both are checked: a wrong `x-api-key` does not mask a valid bearer token.
pub fn authorize(headers: &HeaderMap, expected: &str) -> Result<(), AuthError> {
    let header_key = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let bearer = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_bearer);

    if header_key.is_none() && bearer.is_none() {
        return Err(AuthError::Missing);
    }

    let accepted = [header_key, bearer]
        .into_iter()
        .flatten()
        .any(|presented| keys_match(presented, expected));
    if accepted {
        Ok(())
    } else {
        Err(AuthError::Invalid)
    }
}

fn parse_bearer(header_value: &str) -> Option<&str> {
    let token = header_value.trim().strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

// Digests first so comparison time does not depend on key length either.
fn keys_match(presented: &str, expected: &str) -> bool {
    let a = Sha256::digest(presented.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    constant_time_eq(&a, &b)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_str(v).unwrap());
        }
        map
    }

    #[test]
    fn accepts_header_key() {
        assert!(authorize(&headers(&[("x-api-key", "k1")]), "k1").is_ok());
    }

    #[test]
    fn accepts_bearer_token() {
        assert!(authorize(&headers(&[("authorization", "Bearer k1")]), "k1").is_ok());
    }

    #[test]
    fn wrong_header_does_not_mask_valid_bearer() {
        let h = headers(&[("x-api-key", "nope"), ("authorization", "Bearer k1")]);
        assert!(authorize(&h, "k1").is_ok());
    }

    #[test]
    fn missing_credentials() {
        assert_eq!(authorize(&HeaderMap::new(), "k1"), Err(AuthError::Missing));
        assert_eq!(
            authorize(&headers(&[("authorization", "Basic abc")]), "k1"),
            Err(AuthError::Missing)
        );
    }

    #[test]
    fn wrong_key_is_invalid() {
        assert_eq!(
            authorize(&headers(&[("x-api-key", "k2")]), "k1"),
            Err(AuthError::Invalid)
        );
        assert_eq!(AuthError::Invalid.code(), "invalid_api_key");
    }
}
