//! Cookie helpers
//!
//! The session cookie carries `<token>.<signature>`, where the signature is an
//! HMAC-SHA256 of the token under the server secret. Cookies that fail the
//! check are treated as absent.

use axum::http::{header, HeaderMap};

use crate::config::Config;
use crate::services::signing::{sign_hex, verify_hex};

/// Read a cookie value from the request headers
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// Build a `Set-Cookie` value with the attributes every cookie here shares
pub fn set_cookie(name: &str, value: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name, value, max_age_secs
    )
}

/// A `Set-Cookie` value that deletes `name`
pub fn clear_cookie(name: &str) -> String {
    set_cookie(name, "", 0)
}

/// Signs and verifies the session cookie
#[derive(Clone)]
pub struct SessionCookie {
    name: String,
    secret: Vec<u8>,
    max_age_secs: i64,
}

impl SessionCookie {
    pub fn new(name: impl Into<String>, secret: impl Into<Vec<u8>>, max_age_secs: i64) -> Self {
        Self {
            name: name.into(),
            secret: secret.into(),
            max_age_secs,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.session.cookie_name.clone(),
            config.security.effective_secret_key().into_bytes(),
            config.session.ttl_hours.saturating_mul(3600),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cookie value for a session token
    pub fn encode(&self, token: &str) -> String {
        format!("{}.{}", token, sign_hex(&self.secret, token.as_bytes()))
    }

    /// Recover the token from a cookie value if its signature checks out
    pub fn decode<'a>(&self, value: &'a str) -> Option<&'a str> {
        let (token, signature) = value.rsplit_once('.')?;
        if token.is_empty() || !verify_hex(&self.secret, token.as_bytes(), signature) {
            return None;
        }
        Some(token)
    }

    /// Read and verify the session token from request headers
    pub fn token_from(&self, headers: &HeaderMap) -> Option<String> {
        let value = read_cookie(headers, &self.name)?;
        self.decode(&value).map(str::to_string)
    }

    /// `Set-Cookie` value that stores `token`
    pub fn set_header(&self, token: &str) -> String {
        set_cookie(&self.name, &self.encode(token), self.max_age_secs)
    }

    /// `Set-Cookie` value that removes the session cookie
    pub fn clear_header(&self) -> String {
        clear_cookie(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use proptest::prelude::*;

    fn cookie() -> SessionCookie {
        SessionCookie::new("session", b"secret".to_vec(), 3600)
    }

    #[test]
    fn test_read_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=abc.def; flash=%5B%5D"),
        );

        assert_eq!(read_cookie(&headers, "session").as_deref(), Some("abc.def"));
        assert_eq!(read_cookie(&headers, "flash").as_deref(), Some("%5B%5D"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_set_header_attributes() {
        let header = cookie().set_header("token");
        assert!(header.starts_with("session=token."));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("SameSite=Lax"));
        assert!(header.ends_with("Max-Age=3600"));
        assert_eq!(cookie().clear_header(), "session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    }

    #[test]
    fn test_decode_rejects_tampering() {
        let cookie = cookie();
        let value = cookie.encode("token-1");

        assert_eq!(cookie.decode(&value), Some("token-1"));
        assert_eq!(cookie.decode("token-1"), None);
        assert_eq!(cookie.decode(&value.replace("token-1", "token-2")), None);

        let other = SessionCookie::new("session", b"other".to_vec(), 3600);
        assert_eq!(other.decode(&value), None);
    }

    #[test]
    fn test_token_from_headers() {
        let cookie = cookie();
        let mut headers = HeaderMap::new();
        let value = format!("session={}", cookie.encode("tok"));
        headers.insert(header::COOKIE, HeaderValue::from_str(&value).unwrap());

        assert_eq!(cookie.token_from(&headers).as_deref(), Some("tok"));
    }

    proptest! {
        #[test]
        fn prop_encode_decode(token in "[A-Za-z0-9-]{1,40}") {
            let cookie = cookie();
            let value = cookie.encode(&token);
            prop_assert_eq!(cookie.decode(&value), Some(token.as_str()));
        }
    }
}
