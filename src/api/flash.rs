//! Flash messages
//!
//! One-shot notices shown on the next rendered page. Messages queued before a
//! redirect travel in the `flash` cookie as URL-encoded JSON; the page that
//! shows them clears the cookie.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderValue},
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

use crate::api::cookies::{clear_cookie, read_cookie, set_cookie};
use crate::api::view::see_other;

pub const FLASH_COOKIE: &str = "flash";

/// How long an undelivered flash survives
const FLASH_MAX_AGE_SECS: i64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: Level,
    pub text: String,
}

/// Flash messages for the current request.
///
/// Extracting it reads any messages left by the previous request.
#[derive(Debug, Default)]
pub struct Flash {
    incoming: Vec<FlashMessage>,
    queued: Vec<FlashMessage>,
}

impl<S: Send + Sync> FromRequestParts<S> for Flash {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let incoming = read_cookie(&parts.headers, FLASH_COOKIE)
            .map(|raw| decode_messages(&raw))
            .unwrap_or_default();
        Ok(Self {
            incoming,
            queued: Vec::new(),
        })
    }
}

impl Flash {
    pub fn success(&mut self, text: impl Into<String>) {
        self.push(Level::Success, text.into());
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.push(Level::Error, text.into());
    }

    fn push(&mut self, level: Level, text: String) {
        self.queued.push(FlashMessage { level, text });
    }

    /// Take every message for display on the page being rendered.
    ///
    /// The returned header clears the cookie when messages came from it.
    pub fn drain(self) -> (Vec<FlashMessage>, Option<HeaderValue>) {
        let clear = if self.incoming.is_empty() {
            None
        } else {
            HeaderValue::from_str(&clear_cookie(FLASH_COOKIE)).ok()
        };
        let mut messages = self.incoming;
        messages.extend(self.queued);
        (messages, clear)
    }

    /// Redirect with 303, carrying undelivered messages to the next page
    pub fn redirect(self, to: &str) -> Response {
        let had_incoming = !self.incoming.is_empty();
        let mut messages = self.incoming;
        messages.extend(self.queued);

        let mut response = see_other(to);
        let cookie = if messages.is_empty() {
            had_incoming.then(|| clear_cookie(FLASH_COOKIE))
        } else {
            Some(set_cookie(FLASH_COOKIE, &encode_messages(&messages), FLASH_MAX_AGE_SECS))
        };
        if let Some(value) = cookie.and_then(|c| HeaderValue::from_str(&c).ok()) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
        response
    }
}

fn encode_messages(messages: &[FlashMessage]) -> String {
    let json = serde_json::to_string(messages).unwrap_or_else(|_| "[]".to_string());
    urlencoding::encode(&json).into_owned()
}

/// Malformed cookies decode to no messages
fn decode_messages(raw: &str) -> Vec<FlashMessage> {
    urlencoding::decode(raw)
        .ok()
        .and_then(|json| serde_json::from_str(&json).ok())
        .unwrap_or_default()
}
