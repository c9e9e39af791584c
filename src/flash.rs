// One-shot flash messages carried in a signed cookie
//
// Cookie value: urlencode(json([{category, message}, ...])) + "." + hex(hmac_sha256(secret, payload))

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{
        header::{COOKIE, SET_COOKIE},
        request::Parts,
        HeaderValue,
    },
    response::{AppendHeaders, IntoResponse, IntoResponseParts, Redirect, Response, ResponseParts},
};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::convert::Infallible;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

pub const COOKIE_NAME: &str = "flash";

/// Category used when a course with the same name and teacher exists
pub const COURSE_ERROR: &str = "course_error";

/// Category used when the admin password is wrong
pub const ADMIN_ERROR: &str = "admin_error";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub category: String,
    pub message: String,
}

/// Key used to sign and verify flash cookies
#[derive(Clone)]
pub struct FlashKey(pub Arc<str>);

impl FlashKey {
    pub fn new(secret: &str) -> Self {
        Self(Arc::from(secret))
    }

    /// Hex HMAC-SHA256 of `payload`. HMAC accepts keys of any length, so
    /// `None` is never produced in practice.
    fn sign(&self, payload: &str) -> Option<String> {
        let mut mac = HmacSha256::new_from_slice(self.0.as_bytes()).ok()?;
        mac.update(payload.as_bytes());
        Some(format!("{:x}", mac.finalize().into_bytes()))
    }

    /// Encode messages into a signed cookie value
    pub fn encode(&self, messages: &[FlashMessage]) -> Option<String> {
        let json = serde_json::to_string(messages).ok()?;
        let payload = urlencoding::encode(&json).into_owned();
        let signature = self.sign(&payload)?;
        Some(format!("{payload}.{signature}"))
    }

    /// Verify and decode a cookie value; anything tampered or malformed is `None`
    pub fn decode(&self, value: &str) -> Option<Vec<FlashMessage>> {
        let (payload, signature) = value.rsplit_once('.')?;
        if !constant_time_eq(self.sign(payload)?.as_bytes(), signature.as_bytes()) {
            return None;
        }
        let json = urlencoding::decode(payload).ok()?;
        serde_json::from_str(&json).ok()
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Flash messages pending for this request.
///
/// Returning it as part of the response expires the cookie, so every
/// message is rendered once.
#[derive(Debug, Default)]
pub struct Flashes {
    messages: Vec<FlashMessage>,
    had_cookie: bool,
}

impl Flashes {
    pub fn messages(&self) -> &[FlashMessage] {
        &self.messages
    }

    fn from_headers(key: &FlashKey, parts: &Parts) -> Self {
        let Some(raw) = find_cookie(parts, COOKIE_NAME) else {
            return Self::default();
        };

        let messages = key.decode(&raw).unwrap_or_else(|| {
            tracing::debug!("discarding flash cookie with bad signature");
            Vec::new()
        });

        Self {
            messages,
            had_cookie: true,
        }
    }
}

fn find_cookie(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

#[async_trait]
impl<S> FromRequestParts<S> for Flashes
where
    FlashKey: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let key = FlashKey::from_ref(state);
        Ok(Self::from_headers(&key, parts))
    }
}

impl IntoResponseParts for Flashes {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        if self.had_cookie {
            res.headers_mut().append(
                SET_COOKIE,
                HeaderValue::from_static("flash=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax"),
            );
        }
        Ok(res)
    }
}

/// Redirect to `to`, queueing a message for the next page rendered
pub fn redirect_with_flash(key: &FlashKey, to: &str, category: &str, message: &str) -> Response {
    let cookie = key
        .encode(&[FlashMessage {
            category: category.to_string(),
            message: message.to_string(),
        }])
        .map(|value| format!("{COOKIE_NAME}={value}; Path=/; HttpOnly; SameSite=Lax"))
        .and_then(|cookie| HeaderValue::from_str(&cookie).ok());

    match cookie {
        Some(cookie) => (AppendHeaders([(SET_COOKIE, cookie)]), Redirect::to(to)).into_response(),
        // Message lost, but the redirect still happens
        None => Redirect::to(to).into_response(),
    }
}
