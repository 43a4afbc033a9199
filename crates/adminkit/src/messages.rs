//! One-time flash messages.
//!
//! A successful create/update/delete redirects back to the list view with a
//! notification such as "Created successfully". The messages travel in a
//! cookie holding base64-encoded JSON signed by a [`MessageSigner`]: they are
//! written on the redirect, verified and decoded on the next request, and
//! cleared when that request renders a page.

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// The cookie holding pending messages.
pub const MESSAGES_COOKIE: &str = "adminkit_messages";

/// Mixed into the signing key so it is never reused for other cookies.
const SALT: &str = "adminkit.messages.";

/// Flashed after a successful create.
pub const CREATED: &str = "Created successfully";
/// Flashed after a successful update.
pub const UPDATED: &str = "Updated successfully";
/// Flashed after a successful delete.
pub const DELETED: &str = "Deleted successfully";
/// Flashed when a delete is rejected by a constraint.
pub const DELETE_REFERENCED: &str =
    "Could not be deleted due to being referenced by a related object";

/// The severity level of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    /// Debug-level message, typically not shown in production.
    Debug = 10,
    /// Informational message.
    Info = 20,
    /// Success notification (e.g., "Updated successfully").
    Success = 25,
    /// Warning that requires attention.
    Warning = 30,
    /// Error message indicating a failure.
    Error = 40,
}

impl MessageLevel {
    /// Returns the CSS tag class for this level.
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for MessageLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// A single notification message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The severity level of this message.
    pub level: MessageLevel,
    /// The message text.
    pub text: String,
}

impl Message {
    /// Creates a new message with the given level and text.
    pub fn new(level: MessageLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }

    /// Creates a success-level message.
    pub fn success(text: impl Into<String>) -> Self {
        Self::new(MessageLevel::Success, text)
    }

    /// Creates an error-level message.
    pub fn error(text: impl Into<String>) -> Self {
        Self::new(MessageLevel::Error, text)
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Signs and verifies the message cookie with HMAC-SHA256.
///
/// The cookie value is `payload:signature`, where `payload` is the base64
/// JSON list of messages and the signature is keyed on a salt plus the site's
/// secret key. Values whose signature does not match decode to nothing.
///
/// # Examples
///
/// ```
/// use adminkit::messages::{Message, MessageSigner};
///
/// let signer = MessageSigner::new("s3cret");
/// let value = signer.encode(&[Message::success("Saved")]).unwrap();
/// assert_eq!(signer.decode(&value)[0].text, "Saved");
/// assert!(MessageSigner::new("other").decode(&value).is_empty());
/// ```
#[derive(Clone)]
pub struct MessageSigner {
    key: Vec<u8>,
}

impl std::fmt::Debug for MessageSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageSigner").finish_non_exhaustive()
    }
}

impl MessageSigner {
    /// Creates a signer keyed on `secret_key`.
    pub fn new(secret_key: &str) -> Self {
        Self {
            key: format!("{SALT}{secret_key}").into_bytes(),
        }
    }

    /// Creates a signer with a random key. Cookies it signs do not survive a
    /// restart.
    pub fn random() -> Self {
        let secret: [u8; 32] = rand::random();
        Self::new(&URL_SAFE_NO_PAD.encode(secret))
    }

    fn mac(&self, payload: &str) -> Option<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.key).ok()?;
        mac.update(payload.as_bytes());
        Some(mac)
    }

    /// Encodes and signs messages into a cookie value.
    pub fn encode(&self, messages: &[Message]) -> Option<String> {
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(messages).ok()?);
        let signature = URL_SAFE_NO_PAD.encode(self.mac(&payload)?.finalize().into_bytes());
        Some(format!("{payload}:{signature}"))
    }

    /// Decodes a cookie value. Tampered, unsigned or stale values decode to
    /// nothing.
    pub fn decode(&self, value: &str) -> Vec<Message> {
        self.verify(value.trim())
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default()
    }

    fn verify(&self, value: &str) -> Option<Vec<u8>> {
        let (payload, signature) = value.rsplit_once(':')?;
        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;
        self.mac(payload)?.verify_slice(&signature).ok()?;
        URL_SAFE_NO_PAD.decode(payload).ok()
    }

    /// Reads pending messages from the request's `Cookie` headers.
    pub fn from_headers(&self, headers: &HeaderMap) -> Vec<Message> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|header| header.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == MESSAGES_COOKIE)
            .map(|(_, value)| self.decode(value))
            .unwrap_or_default()
    }

    /// Builds the `Set-Cookie` header that stores `messages` for the next
    /// request.
    pub fn store_cookie(&self, messages: &[Message], path: &str) -> Option<HeaderValue> {
        let value = self.encode(messages)?;
        HeaderValue::from_str(&format!(
            "{MESSAGES_COOKIE}={value}; Path={path}; HttpOnly; SameSite=Lax"
        ))
        .ok()
    }
}

/// Builds the `Set-Cookie` header that discards stored messages.
pub fn clear_cookie(path: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{MESSAGES_COOKIE}=; Path={path}; Max-Age=0; HttpOnly; SameSite=Lax"
    ))
    .ok()
}

/// Appends a `Set-Cookie` header when one could be built.
pub fn append_cookie(headers: &mut HeaderMap, value: Option<HeaderValue>) {
    if let Some(value) = value {
        headers.append(SET_COOKIE, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_level_tag() {
        assert_eq!(MessageLevel::Success.tag(), "success");
        assert_eq!(MessageLevel::Error.to_string(), "error");
        assert!(MessageLevel::Info < MessageLevel::Warning);
    }

    #[test]
    fn test_encode_decode() {
        let signer = MessageSigner::new("secret");
        let messages = vec![Message::success(CREATED), Message::error(DELETE_REFERENCED)];
        let value = signer.encode(&messages).unwrap();
        assert!(!value.contains(';'));
        assert_eq!(signer.decode(&value), messages);
    }

    #[test]
    fn test_decode_garbage_is_empty() {
        let signer = MessageSigner::new("secret");
        assert!(signer.decode("%%%not base64").is_empty());
        assert!(signer.decode("").is_empty());
        let unsigned = URL_SAFE_NO_PAD.encode(b"[{\"level\":\"success\",\"text\":\"hi\"}]");
        assert!(signer.decode(&unsigned).is_empty());
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let signer = MessageSigner::new("secret");
        let value = signer.encode(&[Message::success(UPDATED)]).unwrap();
        let (_, signature) = value.rsplit_once(':').unwrap();
        let forged = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&[Message::error("<script>")]).unwrap(),
        );
        assert!(signer.decode(&format!("{forged}:{signature}")).is_empty());
    }

    #[test]
    fn test_keys_do_not_share_signatures() {
        let value = MessageSigner::new("one").encode(&[Message::success(DELETED)]).unwrap();
        assert!(MessageSigner::new("two").decode(&value).is_empty());
        assert!(MessageSigner::random().decode(&value).is_empty());
    }

    #[test]
    fn test_from_headers_finds_cookie() {
        let signer = MessageSigner::new("secret");
        let mut headers = HeaderMap::new();
        let cookie = format!(
            "session=abc; {MESSAGES_COOKIE}={}; theme=dark",
            signer.encode(&[Message::success(UPDATED)]).unwrap()
        );
        headers.insert(COOKIE, HeaderValue::from_str(&cookie).unwrap());
        let messages = signer.from_headers(&headers);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, UPDATED);
        assert_eq!(messages[0].level, MessageLevel::Success);
    }

    #[test]
    fn test_from_headers_without_cookie() {
        assert!(MessageSigner::new("secret").from_headers(&HeaderMap::new()).is_empty());
    }

    #[test]
    fn test_store_and_clear_cookie() {
        let signer = MessageSigner::new("secret");
        let stored = signer.store_cookie(&[Message::success(DELETED)], "/admin").unwrap();
        let stored = stored.to_str().unwrap();
        assert!(stored.starts_with("adminkit_messages="));
        assert!(stored.contains("Path=/admin"));

        let cleared = clear_cookie("/").unwrap();
        assert!(cleared.to_str().unwrap().contains("Max-Age=0"));
    }
}
