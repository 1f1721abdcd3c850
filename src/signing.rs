//! OAuth 1.0 PLAINTEXT signing for controller requests.
//!
//! Nodes receive a consumer key, token key and token secret from the
//! controller. The consumer secret is always empty, so the PLAINTEXT
//! signature is `&` followed by the token secret.

use crate::error::ConfigError;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Node credentials in the controller's `consumer:token:secret` form.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub consumer_key: String,
    pub token_key: String,
    pub token_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("token_key", &self.token_key)
            .field("token_secret", &"<redacted>")
            .finish()
    }
}

impl std::str::FromStr for Credentials {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        match parts.as_slice() {
            [consumer, token, secret]
                if !consumer.is_empty() && !token.is_empty() && !secret.is_empty() =>
            {
                Ok(Self {
                    consumer_key: consumer.to_string(),
                    token_key: token.to_string(),
                    token_secret: secret.to_string(),
                })
            }
            _ => Err(ConfigError::new(
                "credentials must be of the form consumer_key:token_key:token_secret",
            )),
        }
    }
}

impl Credentials {
    /// Render the `Authorization` header value for one request.
    pub fn authorization_header(&self, nonce: &str, timestamp: u64) -> String {
        let params = [
            ("oauth_nonce", nonce.to_string()),
            ("oauth_timestamp", timestamp.to_string()),
            ("oauth_version", "1.0".to_string()),
            ("oauth_signature_method", "PLAINTEXT".to_string()),
            ("oauth_consumer_key", self.consumer_key.clone()),
            ("oauth_token", self.token_key.clone()),
            ("oauth_signature", format!("&{}", self.token_secret)),
        ];

        let rendered: Vec<String> = params
            .iter()
            .map(|(key, value)| format!("{}=\"{}\"", key, urlencoding::encode(value)))
            .collect();
        format!("OAuth realm=\"\", {}", rendered.join(", "))
    }

    /// Header for a request made now, with a fresh nonce.
    pub fn sign_now(&self) -> String {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        self.authorization_header(&nonce, timestamp)
    }
}
