use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

pub const SUBSCRIBE_MODE: &str = "subscribe";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("webhook verification rejected")]
    Forbidden,
}

/// Subscription handshake: echoes `challenge` only for a `subscribe` request
/// carrying the configured verify token.
pub fn verify(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&str>,
    secret: &SecretString,
) -> Result<String, WebhookError> {
    match (mode, token, challenge) {
        (Some(SUBSCRIBE_MODE), Some(token), Some(challenge))
            if !token.is_empty() && token == secret.expose_secret() =>
        {
            Ok(challenge.to_owned())
        }
        _ => Err(WebhookError::Forbidden),
    }
}
