//! Error types for the campus portal client

use thiserror::Error;

/// Message shown when the server rejects credentials without explaining why.
pub const DEFAULT_LOGIN_FAILURE: &str = "Login failed. Please try again.";

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file not found. Run 'portal init' first.")]
    ConfigNotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport failure: DNS, connect, timeout, broken body.
    #[error("Network error, please try again: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered 401 for the attached bearer token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    /// Login or registration rejected by the server.
    #[error("{0}")]
    Credential(String),

    /// The held token could not be resolved to a user.
    #[error("Session is no longer valid")]
    SessionInvalid,

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Token storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for errors that mean the bearer token must be discarded.
    pub fn is_session_invalid(&self) -> bool {
        matches!(self, Error::Unauthorized(_) | Error::SessionInvalid)
    }

    /// Map an API failure during login/register into the message-bearing
    /// error the form displays.
    pub fn into_credential_error(self) -> Error {
        match self {
            Error::Unauthorized(message) | Error::Status { message, .. } => {
                if message.trim().is_empty() {
                    Error::Credential(DEFAULT_LOGIN_FAILURE.to_string())
                } else {
                    Error::Credential(message)
                }
            }
            other => other,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_maps_to_credential_message() {
        let err = Error::Status {
            status: 400,
            message: "Invalid email or password".to_string(),
        };
        match err.into_credential_error() {
            Error::Credential(msg) => assert_eq!(msg, "Invalid email or password"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_message_falls_back_to_default() {
        let err = Error::Unauthorized(String::new());
        match err.into_credential_error() {
            Error::Credential(msg) => assert_eq!(msg, DEFAULT_LOGIN_FAILURE),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_session_invalid_kinds() {
        assert!(Error::Unauthorized("expired".into()).is_session_invalid());
        assert!(Error::SessionInvalid.is_session_invalid());
        assert!(!Error::Credential("nope".into()).is_session_invalid());
    }
}
