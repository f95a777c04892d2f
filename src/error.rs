use thiserror::Error;

/// Failures talking to the LedFx REST API.
///
/// `Clone` so that every caller waiting on a coalesced refresh receives the
/// same outcome.
#[derive(Debug, Clone, Error)]
pub enum LedFxError {
    #[error("cannot connect to LedFx at {url}: {reason}")]
    Connectivity { url: String, reason: String },

    #[error("LedFx request to {url} failed: status={status} body={body}")]
    BadStatus { url: String, status: u16, body: String },

    #[error("LedFx response from {url} could not be decoded: {reason}")]
    Decode { url: String, reason: String },

    #[error("http client error: {0}")]
    Client(String),
}

impl LedFxError {
    pub(crate) fn transport(url: &str, err: reqwest::Error) -> Self {
        if err.is_decode() {
            LedFxError::Decode {
                url: url.to_string(),
                reason: err.to_string(),
            }
        } else {
            LedFxError::Connectivity {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }

    /// Host unreachable, refused or timed out.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, LedFxError::Connectivity { .. })
    }

    /// The server answered, but not with something usable.
    pub fn is_protocol(&self) -> bool {
        matches!(self, LedFxError::BadStatus { .. } | LedFxError::Decode { .. })
    }
}

impl From<reqwest::Error> for LedFxError {
    fn from(err: reqwest::Error) -> Self {
        LedFxError::Client(err.to_string())
    }
}
