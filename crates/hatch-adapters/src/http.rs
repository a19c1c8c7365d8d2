//! Blocking HTTP client shared by the registry, snapshot, and catalog adapters.
//!
//! Every request runs under the caller's [`Deadline`]: the per-request timeout
//! is clamped to what is left, and a timeout after the deadline expired is
//! reported as [`HttpError::Expired`] rather than a transport error.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use hatch_core::domain::Deadline;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const USER_AGENT: &str = concat!("hatch/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("deadline exceeded")]
    Expired,

    #[error("not found: {url}")]
    NotFound { url: String },

    #[error("HTTP {status} from {url}")]
    Status { status: StatusCode, url: String },

    #[error("{0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> Result<Self, HttpError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    /// Client that ignores proxy settings, for talking to a local server.
    #[cfg(test)]
    pub(crate) fn direct() -> Result<Self, HttpError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(USER_AGENT)
            .no_proxy()
            .build()?;
        Ok(Self { client })
    }

    /// GET `url`, failing on any non-success status.
    pub fn get(&self, url: &str, deadline: &Deadline) -> Result<Response, HttpError> {
        if deadline.is_expired() {
            return Err(HttpError::Expired);
        }
        debug!(url, "GET");

        let response = self
            .client
            .get(url)
            .timeout(deadline.clamp(REQUEST_TIMEOUT))
            .send()
            .map_err(|e| expired_or(deadline, e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(HttpError::NotFound {
                url: url.to_string(),
            }),
            status if status.is_success() => Ok(response),
            status => Err(HttpError::Status {
                status,
                url: url.to_string(),
            }),
        }
    }

    pub fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        deadline: &Deadline,
    ) -> Result<T, HttpError> {
        self.get(url, deadline)?
            .json()
            .map_err(|e| expired_or(deadline, e))
    }

    pub fn get_bytes(&self, url: &str, deadline: &Deadline) -> Result<Vec<u8>, HttpError> {
        let bytes = self
            .get(url, deadline)?
            .bytes()
            .map_err(|e| expired_or(deadline, e))?;
        Ok(bytes.to_vec())
    }
}

fn expired_or(deadline: &Deadline, e: reqwest::Error) -> HttpError {
    if deadline.is_expired() {
        HttpError::Expired
    } else {
        HttpError::Transport(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_deadline_skips_the_request() {
        let client = HttpClient::new().unwrap();
        let deadline = Deadline::after(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(5));

        let err = client
            .get("http://127.0.0.1:9/unreachable", &deadline)
            .unwrap_err();
        assert!(matches!(err, HttpError::Expired));
    }
}
