// SPDX-FileCopyrightText: 2026 Watchtower contributors
// SPDX-License-Identifier: MIT

//! Shared HTTP plumbing for the source clients.
//!
//! Every client gets its own `reqwest::Client` with a bounded per-family
//! timeout; a fetch that exceeds it fails in its own task and never delays
//! another source.

use std::error::Error;
use std::fmt;
use std::time::Duration;

const USER_AGENT: &str = concat!("watchtower/", env!("CARGO_PKG_VERSION"));

pub const FEEDS_TIMEOUT: Duration = Duration::from_secs(10);
pub const MARKETS_TIMEOUT: Duration = Duration::from_secs(15);
pub const WEATHER_TIMEOUT: Duration = Duration::from_secs(10);
pub const LLM_TIMEOUT: Duration = Duration::from_secs(30);

/// Failure of one source fetch. Converted to a `Failed` slot at the task
/// boundary; never aborts the dashboard.
#[derive(Debug)]
pub enum FetchError {
    /// Transport-level failure (connect, timeout, TLS, ...).
    Request {
        what: &'static str,
        source: reqwest::Error,
    },
    /// Non-200 status.
    Status { what: &'static str, code: u16 },
    /// Endpoint answered but the payload did not decode.
    Decode {
        what: &'static str,
        source: reqwest::Error,
    },
    /// Endpoint answered with an empty or unusable result set.
    Empty { what: &'static str },
    /// Provider-specific rate limit (CoinGecko 429).
    RateLimited { what: &'static str },
    /// Every sub-fetch of a multi-endpoint group failed.
    Group { errors: Vec<String> },
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Request { what, source } => {
                if source.is_timeout() {
                    write!(f, "{what} timed out")
                } else {
                    write!(f, "{what} request failed: {source}")
                }
            }
            FetchError::Status { what, code } => write!(f, "{what} HTTP {code}"),
            FetchError::Decode { what, source } => write!(f, "decoding {what}: {source}"),
            FetchError::Empty { what } => write!(f, "no results from {what}"),
            FetchError::RateLimited { what } => {
                write!(f, "{what} rate limited (try again in ~1min)")
            }
            FetchError::Group { errors } => write!(f, "{}", errors.join("; ")),
        }
    }
}

impl Error for FetchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FetchError::Request { source, .. } | FetchError::Decode { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Builds a client with the given timeout and the shared user agent.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|source| FetchError::Request {
            what: "http client",
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_error_joins_sub_errors() {
        let err = FetchError::Group {
            errors: vec!["yahoo chart HTTP 500 for A".to_owned(), "B timed out".to_owned()],
        };
        assert_eq!(err.to_string(), "yahoo chart HTTP 500 for A; B timed out");
    }

    #[test]
    fn status_error_names_endpoint() {
        let err = FetchError::Status {
            what: "polymarket",
            code: 503,
        };
        assert_eq!(err.to_string(), "polymarket HTTP 503");
    }
}
