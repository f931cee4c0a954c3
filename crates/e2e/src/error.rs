//! Error types for the verification harness

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Server failed to start: {0}")]
    ServerStartup(String),

    #[error("Server at {url} not reachable within {waited:?}")]
    ServerUnreachable { url: String, waited: Duration },

    #[error("Browser launch failed: {0}")]
    BrowserLaunch(String),

    #[error("Browser protocol error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error("Timed out after {timeout:?} waiting for {what}")]
    WaitTimeout { what: String, timeout: Duration },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Persisted state key missing: {0}")]
    MissingStateKey(String),

    #[error("Screenshot decode error: {0}")]
    Screenshot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type HarnessResult<T> = Result<T, HarnessError>;
