use std::time::Duration;

use anyhow::Context;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("newsdesk/", env!("CARGO_PKG_VERSION"));

/// Blocking client for the content API. Every request asks for JSON.
pub(crate) fn http_client() -> anyhow::Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("failed to build HTTP client")
}
