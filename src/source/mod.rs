pub mod guardian;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::article::Article;
use crate::config::SourceConfig;

pub const NOT_CONFIGURED: &str = "API key is not configured.";
pub const UNEXPECTED_FORMAT: &str = "The server returned an unexpected response format.";

/// A failed request against the content API, already reduced to a displayable message.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct SourceError {
    pub message: String,
    pub status: u16,
    pub code: Option<String>,
}

impl SourceError {
    pub fn new(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            status,
            code: None,
        }
    }
}

pub fn friendly_message(status: u16) -> &'static str {
    match status {
        400 => "The request was invalid. Please check your search parameters.",
        401 => "Authentication failed. Please check your API key.",
        403 => "Access forbidden. You don't have permission to access this resource.",
        404 => "The requested resource was not found.",
        426 => "API upgrade required. This request cannot be completed with the current plan.",
        429 => "Too many requests. Please try again later.",
        500 => "Server error occurred. Please try again later.",
        _ => "An unexpected error occurred. Please try again.",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    One(String),
    Many(Vec<String>),
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Param::One(value.to_string())
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Param::One(value)
    }
}

impl From<usize> for Param {
    fn from(value: usize) -> Self {
        Param::One(value.to_string())
    }
}

impl From<Vec<String>> for Param {
    fn from(value: Vec<String>) -> Self {
        Param::Many(value)
    }
}

/// Ordered query parameters for a content API request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    params: Vec<(String, Param)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl Into<Param>) -> Self {
        let value = value.into();
        match self.params.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.params.push((key.to_string(), value)),
        }
        self
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&Param> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Lists are comma-joined; empty values are left out.
    pub fn pairs(&self) -> Vec<(&str, String)> {
        self.params
            .iter()
            .filter_map(|(key, value)| {
                let value = match value {
                    Param::One(v) => v.clone(),
                    Param::Many(vs) => vs.join(","),
                };
                (!value.is_empty()).then_some((key.as_str(), value))
            })
            .collect()
    }

    pub fn serialize(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs())
            .finish()
    }
}

pub fn request_url(
    config: &SourceConfig,
    api_key: &str,
    endpoint: &str,
    query: &Query,
) -> Result<Url, SourceError> {
    let base = config.base_url.trim_end_matches('/');
    let endpoint = endpoint.trim_start_matches('/');
    let mut url = Url::parse(&format!("{base}/{endpoint}"))
        .map_err(|e| SourceError::new(format!("Invalid API endpoint: {e}"), 500))?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("api-key", api_key);
        pairs.extend_pairs(query.pairs());
    }
    Ok(url)
}

/// GET `{base}/{endpoint}?api-key=..&{query}` and return the JSON body.
pub fn fetch_json(
    client: &reqwest::blocking::Client,
    config: &SourceConfig,
    endpoint: &str,
    query: &Query,
) -> Result<Value, SourceError> {
    let api_key = config
        .api_key
        .as_deref()
        .ok_or_else(|| SourceError::new(NOT_CONFIGURED, 500))?;
    let url = request_url(config, api_key, endpoint, query)?;
    debug!(endpoint, query = %query.serialize(), "requesting content API");

    let response = client
        .get(url)
        .send()
        .map_err(|e| SourceError::new(e.to_string(), 500))?;
    let status = response.status().as_u16();
    let is_json = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));

    if !is_json {
        warn!(status, "content API answered with a non-JSON body");
        return Err(SourceError::new(UNEXPECTED_FORMAT, status));
    }

    let success = response.status().is_success();
    let text = response
        .text()
        .map_err(|e| SourceError::new(e.to_string(), status))?;
    let data: Value =
        serde_json::from_str(&text).map_err(|e| SourceError::new(e.to_string(), status))?;

    if !success {
        let message = data
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| friendly_message(status).to_string());
        let code = data.get("code").and_then(|c| match c {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
        warn!(status, %message, "content API request failed");
        return Err(SourceError {
            message,
            status,
            code,
        });
    }

    Ok(data)
}

/// Fetch the `search` endpoint and normalize the results.
pub fn fetch_articles(
    client: &reqwest::blocking::Client,
    config: &SourceConfig,
    query: &Query,
) -> Result<Vec<Article>, SourceError> {
    let data = fetch_json(client, config, "search", query)?;
    guardian::normalize(&data)
}
