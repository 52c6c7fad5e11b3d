use std::path::PathBuf;

pub const DEFAULT_ENDPOINT: &str = "https://content.guardianapis.com";
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Credentials and base URL of the content API, read fresh for every request.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

impl SourceConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: non_empty_var("NEWS_API_KEY"),
            base_url: non_empty_var("NEWS_API_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        }
    }
}

pub fn store_dir() -> PathBuf {
    if let Some(dir) = non_empty_var("NEWSDESK_STORE") {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .map(|d| d.join("newsdesk"))
        .unwrap_or_else(|| PathBuf::from(".newsdesk"))
}

/// Number of articles requested per fetch.
pub fn fetch_page_size() -> usize {
    non_empty_var("NEWSDESK_PAGE_SIZE")
        .and_then(|v| v.parse().ok())
        .filter(|&n: &usize| n > 0)
        .unwrap_or(DEFAULT_PAGE_SIZE)
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
