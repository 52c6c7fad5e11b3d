use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleType {
    News,
    Blog,
}

impl ArticleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleType::News => "news",
            ArticleType::Blog => "blog",
        }
    }
}

impl fmt::Display for ArticleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArticleType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "news" => Ok(ArticleType::News),
            "blog" => Ok(ArticleType::Blog),
            other => anyhow::bail!("Unknown article type: {}. Use: news, blog", other),
        }
    }
}

/// A normalized article. Immutable once fetched; a refetch replaces the whole list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub author: String,
    pub published_at: DateTime<Utc>,
    pub description: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub section: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pillar: Option<String>,
    #[serde(rename = "type")]
    pub kind: ArticleType,
}
