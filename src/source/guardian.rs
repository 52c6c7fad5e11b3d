use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::SourceError;
use crate::article::{Article, ArticleType};

pub const NO_ARTICLES: &str = "No articles found in response";

#[derive(Debug, Deserialize)]
struct Envelope {
    response: Option<SearchResponse>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    status: String,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    results: Option<Vec<RawArticle>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArticle {
    id: String,
    web_title: String,
    web_url: String,
    web_publication_date: String,
    section_name: String,
    #[serde(default)]
    pillar_name: Option<String>,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    fields: Option<RawFields>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFields {
    headline: Option<String>,
    byline: Option<String>,
    trail_text: Option<String>,
    thumbnail: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn to_article(raw: RawArticle) -> Option<Article> {
    let published_at = match DateTime::parse_from_rfc3339(&raw.web_publication_date) {
        Ok(d) => d.with_timezone(&Utc),
        Err(e) => {
            warn!(id = %raw.id, error = %e, "skipping article with unreadable publication date");
            return None;
        }
    };
    let fields = raw.fields.unwrap_or_default();
    let section = raw.section_name;

    Some(Article {
        title: non_empty(fields.headline).unwrap_or(raw.web_title),
        description: non_empty(fields.trail_text)
            .unwrap_or_else(|| format!("Article from {section} section")),
        author: non_empty(fields.byline).unwrap_or_else(|| format!("{section} Team")),
        published_at,
        kind: if raw.kind == "article" {
            ArticleType::News
        } else {
            ArticleType::Blog
        },
        pillar: raw.pillar_name,
        url: raw.web_url,
        thumbnail: non_empty(fields.thumbnail),
        id: raw.id,
        section,
    })
}

/// Map a `search` response body onto normalized articles.
pub fn normalize(data: &Value) -> Result<Vec<Article>, SourceError> {
    let envelope: Envelope = serde_json::from_value(data.clone())
        .map_err(|e| SourceError::new(format!("{NO_ARTICLES}: {e}"), 200))?;
    let response = envelope
        .response
        .filter(|r| r.status == "ok")
        .ok_or_else(|| SourceError::new(NO_ARTICLES, 200))?;
    if response.total == Some(0) {
        return Ok(Vec::new());
    }
    let results = response
        .results
        .ok_or_else(|| SourceError::new(NO_ARTICLES, 200))?;
    Ok(results.into_iter().filter_map(to_article).collect())
}
