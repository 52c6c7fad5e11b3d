use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};

use crate::article::{Article, ArticleType};
use crate::source::Query;

pub const SHOW_FIELDS: &str = "thumbnail,trailText,byline,publication,headline";
pub const SHOW_TAGS: &str = "contributor";

pub const TRENDING_SEARCH: &str = "breaking news OR viral OR trending";
pub const TRENDING_PAGE_SIZE: usize = 24;
pub const TRENDING_DAYS: i64 = 3;
pub const RECENT_PAGE_SIZE: usize = 4;
pub const RECENT_DAYS: i64 = 7;
pub const RECENT_DEFAULT_CATEGORY: &str = "world";

/// Sort order requested from the content API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    #[default]
    PublishedAt,
    Relevancy,
    Popularity,
}

impl SortBy {
    /// The API has no popularity ordering, so it falls back to newest.
    pub fn order_by(&self) -> &'static str {
        match self {
            SortBy::PublishedAt | SortBy::Popularity => "newest",
            SortBy::Relevancy => "relevance",
        }
    }
}

impl FromStr for SortBy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "publishedAt" | "published" | "newest" => Ok(SortBy::PublishedAt),
            "relevancy" | "relevance" => Ok(SortBy::Relevancy),
            "popularity" => Ok(SortBy::Popularity),
            other => anyhow::bail!(
                "Unknown sort order: {}. Use: publishedAt, relevancy, popularity",
                other
            ),
        }
    }
}

/// Inclusive on both ends; either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    pub search_query: String,
    pub author: Option<String>,
    pub section: Option<String>,
    pub content_type: Option<ArticleType>,
    pub date_range: DateRange,
    pub sort_by: SortBy,
}

impl FilterState {
    pub fn matches(&self, article: &Article) -> bool {
        self.matches_search(article)
            && self.author.as_ref().is_none_or(|a| article.author == *a)
            && self.section.as_ref().is_none_or(|s| article.section == *s)
            && self.content_type.is_none_or(|t| article.kind == t)
            && self.date_range.contains(article.published_at.date_naive())
    }

    fn matches_search(&self, article: &Article) -> bool {
        let query = self.search_query.to_lowercase();
        if query.is_empty() {
            return true;
        }
        [
            &article.title,
            &article.author,
            &article.description,
            &article.section,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&query))
    }

    pub fn apply(&self, articles: &[Article]) -> Vec<Article> {
        articles.iter().filter(|a| self.matches(a)).cloned().collect()
    }

    pub fn is_active(&self) -> bool {
        *self != FilterState {
            sort_by: self.sort_by,
            ..FilterState::default()
        }
    }

    /// Parameters for fetching from the content API with this state.
    pub fn to_query(&self, page_size: usize) -> Query {
        let mut q = self.search_query.trim().to_string();
        if let Some(kind) = self.content_type {
            if !q.is_empty() {
                q.push(' ');
            }
            q.push_str(kind.as_str());
        }

        let mut query = Query::new()
            .set("page-size", page_size)
            .set("show-fields", SHOW_FIELDS)
            .set("show-tags", SHOW_TAGS)
            .set("q", q)
            .set("section", self.section.clone().unwrap_or_default())
            .set("order-by", self.sort_by.order_by());

        if let Some(from) = self.date_range.from {
            query = query.set("from-date", from.format("%Y-%m-%d").to_string());
            if let Some(to) = self.date_range.to {
                query = query.set("to-date", to.format("%Y-%m-%d").to_string());
            }
        }
        query
    }
}

impl fmt::Display for FilterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.search_query.is_empty() {
            parts.push(format!("search \"{}\"", self.search_query));
        }
        if let Some(author) = &self.author {
            parts.push(format!("author {author}"));
        }
        if let Some(section) = &self.section {
            parts.push(format!("section {section}"));
        }
        if let Some(kind) = self.content_type {
            parts.push(format!("type {kind}"));
        }
        match (self.date_range.from, self.date_range.to) {
            (Some(from), Some(to)) => parts.push(format!("{from}..{to}")),
            (Some(from), None) => parts.push(format!("from {from}")),
            (None, Some(to)) => parts.push(format!("until {to}")),
            (None, None) => {}
        }
        if parts.is_empty() {
            f.write_str("no filters")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}

/// Newest articles matching `q`, published no earlier than `days` before `today`.
fn feed_query(q: &str, page_size: usize, today: NaiveDate, days: i64) -> Query {
    let from = today - Duration::days(days);
    Query::new()
        .set("q", q)
        .set("page-size", page_size)
        .set("order-by", SortBy::PublishedAt.order_by())
        .set("show-fields", SHOW_FIELDS)
        .set("show-tags", SHOW_TAGS)
        .set("from-date", from.format("%Y-%m-%d").to_string())
}

pub fn trending_query(today: NaiveDate) -> Query {
    feed_query(TRENDING_SEARCH, TRENDING_PAGE_SIZE, today, TRENDING_DAYS)
}

/// `all` stands for the world category.
pub fn recent_query(category: &str, today: NaiveDate) -> Query {
    let category =
        optional_choice(category).unwrap_or_else(|| RECENT_DEFAULT_CATEGORY.to_string());
    feed_query(&category, RECENT_PAGE_SIZE, today, RECENT_DAYS)
}

/// `all` (any case) or an empty string means "no constraint".
pub fn optional_choice(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn parse_date(value: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("Invalid date: {}. Use YYYY-MM-DD", value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Param;
    use chrono::{DateTime, Utc};
    use rstest::rstest;

    fn at(ts: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc)
    }

    fn article(id: &str, author: &str, section: &str, kind: ArticleType, ts: &str) -> Article {
        Article {
            id: id.to_string(),
            title: format!("Title {id}"),
            author: author.to_string(),
            published_at: at(ts),
            description: format!("About {id}"),
            url: format!("https://example.com/{id}"),
            thumbnail: None,
            section: section.to_string(),
            pillar: None,
            kind,
        }
    }

    fn sample() -> Vec<Article> {
        vec![
            article("climate", "Jane Doe", "Environment", ArticleType::News, "2024-01-15T10:00:00Z"),
            article("markets", "John Roe", "Business", ArticleType::Blog, "2024-01-14T23:59:59Z"),
            article("storm", "Jane Doe", "World news", ArticleType::News, "2024-01-13T00:00:00Z"),
            article("crypto", "Ana Lima", "Business", ArticleType::News, "2024-01-11T11:45:00Z"),
        ]
    }

    fn ids(articles: &[Article]) -> Vec<&str> {
        articles.iter().map(|a| a.id.as_str()).collect()
    }

    #[test]
    fn test_empty_state_keeps_everything() {
        let all = sample();
        assert_eq!(FilterState::default().apply(&all), all);
        assert!(!FilterState::default().is_active());
    }

    #[rstest]
    #[case("JANE", vec!["climate", "storm"])]
    #[case("business", vec!["markets", "crypto"])]
    #[case("about storm", vec!["storm"])]
    #[case("title c", vec!["climate", "crypto"])]
    #[case("nothing matches", vec![])]
    fn test_search_is_case_insensitive_substring(#[case] query: &str, #[case] expected: Vec<&str>) {
        let state = FilterState {
            search_query: query.to_string(),
            ..Default::default()
        };
        assert_eq!(ids(&state.apply(&sample())), expected);
    }

    #[test]
    fn test_whitespace_search_is_applied_verbatim() {
        let state = FilterState {
            search_query: " ".to_string(),
            ..Default::default()
        };
        assert!(state.is_active());
        assert_eq!(ids(&state.apply(&sample())), vec!["climate", "markets", "storm", "crypto"]);

        let padded = FilterState {
            search_query: " storm".to_string(),
            ..Default::default()
        };
        assert_eq!(ids(&padded.apply(&sample())), vec!["storm"]);

        let no_gap = FilterState {
            search_query: "  ".to_string(),
            ..Default::default()
        };
        assert!(no_gap.apply(&sample()).is_empty());
    }

    #[test]
    fn test_author_section_and_type_are_exact() {
        let state = FilterState {
            author: Some("Jane Doe".to_string()),
            section: Some("World news".to_string()),
            content_type: Some(ArticleType::News),
            ..Default::default()
        };
        assert_eq!(ids(&state.apply(&sample())), vec!["storm"]);

        let partial = FilterState {
            author: Some("Jane".to_string()),
            ..Default::default()
        };
        assert!(partial.apply(&sample()).is_empty());
    }

    #[test]
    fn test_date_range_is_inclusive_and_ignores_time_of_day() {
        let state = FilterState {
            date_range: DateRange {
                from: Some(NaiveDate::from_ymd_opt(2024, 1, 13).unwrap()),
                to: Some(NaiveDate::from_ymd_opt(2024, 1, 14).unwrap()),
            },
            ..Default::default()
        };
        assert_eq!(ids(&state.apply(&sample())), vec!["markets", "storm"]);
    }

    #[test]
    fn test_open_ended_date_range() {
        let from_only = FilterState {
            date_range: DateRange {
                from: Some(NaiveDate::from_ymd_opt(2024, 1, 14).unwrap()),
                to: None,
            },
            ..Default::default()
        };
        assert_eq!(ids(&from_only.apply(&sample())), vec!["climate", "markets"]);

        let to_only = FilterState {
            date_range: DateRange {
                from: None,
                to: Some(NaiveDate::from_ymd_opt(2024, 1, 11).unwrap()),
            },
            ..Default::default()
        };
        assert_eq!(ids(&to_only.apply(&sample())), vec!["crypto"]);
    }

    #[test]
    fn test_filtering_is_idempotent() {
        let state = FilterState {
            search_query: "doe".to_string(),
            content_type: Some(ArticleType::News),
            ..Default::default()
        };
        let once = state.apply(&sample());
        let twice = state.apply(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_predicate_order_does_not_matter() {
        let all = sample();
        let by_author = FilterState {
            author: Some("Jane Doe".to_string()),
            ..Default::default()
        };
        let by_type = FilterState {
            content_type: Some(ArticleType::News),
            ..Default::default()
        };
        let combined = FilterState {
            author: Some("Jane Doe".to_string()),
            content_type: Some(ArticleType::News),
            ..Default::default()
        };
        assert_eq!(by_type.apply(&by_author.apply(&all)), combined.apply(&all));
        assert_eq!(by_author.apply(&by_type.apply(&all)), combined.apply(&all));
    }

    #[test]
    fn test_to_query_appends_type_and_maps_sort() {
        let state = FilterState {
            search_query: "climate".to_string(),
            content_type: Some(ArticleType::Blog),
            section: Some("environment".to_string()),
            sort_by: SortBy::Relevancy,
            ..Default::default()
        };
        let query = state.to_query(24);
        assert_eq!(query.get("q"), Some(&Param::One("climate blog".to_string())));
        assert_eq!(query.get("order-by"), Some(&Param::One("relevance".to_string())));
        assert_eq!(query.get("section"), Some(&Param::One("environment".to_string())));
        assert_eq!(query.get("page-size"), Some(&Param::One("24".to_string())));
    }

    #[test]
    fn test_to_query_sends_to_date_only_with_from_date() {
        let to_only = FilterState {
            date_range: DateRange {
                from: None,
                to: Some(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()),
            },
            ..Default::default()
        };
        let serialized = to_only.to_query(10).serialize();
        assert!(!serialized.contains("to-date"));
        assert!(!serialized.contains("from-date"));
        assert!(!serialized.contains("q="));
        assert!(serialized.contains("order-by=newest"));

        let both = FilterState {
            date_range: DateRange {
                from: Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
                to: Some(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()),
            },
            ..Default::default()
        };
        let serialized = both.to_query(10).serialize();
        assert!(serialized.contains("from-date=2024-01-01"));
        assert!(serialized.contains("to-date=2024-01-31"));
    }

    #[test]
    fn test_trending_query_covers_last_three_days() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let query = trending_query(today);
        assert_eq!(
            query.get("q"),
            Some(&Param::One("breaking news OR viral OR trending".to_string()))
        );
        assert_eq!(query.get("page-size"), Some(&Param::One("24".to_string())));
        assert_eq!(query.get("order-by"), Some(&Param::One("newest".to_string())));
        assert_eq!(query.get("from-date"), Some(&Param::One("2024-02-28".to_string())));
        assert_eq!(query.get("to-date"), None);
    }

    #[rstest]
    #[case("all", "world")]
    #[case("", "world")]
    #[case("technology", "technology")]
    fn test_recent_query_category(#[case] category: &str, #[case] expected: &str) {
        let today = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let query = recent_query(category, today);
        assert_eq!(query.get("q"), Some(&Param::One(expected.to_string())));
        assert_eq!(query.get("page-size"), Some(&Param::One("4".to_string())));
        assert_eq!(query.get("from-date"), Some(&Param::One("2023-12-29".to_string())));
        assert_eq!(query.get("show-tags"), Some(&Param::One("contributor".to_string())));
    }

    #[rstest]
    #[case("all", None)]
    #[case("ALL", None)]
    #[case("  ", None)]
    #[case(" Jane Doe ", Some("Jane Doe"))]
    fn test_optional_choice(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(optional_choice(input).as_deref(), expected);
    }

    #[test]
    fn test_parse_sort_by() {
        assert_eq!("popularity".parse::<SortBy>().unwrap().order_by(), "newest");
        assert_eq!("relevancy".parse::<SortBy>().unwrap(), SortBy::Relevancy);
        assert!("random".parse::<SortBy>().is_err());
    }

    #[test]
    fn test_display_summarizes_active_filters() {
        let state = FilterState {
            search_query: "storm".to_string(),
            author: Some("Jane Doe".to_string()),
            ..Default::default()
        };
        assert_eq!(state.to_string(), "search \"storm\", author Jane Doe");
        assert_eq!(FilterState::default().to_string(), "no filters");
    }
}
