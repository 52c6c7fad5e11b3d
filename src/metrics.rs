use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::article::Article;
use crate::payout::{self, PayoutCalculation};

/// Articles per author or per content type, in first-appearance order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Count {
    pub name: String,
    pub count: usize,
}

fn tally<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<Count> {
    let mut counts: Vec<Count> = Vec::new();
    for key in keys {
        match counts.iter_mut().find(|c| c.name == key) {
            Some(c) => c.count += 1,
            None => counts.push(Count {
                name: key.to_string(),
                count: 1,
            }),
        }
    }
    counts
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub total_articles: usize,
    pub filtered_out: usize,
    pub today_articles: usize,
    pub week_articles: usize,
    pub unique_authors: usize,
    pub unique_sections: usize,
    pub total_payout: f64,
    pub avg_payout_per_article: f64,
    pub by_author: Vec<Count>,
    pub by_type: Vec<Count>,
}

impl Metrics {
    /// Unique author and section counts cover every fetched article; the rest covers the filtered set.
    pub fn compute(
        all: &[Article],
        filtered: &[Article],
        payouts: &[PayoutCalculation],
        now: DateTime<Utc>,
    ) -> Self {
        let today = now.date_naive();
        let week_ago = now - Duration::days(7);
        let total_payout = payout::total(payouts);

        Self {
            total_articles: filtered.len(),
            filtered_out: all.len().saturating_sub(filtered.len()),
            today_articles: filtered
                .iter()
                .filter(|a| a.published_at.date_naive() == today)
                .count(),
            week_articles: filtered.iter().filter(|a| a.published_at >= week_ago).count(),
            unique_authors: all.iter().map(|a| &a.author).collect::<HashSet<_>>().len(),
            unique_sections: all.iter().map(|a| &a.section).collect::<HashSet<_>>().len(),
            total_payout,
            avg_payout_per_article: if filtered.is_empty() {
                0.0
            } else {
                total_payout / filtered.len() as f64
            },
            by_author: tally(filtered.iter().map(|a| a.author.as_str())),
            by_type: tally(filtered.iter().map(|a| a.kind.as_str())),
        }
    }
}
