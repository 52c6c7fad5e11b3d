use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::article::Article;
use crate::kv::KvStore;

pub const RATES_KEY: &str = "payout-rates";
pub const DEFAULT_RATE: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PayoutError {
    #[error("Invalid rate: {0}. Rates must be a non-negative number")]
    InvalidRate(f64),
    #[error("No payout row for author: {0}")]
    UnknownAuthor(String),
}

pub fn validate_rate(rate: f64) -> Result<f64, PayoutError> {
    if rate.is_finite() && rate >= 0.0 {
        Ok(rate)
    } else {
        Err(PayoutError::InvalidRate(rate))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutRate {
    pub author: String,
    pub rate_per_article: f64,
}

/// Per-author rates, keyed by the exact author string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    rates: Vec<PayoutRate>,
}

impl RateTable {
    pub fn new(rates: Vec<PayoutRate>) -> Self {
        Self { rates }
    }

    pub fn load(kv: &KvStore) -> anyhow::Result<Self> {
        Ok(Self::new(kv.get(RATES_KEY)?.unwrap_or_default()))
    }

    pub fn save(&self, kv: &KvStore) -> anyhow::Result<()> {
        kv.set(RATES_KEY, &self.rates)
    }

    pub fn get(&self, author: &str) -> Option<f64> {
        self.rates
            .iter()
            .find(|r| r.author == author)
            .map(|r| r.rate_per_article)
    }

    /// Overwrites the entry for `author`, or appends one.
    pub fn set(&mut self, author: &str, rate: f64) {
        match self.rates.iter_mut().find(|r| r.author == author) {
            Some(existing) => existing.rate_per_article = rate,
            None => self.rates.push(PayoutRate {
                author: author.to_string(),
                rate_per_article: rate,
            }),
        }
    }

    pub fn rates(&self) -> &[PayoutRate] {
        &self.rates
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutCalculation {
    pub author: String,
    pub article_count: usize,
    pub rate: f64,
    pub total_payout: f64,
}

impl PayoutCalculation {
    fn new(author: String, article_count: usize, rate: f64) -> Self {
        Self {
            author,
            article_count,
            rate,
            total_payout: article_count as f64 * rate,
        }
    }

    fn set_rate(&mut self, rate: f64) {
        self.rate = rate;
        self.total_payout = self.article_count as f64 * rate;
    }
}

/// Article counts per author, in order of first appearance.
pub fn count_by_author(articles: &[Article]) -> Vec<(String, usize)> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();
    for article in articles {
        match positions.get(article.author.as_str()) {
            Some(&pos) => counts[pos].1 += 1,
            None => {
                positions.insert(&article.author, counts.len());
                counts.push((article.author.clone(), 1));
            }
        }
    }
    counts
}

pub fn calculate(
    articles: &[Article],
    rates: &RateTable,
    default_rate: f64,
) -> Vec<PayoutCalculation> {
    count_by_author(articles)
        .into_iter()
        .map(|(author, count)| {
            let rate = rates.get(&author).unwrap_or(default_rate);
            PayoutCalculation::new(author, count, rate)
        })
        .collect()
}

pub fn total(payouts: &[PayoutCalculation]) -> f64 {
    payouts.iter().map(|p| p.total_payout).sum()
}

/// Live payout rows plus rate edits that have not been saved yet.
///
/// Unsaved edits survive recomputation, so changing filters keeps the rate
/// the user typed until it is saved or discarded.
#[derive(Debug, Clone)]
pub struct PayoutSheet {
    rows: Vec<PayoutCalculation>,
    pending: HashMap<String, f64>,
    default_rate: f64,
}

impl Default for PayoutSheet {
    fn default() -> Self {
        Self::new(DEFAULT_RATE)
    }
}

impl PayoutSheet {
    pub fn new(default_rate: f64) -> Self {
        Self {
            rows: Vec::new(),
            pending: HashMap::new(),
            default_rate,
        }
    }

    pub fn recompute(&mut self, articles: &[Article], rates: &RateTable) {
        self.rows = calculate(articles, rates, self.default_rate);
        for row in &mut self.rows {
            if let Some(&rate) = self.pending.get(&row.author) {
                row.set_rate(rate);
            }
        }
    }

    pub fn edit(&mut self, author: &str, rate: f64) -> Result<&PayoutCalculation, PayoutError> {
        let rate = validate_rate(rate)?;
        let row = self
            .rows
            .iter_mut()
            .find(|r| r.author == author)
            .ok_or_else(|| PayoutError::UnknownAuthor(author.to_string()))?;
        row.set_rate(rate);
        self.pending.insert(author.to_string(), rate);
        Ok(row)
    }

    pub fn discard(&mut self, rates: &RateTable) {
        self.pending.clear();
        for row in &mut self.rows {
            row.set_rate(rates.get(&row.author).unwrap_or(self.default_rate));
        }
    }

    /// Writes unsaved edits into `rates` and persists the table.
    pub fn save(&mut self, rates: &mut RateTable, kv: &KvStore) -> anyhow::Result<usize> {
        let mut edited: Vec<(&String, &f64)> = self.pending.iter().collect();
        edited.sort_by(|a, b| a.0.cmp(b.0));
        for (author, rate) in &edited {
            rates.set(author, **rate);
        }
        rates.save(kv)?;
        let saved = self.pending.len();
        self.pending.clear();
        info!(saved, "saved payout rates");
        Ok(saved)
    }

    pub fn rows(&self) -> &[PayoutCalculation] {
        &self.rows
    }

    pub fn has_unsaved(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn is_unsaved(&self, author: &str) -> bool {
        self.pending.contains_key(author)
    }

    pub fn total(&self) -> f64 {
        total(&self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::ArticleType;
    use chrono::Utc;
    use rstest::rstest;
    use tempfile::TempDir;

    fn by(author: &str) -> Article {
        Article {
            id: format!("id-{author}"),
            title: "Title".to_string(),
            author: author.to_string(),
            published_at: Utc::now(),
            description: String::new(),
            url: String::new(),
            thumbnail: None,
            section: "News".to_string(),
            pillar: None,
            kind: ArticleType::News,
        }
    }

    fn articles(authors: &[&str]) -> Vec<Article> {
        authors.iter().map(|a| by(a)).collect()
    }

    fn assert_invariant(rows: &[PayoutCalculation]) {
        for row in rows {
            assert_eq!(row.total_payout, row.article_count as f64 * row.rate);
        }
    }

    #[test]
    fn test_groups_by_author_with_table_rates() {
        let rates = RateTable::new(vec![
            PayoutRate {
                author: "A".to_string(),
                rate_per_article: 10.0,
            },
            PayoutRate {
                author: "B".to_string(),
                rate_per_article: 5.0,
            },
        ]);

        let payouts = calculate(&articles(&["A", "A", "B"]), &rates, DEFAULT_RATE);

        assert_eq!(
            payouts,
            vec![
                PayoutCalculation {
                    author: "A".to_string(),
                    article_count: 2,
                    rate: 10.0,
                    total_payout: 20.0,
                },
                PayoutCalculation {
                    author: "B".to_string(),
                    article_count: 1,
                    rate: 5.0,
                    total_payout: 5.0,
                },
            ]
        );
    }

    #[test]
    fn test_unseen_author_gets_default_rate() {
        let payouts = calculate(&articles(&["C", "C", "C"]), &RateTable::default(), DEFAULT_RATE);
        assert_eq!(payouts[0].rate, DEFAULT_RATE);
        assert_eq!(payouts[0].total_payout, 150.0);
    }

    #[test]
    fn test_name_variants_are_counted_separately() {
        let payouts = calculate(
            &articles(&["Jane Doe", "jane doe", "Jane Doe "]),
            &RateTable::default(),
            DEFAULT_RATE,
        );
        assert_eq!(payouts.len(), 3);
        assert!(payouts.iter().all(|p| p.article_count == 1));
    }

    #[test]
    fn test_first_appearance_order() {
        let counts = count_by_author(&articles(&["B", "A", "B", "C", "A"]));
        assert_eq!(
            counts,
            vec![
                ("B".to_string(), 2),
                ("A".to_string(), 2),
                ("C".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_rate_table_set_overwrites_in_place() {
        let mut rates = RateTable::default();
        rates.set("A", 10.0);
        rates.set("B", 20.0);
        rates.set("A", 15.0);
        assert_eq!(rates.rates().len(), 2);
        assert_eq!(rates.rates()[0].author, "A");
        assert_eq!(rates.get("A"), Some(15.0));
    }

    #[test]
    fn test_rate_table_persists_with_camel_case_fields() {
        let dir = TempDir::new().unwrap();
        let kv = KvStore::open(dir.path());
        let mut rates = RateTable::default();
        rates.set("A", 12.5);
        rates.save(&kv).unwrap();

        let raw = std::fs::read_to_string(dir.path().join("kv").join("payout-rates.json")).unwrap();
        assert_eq!(raw, r#"[{"author":"A","ratePerArticle":12.5}]"#);
        assert_eq!(RateTable::load(&kv).unwrap(), rates);
    }

    #[test]
    fn test_corrupted_rate_table_loads_empty() {
        let dir = TempDir::new().unwrap();
        let kv_dir = dir.path().join("kv");
        std::fs::create_dir_all(&kv_dir).unwrap();
        std::fs::write(kv_dir.join("payout-rates.json"), "[{").unwrap();

        let kv = KvStore::open(dir.path());
        assert!(RateTable::load(&kv).unwrap().is_empty());
    }

    #[test]
    fn test_edit_applies_immediately_without_persisting() {
        let dir = TempDir::new().unwrap();
        let kv = KvStore::open(dir.path());
        let rates = RateTable::default();
        let mut sheet = PayoutSheet::default();
        sheet.recompute(&articles(&["A", "A", "B"]), &rates);

        let row = sheet.edit("A", 7.5).unwrap();
        assert_eq!(row.total_payout, 15.0);
        assert!(sheet.is_unsaved("A"));
        assert_eq!(sheet.total(), 15.0 + DEFAULT_RATE);
        assert!(!kv.contains(RATES_KEY));
        assert_invariant(sheet.rows());
    }

    #[test]
    fn test_unsaved_edit_survives_recompute() {
        let rates = RateTable::default();
        let mut sheet = PayoutSheet::default();
        sheet.recompute(&articles(&["A", "B"]), &rates);
        sheet.edit("A", 3.0).unwrap();

        sheet.recompute(&articles(&["A", "A", "A"]), &rates);

        assert_eq!(sheet.rows()[0].rate, 3.0);
        assert_eq!(sheet.rows()[0].total_payout, 9.0);
    }

    #[test]
    fn test_save_overwrites_table_and_storage() {
        let dir = TempDir::new().unwrap();
        let kv = KvStore::open(dir.path());
        let mut rates = RateTable::new(vec![PayoutRate {
            author: "A".to_string(),
            rate_per_article: 10.0,
        }]);
        let mut sheet = PayoutSheet::default();
        let list = articles(&["A", "A", "B"]);
        sheet.recompute(&list, &rates);
        sheet.edit("A", 30.0).unwrap();
        sheet.edit("B", 4.0).unwrap();

        let saved = sheet.save(&mut rates, &kv).unwrap();

        assert_eq!(saved, 2);
        assert!(!sheet.has_unsaved());
        assert_eq!(rates.get("A"), Some(30.0));
        assert_eq!(RateTable::load(&kv).unwrap().get("B"), Some(4.0));

        sheet.recompute(&list, &rates);
        assert_eq!(sheet.rows()[0].total_payout, 60.0);
        assert_eq!(sheet.rows()[1].total_payout, 4.0);
        assert_invariant(sheet.rows());
    }

    #[test]
    fn test_discard_restores_table_rates() {
        let mut rates = RateTable::default();
        rates.set("A", 10.0);
        let mut sheet = PayoutSheet::default();
        sheet.recompute(&articles(&["A"]), &rates);
        sheet.edit("A", 99.0).unwrap();

        sheet.discard(&rates);

        assert_eq!(sheet.rows()[0].rate, 10.0);
        assert!(!sheet.has_unsaved());
    }

    #[rstest]
    #[case(-1.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn test_edit_rejects_invalid_rates(#[case] rate: f64) {
        let mut sheet = PayoutSheet::default();
        sheet.recompute(&articles(&["A"]), &RateTable::default());
        assert!(matches!(sheet.edit("A", rate), Err(PayoutError::InvalidRate(_))));
        assert_eq!(sheet.rows()[0].rate, DEFAULT_RATE);
    }

    #[test]
    fn test_edit_unknown_author() {
        let mut sheet = PayoutSheet::default();
        sheet.recompute(&articles(&["A"]), &RateTable::default());
        assert_eq!(
            sheet.edit("Z", 1.0).unwrap_err(),
            PayoutError::UnknownAuthor("Z".to_string())
        );
    }

    #[test]
    fn test_invariant_holds_across_edit_save_cycles() {
        let dir = TempDir::new().unwrap();
        let kv = KvStore::open(dir.path());
        let mut rates = RateTable::default();
        let mut sheet = PayoutSheet::default();
        let list = articles(&["A", "B", "A", "C", "A", "B"]);
        sheet.recompute(&list, &rates);

        for (author, rate) in [("A", 12.0), ("B", 0.0), ("C", 7.25), ("A", 3.5)] {
            sheet.edit(author, rate).unwrap();
            assert_invariant(sheet.rows());
            sheet.save(&mut rates, &kv).unwrap();
            sheet.recompute(&list, &rates);
            assert_invariant(sheet.rows());
        }
        assert_eq!(sheet.total(), 3.5 * 3.0 + 0.0 + 7.25);
    }
}
