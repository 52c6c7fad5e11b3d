//! Dashboard state.
//!
//! Every mutation goes through a method on [`Dashboard`] that ends in
//! [`Dashboard::recompute`], so the filtered list, the page window and the
//! payout sheet are always derived from the current articles, filter and rates.
//! Fetches are tagged with a [`FetchTicket`]; only the most recently issued
//! ticket may replace the article list.

use std::sync::mpsc::Sender;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::article::Article;
use crate::filter::FilterState;
use crate::kv::KvStore;
use crate::metrics::Metrics;
use crate::paging::PageWindow;
use crate::payout::{PayoutCalculation, PayoutError, PayoutSheet, RateTable};
use crate::source::SourceError;

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

pub type FetchResult = Result<Vec<Article>, SourceError>;

#[derive(Debug)]
pub struct FetchOutcome {
    pub ticket: FetchTicket,
    pub result: FetchResult,
}

/// Run `job` on a worker thread and deliver its result, tagged with `ticket`.
pub fn spawn_fetch<E, F>(ticket: FetchTicket, tx: Sender<E>, job: F) -> thread::JoinHandle<()>
where
    E: From<FetchOutcome> + Send + 'static,
    F: FnOnce() -> FetchResult + Send + 'static,
{
    thread::spawn(move || {
        let result = job();
        // The receiver is gone once the session has ended.
        let _ = tx.send(E::from(FetchOutcome { ticket, result }));
    })
}

pub struct Dashboard {
    articles: Vec<Article>,
    filter: FilterState,
    filtered: Vec<Article>,
    window: PageWindow,
    rates: RateTable,
    payouts: PayoutSheet,
    error: Option<String>,
    loading: bool,
    issued: u64,
}

impl Dashboard {
    pub fn new(rates: RateTable, window: PageWindow, payouts: PayoutSheet) -> Self {
        Self {
            articles: Vec::new(),
            filter: FilterState::default(),
            filtered: Vec::new(),
            window,
            rates,
            payouts,
            error: None,
            loading: false,
            issued: 0,
        }
    }

    fn recompute(&mut self) {
        self.filtered = self.filter.apply(&self.articles);
        self.window.reset();
        self.payouts.recompute(&self.filtered, &self.rates);
        debug!(
            total = self.articles.len(),
            filtered = self.filtered.len(),
            "recomputed dashboard"
        );
    }

    /// Supersedes every earlier ticket.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.issued += 1;
        self.loading = true;
        self.error = None;
        FetchTicket(self.issued)
    }

    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        ticket.0 == self.issued
    }

    /// Applies a fetch result; returns false when a newer fetch has been issued since.
    pub fn finish_fetch(&mut self, ticket: FetchTicket, result: FetchResult) -> bool {
        if !self.is_current(ticket) {
            info!(ticket = ticket.0, latest = self.issued, "dropping stale fetch result");
            return false;
        }
        self.loading = false;
        match result {
            Ok(articles) => {
                self.articles = articles;
                self.error = None;
            }
            Err(e) => {
                warn!(status = e.status, code = ?e.code, error = %e, "fetch failed");
                self.articles.clear();
                self.error = Some(e.message);
            }
        }
        self.recompute();
        true
    }

    pub fn set_filter(&mut self, filter: FilterState) {
        self.filter = filter;
        self.recompute();
    }

    pub fn update_filter(&mut self, change: impl FnOnce(&mut FilterState)) {
        let mut filter = self.filter.clone();
        change(&mut filter);
        self.set_filter(filter);
    }

    pub fn load_more(&mut self) -> bool {
        if !self.has_more() {
            return false;
        }
        self.window.advance();
        true
    }

    pub fn edit_rate(
        &mut self,
        author: &str,
        rate: f64,
    ) -> Result<&PayoutCalculation, PayoutError> {
        self.payouts.edit(author, rate)
    }

    pub fn discard_edits(&mut self) {
        self.payouts.discard(&self.rates);
    }

    pub fn save_rates(&mut self, kv: &KvStore) -> anyhow::Result<usize> {
        let saved = self.payouts.save(&mut self.rates, kv)?;
        self.recompute_payouts();
        Ok(saved)
    }

    fn recompute_payouts(&mut self) {
        self.payouts.recompute(&self.filtered, &self.rates);
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn filtered(&self) -> &[Article] {
        &self.filtered
    }

    pub fn displayed(&self) -> &[Article] {
        self.window.displayed(&self.filtered)
    }

    pub fn has_more(&self) -> bool {
        self.window.has_more(self.filtered.len())
    }

    pub fn page(&self) -> usize {
        self.window.page()
    }

    pub fn payouts(&self) -> &PayoutSheet {
        &self.payouts
    }

    pub fn payout_rows(&self) -> &[PayoutCalculation] {
        self.payouts.rows()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Distinct authors across every fetched article, in first-appearance order.
    pub fn authors(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for a in &self.articles {
            if !seen.contains(&a.author.as_str()) {
                seen.push(a.author.as_str());
            }
        }
        seen
    }

    pub fn sections(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for a in &self.articles {
            if !seen.contains(&a.section.as_str()) {
                seen.push(a.section.as_str());
            }
        }
        seen
    }

    pub fn metrics(&self, now: DateTime<Utc>) -> Metrics {
        Metrics::compute(&self.articles, &self.filtered, self.payouts.rows(), now)
    }
}

/// Holds back a query until its input has been quiet for the debounce window.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    pending: Option<(String, Instant)>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Replaces any query still waiting.
    pub fn push(&mut self, query: String, now: Instant) {
        self.pending = Some((query, now));
    }

    pub fn ready(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some((_, at)) if now.duration_since(*at) >= self.window => {
                self.pending.take().map(|(q, _)| q)
            }
            _ => None,
        }
    }

    pub fn time_left(&self, now: Instant) -> Option<Duration> {
        self.pending
            .as_ref()
            .map(|(_, at)| self.window.saturating_sub(now.duration_since(*at)))
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(SEARCH_DEBOUNCE)
    }
}
