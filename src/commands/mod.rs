pub mod dashboard;
pub mod export;
pub mod feeds;
pub mod payouts;
pub mod rate;
pub mod search;
pub mod session;
pub mod show;

use std::time::Duration;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::article::{Article, ArticleType};
use crate::config::SourceConfig;
use crate::filter::{DateRange, FilterState, SortBy, optional_choice, parse_date};
use crate::kv::KvStore;
use crate::payout::{PayoutSheet, RateTable};
use crate::session::{Session, User};
use crate::source::{self, Query};

/// Filters shared by every command that lists articles.
#[derive(Args, Debug, Clone)]
pub(crate) struct FilterArgs {
    /// Case-insensitive text matched against title, author, description and section
    #[arg(long)]
    pub search: Option<String>,
    /// Only articles by this exact author ("all" for any)
    #[arg(long)]
    pub author: Option<String>,
    /// Only articles in this section ("all" for any)
    #[arg(long)]
    pub section: Option<String>,
    /// news, blog or all
    #[arg(long = "type")]
    pub content_type: Option<String>,
    /// Earliest publish date, YYYY-MM-DD
    #[arg(long)]
    pub from: Option<String>,
    /// Latest publish date, YYYY-MM-DD
    #[arg(long)]
    pub to: Option<String>,
    /// publishedAt, relevancy or popularity
    #[arg(long, default_value = "publishedAt")]
    pub sort: String,
}

impl Default for FilterArgs {
    fn default() -> Self {
        Self {
            search: None,
            author: None,
            section: None,
            content_type: None,
            from: None,
            to: None,
            sort: "publishedAt".to_string(),
        }
    }
}

impl FilterArgs {
    pub(crate) fn to_filter(&self) -> anyhow::Result<FilterState> {
        let content_type = match self.content_type.as_deref().and_then(optional_choice) {
            Some(t) => Some(t.parse::<ArticleType>()?),
            None => None,
        };
        Ok(FilterState {
            search_query: self.search.clone().unwrap_or_default(),
            author: self.author.as_deref().and_then(optional_choice),
            section: self.section.as_deref().and_then(optional_choice),
            content_type,
            date_range: DateRange {
                from: self.from.as_deref().map(parse_date).transpose()?,
                to: self.to.as_deref().map(parse_date).transpose()?,
            },
            sort_by: self.sort.parse::<SortBy>()?,
        })
    }
}

pub(crate) fn spinner(message: impl Into<String>) -> anyhow::Result<ProgressBar> {
    let sp = ProgressBar::new_spinner();
    sp.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    sp.enable_steady_tick(Duration::from_millis(80));
    sp.set_message(message.into());
    Ok(sp)
}

/// Fetch one page of articles from the content API behind a spinner.
pub(crate) fn fetch(query: &Query) -> anyhow::Result<Vec<Article>> {
    let client = crate::http::http_client()?;
    let config = SourceConfig::from_env();
    let sp = spinner("Loading articles...")?;
    let result = source::fetch_articles(&client, &config, query);
    sp.finish_and_clear();
    let articles = result?;
    info!(count = articles.len(), "fetched articles");
    Ok(articles)
}

pub(crate) fn require_admin(kv: &KvStore) -> anyhow::Result<User> {
    let session = Session::restore(kv.clone())?;
    Ok(session.require_admin()?.clone())
}

/// Payout rows for `articles` using the stored rate table.
pub(crate) fn payout_sheet(kv: &KvStore, articles: &[Article]) -> anyhow::Result<PayoutSheet> {
    let rates = RateTable::load(kv)?;
    let mut sheet = PayoutSheet::default();
    sheet.recompute(articles, &rates);
    Ok(sheet)
}
