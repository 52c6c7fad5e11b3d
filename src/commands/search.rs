use anyhow::{bail, ensure};

use crate::article::Article;
use crate::filter::FilterState;
use crate::render::{self, Style};

use super::fetch;

pub(crate) const SEARCH_PAGE_SIZE: usize = 20;

/// Full-text search on the content API; results are not filtered locally.
pub(crate) fn cmd_search(query: &str, group: &str, limit: usize) -> anyhow::Result<()> {
    let keys = match render::parse_grouping(group) {
        Some(keys) => keys,
        None => bail!("Unknown grouping: {}. Use: d, s, a, or combinations like ds", group),
    };
    ensure!(!query.trim().is_empty(), "Search query must not be empty");

    let filter = FilterState {
        search_query: query.to_string(),
        ..FilterState::default()
    };
    let articles = fetch(&filter.to_query(limit.max(1)))?;
    ensure!(!articles.is_empty(), "No articles found for \"{}\"", query.trim());

    let labels = render::index_labels(&articles);
    let refs: Vec<&Article> = articles.iter().collect();
    print!(
        "{}",
        render::render_grouped(&refs, &keys, &labels, &Style::detect())
    );
    Ok(())
}
