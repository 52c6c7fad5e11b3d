use anyhow::bail;
use chrono::Utc;

use crate::article::Article;
use crate::filter;
use crate::render::{self, Style};

use super::fetch;

/// Breaking stories from the last three days.
pub(crate) fn cmd_trending(group: &str) -> anyhow::Result<()> {
    let keys = parse_keys(group)?;
    let articles = fetch(&filter::trending_query(Utc::now().date_naive()))?;
    print_feed(&articles, &keys, "No trending articles right now");
    Ok(())
}

/// The latest few articles for a category over the last week.
pub(crate) fn cmd_recent(category: &str, group: &str) -> anyhow::Result<()> {
    let keys = parse_keys(group)?;
    let articles = fetch(&filter::recent_query(category, Utc::now().date_naive()))?;
    print_feed(&articles, &keys, "No recent articles");
    Ok(())
}

fn parse_keys(group: &str) -> anyhow::Result<Vec<render::GroupKey>> {
    match render::parse_grouping(group) {
        Some(keys) => Ok(keys),
        None => bail!("Unknown grouping: {}. Use: d, s, a, or combinations like ds", group),
    }
}

fn print_feed(articles: &[Article], keys: &[render::GroupKey], empty: &str) {
    if articles.is_empty() {
        println!("{empty}");
        return;
    }
    let labels = render::index_labels(articles);
    let refs: Vec<&Article> = articles.iter().collect();
    print!(
        "{}",
        render::render_grouped(&refs, keys, &labels, &Style::detect())
    );
}
