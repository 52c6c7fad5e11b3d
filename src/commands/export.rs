use std::path::Path;

use anyhow::ensure;
use chrono::{Local, Utc};

use crate::config;
use crate::export::{self, ExportFormat};
use crate::kv::KvStore;
use crate::metrics::Metrics;

use super::{FilterArgs, fetch, payout_sheet, require_admin};

pub(crate) fn cmd_export(
    kv: &KvStore,
    format: ExportFormat,
    out_dir: &Path,
    filters: &FilterArgs,
) -> anyhow::Result<()> {
    if format.needs_payouts() {
        require_admin(kv)?;
    }
    let filter = filters.to_filter()?;

    let articles = fetch(&filter.to_query(config::fetch_page_size()))?;
    let filtered = filter.apply(&articles);
    ensure!(!filtered.is_empty(), "No matching articles");

    let sheet = payout_sheet(kv, &filtered)?;
    let metrics = Metrics::compute(&articles, &filtered, sheet.rows(), Utc::now());
    let contents = export::render(
        format,
        &filtered,
        sheet.rows(),
        &metrics,
        Local::now().date_naive(),
    )?;
    let path = export::write(out_dir, format, &contents)?;
    println!("Exported to {}", path.display());
    Ok(())
}
