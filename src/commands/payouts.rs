use anyhow::ensure;

use crate::config;
use crate::kv::KvStore;
use crate::render::{self, Style};

use super::{FilterArgs, fetch, payout_sheet, require_admin};

pub(crate) fn cmd_payouts(kv: &KvStore, filters: &FilterArgs) -> anyhow::Result<()> {
    require_admin(kv)?;
    let filter = filters.to_filter()?;

    let articles = fetch(&filter.to_query(config::fetch_page_size()))?;
    let filtered = filter.apply(&articles);
    ensure!(!filtered.is_empty(), "No matching articles");

    let sheet = payout_sheet(kv, &filtered)?;
    print!(
        "{}",
        render::render_payouts(sheet.rows(), |a| sheet.is_unsaved(a), &Style::detect())
    );
    Ok(())
}
