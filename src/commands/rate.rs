use crate::kv::KvStore;
use crate::payout::{DEFAULT_RATE, RateTable, validate_rate};

use super::require_admin;

pub(crate) fn cmd_rate_set(kv: &KvStore, author: &str, rate: f64) -> anyhow::Result<()> {
    require_admin(kv)?;
    let rate = validate_rate(rate)?;
    let author = author.trim();
    anyhow::ensure!(!author.is_empty(), "Author must not be empty");

    let mut rates = RateTable::load(kv)?;
    rates.set(author, rate);
    rates.save(kv)?;
    println!("Rate for {author} set to ${rate:.2} per article");
    Ok(())
}

pub(crate) fn cmd_rate_ls(kv: &KvStore) -> anyhow::Result<()> {
    require_admin(kv)?;
    let rates = RateTable::load(kv)?;
    if rates.is_empty() {
        println!("No custom rates. Every author is paid ${DEFAULT_RATE:.2} per article.");
        return Ok(());
    }
    for r in rates.rates() {
        println!("{}  ${:.2}", r.author, r.rate_per_article);
    }
    Ok(())
}
