use anyhow::{bail, ensure};

use crate::article::Article;
use crate::config;
use crate::paging::{DASHBOARD_PAGE_SIZE, PageWindow};
use crate::render::{self, Style};

use super::{FilterArgs, fetch};

pub(crate) fn cmd_show(group: &str, page: usize, filters: &FilterArgs) -> anyhow::Result<()> {
    let keys = match render::parse_grouping(group) {
        Some(keys) => keys,
        None => bail!("Unknown grouping: {}. Use: d, s, a, or combinations like ds", group),
    };
    let filter = filters.to_filter()?;

    let articles = fetch(&filter.to_query(config::fetch_page_size()))?;
    let filtered = filter.apply(&articles);
    ensure!(!filtered.is_empty(), "No matching articles");

    let mut window = PageWindow::new(DASHBOARD_PAGE_SIZE);
    window.go_to(page);
    let displayed = window.displayed(&filtered);

    let labels = render::index_labels(displayed);
    let refs: Vec<&Article> = displayed.iter().collect();
    print!(
        "{}",
        render::render_grouped(&refs, &keys, &labels, &Style::detect())
    );
    if window.has_more(filtered.len()) {
        println!(
            "Showing {} of {} articles. Use --page {} for more.",
            displayed.len(),
            filtered.len(),
            window.page() + 1
        );
    }
    Ok(())
}
