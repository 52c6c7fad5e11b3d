use std::collections::HashMap;
use std::fmt::Write;
use std::io::IsTerminal;

use chrono::{DateTime, Utc};
use itertools::Itertools;
use terminal_size::{Width, terminal_size};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::article::Article;
use crate::payout::PayoutCalculation;

/// Terminal presentation settings for one command run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    pub color: bool,
    pub width: Option<usize>,
}

impl Style {
    pub fn detect() -> Self {
        let color = std::io::stdout().is_terminal();
        let width = color
            .then(terminal_size)
            .flatten()
            .map(|(Width(w), _)| w as usize);
        Self { color, width }
    }

    pub fn plain() -> Self {
        Self {
            color: false,
            width: None,
        }
    }

    fn codes(&self) -> Codes {
        if self.color {
            Codes {
                bold: "\x1b[1m",
                dim: "\x1b[2m",
                italic: "\x1b[3m",
                date: "\x1b[36m",
                warn: "\x1b[33m",
                reset: "\x1b[0m",
            }
        } else {
            Codes::default()
        }
    }
}

#[derive(Default)]
struct Codes {
    bold: &'static str,
    dim: &'static str,
    italic: &'static str,
    date: &'static str,
    warn: &'static str,
    reset: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GroupKey {
    Date,
    Section,
    Author,
}

impl GroupKey {
    fn extract(&self, item: &Article) -> String {
        match self {
            GroupKey::Date => format_date(item),
            GroupKey::Section => item.section.clone(),
            GroupKey::Author => item.author.clone(),
        }
    }

    fn compare(&self, a: &Article, b: &Article) -> std::cmp::Ordering {
        match self {
            GroupKey::Date => format_date(b).cmp(&format_date(a)),
            _ => self.extract(a).cmp(&self.extract(b)),
        }
    }
}

pub fn parse_grouping(arg: &str) -> Option<Vec<GroupKey>> {
    arg.chars()
        .map(|c| match c {
            'd' => Some(GroupKey::Date),
            's' => Some(GroupKey::Section),
            'a' => Some(GroupKey::Author),
            _ => None,
        })
        .collect()
}

pub fn format_date(item: &Article) -> String {
    item.published_at.format("%Y-%m-%d").to_string()
}

fn plural(n: i64, unit: &str) -> String {
    format!("{n} {unit}{} ago", if n == 1 { "" } else { "s" })
}

/// "Just now", "5 minutes ago", ... and a calendar date after a week.
pub fn relative_time(published: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now - published;
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        plural(minutes, "minute")
    } else if hours < 24 {
        plural(hours, "hour")
    } else if days < 7 {
        plural(days, "day")
    } else {
        published.format("%b %-d, %Y").to_string()
    }
}

/// Cut `text` to at most `width` display columns, marking the cut with an ellipsis.
pub fn fit(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > width - 1 {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{text}{}", " ".repeat(fill))
}

fn pad_left(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{}{text}", " ".repeat(fill))
}

fn format_item(item: &Article, grouped_keys: &[GroupKey], label: &str, style: &Style) -> String {
    let c = style.codes();
    let date = (!grouped_keys.contains(&GroupKey::Date)).then(|| format_date(item));
    let mut meta = Vec::new();
    if !grouped_keys.contains(&GroupKey::Author) {
        meta.push(item.author.as_str());
    }
    if !grouped_keys.contains(&GroupKey::Section) {
        meta.push(item.section.as_str());
    }
    let meta = (!meta.is_empty()).then(|| format!("({})", meta.join(" · ")));

    let title = match style.width {
        Some(width) => {
            let used = date.as_ref().map_or(0, |d| d.width() + 2)
                + if label.is_empty() { 0 } else { label.width() + 1 }
                + meta.as_ref().map_or(0, |m| m.width() + 1);
            fit(&item.title, width.saturating_sub(used).max(20))
        }
        None => item.title.clone(),
    };

    let mut out = String::new();
    if let Some(date) = date {
        write!(out, "{}{date}{}  ", c.date, c.reset).unwrap();
    }
    if !label.is_empty() {
        write!(out, "{}{label}{} ", c.bold, c.reset).unwrap();
    }
    out.push_str(&title);
    if let Some(meta) = meta {
        write!(out, " {}{}{meta}{}", c.dim, c.italic, c.reset).unwrap();
    }
    out
}

/// Render articles grouped by `keys`, nesting groups in the given order.
/// `labels` maps article ids to the handle printed before each title.
pub fn render_grouped(
    items: &[&Article],
    keys: &[GroupKey],
    labels: &HashMap<String, String>,
    style: &Style,
) -> String {
    fn recurse(
        out: &mut String,
        items: &[&Article],
        remaining: &[GroupKey],
        all_keys: &[GroupKey],
        labels: &HashMap<String, String>,
        style: &Style,
    ) {
        let depth = all_keys.len() - remaining.len();
        let indent = "  ".repeat(depth);

        if remaining.is_empty() {
            for item in items {
                let label = labels.get(&item.id).map(|s| s.as_str()).unwrap_or("");
                writeln!(out, "{indent}{}", format_item(item, all_keys, label, style)).unwrap();
            }
            return;
        }

        let key = remaining[0];
        let rest = &remaining[1..];

        let mut sorted = items.to_vec();
        sorted.sort_by(|a, b| key.compare(a, b));

        let c = style.codes();
        let (prefix, suffix) = if depth == 0 {
            ("=== ", " ===")
        } else {
            ("--- ", " ---")
        };

        for (group_val, group) in &sorted.iter().chunk_by(|item| key.extract(item)) {
            let group_items: Vec<&Article> = group.copied().collect();
            writeln!(out, "{indent}{}{prefix}{group_val}{suffix}{}", c.bold, c.reset).unwrap();
            if depth == 0 {
                writeln!(out).unwrap();
            }
            recurse(out, &group_items, rest, all_keys, labels, style);
            if depth == 0 {
                writeln!(out).unwrap();
                writeln!(out).unwrap();
            } else {
                writeln!(out).unwrap();
            }
        }
    }

    let mut out = String::new();
    recurse(&mut out, items, keys, keys, labels, style);
    out
}

/// 1-based handles for a list of articles, keyed by article id.
pub fn index_labels(items: &[Article]) -> HashMap<String, String> {
    items
        .iter()
        .enumerate()
        .map(|(i, a)| (a.id.clone(), format!("{}.", i + 1)))
        .collect()
}

/// Card-style listing used by the dashboard, numbered from `start + 1`.
pub fn render_cards(items: &[Article], start: usize, now: DateTime<Utc>, style: &Style) -> String {
    let c = style.codes();
    let mut out = String::new();
    for (i, a) in items.iter().enumerate() {
        let title = match style.width {
            Some(width) => fit(&a.title, width.saturating_sub(6).max(20)),
            None => a.title.clone(),
        };
        writeln!(out, "{}{:>3}.{} {title}", c.bold, start + i + 1, c.reset).unwrap();
        writeln!(
            out,
            "     {}{} · {} · {} · {}{}",
            c.dim,
            a.author,
            a.section,
            a.kind,
            relative_time(a.published_at, now),
            c.reset
        )
        .unwrap();
    }
    out
}

/// Aligned payout table with a total row; unsaved rows are flagged with `*`.
pub fn render_payouts(
    rows: &[PayoutCalculation],
    unsaved: impl Fn(&str) -> bool,
    style: &Style,
) -> String {
    let c = style.codes();
    let headers = ["Author", "Articles", "Rate", "Total"];
    let cells: Vec<[String; 4]> = rows
        .iter()
        .map(|p| {
            let mark = if unsaved(&p.author) { "*" } else { "" };
            [
                p.author.clone(),
                p.article_count.to_string(),
                format!("${:.2}{mark}", p.rate),
                format!("${:.2}", p.total_payout),
            ]
        })
        .collect();
    let total = format!("${:.2}", crate::payout::total(rows));

    let mut widths = headers.map(|h| h.width());
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.width());
        }
    }
    widths[3] = widths[3].max(total.width());

    let mut out = String::new();
    writeln!(
        out,
        "{}{}  {}  {}  {}{}",
        c.bold,
        pad(headers[0], widths[0]),
        pad_left(headers[1], widths[1]),
        pad_left(headers[2], widths[2]),
        pad_left(headers[3], widths[3]),
        c.reset
    )
    .unwrap();
    for row in &cells {
        writeln!(
            out,
            "{}  {}  {}  {}",
            pad(&row[0], widths[0]),
            pad_left(&row[1], widths[1]),
            pad_left(&row[2], widths[2]),
            pad_left(&row[3], widths[3]),
        )
        .unwrap();
    }
    let rule_width = widths.iter().sum::<usize>() + 6;
    writeln!(out, "{}", "-".repeat(rule_width)).unwrap();
    writeln!(
        out,
        "{}{}{}",
        c.bold,
        pad_left(&format!("Total Payout  {total}"), rule_width),
        c.reset
    )
    .unwrap();
    if rows.iter().any(|p| unsaved(&p.author)) {
        writeln!(out, "{}* unsaved rate{}", c.warn, c.reset).unwrap();
    }
    out
}
