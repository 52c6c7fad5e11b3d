use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::article::Article;
use crate::metrics::Metrics;
use crate::payout::{self, PayoutCalculation};

pub const PAYOUTS_CSV_FILE: &str = "payout-report.csv";
pub const ARTICLES_CSV_FILE: &str = "articles-report.csv";
pub const PAYOUT_TEXT_FILE: &str = "payout-report.txt";
pub const JSON_FILE: &str = "news-export.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    PayoutsCsv,
    ArticlesCsv,
    PayoutReport,
    Json,
}

impl ExportFormat {
    pub fn file_name(&self) -> &'static str {
        match self {
            ExportFormat::PayoutsCsv => PAYOUTS_CSV_FILE,
            ExportFormat::ArticlesCsv => ARTICLES_CSV_FILE,
            ExportFormat::PayoutReport => PAYOUT_TEXT_FILE,
            ExportFormat::Json => JSON_FILE,
        }
    }

    pub fn needs_payouts(&self) -> bool {
        !matches!(self, ExportFormat::ArticlesCsv)
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payouts" | "payouts-csv" => Ok(ExportFormat::PayoutsCsv),
            "articles" | "articles-csv" => Ok(ExportFormat::ArticlesCsv),
            "report" | "text" => Ok(ExportFormat::PayoutReport),
            "json" => Ok(ExportFormat::Json),
            other => anyhow::bail!(
                "Unknown export format: {}. Use: payouts, articles, report, json",
                other
            ),
        }
    }
}

pub fn payouts_csv(payouts: &[PayoutCalculation]) -> String {
    let header = "Author,Article Count,Rate per Article,Total Payout".to_string();
    std::iter::once(header)
        .chain(payouts.iter().map(|p| {
            format!(
                "{},{},{},{}",
                csv_cell(&p.author),
                p.article_count,
                p.rate,
                p.total_payout
            )
        }))
        .collect::<Vec<_>>()
        .join("\n")
}

fn quote(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

/// Quoted only when the cell would otherwise break the row.
fn csv_cell(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        quote(cell)
    } else {
        cell.to_string()
    }
}

pub fn articles_csv(articles: &[Article]) -> String {
    let header = ["Title", "Author", "Type", "Published Date", "Source"];
    std::iter::once(header.iter().map(|h| quote(h)).collect::<Vec<_>>().join(","))
        .chain(articles.iter().map(|a| {
            [
                a.title.clone(),
                a.author.clone(),
                a.kind.to_string(),
                a.published_at
                    .with_timezone(&Local)
                    .format("%-m/%-d/%Y")
                    .to_string(),
                a.section.clone(),
            ]
            .iter()
            .map(|cell| quote(cell))
            .collect::<Vec<_>>()
            .join(",")
        }))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn payout_report(payouts: &[PayoutCalculation], generated: NaiveDate) -> String {
    let mut out = String::new();
    writeln!(out, "Payout Report").unwrap();
    writeln!(out, "Generated: {}", generated.format("%-m/%-d/%Y")).unwrap();
    writeln!(out).unwrap();
    for p in payouts {
        writeln!(out, "Author: {}", p.author).unwrap();
        writeln!(out, "  Articles: {}", p.article_count).unwrap();
        writeln!(out, "  Rate: ${:.2}", p.rate).unwrap();
        writeln!(out, "  Total: ${:.2}", p.total_payout).unwrap();
        writeln!(out).unwrap();
    }
    writeln!(out, "Total Payout: ${:.2}", payout::total(payouts)).unwrap();
    out
}

#[derive(Serialize)]
struct JsonExport<'a> {
    articles: &'a [Article],
    payouts: &'a [PayoutCalculation],
    metrics: &'a Metrics,
}

pub fn json_export(
    articles: &[Article],
    payouts: &[PayoutCalculation],
    metrics: &Metrics,
) -> anyhow::Result<String> {
    let export = JsonExport {
        articles,
        payouts,
        metrics,
    };
    Ok(serde_json::to_string_pretty(&export)?)
}

pub fn render(
    format: ExportFormat,
    articles: &[Article],
    payouts: &[PayoutCalculation],
    metrics: &Metrics,
    generated: NaiveDate,
) -> anyhow::Result<String> {
    Ok(match format {
        ExportFormat::PayoutsCsv => payouts_csv(payouts),
        ExportFormat::ArticlesCsv => articles_csv(articles),
        ExportFormat::PayoutReport => payout_report(payouts, generated),
        ExportFormat::Json => json_export(articles, payouts, metrics)?,
    })
}

/// Writes `contents` to the format's fixed file name inside `dir`.
pub fn write(dir: &Path, format: ExportFormat, contents: &str) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(format.file_name());
    fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::ArticleType;
    use chrono::{DateTime, Utc};
    use tempfile::TempDir;

    fn payout(author: &str, count: usize, rate: f64) -> PayoutCalculation {
        PayoutCalculation {
            author: author.to_string(),
            article_count: count,
            rate,
            total_payout: count as f64 * rate,
        }
    }

    fn article(title: &str, author: &str) -> Article {
        Article {
            id: title.to_string(),
            title: title.to_string(),
            author: author.to_string(),
            published_at: DateTime::parse_from_rfc3339("2024-01-05T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            description: String::new(),
            url: String::new(),
            thumbnail: None,
            section: "Technology".to_string(),
            pillar: None,
            kind: ArticleType::News,
        }
    }

    #[test]
    fn test_payouts_csv() {
        let csv = payouts_csv(&[payout("A", 2, 10.0), payout("B", 1, 12.5)]);
        assert_eq!(
            csv,
            "Author,Article Count,Rate per Article,Total Payout\nA,2,10,20\nB,1,12.5,12.5"
        );
    }

    #[test]
    fn test_payouts_csv_quotes_authors_with_commas() {
        let csv = payouts_csv(&[
            payout("Patrick Wintour, diplomatic editor", 2, 50.0),
            payout("Jane \"JD\" Doe", 1, 10.0),
            payout("Plain Name", 1, 5.0),
        ]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[1], "\"Patrick Wintour, diplomatic editor\",2,50,100");
        assert_eq!(lines[2], "\"Jane \"\"JD\"\" Doe\",1,10,10");
        assert_eq!(lines[3], "Plain Name,1,5,5");
    }

    #[test]
    fn test_csv_row_counts_include_header() {
        let payouts = vec![payout("A", 2, 10.0), payout("B", 1, 5.0), payout("C", 4, 1.0)];
        assert_eq!(payouts_csv(&payouts).lines().count(), payouts.len() + 1);
        assert_eq!(payouts_csv(&[]).lines().count(), 1);

        let articles = vec![article("One", "A"), article("Two", "B")];
        assert_eq!(articles_csv(&articles).lines().count(), articles.len() + 1);
    }

    #[test]
    fn test_articles_csv_quotes_every_field() {
        let item = article("Say \"hi\", world", "Jane Doe");
        let local_date = item
            .published_at
            .with_timezone(&Local)
            .format("%-m/%-d/%Y")
            .to_string();
        let csv = articles_csv(&[item]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            r#""Title","Author","Type","Published Date","Source""#
        );
        assert_eq!(
            lines[1],
            format!(r#""Say ""hi"", world","Jane Doe","news","{local_date}","Technology""#)
        );
    }

    #[test]
    fn test_payout_report() {
        let report = payout_report(
            &[payout("A", 2, 10.0), payout("B", 1, 5.5)],
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        );
        assert_eq!(
            report,
            "\
Payout Report
Generated: 1/15/2024

Author: A
  Articles: 2
  Rate: $10.00
  Total: $20.00

Author: B
  Articles: 1
  Rate: $5.50
  Total: $5.50

Total Payout: $25.50
"
        );
    }

    #[test]
    fn test_json_export_shape() {
        let articles = vec![article("One", "A")];
        let payouts = vec![payout("A", 1, 50.0)];
        let metrics = Metrics::compute(&articles, &articles, &payouts, Utc::now());

        let raw = json_export(&articles, &payouts, &metrics).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(value["articles"][0]["title"], "One");
        assert_eq!(value["payouts"][0]["totalPayout"], 50.0);
        assert_eq!(value["metrics"]["totalArticles"], 1);
    }

    #[test]
    fn test_write_uses_fixed_file_names() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), ExportFormat::PayoutsCsv, "x").unwrap();
        assert_eq!(path, dir.path().join("payout-report.csv"));
        assert_eq!(fs::read_to_string(path).unwrap(), "x");
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("payouts".parse::<ExportFormat>().unwrap(), ExportFormat::PayoutsCsv);
        assert_eq!("text".parse::<ExportFormat>().unwrap(), ExportFormat::PayoutReport);
        assert!("pdf".parse::<ExportFormat>().is_err());
        assert!(!ExportFormat::ArticlesCsv.needs_payouts());
    }
}
