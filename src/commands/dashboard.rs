use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Instant;

use anyhow::{Context, bail};
use chrono::{Local, Utc};
use tracing::{debug, info};

use crate::article::ArticleType;
use crate::config::{self, SourceConfig};
use crate::dashboard::{Dashboard, Debouncer, FetchOutcome, spawn_fetch};
use crate::export::{self, ExportFormat};
use crate::filter::{FilterState, SortBy, optional_choice, parse_date};
use crate::kv::KvStore;
use crate::paging::{DASHBOARD_PAGE_SIZE, LOAD_MORE_DELAY, PageWindow};
use crate::payout::{PayoutSheet, RateTable};
use crate::render::{self, Style};
use crate::source::{self, Query};

use super::{require_admin, spinner};

const HELP: &str = "\
Commands:
  list                    show the loaded articles
  more                    load the next page
  open <n>                open article n in the browser
  search <text>|clear     filter loaded articles by text
  author <name>|all       filter by author
  section <name>|all      filter by section
  type news|blog|all      filter by content type
  from <YYYY-MM-DD>|clear earliest publish date
  to <YYYY-MM-DD>|clear   latest publish date
  sort <order>            publishedAt, relevancy or popularity (refetches)
  clear                   remove every filter
  find <text>             search the content API (refetches)
  refresh                 refetch with the current filters
  retry                   repeat the last fetch
  authors | sections      list the values seen in the loaded articles
  payouts                 show the payout table
  rate <author> <rate>    edit a rate (unsaved until `save`)
  save | discard          persist or drop rate edits
  stats                   dashboard metrics
  export <format> [dir]   payouts, articles, report or json
  help | quit";

enum Event {
    Input(String),
    Fetched(FetchOutcome),
    Eof,
}

impl From<FetchOutcome> for Event {
    fn from(outcome: FetchOutcome) -> Self {
        Event::Fetched(outcome)
    }
}

#[derive(Debug, PartialEq)]
enum Flow {
    Continue,
    Quit,
}

struct Repl {
    board: Dashboard,
    kv: KvStore,
    client: reqwest::blocking::Client,
    page_size: usize,
    tx: Sender<Event>,
    debouncer: Debouncer,
    last_query: Query,
    style: Style,
}

impl Repl {
    fn fetch_in_background(&mut self, query: Query) {
        let ticket = self.board.begin_fetch();
        debug!(?ticket, query = %query.serialize(), "issuing fetch");
        self.last_query = query.clone();
        let client = self.client.clone();
        spawn_fetch(ticket, self.tx.clone(), move || {
            source::fetch_articles(&client, &SourceConfig::from_env(), &query)
        });
        println!("Loading...");
    }

    fn load_now(&mut self) -> anyhow::Result<()> {
        let query = self.board.filter().to_query(self.page_size);
        let ticket = self.board.begin_fetch();
        self.last_query = query.clone();
        let sp = spinner("Loading articles...")?;
        let result = source::fetch_articles(&self.client, &SourceConfig::from_env(), &query);
        sp.finish_and_clear();
        self.board.finish_fetch(ticket, result);
        self.report_load();
        Ok(())
    }

    fn report_load(&self) {
        match self.board.error() {
            Some(message) => println!("error: {message} Type `retry` to try again."),
            None => println!(
                "Loaded {} articles ({} match filters)",
                self.board.articles().len(),
                self.board.filtered().len()
            ),
        }
    }

    fn on_fetched(&mut self, outcome: FetchOutcome) {
        if self.board.finish_fetch(outcome.ticket, outcome.result) {
            self.report_load();
        }
    }

    fn report_filter(&self) {
        println!(
            "{} of {} articles match ({})",
            self.board.filtered().len(),
            self.board.articles().len(),
            self.board.filter()
        );
    }

    fn list(&self) {
        if let Some(message) = self.board.error() {
            println!("error: {message} Type `retry` to try again.");
            return;
        }
        let shown = self.board.displayed();
        if shown.is_empty() {
            if self.board.filter().is_active() {
                println!("No articles match ({})", self.board.filter());
            } else {
                println!("No articles loaded");
            }
            return;
        }
        print!("{}", render::render_cards(shown, 0, Utc::now(), &self.style));
        self.report_window();
    }

    fn report_window(&self) {
        let shown = self.board.displayed().len();
        let total = self.board.filtered().len();
        if self.board.has_more() {
            println!("Showing {shown} of {total}. Type `more` to load more.");
        } else {
            println!("Showing all {total} articles.");
        }
    }

    fn more(&mut self) -> anyhow::Result<()> {
        if !self.board.has_more() {
            println!("No more articles.");
            return Ok(());
        }
        let start = self.board.displayed().len();
        let sp = spinner("Loading more...")?;
        thread::sleep(LOAD_MORE_DELAY);
        sp.finish_and_clear();
        self.board.load_more();
        debug!(page = self.board.page(), "loaded more");
        let shown = &self.board.displayed()[start..];
        print!("{}", render::render_cards(shown, start, Utc::now(), &self.style));
        self.report_window();
        Ok(())
    }

    fn open(&self, arg: &str) -> anyhow::Result<()> {
        let n: usize = arg
            .trim()
            .parse()
            .with_context(|| format!("Not an article number: {arg}"))?;
        let shown = self.board.displayed();
        let article = match n.checked_sub(1).and_then(|i| shown.get(i)) {
            Some(article) => article,
            None => bail!("No article {} on screen (1-{})", n, shown.len()),
        };
        anyhow::ensure!(!article.url.is_empty(), "Article has no link");
        open::that(&article.url).map_err(|e| anyhow::anyhow!("Could not open URL: {}", e))?;
        Ok(())
    }

    fn rate(&mut self, arg: &str) -> anyhow::Result<()> {
        let (author, rate) = match arg.trim().rsplit_once(char::is_whitespace) {
            Some((author, rate)) => (author.trim(), rate),
            None => bail!("Usage: rate <author> <rate>"),
        };
        let rate: f64 = rate
            .parse()
            .with_context(|| format!("Not a number: {rate}"))?;
        let row = self.board.edit_rate(author, rate)?;
        println!(
            "{}: {} articles × ${:.2} = ${:.2} (unsaved)",
            row.author, row.article_count, row.rate, row.total_payout
        );
        Ok(())
    }

    fn payouts(&self) {
        let sheet = self.board.payouts();
        if sheet.rows().is_empty() {
            println!("No payouts for the current filters");
            return;
        }
        print!(
            "{}",
            render::render_payouts(sheet.rows(), |a| sheet.is_unsaved(a), &self.style)
        );
    }

    fn stats(&self) {
        let m = self.board.metrics(Utc::now());
        println!("Total articles:    {}", m.total_articles);
        println!("Filtered out:      {}", m.filtered_out);
        println!("Published today:   {}", m.today_articles);
        println!("This week:         {}", m.week_articles);
        println!("Authors:           {}", m.unique_authors);
        println!("Sections:          {}", m.unique_sections);
        println!("Total payout:      ${:.2}", m.total_payout);
        println!("Avg per article:   ${:.2}", m.avg_payout_per_article);
        if !m.by_author.is_empty() {
            println!("Articles by author:");
            for c in &m.by_author {
                println!("  {}: {}", c.name, c.count);
            }
            println!("Articles by type:");
            for c in &m.by_type {
                println!("  {}: {}", c.name, c.count);
            }
        }
    }

    fn export(&self, arg: &str) -> anyhow::Result<()> {
        let mut parts = arg.split_whitespace();
        let format: ExportFormat = parts.next().unwrap_or("payouts").parse()?;
        let dir = PathBuf::from(parts.next().unwrap_or("."));
        anyhow::ensure!(
            !self.board.filtered().is_empty(),
            "Nothing to export for the current filters"
        );
        let metrics = self.board.metrics(Utc::now());
        let contents = export::render(
            format,
            self.board.filtered(),
            self.board.payout_rows(),
            &metrics,
            Local::now().date_naive(),
        )?;
        let path = export::write(&dir, format, &contents)?;
        println!("Exported to {}", path.display());
        Ok(())
    }

    fn handle(&mut self, line: &str) -> anyhow::Result<Flow> {
        let line = line.trim();
        let (cmd, arg) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let arg = arg.trim();
        match cmd {
            "" => {}
            "list" | "ls" => self.list(),
            "more" => self.more()?,
            "open" => self.open(arg)?,
            "search" => {
                let text = if arg == "clear" { "" } else { arg };
                self.board
                    .update_filter(|f| f.search_query = text.to_string());
                self.report_filter();
            }
            "author" => {
                self.board.update_filter(|f| f.author = optional_choice(arg));
                self.report_filter();
            }
            "section" => {
                self.board.update_filter(|f| f.section = optional_choice(arg));
                self.report_filter();
            }
            "type" => {
                let kind = optional_choice(arg)
                    .map(|t| t.parse::<ArticleType>())
                    .transpose()?;
                self.board.update_filter(|f| f.content_type = kind);
                self.report_filter();
            }
            "from" | "to" => {
                let date = match arg {
                    "" | "clear" => None,
                    value => Some(parse_date(value)?),
                };
                self.board.update_filter(|f| {
                    if cmd == "from" {
                        f.date_range.from = date;
                    } else {
                        f.date_range.to = date;
                    }
                });
                self.report_filter();
            }
            "sort" => {
                let sort_by: SortBy = arg.parse()?;
                self.board.update_filter(|f| f.sort_by = sort_by);
                let query = self.board.filter().to_query(self.page_size);
                self.fetch_in_background(query);
            }
            "clear" => {
                let sort_by = self.board.filter().sort_by;
                self.board.set_filter(FilterState {
                    sort_by,
                    ..FilterState::default()
                });
                self.report_filter();
            }
            "find" => {
                anyhow::ensure!(!arg.is_empty(), "Usage: find <text>");
                self.debouncer.push(arg.to_string(), Instant::now());
            }
            "refresh" => {
                let query = self.board.filter().to_query(self.page_size);
                self.fetch_in_background(query);
            }
            "retry" => {
                let query = self.last_query.clone();
                self.fetch_in_background(query);
            }
            "authors" => {
                for author in self.board.authors() {
                    println!("{author}");
                }
            }
            "sections" => {
                for section in self.board.sections() {
                    println!("{section}");
                }
            }
            "payouts" => self.payouts(),
            "rate" => self.rate(arg)?,
            "save" => {
                let saved = self.board.save_rates(&self.kv)?;
                println!("Saved {saved} rate change(s)");
            }
            "discard" => {
                self.board.discard_edits();
                println!(
                    "Discarded unsaved rate changes. Total payout is ${:.2}",
                    self.board.payouts().total()
                );
            }
            "stats" => self.stats(),
            "export" => self.export(arg)?,
            "help" | "?" => println!("{HELP}"),
            "quit" | "exit" | "q" => return Ok(Flow::Quit),
            other => bail!("Unknown command: {}. Type `help` for a list", other),
        }
        Ok(Flow::Continue)
    }

    fn fire_debounced(&mut self) {
        if let Some(text) = self.debouncer.ready(Instant::now()) {
            let filter = FilterState {
                search_query: text,
                ..self.board.filter().clone()
            };
            self.fetch_in_background(filter.to_query(self.page_size));
        }
    }

    fn is_busy(&self) -> bool {
        self.board.is_loading() || self.debouncer.is_pending()
    }
}

fn spawn_reader(tx: Sender<Event>) {
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(Event::Input(line)).is_err() {
                        return;
                    }
                }
                Err(_) => break,
            }
        }
        let _ = tx.send(Event::Eof);
    });
}

fn next_event(rx: &Receiver<Event>, repl: &Repl) -> Option<Option<Event>> {
    match repl.debouncer.time_left(Instant::now()) {
        Some(wait) => match rx.recv_timeout(wait) {
            Ok(event) => Some(Some(event)),
            Err(RecvTimeoutError::Timeout) => Some(None),
            Err(RecvTimeoutError::Disconnected) => None,
        },
        None => rx.recv().ok().map(Some),
    }
}

pub(crate) fn cmd_dashboard(kv: &KvStore) -> anyhow::Result<()> {
    let user = require_admin(kv)?;
    let interactive = std::io::stdin().is_terminal();
    let (tx, rx) = mpsc::channel::<Event>();

    let mut repl = Repl {
        board: Dashboard::new(
            RateTable::load(kv)?,
            PageWindow::new(DASHBOARD_PAGE_SIZE),
            PayoutSheet::default(),
        ),
        kv: kv.clone(),
        client: crate::http::http_client()?,
        page_size: config::fetch_page_size(),
        tx: tx.clone(),
        debouncer: Debouncer::default(),
        last_query: Query::new(),
        style: Style::detect(),
    };

    println!("Welcome, {}. Type `help` for commands.", user.name);
    repl.load_now()?;
    spawn_reader(tx);

    let mut closing = false;
    loop {
        if closing && !repl.is_busy() {
            break;
        }
        if interactive && !closing && !repl.is_busy() {
            print!("> ");
            std::io::stdout().flush()?;
        }
        let event = match next_event(&rx, &repl) {
            Some(event) => event,
            None => break,
        };
        repl.fire_debounced();
        match event {
            None => {}
            Some(Event::Fetched(outcome)) => repl.on_fetched(outcome),
            Some(Event::Eof) => closing = true,
            Some(Event::Input(line)) => match repl.handle(&line) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(e) => println!("error: {e:#}"),
            },
        }
    }

    if repl.board.payouts().has_unsaved() {
        println!("Unsaved rate changes were discarded");
    }
    info!("dashboard closed");
    Ok(())
}
