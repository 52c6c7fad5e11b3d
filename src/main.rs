mod article;
mod commands;
mod config;
mod dashboard;
mod export;
mod filter;
mod http;
mod kv;
mod logger;
mod metrics;
mod paging;
mod payout;
mod render;
mod session;
mod source;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::FilterArgs;
use export::ExportFormat;
use kv::KvStore;

/// Browse a news content API, filter articles and work out author payouts
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List articles, optionally grouped and filtered
    Show {
        /// Grouping mode: d (date), s (section), a (author), or combinations like ds, sa
        #[arg(short, long, default_value = "")]
        group: String,
        /// Show the first N pages of ten articles
        #[arg(short, long, default_value_t = 1)]
        page: usize,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Full-text search on the content API
    Search {
        /// Search text
        query: String,
        /// Grouping mode, as for `show`
        #[arg(short, long, default_value = "")]
        group: String,
        /// Maximum number of results
        #[arg(short = 'n', long, default_value_t = commands::search::SEARCH_PAGE_SIZE)]
        limit: usize,
    },
    /// Breaking stories from the last three days
    Trending {
        /// Grouping mode, as for `show`
        #[arg(short, long, default_value = "")]
        group: String,
    },
    /// The latest articles for a category over the last week
    Recent {
        /// Category searched for; "all" means world news
        #[arg(short, long, default_value = "all")]
        category: String,
        /// Grouping mode, as for `show`
        #[arg(short, long, default_value = "")]
        group: String,
    },
    /// Per-author payouts for the matching articles (admin only)
    Payouts {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Manage per-author payout rates (admin only)
    Rate {
        #[command(subcommand)]
        command: RateCommand,
    },
    /// Write a report file: payouts, articles, report or json
    Export {
        /// payouts (CSV), articles (CSV), report (text) or json
        #[arg(default_value = "payouts")]
        format: ExportFormat,
        /// Directory to write into
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Interactive dashboard (admin only)
    Dashboard,
    /// Log in as one of the demo users
    Login {
        email: String,
        #[arg(long, default_value = session::DEMO_PASSWORD)]
        password: String,
    },
    /// Forget the logged-in user
    Logout,
    /// Show the logged-in user
    Whoami,
}

#[derive(Subcommand)]
enum RateCommand {
    /// Set the rate paid per article for an author
    Set {
        /// Exact author name as shown in listings
        author: String,
        /// Amount per article
        rate: f64,
    },
    /// List stored rates
    Ls,
}

fn run(command: Option<Command>, kv: &KvStore) -> anyhow::Result<()> {
    match command {
        Some(Command::Show {
            ref group,
            page,
            ref filters,
        }) => commands::show::cmd_show(group, page, filters),
        Some(Command::Search {
            ref query,
            ref group,
            limit,
        }) => commands::search::cmd_search(query, group, limit),
        Some(Command::Trending { ref group }) => commands::feeds::cmd_trending(group),
        Some(Command::Recent {
            ref category,
            ref group,
        }) => commands::feeds::cmd_recent(category, group),
        Some(Command::Payouts { ref filters }) => commands::payouts::cmd_payouts(kv, filters),
        Some(Command::Rate {
            command: RateCommand::Set { ref author, rate },
        }) => commands::rate::cmd_rate_set(kv, author, rate),
        Some(Command::Rate {
            command: RateCommand::Ls,
        }) => commands::rate::cmd_rate_ls(kv),
        Some(Command::Export {
            format,
            ref out,
            ref filters,
        }) => commands::export::cmd_export(kv, format, out, filters),
        Some(Command::Dashboard) => commands::dashboard::cmd_dashboard(kv),
        Some(Command::Login {
            ref email,
            ref password,
        }) => commands::session::cmd_login(kv, email, password),
        Some(Command::Logout) => commands::session::cmd_logout(kv),
        Some(Command::Whoami) => commands::session::cmd_whoami(kv),
        None => commands::show::cmd_show("", 1, &FilterArgs::default()),
    }
}

fn main() {
    logger::init_logger();
    let args = Args::parse();
    let kv = KvStore::open(&config::store_dir());

    if let Err(e) = run(args.command, &kv) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
