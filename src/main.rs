use bankgrid::auth::{self, AUTH_COOKIE, GateDecision};
use bankgrid::source::{DEFAULT_ADMIN_COUNT, DEFAULT_TRANSACTION_COUNT, Generate};
use bankgrid::{
    Admin, Constraint, DatePreset, FieldValue, GridConfig, GridView, Record, Transaction, TransactionStatus,
    read_jsonl, write_jsonl,
};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use eyre::{Result, eyre};
use std::path::PathBuf;
use std::time::Instant;
use tracing::warn;

#[derive(Parser)]
#[command(name = "bankgrid")]
#[command(about = "BankGrid CLI - filter, sort and page through dashboard transactions and administrators")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Path to a grid config file (default: <config dir>/bankgrid/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the transactions table
    Transactions {
        #[command(flatten)]
        view: ViewArgs,

        /// Allowed statuses (repeatable): confirmed, pending, declined
        #[arg(long = "status")]
        statuses: Vec<String>,

        /// Allowed currencies (repeatable)
        #[arg(long = "currency")]
        currencies: Vec<String>,

        /// Minimum amount (inclusive)
        #[arg(long)]
        min: Option<String>,

        /// Maximum amount (inclusive)
        #[arg(long)]
        max: Option<String>,
    },

    /// Show the administrators table
    Admins {
        #[command(flatten)]
        view: ViewArgs,

        /// Allowed roles (repeatable)
        #[arg(long = "role")]
        roles: Vec<String>,
    },

    /// Write mock records to a JSONL file
    Generate {
        kind: Kind,

        /// Number of records (default: 250 transactions / 150 admins)
        #[arg(short = 'n', long)]
        count: Option<usize>,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Check whether a path would be served or redirected to login
    Gate {
        path: String,

        /// Raw Cookie header
        #[arg(long)]
        cookie: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Transactions,
    Admins,
}

#[derive(Args)]
struct ViewArgs {
    /// Load records from a JSONL file instead of generating them
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Number of records to generate
    #[arg(short = 'n', long)]
    count: Option<usize>,

    /// Free-text search
    #[arg(short, long, default_value = "")]
    search: String,

    /// Created at or after (RFC 3339, YYYY-MM-DDTHH:MM or YYYY-MM-DD)
    #[arg(long)]
    from: Option<String>,

    /// Created at or before
    #[arg(long)]
    to: Option<String>,

    /// Relative start date: today, month, or a day count such as 7d
    #[arg(long, conflicts_with_all = ["from", "to"])]
    since: Option<String>,

    /// Header clicks, applied in order; clicking the same column twice sorts descending
    #[arg(long = "sort")]
    sorts: Vec<String>,

    /// Scroll offset of the table body in px
    #[arg(long, default_value_t = 0.0)]
    scroll: f64,

    /// Height of the table body in px
    #[arg(long, default_value_t = 480.0)]
    height: f64,

    /// Measured row height in px
    #[arg(long)]
    row_height: Option<f64>,

    /// Rows per page; switches to a paginated table
    #[arg(long)]
    page_size: Option<usize>,

    /// Page number, starting at 1
    #[arg(long)]
    page: Option<usize>,

    /// Open the detail view for the row at this position (0-based)
    #[arg(long)]
    open: Option<usize>,
}

fn main() -> Result<()> {
    // Setup tracing
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Transactions {
            view,
            statuses,
            currencies,
            min,
            max,
        } => {
            let config = GridConfig::load_or_default(cli.config.as_deref())?;
            let statuses = statuses
                .iter()
                .map(|s| s.parse::<TransactionStatus>().map(|st| st.as_str()))
                .collect::<Result<Vec<_>>>()?;

            let mut constraints = vec![
                ("status", Constraint::one_of(statuses)),
                ("currency", Constraint::one_of(currencies)),
            ];
            if min.is_some() || max.is_some() {
                constraints.push((
                    "amount",
                    Constraint::range_from_input(min.as_deref().unwrap_or(""), max.as_deref().unwrap_or("")),
                ));
            }

            let records = load::<Transaction>(&view, DEFAULT_TRANSACTION_COUNT)?;
            show(records, &config, &view, constraints)?;
        }
        Commands::Admins { view, roles } => {
            let config = GridConfig::load_or_default(cli.config.as_deref())?;
            let records = load::<Admin>(&view, DEFAULT_ADMIN_COUNT)?;
            show(records, &config, &view, vec![("role", Constraint::one_of(roles))])?;
        }
        Commands::Generate { kind, count, output } => {
            let written = match kind {
                Kind::Transactions => {
                    let records = Transaction::generate(count.unwrap_or(DEFAULT_TRANSACTION_COUNT));
                    write_jsonl(&output, &records)?;
                    records.len()
                }
                Kind::Admins => {
                    let records = Admin::generate(count.unwrap_or(DEFAULT_ADMIN_COUNT));
                    write_jsonl(&output, &records)?;
                    records.len()
                }
            };
            println!("Wrote {} records to {}", written, output.display());
        }
        Commands::Gate { path, cookie } => {
            let value = cookie.as_deref().and_then(|h| auth::cookie_value(h, AUTH_COOKIE));
            match auth::gate(&path, value) {
                GateDecision::Allow => println!("{} {}", "allow".green(), path),
                GateDecision::Redirect(target) => println!("{} {}", "redirect".yellow(), target),
            }
        }
    }

    Ok(())
}

fn load<R: Generate>(view: &ViewArgs, default_count: usize) -> Result<Vec<R>> {
    match &view.input {
        Some(path) => read_jsonl(path),
        None => Ok(R::generate(view.count.unwrap_or(default_count))),
    }
}

fn show<R: Record>(
    records: Vec<R>,
    config: &GridConfig,
    view: &ViewArgs,
    constraints: Vec<(&str, Constraint)>,
) -> Result<()> {
    let mut grid = GridView::new(records, config);
    if let Some(size) = view.page_size {
        grid.set_page_size(size);
    }
    grid.resize(view.height);
    if let Some(measured) = view.row_height {
        grid.calibrate(measured);
    }

    grid.type_search(view.search.as_str(), Instant::now());
    grid.commit_search();
    for (field, constraint) in constraints {
        grid.set_constraint(field, constraint);
    }
    if let Some(preset) = &view.since {
        let preset: DatePreset = preset.parse()?;
        grid.set_constraint("createdAt", Constraint::since(preset, Utc::now()));
    } else if view.from.is_some() || view.to.is_some() {
        grid.set_constraint(
            "createdAt",
            Constraint::between_from_input(
                view.from.as_deref().unwrap_or(""),
                view.to.as_deref().unwrap_or(""),
            ),
        );
    }

    for key in &view.sorts {
        if !grid.set_sort(key) {
            warn!(key = %key, "Column is not sortable, ignoring");
        }
    }

    grid.on_scroll(view.scroll);
    if let Some(page) = view.page {
        if page == 0 {
            return Err(eyre!("Pages start at 1"));
        }
        grid.set_page(page - 1);
    }

    print_table(&grid);

    if let Some(position) = view.open {
        grid.set_on_row_activate(|record: &R| {
            println!();
            for (label, value) in record.details() {
                println!("  {:<12} {}", label.dimmed(), value);
            }
        });
        if !grid.activate(position) {
            return Err(eyre!("No row at position {}", position));
        }
    }

    Ok(())
}

fn print_table<R: Record>(grid: &GridView<R>) {
    let headers: Vec<String> = grid
        .headers()
        .iter()
        .map(|h| match h.indicator {
            Some(direction) => format!("{} {}", h.label, direction.glyph()),
            None => h.label.to_string(),
        })
        .collect();

    let rows: Vec<(usize, Vec<(String, Option<&str>)>)> = grid
        .visible_rows()
        .map(|(position, record)| {
            let cells = R::columns()
                .iter()
                .map(|c| match record.field(c.name) {
                    Some(value) => (cell_text(&value), status_of(&value)),
                    None => (String::new(), None),
                })
                .collect();
            (position, cells)
        })
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for (_, cells) in &rows {
        for (i, (text, _)) in cells.iter().enumerate() {
            widths[i] = widths[i].max(text.chars().count());
        }
    }

    let header_line: Vec<String> = headers.iter().zip(&widths).map(|(h, w)| pad(h, *w)).collect();
    println!("{:>6}  {}", "#", header_line.join("  ").as_str().bold());

    for (position, cells) in &rows {
        let line: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|((text, status), w)| {
                let padded = pad(text, *w);
                match *status {
                    Some("confirmed") => padded.as_str().green().to_string(),
                    Some("pending") => padded.as_str().yellow().to_string(),
                    Some("declined") => padded.as_str().red().to_string(),
                    _ => padded,
                }
            })
            .collect();
        println!("{:>6}  {}", position, line.join("  "));
    }

    let window = grid.window();
    println!();
    println!(
        "Всего: {} of {}  rows {}..{}  page {}/{}",
        grid.len(),
        grid.total(),
        window.start,
        window.end,
        grid.page() + 1,
        grid.total_pages()
    );
}

fn cell_text(value: &FieldValue<'_>) -> String {
    match value {
        FieldValue::Timestamp(s) => bankgrid::models::format_timestamp(s),
        FieldValue::Category(s) => match s.parse::<TransactionStatus>() {
            Ok(status) => status.label().to_string(),
            Err(_) => s.to_string(),
        },
        other => other.to_string(),
    }
}

fn status_of<'a>(value: &FieldValue<'a>) -> Option<&'a str> {
    match value {
        FieldValue::Category(s) if s.parse::<TransactionStatus>().is_ok() => Some(*s),
        _ => None,
    }
}

fn pad(text: &str, width: usize) -> String {
    let len = text.chars().count();
    format!("{}{}", text, " ".repeat(width.saturating_sub(len)))
}
