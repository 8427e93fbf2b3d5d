//! Command-line front-end for the Spender dashboard.

use std::io::{self, Write as _};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Color, Table};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use spender_rs::aggregator::BreakdownStatus;
use spender_rs::client::{DEFAULT_BASE_URL, SpenderClient};
use spender_rs::dashboard::{Dashboard, DashboardSnapshot};
use spender_rs::error::SpenderError;
use spender_rs::models::{
    AuthRequest, Category, CategoryBreakdownEntry, NaiveDate, Period, Transaction,
    TransactionDraft, TransactionId, User,
};
use spender_rs::session::Session;
use spender_rs::storage::FileSessionStore;

/// Environment variable holding the API base URL.
const API_URL_ENV: &str = "SPENDER_API_URL";

/// Spender CLI: browse and edit monthly spending.
#[derive(Debug, Parser)]
#[command(name = "spender", version, about)]
struct Cli {
    /// Override the session directory (default: XDG data dir).
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,
    /// API base URL (default: $SPENDER_API_URL or http://localhost:8000).
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Exchange an identity-provider token for a session.
    Login {
        /// OAuth access token.
        #[arg(long)]
        token: String,
        /// Profile claims as JSON (`{"sub": ..., "email": ..., "name": ...}`).
        #[arg(long, value_parser = parse_json)]
        user_info: serde_json::Value,
    },
    /// Forget the stored session.
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// List transactions for a month.
    List(MonthArg),
    /// Add a transaction.
    Add(AddArgs),
    /// Change fields of a transaction.
    Edit(EditArgs),
    /// Delete a transaction.
    Delete {
        /// Transaction id.
        id: TransactionId,
        /// Month the transaction is listed under.
        #[command(flatten)]
        month: MonthArg,
    },
    /// Show the category breakdown for a month.
    Dashboard(MonthArg),
}

/// Month selector shared by scoped subcommands.
#[derive(Debug, Args)]
struct MonthArg {
    /// Month to show (YYYY-MM, default: current month).
    #[arg(long, value_parser = parse_period)]
    month: Option<Period>,
}

/// Arguments for the `add` subcommand.
#[derive(Debug, Args)]
struct AddArgs {
    /// Label, e.g. "Coffee".
    #[arg(long)]
    name: String,
    /// Amount spent.
    #[arg(long, allow_hyphen_values = true)]
    amount: String,
    /// Shopping, Bills, "Eating Out" or Others.
    #[arg(long, value_parser = parse_category, default_value = "Others")]
    category: Category,
    /// Purchase date (YYYY-MM-DD, default: today).
    #[arg(long)]
    date: Option<String>,
    /// Month to list afterwards (default: the month of --date).
    #[arg(long, value_parser = parse_period)]
    month: Option<Period>,
}

/// Arguments for the `edit` subcommand.
#[derive(Debug, Args)]
struct EditArgs {
    /// Transaction id.
    id: TransactionId,
    /// New label.
    #[arg(long)]
    name: Option<String>,
    /// New amount.
    #[arg(long, allow_hyphen_values = true)]
    amount: Option<String>,
    /// New category.
    #[arg(long, value_parser = parse_category)]
    category: Option<Category>,
    /// New date (YYYY-MM-DD).
    #[arg(long)]
    date: Option<String>,
    /// Month the transaction is listed under.
    #[arg(long, value_parser = parse_period)]
    month: Option<Period>,
}

/// Parses a `YYYY-MM` period for clap.
fn parse_period(s: &str) -> Result<Period, String> {
    s.parse().map_err(|err| format!("{err}"))
}

/// Parses a category name for clap.
fn parse_category(s: &str) -> Result<Category, String> {
    s.parse().map_err(|err| format!("{err}"))
}

/// Parses a JSON object for clap.
fn parse_json(s: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(s).map_err(|err| format!("{err}"))
}

/// Picks the API base URL: flag, then environment, then default.
fn resolve_api_url(flag: Option<String>, env: Option<String>) -> String {
    flag.or(env.filter(|value| !value.is_empty()))
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned())
}

/// Month to show after `add`: explicit, else the month of the date.
fn month_for_add(month: Option<Period>, draft: &TransactionDraft) -> Period {
    month.unwrap_or_else(|| {
        NaiveDate::parse_from_str(draft.date.trim(), "%Y-%m-%d")
            .map_or_else(|_err| Period::current(), Period::containing)
    })
}

/// Builds the add-form draft from CLI arguments.
fn add_draft(args: AddArgs, today: NaiveDate) -> TransactionDraft {
    let mut draft = TransactionDraft::dated(today);
    draft.name = args.name;
    draft.amount = args.amount;
    draft.category = args.category;
    if let Some(date) = args.date {
        draft.date = date;
    }
    draft
}

/// Overwrites the draft fields given on the command line.
fn apply_edit(draft: &mut TransactionDraft, args: &EditArgs) {
    if let Some(name) = args.name.as_ref() {
        draft.name.clone_from(name);
    }
    if let Some(amount) = args.amount.as_ref() {
        draft.amount.clone_from(amount);
    }
    if let Some(category) = args.category {
        draft.category = category;
    }
    if let Some(date) = args.date.as_ref() {
        draft.date.clone_from(date);
    }
}

/// Creates the session store, using `data_dir` if provided or the
/// default XDG data directory otherwise.
fn create_session_store(data_dir: Option<PathBuf>) -> spender_rs::error::Result<FileSessionStore> {
    let dir = match data_dir {
        Some(dir) => dir,
        None => FileSessionStore::default_dir()?,
    };
    FileSessionStore::new(dir)
}

/// Prints `err` with its cause chain and a hint where one helps.
fn report(err: &SpenderError) -> io::Result<ExitCode> {
    let mut out = io::stderr().lock();
    writeln!(out, "{} {err}", "error:".red().bold())?;
    let mut source = core::error::Error::source(err);
    while let Some(cause) = source {
        writeln!(out, "  {} {cause}", "caused by:".dimmed())?;
        source = cause.source();
    }
    if err.requires_login() {
        writeln!(
            out,
            "  {} run {} first",
            "hint:".cyan(),
            "spender login".bold()
        )?;
    }
    Ok(ExitCode::FAILURE)
}

/// Runs the CLI, returning an appropriate exit code.
async fn run() -> io::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_err| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let _dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    let sessions = match create_session_store(cli.data_dir) {
        Ok(sessions) => sessions,
        Err(err) => return report(&err),
    };

    let base_url = resolve_api_url(cli.api_url, std::env::var(API_URL_ENV).ok());
    let client = match SpenderClient::builder().base_url(base_url).build() {
        Ok(client) => client,
        Err(err) => return report(&err),
    };

    match dispatch(client, &sessions, cli.command).await {
        Ok(code) => Ok(code),
        Err(CliError::Io(err)) => Err(err),
        Err(CliError::Spender(err)) => report(&err),
    }
}

/// Failure of a subcommand.
#[derive(Debug)]
enum CliError {
    /// Writing output failed.
    Io(io::Error),
    /// The library reported an error.
    Spender(SpenderError),
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<SpenderError> for CliError {
    fn from(err: SpenderError) -> Self {
        Self::Spender(err)
    }
}

/// Dispatches to the appropriate subcommand handler.
async fn dispatch(
    client: SpenderClient,
    sessions: &FileSessionStore,
    command: Command,
) -> Result<ExitCode, CliError> {
    match command {
        Command::Login { token, user_info } => {
            let spinner = make_spinner("Signing in...");
            let request = AuthRequest::new(token, user_info);
            let result = Session::sign_in(&client, &request, sessions).await;
            spinner.finish_and_clear();
            print_user(result?.user())?;
        }
        Command::Logout => {
            if let Some(session) = Session::restore(sessions)? {
                session.end(sessions)?;
            }
            writeln!(io::stdout().lock(), "{}", "Signed out.".green())?;
        }
        Command::Whoami => {
            let session = Session::restore(sessions)?.ok_or(SpenderError::NotLoggedIn)?;
            print_user(session.user())?;
        }
        Command::List(arg) => {
            let dashboard = open(client, sessions, arg.month)?;
            load(&dashboard).await?;
            print_transactions(&dashboard.snapshot())?;
        }
        Command::Add(args) => {
            let month = args.month;
            let draft = add_draft(args, chrono::Local::now().date_naive());
            let dashboard = open(client, sessions, Some(month_for_add(month, &draft)))?;
            load(&dashboard).await?;
            let spinner = make_spinner("Saving...");
            let result = dashboard.submit(&draft).await;
            spinner.finish_and_clear();
            let created = result?;
            writeln!(
                io::stdout().lock(),
                "{} {}",
                "Added".green().bold(),
                format_args!("#{} {}", created.id, created.name)
            )?;
            print_transactions(&dashboard.snapshot())?;
        }
        Command::Edit(args) => {
            let dashboard = open(client, sessions, args.month)?;
            load(&dashboard).await?;
            let id = args.id;
            let _began = dashboard.begin_edit(id).await?;
            let _changed = dashboard.update_draft(|draft| apply_edit(draft, &args));
            let spinner = make_spinner("Saving...");
            let result = dashboard.save_edit().await;
            spinner.finish_and_clear();
            if let Some(updated) = result? {
                writeln!(
                    io::stdout().lock(),
                    "{} {}",
                    "Updated".green().bold(),
                    format_args!("#{} {}", updated.id, updated.name)
                )?;
            }
            print_transactions(&dashboard.snapshot())?;
        }
        Command::Delete { id, month } => {
            let dashboard = open(client, sessions, month.month)?;
            load(&dashboard).await?;
            dashboard.delete(id).await?;
            writeln!(
                io::stdout().lock(),
                "{} {}",
                "Deleted".green().bold(),
                format_args!("#{id}")
            )?;
            print_transactions(&dashboard.snapshot())?;
        }
        Command::Dashboard(arg) => {
            let dashboard = open(client, sessions, arg.month)?;
            load(&dashboard).await?;
            print_breakdown(&dashboard.snapshot())?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Builds a dashboard for the stored session and `month`.
fn open(
    client: SpenderClient,
    sessions: &FileSessionStore,
    month: Option<Period>,
) -> Result<Dashboard<SpenderClient>, SpenderError> {
    let session = Session::restore(sessions)?.ok_or(SpenderError::NotLoggedIn)?;
    Ok(Dashboard::new(
        Arc::new(client),
        Some(session),
        month.unwrap_or_else(Period::current),
    ))
}

/// Loads both views behind a spinner.
async fn load(dashboard: &Dashboard<SpenderClient>) -> Result<(), SpenderError> {
    let spinner = make_spinner(&format!("Loading {}...", dashboard.period().label()));
    let result = dashboard.load().await;
    spinner.finish_and_clear();
    result?.into_result()
}

// ── Output formatting ────────────────────────────────────────────────

/// Prints the signed-in user.
fn print_user(user: &User) -> io::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "{} {}", "Signed in as".green().bold(), user.name.bold())?;
    writeln!(out, "  {} {}", "id:".dimmed(), user.id)?;
    if let Some(email) = user.email.as_deref() {
        writeln!(out, "  {} {email}", "email:".dimmed())?;
    }
    Ok(())
}

/// Prints the transactions of a snapshot in a table.
fn print_transactions(snapshot: &DashboardSnapshot) -> io::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(
        out,
        "{} {}",
        snapshot.period.label().green().bold(),
        format_args!("({})", snapshot.transactions.len()).dimmed()
    )?;
    if snapshot.transactions.is_empty() {
        writeln!(out, "{}", "No transactions for this month.".dimmed())?;
        return Ok(());
    }
    writeln!(out)?;
    writeln!(out, "{}", transactions_table(&snapshot.transactions))?;
    writeln!(out, "{} {:.2}", "Total:".bold(), snapshot.total)?;
    Ok(())
}

/// Renders transactions as a table.
fn transactions_table(txs: &[Transaction]) -> Table {
    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("ID").fg(Color::Cyan),
        Cell::new("Date").fg(Color::Cyan),
        Cell::new("Name").fg(Color::Cyan),
        Cell::new("Category").fg(Color::Cyan),
        Cell::new("Amount").fg(Color::Cyan),
    ]);
    for tx in txs {
        let amount = Cell::new(format!("{:.2}", tx.amount)).set_alignment(CellAlignment::Right);
        let amount = if tx.amount < 0.0 {
            amount.fg(Color::Green)
        } else {
            amount.fg(Color::Red)
        };
        _ = table.add_row(vec![
            Cell::new(tx.id),
            Cell::new(tx.date),
            Cell::new(&tx.name),
            Cell::new(tx.category),
            amount,
        ]);
    }
    table
}

/// Prints the category breakdown of a snapshot.
fn print_breakdown(snapshot: &DashboardSnapshot) -> io::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "{}", snapshot.period.label().green().bold())?;
    match snapshot.chart {
        BreakdownStatus::Ready => {}
        BreakdownStatus::Loading | BreakdownStatus::NoData => {
            writeln!(out, "{}", "No spending data for this month.".dimmed())?;
            return Ok(());
        }
    }
    writeln!(out)?;
    writeln!(out, "{}", breakdown_table(&snapshot.breakdown))?;
    let total: f64 = snapshot.breakdown.iter().map(|entry| entry.amount).sum();
    writeln!(out, "{} {total:.2}", "Total:".bold())?;
    Ok(())
}

/// Renders the breakdown with each category's share of the total.
fn breakdown_table(entries: &[CategoryBreakdownEntry]) -> Table {
    let total: f64 = entries.iter().map(|entry| entry.amount).sum();
    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Category").fg(Color::Cyan),
        Cell::new("Amount").fg(Color::Cyan),
        Cell::new("Share").fg(Color::Cyan),
    ]);
    for entry in entries {
        let share = if total > 0.0 {
            entry.amount / total * 100.0
        } else {
            0.0
        };
        _ = table.add_row(vec![
            Cell::new(&entry.category),
            Cell::new(format!("{:.2}", entry.amount)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{share:.1}%")).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

/// Creates a spinner with the given message.
fn make_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_err| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_owned());
    spinner.enable_steady_tick(core::time::Duration::from_millis(80));
    spinner
}

/// Entry point.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            // Nothing left to report to if stderr itself failed.
            let _ignored = writeln!(io::stderr(), "fatal I/O error: {err}");
            ExitCode::FAILURE
        }
    }
}
