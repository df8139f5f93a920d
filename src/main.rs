use anyhow::Result;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use rust_decimal::Decimal;
use strato::core::analytics::TimeWindow;
use strato::core::amount::parse_amount;
use strato::core::log::init_logging;
use strato::core::transaction::PeriodKey;
use strato::{AppCommand, ManualEntry};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Add periods (YYYY-MM) to the selection and sync them
    Select {
        #[arg(required = true)]
        periods: Vec<PeriodKey>,
    },
    /// Remove periods from the selection
    Deselect {
        #[arg(required = true)]
        periods: Vec<PeriodKey>,
    },
    /// Clear the period selection
    Clear,
    /// Manage the feed URL of each source per period
    Sources {
        #[command(subcommand)]
        command: SourcesCommands,
    },
    /// Refetch every feed of the selected periods
    Refresh,
    /// Display income, expenses and balance of the selected periods
    Summary,
    /// List the transactions of the selected periods, newest first
    List,
    /// Add a manual transaction, or edit one with --id
    Add {
        /// Date as DD/MM/YYYY
        #[arg(long)]
        date: String,
        #[arg(long)]
        description: String,
        /// Signed amount, negative for expenses
        #[arg(long, value_parser = amount_arg, allow_hyphen_values = true)]
        amount: Decimal,
        #[arg(long)]
        category: Option<String>,
        /// Free text source label
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        id: Option<String>,
    },
    /// Delete a manual transaction
    Remove { id: String },
    /// Toggle whether a transaction is counted
    Ignore { id: String },
    /// Display breakdowns by source and the monthly evolution
    Charts {
        /// all, today, custom or a trailing window such as 30d
        #[arg(long, default_value = "all")]
        window: TimeWindow,
        /// Start of a custom window (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// End of a custom window (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
enum SourcesCommands {
    /// Show the configured URLs of the selected periods
    List,
    /// Set the feed URL of a source for a period
    Set {
        period: PeriodKey,
        source: String,
        url: String,
    },
    /// Remove the feed URL of a source for a period
    Unset { period: PeriodKey, source: String },
}

fn amount_arg(raw: &str) -> Result<Decimal, String> {
    parse_amount(raw).ok_or_else(|| format!("invalid amount: {raw}"))
}

impl From<Commands> for AppCommand {
    fn from(cmd: Commands) -> AppCommand {
        match cmd {
            Commands::Select { periods } => AppCommand::Select(periods),
            Commands::Deselect { periods } => AppCommand::Deselect(periods),
            Commands::Clear => AppCommand::Clear,
            Commands::Sources { command } => match command {
                SourcesCommands::List => AppCommand::SourcesList,
                SourcesCommands::Set {
                    period,
                    source,
                    url,
                } => AppCommand::SourcesSet {
                    period,
                    source,
                    url,
                },
                SourcesCommands::Unset { period, source } => {
                    AppCommand::SourcesUnset { period, source }
                }
            },
            Commands::Refresh => AppCommand::Refresh,
            Commands::Summary => AppCommand::Summary,
            Commands::List => AppCommand::List,
            Commands::Add {
                date,
                description,
                amount,
                category,
                label,
                id,
            } => AppCommand::Add(ManualEntry {
                id,
                date,
                description,
                amount,
                category,
                label,
            }),
            Commands::Remove { id } => AppCommand::Remove(id),
            Commands::Ignore { id } => AppCommand::Ignore(id),
            Commands::Charts { window, from, to } => {
                let window = if from.is_some() || to.is_some() {
                    TimeWindow::Custom {
                        start: from,
                        end: to,
                    }
                } else {
                    window
                };
                AppCommand::Charts(window)
            }
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => strato::cli::setup::setup_at_path(path),
            None => strato::cli::setup::setup(),
        },
        Some(cmd) => strato::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
