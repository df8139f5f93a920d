pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::analytics::TimeWindow;
use crate::core::config::AppConfig;
use crate::core::transaction::PeriodKey;
use crate::core::Session;
use crate::providers::HttpFeedProvider;
use crate::store::DiskStore;
use anyhow::Result;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

/// A manual entry as typed by the user. Without `id` a new entry is created.
#[derive(Debug, Clone)]
pub struct ManualEntry {
    pub id: Option<String>,
    pub date: String,
    pub description: String,
    pub amount: Decimal,
    pub category: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone)]
pub enum AppCommand {
    Select(Vec<PeriodKey>),
    Deselect(Vec<PeriodKey>),
    Clear,
    SourcesList,
    SourcesSet {
        period: PeriodKey,
        source: String,
        url: String,
    },
    SourcesUnset {
        period: PeriodKey,
        source: String,
    },
    Refresh,
    Summary,
    List,
    Add(ManualEntry),
    Remove(String),
    Ignore(String),
    Charts(TimeWindow),
}

pub type AppSession = Session<HttpFeedProvider>;

/// Opens the session described by the config and runs one command against it.
pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Strato starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let data_path = config.default_data_path()?;
    let store = Arc::new(DiskStore::open(&data_path)?);
    let provider = HttpFeedProvider::new(&config.fetch)?;
    let session = Session::load(store, provider, config.catalog()).await;

    match command {
        AppCommand::Select(periods) => cli::periods::select(&session, periods).await,
        AppCommand::Deselect(periods) => cli::periods::deselect(&session, periods).await,
        AppCommand::Clear => cli::periods::clear(&session).await,
        AppCommand::SourcesList => cli::sources::list(&session).await,
        AppCommand::SourcesSet {
            period,
            source,
            url,
        } => cli::sources::set(&session, period, &source, &url).await,
        AppCommand::SourcesUnset { period, source } => {
            cli::sources::set(&session, period, &source, "").await
        }
        AppCommand::Refresh => cli::periods::refresh(&session).await,
        AppCommand::Summary => cli::summary::run(&session).await,
        AppCommand::List => cli::statement::list(&session).await,
        AppCommand::Add(entry) => cli::statement::add(&session, entry).await,
        AppCommand::Remove(id) => cli::statement::remove(&session, &id).await,
        AppCommand::Ignore(id) => cli::statement::toggle_ignore(&session, &id).await,
        AppCommand::Charts(window) => cli::charts::run(&session, window).await,
    }
}
