mod api;
mod classifier;
mod common;
mod config;
mod storage;
mod sync;
mod transport;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{ArgAction, Parser, Subcommand};
use dotenvy::dotenv;
use serde::Serialize;
use tokio::sync::mpsc;

use api::TodoService;
use classifier::Classifier;
use config::AppConfig;
use storage::MessageStore;
use sync::SyncEngine;
use transport::JsonLinesTransport;

#[derive(Parser)]
#[command(
    name = "group_todo_sync",
    version,
    about = "Keeps a to-do list in sync with one chat group"
)]
struct Cli {
    /// Path to JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: String,
    /// SQLite database file (overrides config and TODO_DB_PATH)
    #[arg(long, value_name = "FILE")]
    database: Option<String>,
    /// Group id to track (overrides config and TEMPGROUP)
    #[arg(long, value_name = "ID")]
    group: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest session events (newline-delimited JSON) until the stream ends
    Run {
        /// Read events from this file instead of stdin
        #[arg(long, value_name = "FILE")]
        events: Option<PathBuf>,
    },
    /// Print every stored message
    List,
    /// Print one message
    Get { id: String },
    /// Set the checked flag on a message
    Check {
        id: String,
        #[arg(action = ArgAction::Set)]
        value: bool,
    },
    /// Set the done flag on a message
    Done {
        id: String,
        #[arg(action = ArgAction::Set)]
        value: bool,
    },
    /// Remove every stored message
    Clear,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let mut app_config = config::load_config(&cli.config).apply_env();
    app_config.apply_overrides(cli.group, cli.database);

    // The store must be reachable before anything else runs.
    storage::ensure_parent_dir(&app_config.database_path)?;
    let store = Arc::new(MessageStore::with_path(&app_config.database_path)?);
    log::info!("Opened message store at {}", app_config.database_path);

    let service = TodoService::new(store.clone());
    match cli.command {
        Command::Run { events } => run_sync(store, &app_config, events).await?,
        Command::List => print_json(&service.list_all())?,
        Command::Get { id } => print_json(&service.get_by_id(&id))?,
        Command::Check { id, value } => print_json(&service.toggle_checked(&id, value))?,
        Command::Done { id, value } => print_json(&service.toggle_done(&id, value))?,
        Command::Clear => print_json(&service.delete_all())?,
    }

    Ok(())
}

async fn run_sync(
    store: Arc<MessageStore>,
    app_config: &AppConfig,
    events: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let group = app_config
        .monitored_group
        .as_deref()
        .ok_or("no monitored group configured; set TEMPGROUP or pass --group")?;

    let reader = transport::open_events(events.as_deref()).await?;

    // Session -> engine
    let (event_tx, event_rx) = mpsc::channel(100);
    let session = tokio::spawn(async move { JsonLinesTransport::new(reader, event_tx).run().await });

    let engine = SyncEngine::new(store, Classifier::new(group));
    engine.run(event_rx).await;

    match session.await {
        Ok(Ok(delivered)) => log::info!("Session stream finished after {delivered} events"),
        Ok(Err(err)) => log::error!("Session stream failed: {err}"),
        Err(err) => log::error!("Session reader task terminated: {err}"),
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
