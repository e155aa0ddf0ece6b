use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use progtrack_core::{EventBus, EventPublisher, LogSubscriber, Reconciler, Status, UpdateRequest};
use progtrack_store::MemoryStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod config;
mod output;
mod state;
mod subtask_cmd;
mod task_cmd;

use output::Format;
use subtask_cmd::SubtaskCommand;
use task_cmd::TaskCommand;

pub(crate) type App = Reconciler<MemoryStore>;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("PROGTRACK_BUILD_SHA"), ")");

#[derive(Parser, Debug)]
#[command(name = "progtrack", version = VERSION, about = "Task/subtask progress tracking")]
struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text, global = true)]
    format: Format,

    /// Snapshot file (overrides config.store.path)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Task commands
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },

    /// Subtask commands
    Subtask {
        #[command(subcommand)]
        command: SubtaskCommand,
    },

    /// Configuration under ~/.progtrack
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config.toml if none exists
    Init,
    /// Print the effective config
    Show,
    /// Print the config file location
    Path,
}

/// Optional field edits shared by `task update` and `subtask update`.
#[derive(Args, Debug, Default)]
pub(crate) struct UpdateArgs {
    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    priority: Option<i32>,

    /// Planned equipment count
    #[arg(long)]
    equipment: Option<i64>,

    /// Installed equipment count
    #[arg(long)]
    actual: Option<i64>,

    #[arg(long)]
    status: Option<Status>,

    #[arg(long)]
    rate: Option<i32>,

    #[arg(long)]
    start: Option<NaiveDate>,

    #[arg(long)]
    end: Option<NaiveDate>,
}

impl From<UpdateArgs> for UpdateRequest {
    fn from(a: UpdateArgs) -> Self {
        UpdateRequest {
            name: a.name,
            priority: a.priority,
            equipment_count: a.equipment,
            actual_equipment_count: a.actual,
            status: a.status,
            completion_rate: a.rate,
            planned_start: a.start,
            planned_end: a.end,
        }
    }
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_app(cfg: &config::Config, store: Option<PathBuf>) -> Result<App> {
    let path = match store {
        Some(p) => p,
        None => cfg.store_path()?,
    };
    tracing::debug!(path = %path.display(), "opening store");
    let store =
        MemoryStore::open(&path).with_context(|| format!("open store {}", path.display()))?;

    let bus = Arc::new(EventBus::new());
    bus.subscribe(Arc::new(LogSubscriber));
    Ok(Reconciler::new(store, bus).with_config(cfg.reconcile))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config()?;
    init_tracing(&cfg.log.filter);

    match cli.command {
        Command::Task { command } => {
            let app = open_app(&cfg, cli.store)?;
            task_cmd::run(&app, cli.format, command).await?;
        }

        Command::Subtask { command } => {
            let app = open_app(&cfg, cli.store)?;
            subtask_cmd::run(&app, cli.format, command).await?;
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => {
                let s = toml::to_string_pretty(&cfg).context("serialize config")?;
                println!("{s}");
            }
            ConfigCommand::Path => println!("{}", config::config_path()?.display()),
        },
    }

    Ok(())
}
