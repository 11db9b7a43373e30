use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::TemplateEditor;
use crate::config::ConfigLoader;
use crate::storage::FileStorage;

pub mod commands;

use self::commands::{AddCardArgs, CategoryArgs, MoveCardArgs, TitleArgs, UncategorizeArgs};

#[derive(Parser, Debug)]
#[command(
    name = "eventboard",
    version,
    about = "Inspect and edit the stored event announcement template"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over EVENTBOARD_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over EVENTBOARD_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the rehydrated template as JSON (default)
    Show,
    /// Validate every stored key and report its status
    Check,
    /// Clear stored state and return to factory defaults
    Reset,
    /// Set the template background color (#RRGGBB)
    Background {
        color: String,
    },
    /// Set the title card text
    Title(TitleArgs),
    /// Add an event card
    AddCard(AddCardArgs),
    /// Delete an event card
    DeleteCard {
        uuid: String,
    },
    /// Move an event card up or down
    MoveCard(MoveCardArgs),
    /// Type a category name for a card (rename, fuse, switch or create)
    Category(CategoryArgs),
    /// Tick or untick a card's "no category" box
    Uncategorize(UncategorizeArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var("EVENTBOARD_CONFIG", path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var("EVENTBOARD_DATA", path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let config = loader.load_or_init()?;
    let storage = Arc::new(FileStorage::open(&config.storage.path)?);

    let command = cli.command.unwrap_or(Commands::Show);
    let mut editor = TemplateEditor::new(storage, &config.history);
    // `check` reports on storage as found; rehydrating could repair it first.
    if !matches!(command, Commands::Check) {
        editor.rehydrate();
    }
    let output = commands::execute(&mut editor, command)?;
    print!("{output}");
    Ok(())
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}
