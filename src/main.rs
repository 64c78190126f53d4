//! SimpleORM CLI - manage a mirror journal through the mapping layer

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use simpleorm::config::{self, SimpleOrmConfig};
use simpleorm::ui::{self, Icons};
use simpleorm::{EntryState, JournalStore, MirrorEntry};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "simpleorm")]
#[command(version)]
#[command(about = "Declarative record/table mapping for SQLite, driving a mirror journal")]
#[command(long_about = r#"
SimpleORM maps typed records onto a single SQLite table. This tool uses it to
keep a journal of mirrored files.

Example usage:
  simpleorm init
  simpleorm add --path docs/readme.txt --size 120
  simpleorm list --where '"State" = ?' --arg Pending
  simpleorm mark --id 1 --state mirrored
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the database file (overrides the config file)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file and create the journal table
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Add one entry and print its assigned ID
    Add {
        /// Path relative to the mirrored root
        #[arg(short, long)]
        path: String,

        /// Size in bytes
        #[arg(short, long, default_value = "0")]
        size: i64,

        /// Modification time (RFC 3339), defaults to now
        #[arg(short, long)]
        modified: Option<String>,

        /// Record a folder instead of a file
        #[arg(long)]
        folder: bool,

        /// Free-form note
        #[arg(short, long)]
        note: Option<String>,
    },

    /// List entries, optionally filtered by a raw WHERE clause
    List {
        /// SQL filter clause, e.g. '"Size" > ?'
        #[arg(short = 'w', long = "where")]
        filter: Option<String>,

        /// Positional argument for the filter clause (repeatable)
        #[arg(short, long = "arg")]
        args: Vec<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Change the state of an entry
    Mark {
        #[arg(short, long)]
        id: i64,

        /// pending, mirrored, deleted or failed
        #[arg(short, long)]
        state: EntryState,
    },

    /// Overwrite entries from a JSON file (array of entries), keeping their IDs
    Replace {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Delete an entry by ID
    Remove {
        #[arg(short, long)]
        id: i64,
    },

    /// Show per-state totals
    Stats,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let settings = config::load_config(Some(&config_path))?.unwrap_or_default();

    // Initialize logging
    let filter = if cli.verbose || settings.log_sql() {
        EnvFilter::new("info,simpleorm=debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let database = settings.database_path(cli.database.as_deref());

    match cli.command {
        Commands::Init { force } => {
            let written = SimpleOrmConfig {
                database: Some(database.display().to_string()),
                ..settings
            };
            config::write_config(&config_path, &written, force)?;
            let store = open_store(&database)?;

            ui::header("Initialized mirror journal");
            ui::info("Config", &config_path.display().to_string());
            ui::info("Database", &database.display().to_string());
            ui::info("Entries", &store.count()?.to_string());
        }

        Commands::Add { path, size, modified, folder, note } => {
            let store = open_store(&database)?;
            let modified = parse_timestamp(modified.as_deref())?;
            let mut entry = if folder {
                MirrorEntry::folder(path, modified)
            } else {
                MirrorEntry::new(path, size, modified)
            };
            entry.note = note;

            let entry = store.add(entry)?;
            ui::success(&format!("{} Added entry {} ({})", Icons::NEW, entry.id, entry.path));
        }

        Commands::List { filter, args, format } => {
            let store = open_store(&database)?;
            let entries = store.find(filter.as_deref().unwrap_or(""), &args)?;

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("∅ No entries found.");
            } else {
                println!("{}", ui::entries_table(&entries));
            }
        }

        Commands::Mark { id, state } => {
            let store = open_store(&database)?;
            let entry = store.mark(id, state)?;
            ui::success(&format!("Entry {} is now {}", entry.id, ui::state_label(entry.state)));
        }

        Commands::Replace { file } => {
            let store = open_store(&database)?;
            let contents = std::fs::read_to_string(&file)?;
            let entries: Vec<MirrorEntry> = serde_json::from_str(&contents)?;
            store.replace(&entries)?;
            ui::success(&format!("Replaced {} entries", entries.len()));
        }

        Commands::Remove { id } => {
            let store = open_store(&database)?;
            if store.remove(id)? {
                ui::success(&format!("{} Removed entry {}", Icons::DEL, id));
            } else {
                ui::warn(&format!("No entry with ID {}", id));
            }
        }

        Commands::Stats => {
            let store = open_store(&database)?;
            let stats = store.stats()?;

            ui::section(&format!("{} Journal ({})", Icons::STATS, database.display()));
            println!("{}", ui::stats_table(&stats));
        }
    }

    Ok(())
}

fn open_store(database: &Path) -> anyhow::Result<JournalStore> {
    config::ensure_db_dir(database)?;
    tracing::debug!("Opening journal at {}", database.display());
    Ok(JournalStore::open(database)?)
}

fn parse_timestamp(value: Option<&str>) -> anyhow::Result<DateTime<Utc>> {
    match value {
        Some(text) => Ok(DateTime::parse_from_rfc3339(text)?.with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}
