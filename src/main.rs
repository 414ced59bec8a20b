//! Binary entry point for freshkeep.
//!
//! A thin terminal front end over the cache orchestrator.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::{Context, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use freshkeep::cli::{
    OutputFormat, write_dashboard, write_items_table, write_json, write_references_table,
    write_status,
};
use freshkeep::models::{DATE_FORMAT, ImageRef};
use freshkeep::observability::init_logging;
use freshkeep::{
    CacheOrchestrator, ExpiryStatus, FoodItemDraft, FreshStore, Language, ReferenceDraft,
    ReferenceKind, StoreConfig,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

/// Freshkeep - track what is in the fridge and when it expires.
#[derive(Parser)]
#[command(name = "freshkeep")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "FRESHKEEP_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Override the data directory.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Output format: table or json.
    #[arg(short, long, global = true, default_value = "table")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Record a food item.
    Add {
        /// Item name.
        name: String,

        /// Expiry date (YYYY-MM-DD).
        #[arg(short, long, value_parser = parse_date)]
        expires: NaiveDate,

        /// Number of units.
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        /// Category id.
        #[arg(long)]
        category: Option<i64>,

        /// Location id.
        #[arg(long)]
        location: Option<i64>,

        /// Days before expiry to be reminded.
        #[arg(long, default_value_t = 0)]
        reminder: u32,

        /// Free-form notes.
        #[arg(long)]
        notes: Option<String>,

        /// Symbol (emoji) shown in place of a photo.
        #[arg(long, conflicts_with = "image")]
        symbol: Option<String>,

        /// Media reference for a photo.
        #[arg(long)]
        image: Option<String>,
    },

    /// List food items, soonest expiry first.
    List {
        /// Only show items with this status (expired, expiring_soon, fresh).
        #[arg(short, long, value_parser = parse_status)]
        status: Option<ExpiryStatus>,
    },

    /// Change fields of a food item.
    Update {
        /// Item id.
        id: i64,

        /// New name.
        #[arg(long)]
        name: Option<String>,

        /// New expiry date (YYYY-MM-DD).
        #[arg(short, long, value_parser = parse_date)]
        expires: Option<NaiveDate>,

        /// New quantity.
        #[arg(short, long)]
        quantity: Option<u32>,

        /// New category id.
        #[arg(long, conflicts_with = "clear_category")]
        category: Option<i64>,

        /// Remove the category reference.
        #[arg(long)]
        clear_category: bool,

        /// New location id.
        #[arg(long, conflicts_with = "clear_location")]
        location: Option<i64>,

        /// Remove the location reference.
        #[arg(long)]
        clear_location: bool,

        /// New reminder lead time in days.
        #[arg(long)]
        reminder: Option<u32>,

        /// New notes.
        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete a food item.
    Remove {
        /// Item id.
        id: i64,
    },

    /// Manage categories.
    Category {
        #[command(subcommand)]
        action: ReferenceAction,
    },

    /// Manage storage locations.
    Location {
        #[command(subcommand)]
        action: ReferenceAction,
    },

    /// Rename default categories and locations into another language.
    Language {
        /// Language code or name (en, es, fr, de).
        #[arg(value_parser = parse_language)]
        language: Language,
    },

    /// Show per-status counts.
    Dashboard,

    /// Show backend and cache diagnostics.
    Status,

    /// Delete all data and re-seed defaults.
    Reset {
        /// Confirm the reset.
        #[arg(long)]
        yes: bool,
    },
}

/// Category and location subcommands.
#[derive(Subcommand)]
enum ReferenceAction {
    /// List rows.
    List,
    /// Add a row.
    Add {
        /// Display name.
        name: String,
        /// Icon key.
        #[arg(long, default_value = "tag")]
        icon: String,
    },
    /// Rename a row or change its icon.
    Rename {
        /// Row id.
        id: i64,
        /// New display name.
        name: String,
        /// New icon key.
        #[arg(long)]
        icon: Option<String>,
    },
    /// Delete a row. Items pointing at it show as unknown.
    Remove {
        /// Row id.
        id: i64,
    },
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn parse_status(s: &str) -> Result<ExpiryStatus, String> {
    ExpiryStatus::parse(s).ok_or_else(|| format!("unknown status '{s}'"))
}

fn parse_language(s: &str) -> Result<Language, String> {
    Language::parse(s).ok_or_else(|| format!("unsupported language '{s}'"))
}

/// Main entry point.
fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            return ExitCode::FAILURE;
        },
    };

    let logging = if cli.verbose {
        config.logging.clone().verbose()
    } else {
        config.logging.clone()
    };
    if let Err(e) = init_logging(&logging) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Loads configuration.
fn load_config(cli: &Cli) -> anyhow::Result<StoreConfig> {
    let config = match &cli.config {
        Some(path) => StoreConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => StoreConfig::load_default(),
    };
    let mut config = config.with_env_overrides();
    if let Some(dir) = &cli.data_dir {
        config.data_dir.clone_from(dir);
    }
    config.validate()?;
    Ok(config)
}

/// Runs the selected command.
fn run_command(cli: Cli, config: &StoreConfig) -> anyhow::Result<()> {
    let store = FreshStore::open(config).context("opening inventory store")?;
    let cache = store.cache();
    cache.refresh_all().context("loading inventory")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let format = cli.format;

    match cli.command {
        Commands::Add {
            name,
            expires,
            quantity,
            category,
            location,
            reminder,
            notes,
            symbol,
            image,
        } => {
            let mut draft = FoodItemDraft::new(name, expires)
                .with_quantity(quantity)
                .with_reminder_days(reminder);
            draft.category_id = category;
            draft.location_id = location;
            draft.notes = notes;
            draft.image_uri = symbol.map(|s| ImageRef::symbol_uri(&s)).or(image);
            let id = cache.create_food_item(&draft)?;
            writeln!(out, "Added food item {id}")?;
        },

        Commands::List { status } => {
            let items = match status {
                Some(status) => cache.get_by_status(status),
                None => cache.food_items(),
            };
            match format {
                OutputFormat::Table => write_items_table(&mut out, &items)?,
                OutputFormat::Json => write_json(&mut out, &items)?,
            }
        },

        Commands::Update {
            id,
            name,
            expires,
            quantity,
            category,
            clear_category,
            location,
            clear_location,
            reminder,
            notes,
        } => {
            let Some(mut item) = cache.food_item_repository().get_by_id(id)? else {
                bail!("food item {id} does not exist");
            };
            if let Some(name) = name {
                item.name = name;
            }
            if let Some(expires) = expires {
                item.expiry_date = expires;
            }
            if let Some(quantity) = quantity {
                item.quantity = quantity;
            }
            if clear_category {
                item.category_id = None;
            } else if category.is_some() {
                item.category_id = category;
            }
            if clear_location {
                item.location_id = None;
            } else if location.is_some() {
                item.location_id = location;
            }
            if let Some(reminder) = reminder {
                item.reminder_days = reminder;
            }
            if notes.is_some() {
                item.notes = notes;
            }
            cache.update_food_item(&item)?;
            writeln!(out, "Updated food item {id}")?;
        },

        Commands::Remove { id } => {
            cache.delete_food_item(id)?;
            writeln!(out, "Removed food item {id}")?;
        },

        Commands::Category { action } => {
            run_reference(cache, ReferenceKind::Category, action, format, &mut out)?;
        },

        Commands::Location { action } => {
            run_reference(cache, ReferenceKind::Location, action, format, &mut out)?;
        },

        Commands::Language { language } => {
            cache.change_language(language)?;
            writeln!(out, "Default names switched to {language}")?;
        },

        Commands::Dashboard => {
            let counts = cache.dashboard_counts();
            match format {
                OutputFormat::Table => write_dashboard(&mut out, &counts)?,
                OutputFormat::Json => write_json(&mut out, &counts)?,
            }
        },

        Commands::Status => {
            let status = cache.get_cache_status();
            match format {
                OutputFormat::Table => {
                    write_status(&mut out, &status, store.supervisor().recovery_attempts())?;
                },
                OutputFormat::Json => write_json(&mut out, &status)?,
            }
        },

        Commands::Reset { yes } => {
            if !yes {
                bail!("reset deletes every item, category and location; pass --yes to confirm");
            }
            cache.reset()?;
            writeln!(out, "Inventory reset")?;
        },
    }
    Ok(())
}

/// Runs a category or location subcommand.
fn run_reference<W: Write>(
    cache: &CacheOrchestrator,
    kind: ReferenceKind,
    action: ReferenceAction,
    format: OutputFormat,
    out: &mut W,
) -> anyhow::Result<()> {
    match action {
        ReferenceAction::List => {
            let rows = match kind {
                ReferenceKind::Category => cache.categories(),
                ReferenceKind::Location => cache.locations(),
            };
            match format {
                OutputFormat::Table => write_references_table(out, &rows)?,
                OutputFormat::Json => write_json(out, &rows)?,
            }
        },
        ReferenceAction::Add { name, icon } => {
            let id = cache.create_reference(kind, &ReferenceDraft::new(name, icon))?;
            writeln!(out, "Added {kind} {id}")?;
        },
        ReferenceAction::Rename { id, name, icon } => {
            let repo = match kind {
                ReferenceKind::Category => cache.category_repository(),
                ReferenceKind::Location => cache.location_repository(),
            };
            let Some(mut row) = repo.get_by_id(id)? else {
                bail!("{kind} {id} does not exist");
            };
            row.name = name;
            if let Some(icon) = icon {
                row.icon = icon;
            }
            cache.update_reference(kind, &row)?;
            writeln!(out, "Updated {kind} {id}")?;
        },
        ReferenceAction::Remove { id } => {
            cache.delete_reference(kind, id)?;
            writeln!(out, "Removed {kind} {id}")?;
        },
    }
    Ok(())
}
