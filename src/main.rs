use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use budget_sheet_lib::commands::{self, AppState};
use budget_sheet_lib::config::{AppConfig, GenerationJob};
use budget_sheet_lib::logging::{format_line, LogHub, MemoryLog, RunLog};
use clap::{Parser, Subcommand};
use log::Level;
use serde::Serialize;

#[derive(Parser)]
#[command(
    name = "budget-sheet",
    about = "Turn a raw budget spreadsheet export into the formatted institutional budget."
)]
struct Cli {
    /// Also print debug messages.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Find the header row of a source spreadsheet.
    Locate { source: PathBuf },
    /// Show the rows, suggested column map and suggested levels of a source.
    Preview {
        source: PathBuf,
        /// 0-based header row (located automatically when omitted).
        #[arg(long)]
        header_row: Option<usize>,
        #[arg(long, default_value_t = 500)]
        max_rows: usize,
    },
    /// Generate a budget from a JSON job file.
    Generate { job: PathBuf },
    /// Write a blank template in the expected layout.
    InitTemplate { path: PathBuf },
    /// List recent generations.
    History {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Totals over every recorded generation.
    Stats,
    /// Autocomplete lists (institution, sector, requester, preparer, intern, fiscal).
    Lists {
        #[command(subcommand)]
        action: ListAction,
    },
    /// Saved column-map profiles.
    Profiles {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum ListAction {
    Show { list: String },
    Add { list: String, value: String },
    Remove { list: String, value: String },
}

#[derive(Subcommand)]
enum ProfileAction {
    List,
    Show { name: String },
    /// Store the mapping from a JSON file under `name`.
    Save { name: String, mapping: PathBuf },
    Delete { name: String },
}

fn build_log(config: &AppConfig, verbose: bool) -> LogHub {
    let mut hub = LogHub::new();
    hub.subscribe(move |level, message| {
        if verbose || level <= Level::Info {
            eprintln!("{}", format_line(level, message));
        }
    });
    if let Some(path) = &config.log_file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                let file = Mutex::new(file);
                hub.subscribe(move |level, message| {
                    if let Ok(mut f) = file.lock() {
                        let _ = writeln!(f, "{}", format_line(level, message));
                    }
                });
            }
            Err(e) => eprintln!("warning: cannot open log file {}: {}", path.display(), e),
        }
    }
    hub
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{}", text);
    Ok(())
}

fn run(cli: Cli, state: &AppState) -> Result<(), String> {
    match cli.command {
        Command::Locate { source } => print_json(&commands::locate(state, &source)?),
        Command::Preview {
            source,
            header_row,
            max_rows,
        } => print_json(&commands::preview(state, &source, header_row, max_rows)?),
        Command::Generate { job } => {
            let job = GenerationJob::from_file(&job)?;
            print_json(&commands::generate_budget(state, job)?)
        }
        Command::InitTemplate { path } => {
            let path = commands::init_template(state, &path)?;
            println!("{}", path.display());
            Ok(())
        }
        Command::History { limit } => print_json(&commands::get_history(state, limit)?),
        Command::Stats => print_json(&commands::get_stats(state)?),
        Command::Lists { action } => match action {
            ListAction::Show { list } => {
                for value in commands::list_values(state, &list)? {
                    println!("{}", value);
                }
                Ok(())
            }
            ListAction::Add { list, value } => {
                if !commands::add_list_value(state, &list, &value)? {
                    state.log.info("Value already present or blank; nothing added.");
                }
                Ok(())
            }
            ListAction::Remove { list, value } => {
                if !commands::remove_list_value(state, &list, &value)? {
                    return Err(format!("'{}' is not in the {} list.", value, list));
                }
                Ok(())
            }
        },
        Command::Profiles { action } => match action {
            ProfileAction::List => print_json(&commands::get_profiles(state)?),
            ProfileAction::Show { name } => print_json(&commands::get_profile(state, &name)?),
            ProfileAction::Save { name, mapping } => {
                let id = commands::save_profile(state, &name, &mapping)?;
                println!("{}", id);
                Ok(())
            }
            ProfileAction::Delete { name } => {
                if !commands::delete_profile(state, &name)? {
                    return Err(format!("Profile not found: {}", name));
                }
                Ok(())
            }
        },
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    // The hub needs the config, so config messages are held until it exists.
    let startup = MemoryLog::new();
    let config = AppConfig::load(&startup);
    let log: Arc<dyn RunLog> = Arc::new(build_log(&config, cli.verbose));
    for (level, message) in startup.entries() {
        log.log(level, &message);
    }
    let state = AppState::new(config, log);
    match run(cli, &state) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
