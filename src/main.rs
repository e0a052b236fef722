#![forbid(unsafe_code)]

mod config;
mod constants;
mod platform;
mod reconcile;
mod service;
mod store;
mod types;
mod undo;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{Level as TraceLevel, Subscriber, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, reload};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;

use config::Config;
use platform::WindowSnapshotProvider;
use platform::x11::{WindowScan, X11Desktop};
use reconcile::{ReconcileReport, Reconciler};
use service::{LayoutService, SaveOutcome};
use store::{JsonFileStore, LayoutStore};
use types::Layout;
use undo::UndoStack;

#[derive(Parser, Debug)]
#[command(name = "folder-layout", version, about = "Save and restore file manager window layouts")]
struct Cli {
    /// Config file (default: <config_dir>/folder-layout/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Layouts file, overrides the config file
    #[arg(long, global = true)]
    layouts: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture the open folder windows under NAME
    Save {
        name: String,
        /// Overwrite an existing layout without asking
        #[arg(long)]
        force: bool,
    },
    /// Close, open and move folder windows to match NAME
    Restore { name: String },
    /// List saved layouts
    List,
    /// Show the windows stored in NAME
    Show { name: String },
    /// Delete a saved layout
    Delete { name: String },
    /// Print the folder windows currently open
    Windows,
    /// Interactive session; keeps an undo history while it runs
    Shell,
}

/// Commands accepted inside `shell`
#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
enum ShellCommand {
    Save {
        name: String,
        #[arg(long)]
        force: bool,
    },
    Restore { name: String },
    /// Go back to the arrangement before the last restore or undo
    Undo,
    List,
    Show { name: String },
    Delete { name: String },
    Windows,
    #[command(alias = "exit")]
    Quit,
}

fn parse_level(level: &str) -> TraceLevel {
    match level.to_lowercase().as_str() {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    }
}

/// Formatting subscriber plus a setter for its level once the config is known
fn logging<W>(
    initial: TraceLevel,
    writer: W,
) -> (impl Subscriber + Send + Sync + 'static, impl Fn(TraceLevel) -> Result<()>)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let (filter, handle) = reload::Layer::new(LevelFilter::from_level(initial));
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer));
    let set_level = move |level: TraceLevel| {
        handle
            .reload(LevelFilter::from_level(level))
            .context("Failed to change log level")
    };
    (subscriber, set_level)
}

fn list_layouts<S: LayoutStore>(service: &LayoutService<S>) -> Result<()> {
    if service.layouts().is_empty() {
        println!("No saved layouts.");
        return Ok(());
    }
    for layout in service.layouts() {
        println!(
            "{:<24} {:>3} window(s)  saved {}",
            layout.name,
            layout.windows.len(),
            layout.saved_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

fn show_layout<S: LayoutStore>(service: &LayoutService<S>, name: &str) -> Result<()> {
    let layout = find_layout(service, name)?;
    println!("{} (saved {})", layout.name, layout.saved_at.format("%Y-%m-%d %H:%M:%S"));
    for window in &layout.windows {
        println!("  {:<20} {}", window.rect.to_string(), window.path);
    }
    Ok(())
}

fn delete_layout<S: LayoutStore>(service: &mut LayoutService<S>, name: &str) -> Result<()> {
    if service.delete(name)? {
        println!("Deleted '{}'.", name);
        Ok(())
    } else {
        Err(anyhow!("No layout named '{}'", name))
    }
}

fn find_layout<'s, S: LayoutStore>(service: &'s LayoutService<S>, name: &str) -> Result<&'s Layout> {
    service
        .get(name)
        .ok_or_else(|| anyhow!("No layout named '{}'", name))
}

fn confirm_overwrite(existing: &Layout) -> bool {
    print!(
        "A layout named '{}' already exists ({} window(s), saved {}). Overwrite? [y/N] ",
        existing.name,
        existing.windows.len(),
        existing.saved_at.format("%Y-%m-%d %H:%M")
    );
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

fn save_layout<S: LayoutStore>(
    service: &mut LayoutService<S>,
    provider: &dyn WindowSnapshotProvider,
    name: &str,
    force: bool,
) -> Result<()> {
    let live = provider
        .list_live_windows()
        .context("Failed to capture open folder windows")?;
    match service.save(name, live, |existing| force || confirm_overwrite(existing))? {
        SaveOutcome::Created(layout) => {
            println!("Saved '{}' with {} window(s).", layout.name, layout.windows.len())
        }
        SaveOutcome::Overwritten(layout) => {
            println!("Overwrote '{}' with {} window(s).", layout.name, layout.windows.len())
        }
        SaveOutcome::Aborted => println!("Kept existing '{}'.", name),
    }
    Ok(())
}

fn print_report(report: &ReconcileReport) {
    println!("{report}");
    if report.is_converged() {
        println!("All windows in place.");
    }
    for path in &report.unresolved {
        println!("  did not appear: {path}");
    }
    for failure in &report.failures {
        println!("  {} failed for {}: {}", failure.operation, failure.path, failure.message);
    }
}

fn restore_layout<S: LayoutStore>(
    service: &LayoutService<S>,
    reconciler: &Reconciler<'_>,
    name: &str,
) -> Result<()> {
    let layout = find_layout(service, name)?;
    let report = reconciler.reconcile(layout)?;
    print_report(&report);
    Ok(())
}

/// Shown when file manager windows exist but their titles are bare folder names
fn title_hint(scan: &WindowScan) -> Option<String> {
    if scan.non_path_titles.is_empty() {
        return None;
    }
    Some(format!(
        "{} file manager window(s) skipped because the title is not a folder path ({}). \
         Enable \"show full path in title\" in the file manager to include them.",
        scan.non_path_titles.len(),
        scan.non_path_titles.join(", ")
    ))
}

fn list_windows(desktop: &X11Desktop) -> Result<()> {
    let scan = desktop.scan()?;
    if scan.folders.is_empty() {
        println!("No folder windows open.");
    }
    if let Some(hint) = title_hint(&scan) {
        println!("{hint}");
    }
    for window in &scan.folders {
        println!(
            "{:<12} {:<20} {}  [{}] {}",
            window.handle.to_string(),
            window.rect.to_string(),
            window.path,
            window.display_name,
            window.location_url
        );
    }
    Ok(())
}

fn run_shell<S: LayoutStore>(
    service: &mut LayoutService<S>,
    desktop: &X11Desktop,
    reconciler: &Reconciler<'_>,
    undo: &UndoStack,
) -> Result<()> {
    println!("folder-layout shell. Type 'help' for commands, 'quit' to leave.");
    loop {
        if undo.is_empty() {
            print!("folder-layout> ");
        } else {
            print!("folder-layout [{} undo]> ", undo.len());
        }
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line).context("Failed to read command")? == 0 {
            println!();
            return Ok(());
        }
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }

        let command = match ShellCommand::try_parse_from(words) {
            Ok(command) => command,
            Err(err) => {
                let _ = err.print();
                continue;
            }
        };

        let result = match command {
            ShellCommand::Save { name, force } => save_layout(service, desktop, &name, force),
            ShellCommand::Restore { name } => restore_layout(service, reconciler, &name),
            ShellCommand::Undo => {
                if let Some(captured_at) = undo.peek_captured_at() {
                    println!("Returning to windows as of {}", captured_at.format("%H:%M:%S"));
                }
                match reconciler.undo() {
                    Ok(Some(report)) => {
                        print_report(&report);
                        Ok(())
                    }
                    Ok(None) => {
                        println!("Nothing to undo.");
                        Ok(())
                    }
                    Err(e) => Err(e.into()),
                }
            }
            ShellCommand::List => list_layouts(service),
            ShellCommand::Show { name } => show_layout(service, &name),
            ShellCommand::Delete { name } => delete_layout(service, &name),
            ShellCommand::Windows => list_windows(desktop),
            ShellCommand::Quit => return Ok(()),
        };
        if let Err(e) = result {
            println!("error: {e:#}");
        }
    }
}

fn connect(config: &Config) -> Result<X11Desktop> {
    X11Desktop::connect(config.file_manager.clone())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Installed before the config is read so its clamp warnings are visible
    let env_level = std::env::var("LOG_LEVEL").ok();
    let (subscriber, set_level) = logging(parse_level(env_level.as_deref().unwrap_or("info")), io::stderr);
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load_from(&config_path)?;

    // LOG_LEVEL wins over the config file
    if env_level.is_none() {
        set_level(parse_level(&config.log_level))?;
    }

    let layouts_path = cli
        .layouts
        .clone()
        .or_else(|| config.layouts_path.clone())
        .unwrap_or_else(JsonFileStore::default_path);
    info!(config = %config_path.display(), layouts = %layouts_path.display(), "Starting folder-layout");
    let mut service = LayoutService::load(JsonFileStore::new(layouts_path))?;

    match cli.command {
        Command::List => list_layouts(&service),
        Command::Show { name } => show_layout(&service, &name),
        Command::Delete { name } => delete_layout(&mut service, &name),
        Command::Save { name, force } => {
            let desktop = connect(&config)?;
            save_layout(&mut service, &desktop, &name, force)
        }
        Command::Windows => {
            let desktop = connect(&config)?;
            list_windows(&desktop)
        }
        Command::Restore { name } => {
            let desktop = connect(&config)?;
            let undo = UndoStack::new(config.undo_depth);
            let reconciler = Reconciler::new(&desktop, &desktop, &undo, config.settle.policy());
            restore_layout(&service, &reconciler, &name)
        }
        Command::Shell => {
            let desktop = connect(&config)?;
            let undo = UndoStack::new(config.undo_depth);
            let reconciler = Reconciler::new(&desktop, &desktop, &undo, config.settle.policy());
            run_shell(&mut service, &desktop, &reconciler, &undo)
        }
    }
}
