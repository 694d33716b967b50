use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clonenux_core::config::{Config, LoggingLevel};
use clonenux_core::{Inventory, ScanReport};
use clonenux_inventory::render;
use colored::Colorize;
use std::path::PathBuf;
use tracing::{info, warn};

mod logging;

const BANNER: &str = "Select the device to backup.";

#[derive(Debug, Parser)]
#[command(name = "clonenux", version, about = "List block devices that can be backed up")]
struct Cli {
    /// Configuration file (defaults to $XDG_CONFIG_HOME/clonenux/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Maximum number of devices to list
    #[arg(long, global = true)]
    max_entries: Option<usize>,

    /// error, warn, info, debug or trace
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Skip the selection banner
    #[arg(long, global = true)]
    no_banner: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the numbered device menu (default)
    List,
    /// Print the full scan report as JSON
    Scan {
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    logging::init(&config.logging);

    let report = scan(&config).context("device discovery unavailable")?;

    match cli.command.unwrap_or(Command::List) {
        Command::List => print_menu(&report.inventory, !cli.no_banner),
        Command::Scan { pretty } => {
            if pretty {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", serde_json::to_string(&report)?);
            }
        }
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).context("load configuration")?;
    if let Some(max_entries) = cli.max_entries {
        config.inventory.max_entries = max_entries;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.parse::<LoggingLevel>()?;
    }
    config.validate()?;
    Ok(config)
}

fn scan(config: &Config) -> Result<ScanReport> {
    #[cfg(target_os = "linux")]
    {
        let source = clonenux_host_linux::SysfsDeviceSource::from_config(&config.discovery);
        Ok(clonenux_inventory::Scanner::from_config(source, config).scan()?)
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = config;
        Err(clonenux_core::InventoryError::UnsupportedPlatform {
            details: format!("no block device source for {}", std::env::consts::OS),
        }
        .into())
    }
}

fn print_menu(inventory: &Inventory, banner: bool) {
    if inventory.is_empty() {
        warn!("no selectable block devices found");
    } else if inventory.is_truncated() {
        info!(
            listed = inventory.len(),
            not_shown = inventory.overflow,
            max_entries = inventory.max_entries,
            "device menu truncated"
        );
    }
    for line in menu_lines(inventory, banner) {
        println!("{line}");
    }
}

/// The selection menu: optional banner, one line per entry, then a note when
/// the inventory is empty or was cut short.
fn menu_lines(inventory: &Inventory, banner: bool) -> Vec<String> {
    let mut lines = Vec::with_capacity(inventory.len() + 2);
    if banner {
        lines.push(message(BANNER));
    }
    if inventory.is_empty() {
        lines.push("No selectable block devices found.".to_string());
        return lines;
    }
    lines.extend(render(&inventory.entries));
    if inventory.is_truncated() {
        lines.push(format!(
            "{} more device(s) not shown (limit {}, see --max-entries)",
            inventory.overflow, inventory.max_entries
        ));
    }
    lines
}

fn message(text: &str) -> String {
    format!(">>> {text}").black().on_bright_white().blink().to_string()
}
