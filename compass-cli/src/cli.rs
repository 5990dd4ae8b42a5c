use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use compass_core::{Config, Notice, QueryController, WeatherApiClient};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "compass", version, about = "Weather compass for Colombo, Sri Lanka")]
pub struct Cli {
    /// Override the configured WeatherAPI.com key for this run.
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the WeatherAPI.com API key interactively.
    Configure,

    /// Fetch current conditions once, render them, and exit.
    Show,

    /// Live dashboard: auto-refreshes periodically; 'r' retries, 'q' quits.
    Watch,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let mut config = Config::load()?;
        if let Some(key) = self.api_key {
            config.api_key = key;
        }

        match self.command.unwrap_or(Command::Watch) {
            Command::Configure => configure(config),
            Command::Show => show(config).await,
            Command::Watch => watch(config).await,
        }
    }
}

fn build_controller(config: &Config) -> QueryController {
    let fetcher = WeatherApiClient::new(config.api_key.clone(), config.endpoint.clone());
    QueryController::new(Box::new(fetcher), config.location.clone(), config.retry_attempts)
}

fn configure(mut config: Config) -> Result<()> {
    let key = inquire::Password::new("WeatherAPI.com API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    config.api_key = key.trim().to_string();
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn show(config: Config) -> Result<()> {
    warn_if_degraded(&config);

    let mut controller = build_controller(&config);
    let notice = controller.start().await;

    print!("{}", render::header());
    if let Some(notice) = &notice {
        println!("{}", render::render_notice(notice));
    }
    println!("{}", render::render(&controller.view()));
    Ok(())
}

async fn watch(config: Config) -> Result<()> {
    warn_if_degraded(&config);
    info!(minutes = config.refresh_minutes, "starting watch loop");

    let mut controller = build_controller(&config);
    redraw(&controller, None);

    let notice = controller.start().await;
    redraw(&controller, notice.as_ref());

    let mut ticker = tokio::time::interval(config.refresh_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of a fresh interval completes immediately.
    ticker.tick().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let notice = controller.tick().await;
                redraw(&controller, notice.as_ref());
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read from stdin")? else {
                    break;
                };
                match line.trim() {
                    "q" | "quit" => break,
                    "r" | "refresh" => {
                        let notice = controller.refetch().await;
                        redraw(&controller, notice.as_ref());
                    }
                    "" => {}
                    other => println!("Unknown command '{other}' (r = refresh, q = quit)"),
                }
            }
        }
    }

    Ok(())
}

fn redraw(controller: &QueryController, notice: Option<&Notice>) {
    // Clear the screen and move the cursor home.
    print!("\x1b[2J\x1b[H");
    print!("{}", render::header());
    println!();
    if let Some(notice) = notice {
        println!("{}", render::render_notice(notice));
        println!();
    }
    println!("{}", render::render(&controller.view()));
    println!("[r] refresh   [q] quit");
}

fn warn_if_degraded(config: &Config) {
    if !config.has_real_key() {
        warn!("no WeatherAPI.com key configured; live fetches will fail and demo data will show");
    }
}
