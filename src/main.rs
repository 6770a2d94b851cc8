mod cloudflare;
mod engine;
mod errors;
mod history;
mod netinfo;
mod results;
mod stats;
mod tui;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use clap_verbosity_flag::{ErrorLevel, Verbosity};
use colored::Colorize;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use log::debug;

use crate::cloudflare::{Client, DEFAULT_BASE_URL};
use crate::engine::{Orchestrator, TestConfig};
use crate::errors::{exit_codes, format_error_for_display, SpeedTestError};
use crate::history::{HistoryStore, JsonFileHistory, DEFAULT_CAPACITY};
use crate::netinfo::NetworkInfoProbe;
use crate::results::{ServerInfo, TestResult, VpnStatus};
use crate::tui::{DisplayMode, NullProgress, ProgressCallback, TuiController};

/// Version string reported by --version, including the git revision
/// the binary was built from.
const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (rev ",
    env!("NETSCOPE_BUILD_GIT_HASH"),
    ")"
);

/// Measure download/upload throughput, latency, and jitter from the
/// terminal.
#[derive(Parser)]
#[command(author, version = VERSION, about, long_about = None)]
struct Cli {
    /// Emit the result as JSON instead of rendering the TUI
    #[arg(long)]
    json: bool,

    /// Report the connection as running through a VPN
    #[arg(long)]
    simulate_vpn: bool,

    /// List stored results instead of running a test
    #[arg(long)]
    history: bool,

    /// Number of history entries to list
    #[arg(long, default_value_t = history::DEFAULT_LIST_LIMIT)]
    limit: usize,

    /// File the result history is stored in
    #[arg(long, default_value = "netscope-history.json")]
    history_file: PathBuf,

    /// Base URL of the measurement endpoint
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    server_url: String,

    #[command(flatten)]
    verbosity: Verbosity<ErrorLevel>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbosity.log_level_filter())
        .init();

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            eprintln!("{}", format_error_for_display(&error));
            std::process::exit(error.kind.exit_code());
        }
    }
}

async fn run(cli: Cli) -> Result<i32, SpeedTestError> {
    if cli.history {
        return list_history(&cli);
    }

    let mode = DisplayMode::detect(cli.json, std::io::stdout().is_terminal());
    debug!("Display mode: {:?}", mode);

    let client = Client::new(&cli.server_url)?;
    let network = NetworkInfoProbe::new(cli.simulate_vpn).probe().await;
    let server = ServerInfo::pick(client.host());

    let history: Box<dyn HistoryStore> = Box::new(JsonFileHistory::open(
        cli.history_file.clone(),
        DEFAULT_CAPACITY,
    ));

    let mut controller = TuiController::new(mode);
    controller.set_metadata(server.clone(), network.clone());

    let progress: Arc<dyn ProgressCallback> = match mode {
        DisplayMode::Tui => controller.progress_callback(),
        _ => Arc::new(NullProgress),
    };

    let orchestrator = Arc::new(Orchestrator::new(
        TestConfig::default(),
        client,
        history,
        progress,
    ));

    // Ctrl+C in the non-TUI modes; in raw mode the key arrives as a
    // terminal event instead.
    {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                orchestrator.cancel();
            }
        });
    }

    controller.init()?;

    let run_task = {
        let orchestrator = Arc::clone(&orchestrator);
        let network = network.clone();
        let server = server.clone();
        tokio::spawn(async move { orchestrator.run(network, server).await })
    };

    if controller.mode() == DisplayMode::Tui {
        while !run_task.is_finished() {
            controller.render()?;
            if poll_cancel_keys()? {
                orchestrator.cancel();
            }
        }
    }

    let outcome = run_task.await.map_err(|e| {
        SpeedTestError::io(format!("test task failed: {}", e))
    })?;

    match outcome {
        Ok(result) => {
            if controller.mode() == DisplayMode::Tui {
                controller.show_result(&result)?;
                wait_for_quit()?;
            }
            controller.cleanup()?;

            match controller.mode() {
                DisplayMode::Json => {
                    let json = serde_json::to_string_pretty(&result)
                        .map_err(|e| {
                            SpeedTestError::io(format!(
                                "could not serialize result: {}",
                                e
                            ))
                        })?;
                    println!("{}", json);
                }
                _ => print_summary(&result),
            }

            Ok(exit_codes::SUCCESS)
        }
        Err(error) if error.is_cancelled() => {
            controller.cleanup()?;
            eprintln!("Test cancelled.");
            Ok(exit_codes::CANCELLED)
        }
        Err(error) => {
            controller.cleanup()?;
            Err(error)
        }
    }
}

/// Poll for a cancel key without blocking the render cadence.
fn poll_cancel_keys() -> Result<bool, SpeedTestError> {
    if !event::poll(Duration::from_millis(50))
        .map_err(|e| SpeedTestError::from_io("polling input", e))?
    {
        return Ok(false);
    }

    let event = event::read()
        .map_err(|e| SpeedTestError::from_io("reading input", e))?;

    if let Event::Key(key) = event {
        if key.kind == KeyEventKind::Press {
            let cancel = matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)
                || (key.code == KeyCode::Char('c')
                    && key.modifiers.contains(KeyModifiers::CONTROL));
            return Ok(cancel);
        }
    }

    Ok(false)
}

/// Block until the user dismisses the final TUI frame.
fn wait_for_quit() -> Result<(), SpeedTestError> {
    loop {
        if !event::poll(Duration::from_millis(250))
            .map_err(|e| SpeedTestError::from_io("polling input", e))?
        {
            continue;
        }

        let event = event::read()
            .map_err(|e| SpeedTestError::from_io("reading input", e))?;

        if let Event::Key(key) = event {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc | KeyCode::Enter => {
                    return Ok(())
                }
                KeyCode::Char('c')
                    if key.modifiers.contains(KeyModifiers::CONTROL) =>
                {
                    return Ok(())
                }
                _ => {}
            }
        }
    }
}

fn print_summary(result: &TestResult) {
    println!();
    println!(
        "{} {} {}",
        "Server:".bold().white(),
        result.server_location.bright_blue(),
        format!("({})", result.server_host).bright_blue()
    );
    println!(
        "{} {} {}",
        "Your IP:".bold().white(),
        result.ip_address.bright_blue(),
        format!("({})", result.isp).bright_blue()
    );
    println!("{} {:.2} ms", "Ping:".bold().white(), result.ping_ms);
    println!("{} {:.2} ms", "Jitter:".bold().white(), result.jitter_ms);
    println!(
        "{} {}",
        "Download:".bold().white(),
        format!("{:.2} Mbps", result.download_mbps).bright_cyan()
    );
    println!(
        "{} {}",
        "Upload:".bold().white(),
        format!("{:.2} Mbps", result.upload_mbps).bright_cyan()
    );

    if result.vpn_status == VpnStatus::Active {
        let provider = result.vpn_provider.as_deref().unwrap_or("active");
        println!("{} {}", "VPN:".bold().white(), provider.bright_magenta());
    }

    if result.simulated {
        println!(
            "{}",
            "Endpoint unreachable, values are simulated.".yellow()
        );
    }
}

fn list_history(cli: &Cli) -> Result<i32, SpeedTestError> {
    let store =
        JsonFileHistory::open(cli.history_file.clone(), DEFAULT_CAPACITY);
    let entries = store.recent(cli.limit);

    if entries.is_empty() {
        println!("No stored results.");
        return Ok(exit_codes::SUCCESS);
    }

    for entry in entries {
        let marker = if entry.simulated { " (simulated)" } else { "" };
        println!(
            "{}  {} {}  {} {}  {} {:.2} ms{}",
            entry
                .created_at
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
                .bright_blue(),
            "down".bold().white(),
            format!("{:.2} Mbps", entry.download_mbps).bright_cyan(),
            "up".bold().white(),
            format!("{:.2} Mbps", entry.upload_mbps).bright_cyan(),
            "ping".bold().white(),
            entry.ping_ms,
            marker.yellow()
        );
    }

    Ok(exit_codes::SUCCESS)
}
