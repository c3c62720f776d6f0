//! wsterm CLI - shells and job streams on remote targets.
//!
//! This is the main binary entry point. See the `wsterm` library for the
//! tunnel itself.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use wsterm::{commands, Config};

/// Global allocator configured per M-MIMALLOC-APPS guideline.
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

// CLI
#[derive(Parser)]
#[command(name = "wsterm")]
#[command(version)]
#[command(about = "Remote terminal over a WebSocket tunnel")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a shell on a remote target
    Shell {
        /// Target identifier (e.g. machine name or id)
        target: String,
        /// API resource the target belongs to (default from config)
        #[arg(long)]
        resource: Option<String>,
    },
    /// Stream the live output of a running job
    Stream {
        /// Job identifier
        job_id: String,
    },
}

/// Logs go to a file: the terminal is in raw mode while a session runs.
fn init_logging() {
    let log_path = Config::log_path();
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format_timestamp_secs();
    match std::fs::File::create(&log_path) {
        Ok(log_file) => {
            builder.target(env_logger::Target::Pipe(Box::new(log_file)));
        }
        Err(e) => {
            eprintln!("Warning: could not create log file {:?}: {}", log_path, e);
            builder.filter_level(log::LevelFilter::Off);
        }
    }
    builder.init();
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;

    let result = runtime.block_on(async {
        match cli.command {
            Commands::Shell { target, resource } => {
                commands::shell::run(&config, &target, resource.as_deref()).await
            }
            Commands::Stream { job_id } => commands::stream::run(&config, &job_id).await,
        }
    });

    // A stdin read may still be parked on a blocking thread; don't wait for it.
    runtime.shutdown_background();
    result
}

fn main() {
    init_logging();

    // Set up panic hook to log panics and ensure terminal cleanup
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        log::error!("PANIC: {:?}", panic_info);

        // Ensure terminal is cleaned up before printing panic
        let _ = crossterm::terminal::disable_raw_mode();

        default_hook(panic_info);
    }));

    let cli = Cli::parse();
    log::info!("wsterm v{} starting", env!("CARGO_PKG_VERSION"));

    let code = match run(cli) {
        Ok(()) => 0,
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    };
    std::process::exit(code);
}
