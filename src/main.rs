//! Binary entrypoint for the petcare CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml`
//! - `start` - run the tick scheduler and read console commands from stdin
//! - `leaderboard [-n <count>] [--json]` - print the oldest pets
//! - `show <owner_id> [--json]` - print one pet's status
//! - `purge --yes` - delete every pet
//!
//! See the library crate docs for module-level details: `petcare::`.
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};

use petcare::config::Config;
use petcare::pet::commands::{self, ConsoleParser};
use petcare::pet::scheduler::start_scheduler;
use petcare::pet::{ChannelNotifier, PetService, PetServiceBuilder, PetStoreBuilder};

#[derive(Parser)]
#[command(name = "petcare")]
#[command(about = "Persistent virtual pets with decay, freezes and weather")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Run the scheduler and the stdin command console
    Start,
    /// Print the oldest pets
    Leaderboard {
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show one owner's pet
    Show {
        owner_id: u64,
        /// Print the stored record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete every pet record
    Purge {
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        init_logging(&None, cli.verbose);
        Config::create_default(&cli.config).await?;
        info!("Configuration file created at {}", cli.config);
        return Ok(());
    }

    let config = match Config::load(&cli.config).await {
        Ok(cfg) => cfg,
        Err(e) if !std::path::Path::new(&cli.config).exists() => {
            init_logging(&None, cli.verbose);
            warn!("{}; using built-in defaults", e);
            Config::default()
        }
        Err(e) => return Err(e),
    };
    init_logging(&Some(config.clone()), cli.verbose);
    config.validate()?;

    match cli.command {
        // Written before any config exists
        Commands::Init => {}
        Commands::Start => run(config).await?,
        Commands::Leaderboard { count, json } => {
            let service = open_service(&config, None)?;
            let entries = service.leaderboard(count).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                println!("{}", commands::render_leaderboard(&entries));
            }
        }
        Commands::Show { owner_id, json } => {
            let service = open_service(&config, None)?;
            match service.status(owner_id).await {
                Ok(pet) if json => println!("{}", serde_json::to_string_pretty(&pet)?),
                Ok(pet) => println!("{}", commands::render_status(&pet, &service)),
                Err(e) => println!("{}", commands::render_error(&e)),
            }
        }
        Commands::Purge { yes } => {
            if !yes {
                return Err(anyhow!("refusing to purge without --yes"));
            }
            let service = open_service(&config, None)?;
            let removed = service.purge_all().await?;
            println!("Deleted {} pet(s).", removed);
        }
    }

    Ok(())
}

fn open_service(config: &Config, notifier: Option<ChannelNotifier>) -> Result<PetService> {
    let path = config.storage.pets_path();
    let store = PetStoreBuilder::new(&path)
        .open()
        .map_err(|e| anyhow!("Failed to open pet store at {}: {}", path.display(), e))?;
    let mut builder = PetServiceBuilder::new(Arc::new(store)).config(config);
    if let Some(notifier) = notifier {
        builder = builder.notifier(Arc::new(notifier));
    }
    Ok(builder.build()?)
}

async fn run(config: Config) -> Result<()> {
    info!("Starting petcare v{}", env!("CARGO_PKG_VERSION"));
    let (notifier, mut notices) = ChannelNotifier::new();
    let service = Arc::new(open_service(&config, Some(notifier))?);

    let printer = tokio::spawn(async move {
        while let Some(notice) = notices.recv().await {
            println!("[owner {}] {}", notice.owner_id, notice.message);
        }
    });

    let scheduler = start_scheduler(service.clone(), &config.schedule);
    let parser = ConsoleParser::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("petcare ready. Type '<owner_id> help' for commands.");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(text) => match parser.parse(&text) {
                        None => {}
                        Some(Ok(cmd)) => {
                            let reply = commands::handle(&service, cmd.owner_id, cmd.command).await;
                            println!("{}", reply);
                        }
                        Some(Err(msg)) => println!("{}", msg),
                    },
                    None => {
                        info!("stdin closed; shutting down");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received; shutting down");
                break;
            }
        }
    }

    scheduler.shutdown().await;
    // Last sender goes away with the service; the printer drains and exits.
    drop(service);
    let _ = printer.await;
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity wins; otherwise the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse::<log::LevelFilter>().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    // sled is chatty at debug
    builder.filter_module("sled", log::LevelFilter::Warn);

    let log_file = config
        .as_ref()
        .and_then(|c| c.logging.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

    match log_file {
        Some(f) => {
            let file = std::sync::Mutex::new(f);
            // Foreground runs echo to the console as well as the file
            let is_tty = atty::is(atty::Stream::Stderr);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = file.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
    }
    let _ = builder.try_init();
}
