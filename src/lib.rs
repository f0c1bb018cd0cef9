use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod capture;
pub mod error;
pub mod inspect;
pub mod nbt;
pub mod server;
pub mod util;

use capture::{CsvLog, Sampler, SaveFile, SetupConfig};
use server::{StaticServer, VIEWER_ASSET};

/// Periodically log a player's position from a Minecraft save and serve
/// the log with a small viewer page.
#[derive(Parser)]
#[command(name = "poscapture")]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub capture: CaptureArgs,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, env = "POSCAPTURE_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long, env = "POSCAPTURE_LOG_JSON", global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print what a player .dat file contains
    Inspect {
        /// Path to the .dat file
        file: PathBuf,

        /// Dump the whole decoded tree as JSON
        #[arg(long)]
        full: bool,
    },
}

#[derive(Args)]
pub struct CaptureArgs {
    /// Project folder holding setup.json, userlog/ and the viewer
    #[arg(long)]
    pub root: Option<String>,

    /// Configuration file (defaults to <root>/setup.json)
    #[arg(short, long, env = "POSCAPTURE_CONFIG")]
    pub config: Option<String>,

    /// Log every tick even when the position has not changed
    #[arg(long)]
    pub force_same: bool,

    /// Viewer server port (overrides serverPort)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Viewer server address
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    /// Do not start the viewer server
    #[arg(long)]
    pub no_server: bool,
}

/// Install the global tracing subscriber.
pub fn init_tracing(log_level: &str, json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| log_level.into());

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Command::Inspect { file, full }) => {
            let report = inspect::inspect_file(&file, full)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            println!("{report}");
            Ok(())
        }
        None => start_capture(cli.capture).await,
    }
}

async fn start_capture(args: CaptureArgs) -> anyhow::Result<()> {
    let root = match args.root {
        Some(root) => PathBuf::from(util::expand_tilde(&root)),
        None => std::env::current_dir().context("Cannot determine the current directory")?,
    };
    let config_path = args
        .config
        .map(|c| PathBuf::from(util::expand_tilde(&c)))
        .unwrap_or_else(|| root.join("setup.json"));

    let config = SetupConfig::load(&config_path)?;
    let paths = config.resolve_paths(&root)?;
    paths
        .prepare()
        .with_context(|| format!("Cannot create {}", paths.userlog_dir.display()))?;

    let force_same = args.force_same || config.force_same();
    let interval = config.interval();

    if !args.no_server {
        let addr = SocketAddr::new(args.host, args.port.unwrap_or(config.server_port()));
        // The viewer is optional; capture keeps running without it.
        match StaticServer::bind(root.clone(), addr).await {
            Ok(server) => {
                tracing::info!(url = %format!("http://{addr}/{VIEWER_ASSET}"), "Static server started");
                server.spawn();
            }
            Err(e) => {
                tracing::warn!(%addr, error = %e, "Could not start static server");
            }
        }
    }

    let sink = CsvLog::new(&paths.log_path);
    tracing::info!(
        world = config.savename.as_deref().unwrap_or_default(),
        player = config.username.as_deref().unwrap_or_default(),
        interval_ms = interval.as_millis() as u64,
        force_same,
        save = %paths.dat_path.display(),
        log = %sink.path().display(),
        "Position capture started"
    );

    let sampler = Sampler::new(SaveFile::new(&paths.dat_path), sink, force_same);
    let capture = tokio::spawn(sampler.run(interval));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    tracing::info!("Stopping position capture");
    capture.abort();
    Ok(())
}
