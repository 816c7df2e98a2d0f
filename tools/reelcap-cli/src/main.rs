//! Reelcap CLI — capture, staging server, finalize, and maintenance.
//!
//! Usage:
//!   reelcap serve [OPTIONS]       Run the staging/finalize server
//!   reelcap capture [OPTIONS]     Capture a synthetic source against a server
//!   reelcap finalize <SESSION>    Finalize a staged session locally
//!   reelcap reap [OPTIONS]        Remove stale staging partitions
//!   reelcap check                 Check encoder availability

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "reelcap",
    about = "Batched frame capture and video encode pipeline",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the staging/finalize server
    Serve {
        /// Listen address (overrides config)
        #[arg(long)]
        addr: Option<String>,

        /// Staging storage root (overrides config)
        #[arg(long)]
        storage_root: Option<PathBuf>,

        /// Encode strategy: image-sequence | concat-manifest
        #[arg(long)]
        strategy: Option<String>,

        /// Session TTL for the orphan reaper, in seconds
        #[arg(long)]
        session_ttl: Option<u64>,
    },

    /// Run a synthetic capture against a server
    Capture {
        /// Server base URL
        #[arg(long, default_value = "http://127.0.0.1:8787")]
        server: String,

        /// Session id (generated from the current time when omitted)
        #[arg(long)]
        session: Option<String>,

        /// Source duration in seconds
        #[arg(long, default_value = "2.0")]
        duration: f64,

        /// Sampling frame rate
        #[arg(long, default_value = "30")]
        fps: u32,

        /// Frame width
        #[arg(long, default_value = "640")]
        width: u32,

        /// Frame height
        #[arg(long, default_value = "480")]
        height: u32,

        /// Frames per upload batch
        #[arg(long, default_value = "30")]
        batch_size: u32,

        /// Solid fill color as RRGGBB hex
        #[arg(long, default_value = "4080c0")]
        color: String,

        /// Local delivery path for the finalized video
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Owner for the published video
        #[arg(long, default_value = "local")]
        owner: String,

        /// Skip publishing to the server's object store
        #[arg(long)]
        no_publish: bool,
    },

    /// Finalize a staged session against the local store (no server)
    Finalize {
        /// Session id
        session: String,

        /// Total frames that must be staged
        #[arg(long)]
        total_frames: u64,

        /// Playback frame rate
        #[arg(long, default_value = "30")]
        fps: u32,

        /// Frame width
        #[arg(long, default_value = "640")]
        width: u32,

        /// Frame height
        #[arg(long, default_value = "480")]
        height: u32,

        /// Staging storage root (overrides config)
        #[arg(long)]
        storage_root: Option<PathBuf>,

        /// Encode strategy: image-sequence | concat-manifest
        #[arg(long)]
        strategy: Option<String>,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Remove staging partitions older than the TTL
    Reap {
        /// Age threshold in seconds
        #[arg(long, default_value = "3600")]
        ttl: u64,

        /// Staging storage root (overrides config)
        #[arg(long)]
        storage_root: Option<PathBuf>,
    },

    /// Check encoder availability
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    reelcap_common::logging::init_logging(&reelcap_common::config::LoggingConfig {
        level: log_level.to_string(),
        json: false,
        file: None,
    });

    match cli.command {
        Commands::Serve {
            addr,
            storage_root,
            strategy,
            session_ttl,
        } => commands::serve::run(addr, storage_root, strategy, session_ttl).await,
        Commands::Capture {
            server,
            session,
            duration,
            fps,
            width,
            height,
            batch_size,
            color,
            output,
            owner,
            no_publish,
        } => {
            commands::capture::run(commands::capture::CaptureArgs {
                server,
                session,
                duration,
                fps,
                width,
                height,
                batch_size,
                color,
                output,
                owner,
                no_publish,
            })
            .await
        }
        Commands::Finalize {
            session,
            total_frames,
            fps,
            width,
            height,
            storage_root,
            strategy,
            output,
        } => {
            commands::finalize::run(
                session,
                total_frames,
                fps,
                width,
                height,
                storage_root,
                strategy,
                output,
            )
            .await
        }
        Commands::Reap { ttl, storage_root } => commands::reap::run(ttl, storage_root),
        Commands::Check => commands::check::run(),
    }
}
