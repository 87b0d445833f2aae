// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "fitcheck")]
#[command(about = "Take an outfit photo and get a critique from a vision model")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras
    Devices,

    /// Capture one photo and print its critique
    Check {
        /// Image file fed to the software camera (default: generated test pattern)
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Use the front camera
        #[arg(short, long)]
        front: bool,

        /// Model id (overrides the config file)
        #[arg(short, long)]
        model: Option<String>,

        /// Capture and encode only; skip the critique request
        #[arg(long)]
        no_feedback: bool,
    },

    /// Encode an image the way it is sent for critique
    Encode {
        /// Image file to encode
        image: PathBuf,

        /// Write the base64 payload here instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Bound for both width and height
        #[arg(long)]
        max_dim: Option<u32>,

        /// Quality factor in (0, 1]
        #[arg(short, long)]
        quality: Option<f32>,
    },

    /// Show the effective configuration
    Config {
        /// Write the default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=fitcheck=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices => cli::list_devices(),
        Commands::Check {
            source,
            front,
            model,
            no_feedback,
        } => cli::check_outfit(source, front, model, no_feedback),
        Commands::Encode {
            image,
            output,
            max_dim,
            quality,
        } => cli::encode_image(image, output, max_dim, quality),
        Commands::Config { init } => cli::show_config(init),
    }
}
