// SPDX-License-Identifier: GPL-3.0-only

use cardcam::Config;
use cardcam::card::CaptureType;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "cardcam")]
#[command(about = "Multi-lens capture and card composition, driven by a virtual camera")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the lenses of the virtual device
    List {
        /// Show the front-facing lenses instead of the back ones
        #[arg(long)]
        front: bool,
    },

    /// Show which lens serves each zoom factor
    Zoom {
        /// Zoom factors to apply in order
        #[arg(required = true, num_args = 1.., allow_negative_numbers = true)]
        factors: Vec<f64>,
    },

    /// Compose an image file into a card
    Render {
        /// Source image
        input: PathBuf,

        /// Output file (.png or .jpg)
        #[arg(short, long)]
        output: PathBuf,

        /// Card type: vehicle, location or driver
        #[arg(short = 't', long = "type", default_value = "vehicle")]
        capture_type: CaptureType,

        #[arg(long, default_value = "1.0")]
        scale: f64,

        /// Quarter turns clockwise (negative for counter-clockwise)
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        rotate: i32,

        #[arg(long)]
        flip_horizontal: bool,

        #[arg(long)]
        flip_vertical: bool,

        /// Offset in display units, e.g. `--offset 12 -4`
        #[arg(long, num_args = 2, allow_negative_numbers = true)]
        offset: Option<Vec<f64>>,
    },

    /// Run the live filtered preview at the configured viewport
    Preview {
        /// Filter id (mono, sepia, noir, vivid, ...)
        #[arg(short, long)]
        filter: Option<String>,

        /// Number of preview updates to show
        #[arg(short = 'n', long, default_value = "30")]
        frames: usize,

        /// Save the last filtered frame (.png or .jpg)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Capture a still from the virtual camera and compose it into a card
    Photo {
        /// Image to serve as camera content (default: generated pattern)
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Card type: vehicle, location or driver
        #[arg(short = 't', long = "type", default_value = "vehicle")]
        capture_type: CaptureType,

        /// Zoom factor to capture at
        #[arg(short, long, default_value = "1.0")]
        zoom: f64,

        /// Filter id (mono, sepia, noir, vivid, ...)
        #[arg(short, long)]
        filter: Option<String>,

        /// Output directory (default: ~/Pictures/cardcam)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();

    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=cardcam=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter)),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List { front } => cli::list_lenses(front),
        Commands::Zoom { factors } => cli::zoom_plan(&config, &factors),
        Commands::Render {
            input,
            output,
            capture_type,
            scale,
            rotate,
            flip_horizontal,
            flip_vertical,
            offset,
        } => {
            let offset = match offset.as_deref() {
                Some([dx, dy]) => (*dx, *dy),
                _ => (0.0, 0.0),
            };
            cli::render_card(
                &config,
                cli::RenderArgs {
                    input,
                    output,
                    capture_type,
                    scale,
                    quarter_turns: rotate,
                    flip_horizontal,
                    flip_vertical,
                    offset,
                },
            )
        }
        Commands::Preview {
            filter,
            frames,
            output,
        } => cli::preview(&config, filter, frames, output),
        Commands::Photo {
            source,
            capture_type,
            zoom,
            filter,
            output,
        } => cli::take_photo(&config, source, capture_type, zoom, filter, output),
    }
}
