//! pixelflut - Draw images on and fetch images from pixelflut servers
//!
//! A command-line front end for the `pixelflut` library.

use clap::{Parser, Subcommand};
use log::info;
use pixelflut::{fetch_image, flut, FetchOptions, FlutOptions, Point, Rect, StopSignal};
use std::io;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "pixelflut")]
#[command(version)]
#[command(about = "Draw images on and fetch images from pixelflut servers", long_about = None)]
struct Cli {
    /// Server address (host:port)
    #[arg(short, long, global = true, default_value = "127.0.0.1:1337")]
    address: String,

    /// Number of parallel connections
    #[arg(short = 'n', long, global = true, default_value = "4")]
    connections: usize,

    /// Stop after this many seconds (default: run until stdin is closed)
    #[arg(short, long, global = true)]
    seconds: Option<u64>,

    /// Stop all connections as soon as one fails
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Draw an image on the canvas
    Flut {
        /// Input image file (PNG, JPEG, GIF, WebP)
        input: PathBuf,

        /// Left edge of the image on the canvas
        #[arg(short, long, default_value = "0")]
        x: u32,

        /// Top edge of the image on the canvas
        #[arg(short, long, default_value = "0")]
        y: u32,

        /// Send pixels in random order instead of row by row
        #[arg(long)]
        shuffle: bool,
    },

    /// Read a window of the canvas into a PNG file
    Fetch {
        /// Output PNG file
        #[arg(short, long, default_value = "canvas.png")]
        output: PathBuf,

        /// Left edge of the window
        #[arg(short, long, default_value = "0")]
        x: u32,

        /// Top edge of the window
        #[arg(short, long, default_value = "0")]
        y: u32,

        /// Window width
        #[arg(long, default_value = "800")]
        width: u32,

        /// Window height
        #[arg(long, default_value = "600")]
        height: u32,

        /// Ask the server for every pixel with `PX <x> <y>` queries
        #[arg(long)]
        request_pixels: bool,
    },
}

/// Raises `stop` after `seconds`, or once stdin reaches end of input.
fn arm_stop(stop: &StopSignal, seconds: Option<u64>) {
    let stop = stop.clone();
    thread::spawn(move || {
        match seconds {
            Some(seconds) => thread::sleep(Duration::from_secs(seconds)),
            None => {
                eprintln!("Running until stdin is closed (Ctrl-D)");
                let _ = io::copy(&mut io::stdin().lock(), &mut io::sink());
            }
        }
        stop.stop();
    });
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let stop = StopSignal::new();

    match cli.command {
        Commands::Flut {
            input,
            x,
            y,
            shuffle,
        } => {
            let img = image::open(&input)
                .map_err(|e| format!("Failed to open '{}': {}", input.display(), e))?
                .to_rgba8();

            info!(
                "Drawing '{}' ({}x{}) at ({}, {})",
                input.display(),
                img.width(),
                img.height(),
                x,
                y
            );

            let opts = FlutOptions {
                offset: Point::new(x, y),
                shuffle,
                connections: cli.connections,
                strict: cli.strict,
                ..FlutOptions::default()
            };

            arm_stop(&stop, cli.seconds);
            let report = flut(&img, &cli.address, &opts, &stop)?;

            let totals = report.totals();
            info!(
                "Sent {} pixels ({} full passes)",
                totals.frames_sent, totals.cycles
            );
            if report.is_clean() {
                Ok(())
            } else {
                Err("some connections failed".into())
            }
        }

        Commands::Fetch {
            output,
            x,
            y,
            width,
            height,
            request_pixels,
        } => {
            let opts = FetchOptions {
                connections: cli.connections,
                strict: cli.strict,
                request_pixels,
                ..FetchOptions::default()
            };

            let handle = fetch_image(
                Rect::new(x, y, width, height),
                &cli.address,
                &opts,
                stop.clone(),
            )?;
            arm_stop(&stop, cli.seconds);

            // Receivers also end on their own when the server hangs up.
            while !stop.is_stopped() && !handle.is_finished() {
                thread::sleep(Duration::from_millis(50));
            }
            let (canvas, report) = handle.finish();

            canvas.to_image().save(&output)?;
            info!(
                "Fetched {} pixels -> '{}'",
                report.totals().pixels_applied,
                output.display()
            );
            Ok(())
        }
    }
}
