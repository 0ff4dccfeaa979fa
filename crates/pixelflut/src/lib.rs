//! # pixelflut
//!
//! A client for the pixelflut canvas protocol.
//!
//! ## Features
//!
//! - **Encoder**: Converts an image into a `PX <x> <y> <rrggbb>\n` command stream
//! - **Decoder**: Incremental frame parser for the server's pixel responses
//! - **Flut**: Streams the commands over several connections until stopped
//! - **Fetch**: Reads pixel responses from several connections into a shared canvas
//!
//! ## Quick Start
//!
//! ### Drawing an image
//!
//! ```ignore
//! use pixelflut::{flut, FlutOptions, StopSignal};
//!
//! let img = image::open("logo.png")?.to_rgba8();
//! let stop = StopSignal::new();
//! let opts = FlutOptions { connections: 4, shuffle: true, ..FlutOptions::default() };
//! // Blocks until `stop.stop()` is called from another thread.
//! let report = flut(&img, "127.0.0.1:1337", &opts, &stop)?;
//! ```
//!
//! ### Fetching the canvas
//!
//! ```ignore
//! use pixelflut::{fetch_image, FetchOptions, Rect, StopSignal};
//!
//! let handle = fetch_image(Rect::new(0, 0, 800, 600), "127.0.0.1:1337", &FetchOptions::default(), StopSignal::new())?;
//! std::thread::sleep(std::time::Duration::from_secs(5));
//! let (canvas, report) = handle.finish();
//! canvas.to_image().save("canvas.png")?;
//! ```

use std::io;

use thiserror::Error;

pub mod canvas;
pub mod command;
pub mod decoder;
pub mod encoder;
pub mod fetch;
pub mod flut;
pub mod options;
pub mod receiver;
pub mod report;
pub mod sender;
pub mod stop;

pub use canvas::{Canvas, Rect};
pub use command::{CommandSequence, PixelCommand, PixelQuery, Point};
pub use decoder::{decode_frame, FrameError, FrameReader, PixelUpdate};
pub use encoder::{commands_from_image, queries_from_bounds, WireEncode};
pub use fetch::{fetch_image, FetchHandle};
pub use flut::flut;
pub use options::{FetchOptions, FlutOptions, DEFAULT_IO_TIMEOUT};
pub use receiver::receive_on;
pub use report::{FetchReport, FlutReport, Report, WorkerReport, WorkerStats};
pub use sender::{send_on, send_to};
pub use stop::StopSignal;

/// Errors that can occur while drawing to or reading from a pixelflut server.
#[derive(Debug, Error)]
pub enum PixelflutError {
    /// The command sequence cannot be split into zero connections
    #[error("invalid partition: cannot split work across {conns} connections")]
    InvalidPartition { conns: usize },

    /// Image or bounds rectangle has no pixels
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// Establishing a connection failed
    #[error("failed to connect to {address}: {source}")]
    ConnectionDial {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Writing to an established connection failed
    #[error("connection write failed: {0}")]
    ConnectionWrite(#[source] io::Error),

    /// Reading from an established connection failed
    #[error("connection read failed: {0}")]
    ConnectionRead(#[source] io::Error),

    /// A received frame does not match `PX <x> <y> <rrggbb>\n`
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] FrameError),

    /// Parsed coordinates fall outside the target canvas
    #[error("pixel ({x}, {y}) is outside the canvas")]
    OutOfBounds { x: u32, y: u32 },

    /// The operation was cancelled before it started any work
    #[error("operation stopped")]
    Stopped,
}

/// Result type for pixelflut operations.
pub type Result<T> = core::result::Result<T, PixelflutError>;
