//! Tuning knobs for [`flut`](crate::flut) and [`fetch_image`](crate::fetch_image).

use std::time::Duration;

use crate::command::Point;

/// Default read/write deadline; bounds how long a worker can miss a stop request.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_millis(100);

/// Options for drawing an image.
#[derive(Clone, Debug)]
pub struct FlutOptions {
    /// Canvas position of the image's top-left pixel.
    pub offset: Point,

    /// Send pixels in random order instead of row by row.
    pub shuffle: bool,

    /// Number of parallel connections (at least 1).
    pub connections: usize,

    /// Socket write deadline. Stop requests are noticed within this interval.
    pub io_timeout: Duration,

    /// Stop every connection as soon as one of them fails.
    pub strict: bool,
}

impl Default for FlutOptions {
    fn default() -> Self {
        Self {
            offset: Point::default(),
            shuffle: false,
            connections: 1,
            io_timeout: DEFAULT_IO_TIMEOUT,
            strict: false,
        }
    }
}

/// Options for reading the canvas back.
#[derive(Clone, Debug)]
pub struct FetchOptions {
    /// Number of parallel connections (at least 1).
    pub connections: usize,

    /// Socket read/write deadline. Stop requests are noticed within this interval.
    pub io_timeout: Duration,

    /// Stop every connection as soon as one of them fails.
    pub strict: bool,

    /// Continuously send `PX <x> <y>` queries for the bounds on each connection.
    /// Leave unset for servers that push their canvas state unprompted.
    pub request_pixels: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            connections: 1,
            io_timeout: DEFAULT_IO_TIMEOUT,
            strict: false,
            request_pixels: false,
        }
    }
}
