//! Fetching orchestrator: receivers populating a shared canvas in the background.

use std::net::TcpStream;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{error, info, warn};

use crate::canvas::{Canvas, Rect};
use crate::command::{CommandSequence, PixelQuery};
use crate::encoder::queries_from_bounds;
use crate::options::FetchOptions;
use crate::receiver::receive_on;
use crate::report::{FetchReport, WorkerReport};
use crate::stop::StopSignal;
use crate::{PixelflutError, Result};

/// Receivers of a running fetch and the canvas they write into.
///
/// The canvas keeps changing until the receivers are stopped; read it through
/// [`canvas`](Self::canvas) for a live view, or call [`finish`](Self::finish)
/// for a settled one.
#[derive(Debug)]
pub struct FetchHandle {
    canvas: Arc<Canvas>,
    stop: StopSignal,
    workers: Vec<JoinHandle<WorkerReport>>,
    failed: Vec<WorkerReport>,
}

impl FetchHandle {
    /// The canvas being populated.
    pub fn canvas(&self) -> &Arc<Canvas> {
        &self.canvas
    }

    /// The signal that stops this fetch.
    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    /// `true` once every receiver thread has returned.
    pub fn is_finished(&self) -> bool {
        self.workers.iter().all(|w| w.is_finished())
    }

    /// Raises the stop signal, then waits for every receiver.
    pub fn finish(self) -> (Arc<Canvas>, FetchReport) {
        self.stop.stop();
        self.join()
    }

    /// Waits for every receiver without raising the stop signal.
    pub fn join(self) -> (Arc<Canvas>, FetchReport) {
        let mut workers = self.failed;
        workers.extend(
            self.workers
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic))),
        );
        workers.sort_by_key(|w| w.connection);

        let report = FetchReport { workers };
        let totals = report.totals();
        info!(
            "Fetch finished: {} pixels applied, {} malformed, {} out of bounds, {} failed connections",
            totals.pixels_applied,
            totals.malformed,
            totals.out_of_bounds,
            report.errors().count()
        );
        (self.canvas, report)
    }
}

/// Starts reading the pixels inside `bounds` from the server at `address`.
///
/// All `opts.connections` connections are dialed before this returns; the
/// receivers then run on background threads and the handle comes back at once.
/// A connection that cannot be dialed is recorded in the final report while the
/// rest proceed. With `opts.request_pixels`, the bounds are split into query
/// chunks, one per connection.
///
/// # Errors
///
/// [`PixelflutError::InvalidPartition`] for zero connections,
/// [`PixelflutError::InvalidDimensions`] for empty bounds, and
/// [`PixelflutError::ConnectionDial`] if no connection could be established or,
/// with `opts.strict`, if any one of them failed.
pub fn fetch_image(
    bounds: Rect,
    address: &str,
    opts: &FetchOptions,
    stop: StopSignal,
) -> Result<FetchHandle> {
    if opts.connections == 0 {
        return Err(PixelflutError::InvalidPartition { conns: 0 });
    }
    let canvas = Arc::new(Canvas::new(bounds)?);

    let mut query_chunks: Vec<Option<CommandSequence<PixelQuery>>> =
        if opts.request_pixels {
            queries_from_bounds(bounds)
                .chunk(opts.connections)?
                .into_iter()
                .map(Some)
                .collect()
        } else {
            (0..opts.connections).map(|_| None).collect()
        };

    let mut streams = Vec::with_capacity(opts.connections);
    let mut failed = Vec::new();
    for connection in 0..opts.connections {
        match TcpStream::connect(address) {
            Ok(stream) => streams.push((connection, stream)),
            Err(source) => {
                let e = PixelflutError::ConnectionDial {
                    address: address.to_string(),
                    source,
                };
                if opts.strict {
                    return Err(e);
                }
                warn!("Connection {}: {}", connection, e);
                failed.push(WorkerReport {
                    connection,
                    outcome: Err(e),
                });
            }
        }
    }

    if streams.is_empty() {
        // Every dial failed; hand back the first failure.
        return Err(failed
            .into_iter()
            .find_map(|w| w.outcome.err())
            .unwrap_or(PixelflutError::Stopped));
    }

    info!(
        "Fetching {:?} from {} over {} connections",
        bounds,
        address,
        streams.len()
    );

    let workers = streams
        .into_iter()
        .map(|(connection, stream)| {
            let canvas = Arc::clone(&canvas);
            let stop = stop.clone();
            let queries = query_chunks[connection].take();
            let io_timeout = opts.io_timeout;
            let strict = opts.strict;
            thread::spawn(move || {
                let outcome = receive_on(stream, &canvas, queries.as_ref(), io_timeout, &stop);
                if let Err(e) = &outcome {
                    error!("Receiver {} failed: {}", connection, e);
                    if strict {
                        stop.stop();
                    }
                }
                WorkerReport {
                    connection,
                    outcome,
                }
            })
        })
        .collect();

    Ok(FetchHandle {
        canvas,
        stop,
        workers,
        failed,
    })
}
