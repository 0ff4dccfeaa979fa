//! Sending orchestrator: one sender thread per chunk of the image.

use std::thread;

use image::{GenericImageView, Pixel};
use log::{error, info};

use crate::encoder::commands_from_image;
use crate::options::FlutOptions;
use crate::report::{FlutReport, WorkerReport};
use crate::sender::send_to;
use crate::stop::StopSignal;
use crate::{PixelflutError, Result};

/// Draws `img` on the server at `address` until `stop` is raised.
///
/// The image becomes one command per pixel (offset by `opts.offset`), optionally
/// shuffled, and is split into `opts.connections` chunks. Each chunk gets its own
/// connection and thread that replays it in a loop. The call blocks until every
/// sender has returned, which normally means until `stop` is raised from another
/// thread. A connection that fails to dial or write ends alone; the others keep
/// going unless `opts.strict` is set.
///
/// # Errors
///
/// Fails before opening any connection with [`PixelflutError::InvalidPartition`]
/// for zero connections, or [`PixelflutError::InvalidDimensions`] for an empty image
/// or one that reaches past `u32::MAX` once offset.
/// Per-connection failures are reported in the returned [`FlutReport`].
pub fn flut<I>(img: &I, address: &str, opts: &FlutOptions, stop: &StopSignal) -> Result<FlutReport>
where
    I: GenericImageView,
    I::Pixel: Pixel<Subpixel = u8>,
{
    let (width, height) = img.dimensions();
    // Every pixel needs its own coordinate, so the far edge must stay within u32.
    if width == 0
        || height == 0
        || opts.offset.x.checked_add(width - 1).is_none()
        || opts.offset.y.checked_add(height - 1).is_none()
    {
        return Err(PixelflutError::InvalidDimensions { width, height });
    }
    if opts.connections == 0 {
        return Err(PixelflutError::InvalidPartition { conns: 0 });
    }

    let mut commands = commands_from_image(img, opts.offset);
    if opts.shuffle {
        commands.shuffle();
    }
    let chunks = commands.chunk(opts.connections)?;

    info!(
        "Flooding {}x{} image at {:?} to {} over {} connections",
        width, height, opts.offset, address, opts.connections
    );

    let mut workers: Vec<WorkerReport> = thread::scope(|s| {
        let handles: Vec<_> = chunks
            .iter()
            .enumerate()
            .map(|(connection, chunk)| {
                s.spawn(move || {
                    let outcome = send_to(address, chunk, opts.io_timeout, stop);
                    if let Err(e) = &outcome {
                        error!("Connection {} to {} failed: {}", connection, address, e);
                        if opts.strict {
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

        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect()
    });
    workers.sort_by_key(|w| w.connection);

    let report = FlutReport { workers };
    let totals = report.totals();
    info!(
        "Flut to {} finished: {} frames in {} cycles, {} failed connections",
        address,
        totals.frames_sent,
        totals.cycles,
        report.errors().count()
    );
    Ok(report)
}
