//! Canvas receiver: decodes one connection's responses into the shared canvas.

use std::io::{self, Read};
use std::net::{Shutdown, TcpStream};
use std::thread;
use std::time::Duration;

use log::{debug, info};

use crate::canvas::Canvas;
use crate::command::{CommandSequence, PixelQuery};
use crate::decoder::{decode_frame, FrameReader};
use crate::report::WorkerStats;
use crate::sender::{bomb, is_retryable};
use crate::stop::StopSignal;
use crate::{PixelflutError, Result};

/// Reads responses from `stream` into `canvas` until `stop` is raised.
///
/// With a non-empty `queries` chunk, a companion thread writes those queries to a
/// clone of the stream in a loop, so that servers answering `PX <x> <y>` keep
/// reporting the pixels. Malformed and out-of-bounds frames are counted and
/// skipped. The connection is shut down on return.
///
/// # Errors
///
/// [`PixelflutError::ConnectionRead`] on a read failure, including the server
/// closing the connection before `stop` was raised. [`PixelflutError::ConnectionWrite`]
/// if the query stream failed while reading kept working.
pub fn receive_on(
    stream: TcpStream,
    canvas: &Canvas,
    queries: Option<&CommandSequence<PixelQuery>>,
    io_timeout: Duration,
    stop: &StopSignal,
) -> Result<WorkerStats> {
    stream
        .set_read_timeout(Some(io_timeout))
        .map_err(PixelflutError::ConnectionRead)?;
    stream
        .set_write_timeout(Some(io_timeout))
        .map_err(PixelflutError::ConnectionWrite)?;

    let peer = stream.peer_addr().ok();
    info!("Receiving canvas {:?} from {:?}", canvas.bounds(), peer);

    // Raised when this receiver exits so its query thread follows it.
    let done = StopSignal::new();

    let (read_result, query_result) = thread::scope(|s| {
        let query_thread = match queries.filter(|q| !q.is_empty()) {
            Some(queries) => {
                let mut writer = stream.try_clone().map_err(PixelflutError::ConnectionWrite)?;
                let payload = queries.encode();
                let done = &done;
                Some(s.spawn(move || {
                    bomb(&mut writer, &payload, || {
                        stop.is_stopped() || done.is_stopped()
                    })
                }))
            }
            None => None,
        };

        let read_result = read_frames(&stream, canvas, stop);
        done.stop();

        // The write deadline bounds this join; shut down only after the writer left.
        let query_result = match query_thread {
            Some(handle) => handle
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic)),
            None => Ok(WorkerStats::default()),
        };
        let _ = stream.shutdown(Shutdown::Both);
        Ok::<_, PixelflutError>((read_result, query_result))
    })?;

    let mut stats = read_result?;
    // A failed query write usually shows up as a read failure too; the read error wins.
    stats += query_result?;

    debug!(
        "Receiver for {:?} stopped: {} frames, {} applied, {} malformed, {} out of bounds",
        peer, stats.frames_received, stats.pixels_applied, stats.malformed, stats.out_of_bounds
    );
    Ok(stats)
}

/// Frame loop. `stop` is checked before each blocking read and again before the
/// decoded pixel is applied.
pub(crate) fn read_frames<R: Read>(
    input: R,
    canvas: &Canvas,
    stop: &StopSignal,
) -> Result<WorkerStats> {
    let mut stats = WorkerStats::default();
    let mut reader = FrameReader::new(input);

    while !stop.is_stopped() {
        let frame = match reader.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                return Err(PixelflutError::ConnectionRead(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "server closed the connection",
                )))
            }
            Err(e) if is_retryable(&e) => continue,
            Err(e) => return Err(PixelflutError::ConnectionRead(e)),
        };
        stats.frames_received += 1;

        let update = match decode_frame(frame) {
            Ok(update) => update,
            Err(e) => {
                stats.malformed += 1;
                debug!(
                    "Skipping malformed frame {:?}: {}",
                    String::from_utf8_lossy(frame),
                    e
                );
                continue;
            }
        };

        if stop.is_stopped() {
            break;
        }
        match canvas.apply(&update) {
            Ok(()) => stats.pixels_applied += 1,
            Err(_) => stats.out_of_bounds += 1,
        }
    }
    Ok(stats)
}
