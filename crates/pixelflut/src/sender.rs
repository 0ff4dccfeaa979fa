//! Connection sender: replays one chunk of frames over one connection until stopped.

use std::io::{self, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use log::{debug, info};

use crate::command::CommandSequence;
use crate::encoder::WireEncode;
use crate::report::WorkerStats;
use crate::stop::StopSignal;
use crate::{PixelflutError, Result};

/// Dials `address` and runs [`send_on`] on the new connection.
///
/// An empty chunk, or a stop raised before dialing, returns right away without
/// opening a connection.
///
/// # Errors
///
/// [`PixelflutError::ConnectionDial`] if the connection cannot be established,
/// otherwise whatever [`send_on`] returns.
pub fn send_to<C: WireEncode>(
    address: &str,
    commands: &CommandSequence<C>,
    io_timeout: Duration,
    stop: &StopSignal,
) -> Result<WorkerStats> {
    if commands.is_empty() {
        debug!("Nothing to send to {}, skipping connection", address);
        return Ok(WorkerStats::default());
    }
    if stop.is_stopped() {
        debug!("Stopped before dialing {}", address);
        return Ok(WorkerStats::default());
    }

    let stream = TcpStream::connect(address).map_err(|source| PixelflutError::ConnectionDial {
        address: address.to_string(),
        source,
    })?;
    send_on(stream, commands, io_timeout, stop)
}

/// Writes `commands` to `stream` over and over until `stop` is raised.
///
/// The stream gets a write deadline of `io_timeout` so a stalled peer cannot keep
/// the sender from seeing the stop request. The connection is shut down on return.
///
/// # Errors
///
/// [`PixelflutError::ConnectionWrite`] when a write fails for any reason other
/// than the deadline expiring.
pub fn send_on<C: WireEncode>(
    mut stream: TcpStream,
    commands: &CommandSequence<C>,
    io_timeout: Duration,
    stop: &StopSignal,
) -> Result<WorkerStats> {
    stream
        .set_write_timeout(Some(io_timeout))
        .map_err(PixelflutError::ConnectionWrite)?;
    if let Err(e) = stream.set_nodelay(true) {
        debug!("Could not disable Nagle on {:?}: {}", stream.peer_addr().ok(), e);
    }

    let payload = commands.encode();
    let peer = stream.peer_addr().ok();
    info!(
        "Sending {} frames ({} bytes) per cycle to {:?}",
        commands.len(),
        payload.len(),
        peer
    );

    let result = bomb(&mut stream, &payload, || stop.is_stopped());
    let _ = stream.shutdown(Shutdown::Both);

    match &result {
        Ok(stats) => debug!(
            "Sender for {:?} stopped after {} cycles, {} frames",
            peer, stats.cycles, stats.frames_sent
        ),
        Err(e) => debug!("Sender for {:?} failed: {}", peer, e),
    }
    result
}

/// Cyclic write loop. `should_stop` is polled before every write.
pub(crate) fn bomb<W, F>(out: &mut W, payload: &[u8], should_stop: F) -> Result<WorkerStats>
where
    W: Write,
    F: Fn() -> bool,
{
    let mut stats = WorkerStats::default();
    if payload.is_empty() {
        return Ok(stats);
    }

    let mut offset = 0;
    while !should_stop() {
        match out.write(&payload[offset..]) {
            Ok(0) => {
                return Err(PixelflutError::ConnectionWrite(
                    io::ErrorKind::WriteZero.into(),
                ))
            }
            Ok(n) => {
                stats.frames_sent += count_frames(&payload[offset..offset + n]);
                offset += n;
                if offset == payload.len() {
                    offset = 0;
                    stats.cycles += 1;
                }
            }
            Err(e) if is_retryable(&e) => continue,
            Err(e) => return Err(PixelflutError::ConnectionWrite(e)),
        }
    }
    Ok(stats)
}

/// Deadline expiry and signal interruption; the caller re-checks its stop flag and retries.
#[inline]
pub(crate) fn is_retryable(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}

#[inline]
fn count_frames(written: &[u8]) -> u64 {
    written.iter().filter(|&&b| b == b'\n').count() as u64
}
