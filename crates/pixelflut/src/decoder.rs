//! Incremental decoder for the server's pixel responses.
//!
//! # Frame format
//!
//! ```text
//! PX <x> <y> <rrggbb>\n
//! ```
//!
//! The color is a fixed-width suffix: the six bytes in front of the newline are
//! hex-decoded directly. The coordinate segment between the `PX ` prefix and the
//! color has no fixed width, so `x` and `y` are split at the last space found by
//! scanning backward from the end of that segment. No other tokenizing happens.

use std::io::{self, BufRead, BufReader, Read};

use thiserror::Error;

const PREFIX: &[u8] = b"PX ";
/// Six hex digits plus the newline.
const COLOR_SUFFIX_LEN: usize = 7;
/// `PX 0 0 000000\n`
const MIN_FRAME_LEN: usize = 14;
/// Frames longer than this are cut and reported as malformed.
pub const MAX_FRAME_LEN: usize = 256;

/// One pixel reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelUpdate {
    pub x: u32,
    pub y: u32,
    pub color: [u8; 3],
}

/// Reasons a frame is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame is {0} bytes, shorter than any valid response")]
    TooShort(usize),

    #[error("frame is not terminated by a newline")]
    MissingNewline,

    #[error("frame does not start with \"PX \"")]
    MissingPrefix,

    #[error("no space in front of the color")]
    MissingColorSeparator,

    #[error("no space between x and y")]
    MissingCoordinateSeparator,

    #[error("empty coordinate")]
    EmptyCoordinate,

    #[error("non-digit byte {0:#04x} in coordinate")]
    InvalidDigit(u8),

    #[error("coordinate does not fit in 32 bits")]
    CoordinateOverflow,

    #[error("non-hex byte {0:#04x} in color")]
    InvalidHex(u8),
}

/// Decodes one newline-terminated response frame.
///
/// # Example
/// ```
/// use pixelflut::{decode_frame, PixelUpdate};
///
/// let update = decode_frame(b"PX 12 345 1a2b3c\n")?;
/// assert_eq!(update, PixelUpdate { x: 12, y: 345, color: [0x1a, 0x2b, 0x3c] });
/// # Ok::<(), pixelflut::FrameError>(())
/// ```
pub fn decode_frame(frame: &[u8]) -> Result<PixelUpdate, FrameError> {
    if frame.last() != Some(&b'\n') {
        return Err(FrameError::MissingNewline);
    }
    if frame.len() < MIN_FRAME_LEN {
        return Err(FrameError::TooShort(frame.len()));
    }
    if !frame.starts_with(PREFIX) {
        return Err(FrameError::MissingPrefix);
    }

    let color_start = frame.len() - COLOR_SUFFIX_LEN;
    if frame[color_start - 1] != b' ' {
        return Err(FrameError::MissingColorSeparator);
    }
    let color = decode_color(&frame[color_start..frame.len() - 1])?;

    // MIN_FRAME_LEN guarantees at least three bytes here.
    let xy = &frame[PREFIX.len()..color_start - 1];
    let mut split = xy.len() - 2;
    loop {
        if xy[split] == b' ' {
            break;
        }
        if split == 0 {
            return Err(FrameError::MissingCoordinateSeparator);
        }
        split -= 1;
    }

    let x = parse_decimal(&xy[..split])?;
    let y = parse_decimal(&xy[split + 1..])?;

    Ok(PixelUpdate { x, y, color })
}

fn parse_decimal(digits: &[u8]) -> Result<u32, FrameError> {
    if digits.is_empty() {
        return Err(FrameError::EmptyCoordinate);
    }
    let mut value: u32 = 0;
    for &c in digits {
        if !c.is_ascii_digit() {
            return Err(FrameError::InvalidDigit(c));
        }
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add((c - b'0') as u32))
            .ok_or(FrameError::CoordinateOverflow)?;
    }
    Ok(value)
}

fn decode_color(hex: &[u8]) -> Result<[u8; 3], FrameError> {
    let mut color = [0u8; 3];
    for (byte, pair) in color.iter_mut().zip(hex.chunks_exact(2)) {
        *byte = (hex_value(pair[0])? << 4) | hex_value(pair[1])?;
    }
    Ok(color)
}

#[inline]
fn hex_value(c: u8) -> Result<u8, FrameError> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(FrameError::InvalidHex(c)),
    }
}

/// Splits a byte stream into newline-terminated frames.
///
/// A read that fails with a timeout keeps the bytes received so far, so the
/// underlying stream may carry a read deadline: the caller handles
/// `WouldBlock`/`TimedOut`, checks whatever it needs to, and calls
/// [`read_frame`](Self::read_frame) again to resume the same frame.
pub struct FrameReader<R> {
    inner: BufReader<R>,
    line: Vec<u8>,
    complete: bool,
    // Set after an overlong frame was cut; the rest of that line is dropped.
    discarding: bool,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            line: Vec::with_capacity(MAX_FRAME_LEN),
            complete: false,
            discarding: false,
        }
    }

    /// Returns the next frame, newline included.
    ///
    /// `Ok(None)` means the stream closed; a trailing partial frame is dropped.
    /// Frames exceeding [`MAX_FRAME_LEN`] are returned cut at that length and
    /// therefore lack the newline; the rest of such a line is skipped, never
    /// returned as a frame of its own.
    pub fn read_frame(&mut self) -> io::Result<Option<&[u8]>> {
        if self.complete {
            self.line.clear();
            self.complete = false;
        }
        if self.discarding && !self.skip_line()? {
            return Ok(None);
        }

        let remaining = (MAX_FRAME_LEN - self.line.len()) as u64;
        (&mut self.inner)
            .take(remaining)
            .read_until(b'\n', &mut self.line)?;

        if self.line.last() == Some(&b'\n') {
            self.complete = true;
            return Ok(Some(&self.line));
        }
        if self.line.len() >= MAX_FRAME_LEN {
            self.complete = true;
            self.discarding = true;
            return Ok(Some(&self.line));
        }
        Ok(None)
    }

    /// Drops bytes up to and including the next newline. Returns `false` at end
    /// of stream. A timeout leaves `discarding` set for the next call.
    fn skip_line(&mut self) -> io::Result<bool> {
        while self.discarding {
            let buf = self.inner.fill_buf()?;
            if buf.is_empty() {
                return Ok(false);
            }
            match buf.iter().position(|&b| b == b'\n') {
                Some(i) => {
                    self.inner.consume(i + 1);
                    self.discarding = false;
                }
                None => {
                    let n = buf.len();
                    self.inner.consume(n);
                }
            }
        }
        Ok(true)
    }

    pub fn get_ref(&self) -> &R {
        self.inner.get_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_decode_roundtrip_sample() {
        let update = decode_frame(b"PX 12 345 1a2b3c\n").unwrap();
        assert_eq!(
            update,
            PixelUpdate {
                x: 12,
                y: 345,
                color: [0x1a, 0x2b, 0x3c]
            }
        );
    }

    #[test]
    fn test_decode_variable_width_coordinates() {
        let update = decode_frame(b"PX 7 1080 ffffff\n").unwrap();
        assert_eq!((update.x, update.y), (7, 1080));

        let update = decode_frame(b"PX 1920 7 000000\n").unwrap();
        assert_eq!((update.x, update.y), (1920, 7));

        let update = decode_frame(b"PX 0 0 000000\n").unwrap();
        assert_eq!((update.x, update.y), (0, 0));
    }

    #[test]
    fn test_decode_uppercase_hex() {
        let update = decode_frame(b"PX 1 2 ABCDEF\n").unwrap();
        assert_eq!(update.color, [0xab, 0xcd, 0xef]);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        let cases: &[(&[u8], FrameError)] = &[
            (b"PX abc def ffffff\n", FrameError::InvalidDigit(b'a')),
            (b"PX 1 2 ffffff", FrameError::MissingNewline),
            (b"PX 1 ffffff\n", FrameError::TooShort(12)),
            (b"PY 10 20 ffffff\n", FrameError::MissingPrefix),
            (b"PX 10 20 fffffg\n", FrameError::InvalidHex(b'g')),
            (b"PX 10 20_ffffff\n", FrameError::MissingColorSeparator),
            (b"PX 1000 ffffff\n", FrameError::MissingCoordinateSeparator),
            (b"PX  100 ffffff\n", FrameError::EmptyCoordinate),
            (b"PX 99999999999 1 ffffff\n", FrameError::CoordinateOverflow),
            (b"PX 1 2 3 ffffff\n", FrameError::InvalidDigit(b' ')),
        ];
        for (frame, expected) in cases {
            assert_eq!(
                decode_frame(frame),
                Err(*expected),
                "frame {:?}",
                String::from_utf8_lossy(frame)
            );
        }
    }

    #[test]
    fn test_reader_splits_frames() {
        let data = b"PX 1 2 ff0000\nPX 3 4 00ff00\npartial".to_vec();
        let mut reader = FrameReader::new(Cursor::new(data));

        assert_eq!(reader.read_frame().unwrap(), Some(&b"PX 1 2 ff0000\n"[..]));
        assert_eq!(reader.read_frame().unwrap(), Some(&b"PX 3 4 00ff00\n"[..]));
        assert_eq!(reader.read_frame().unwrap(), None);
    }

    #[test]
    fn test_reader_cuts_overlong_frames() {
        let mut data = vec![b'x'; MAX_FRAME_LEN];
        data.extend_from_slice(b"PX 1 1 ff0000\n");
        data.extend_from_slice(b"PX 2 2 00ff00\n");
        let mut reader = FrameReader::new(Cursor::new(data));

        let first = reader.read_frame().unwrap().unwrap().to_vec();
        assert_eq!(first.len(), MAX_FRAME_LEN);
        assert_eq!(decode_frame(&first), Err(FrameError::MissingNewline));

        // The tail of the long line is dropped even though it looks like a frame.
        let next = reader.read_frame().unwrap().unwrap();
        assert_eq!(next, b"PX 2 2 00ff00\n");
        assert_eq!(reader.read_frame().unwrap(), None);
    }

    #[test]
    fn test_reader_frame_of_exactly_max_len_is_kept() {
        let mut data = b"PX 1 1 ".to_vec();
        data.resize(MAX_FRAME_LEN - 8, b'0');
        data.extend_from_slice(b" ff0000\n");
        data.extend_from_slice(b"PX 2 2 00ff00\n");
        let mut reader = FrameReader::new(Cursor::new(data));

        assert_eq!(reader.read_frame().unwrap().unwrap().len(), MAX_FRAME_LEN);
        assert_eq!(reader.read_frame().unwrap(), Some(&b"PX 2 2 00ff00\n"[..]));
    }

    /// Yields its chunks one read at a time, with a timeout error between them.
    struct Stuttering {
        chunks: Vec<Vec<u8>>,
        timeout_next: bool,
    }

    impl Read for Stuttering {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.timeout_next {
                self.timeout_next = false;
                return Err(io::ErrorKind::WouldBlock.into());
            }
            if self.chunks.is_empty() {
                return Ok(0);
            }
            let chunk = self.chunks.remove(0);
            buf[..chunk.len()].copy_from_slice(&chunk);
            self.timeout_next = true;
            Ok(chunk.len())
        }
    }

    #[test]
    fn test_reader_resumes_after_timeout() {
        let mut reader = FrameReader::new(Stuttering {
            chunks: vec![b"PX 12 3".to_vec(), b"45 1a2b3c\n".to_vec()],
            timeout_next: false,
        });

        let err = reader.read_frame().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);

        let frame = reader.read_frame().unwrap().unwrap();
        assert_eq!(decode_frame(frame).unwrap().y, 345);
    }

    #[test]
    fn test_reader_keeps_discarding_across_timeouts() {
        let mut reader = FrameReader::new(Stuttering {
            chunks: vec![
                vec![b'x'; MAX_FRAME_LEN],
                vec![b'x'; 20],
                b"PX 1 1 ff0000\n".to_vec(),
                b"PX 2 2 00ff00\n".to_vec(),
            ],
            timeout_next: false,
        });

        let mut frames = Vec::new();
        loop {
            match reader.read_frame() {
                Ok(Some(frame)) => frames.push(frame.to_vec()),
                Ok(None) => break,
                Err(e) => assert_eq!(e.kind(), io::ErrorKind::WouldBlock),
            }
        }

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], vec![b'x'; MAX_FRAME_LEN]);
        assert_eq!(frames[1], b"PX 2 2 00ff00\n");
    }
}
