//! Image to command conversion and the outbound wire format.
//!
//! Commands are written as `PX <x> <y> <rrggbb>\n` with plain decimal coordinates
//! and exactly six lowercase hex digits. Queries drop the color: `PX <x> <y>\n`.

use image::{GenericImageView, Pixel};

use crate::canvas::Rect;
use crate::command::{CommandSequence, PixelCommand, PixelQuery, Point};

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Longest possible encoded command: `PX ` + two u32 + separators + color + newline.
pub(crate) const MAX_COMMAND_LEN: usize = 3 + 10 + 1 + 10 + 1 + 6 + 1;

/// Serialization of a single outbound frame.
pub trait WireEncode {
    /// Appends the frame, newline included, to `out`.
    fn encode_into(&self, out: &mut Vec<u8>);

    /// Returns the frame as a fresh buffer.
    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MAX_COMMAND_LEN);
        self.encode_into(&mut out);
        out
    }
}

impl WireEncode for PixelCommand {
    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(b"PX ");
        write_number(out, self.x);
        out.push(b' ');
        write_number(out, self.y);
        out.push(b' ');
        for byte in self.color {
            out.push(HEX_DIGITS[(byte >> 4) as usize]);
            out.push(HEX_DIGITS[(byte & 0x0f) as usize]);
        }
        out.push(b'\n');
    }
}

impl WireEncode for PixelQuery {
    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(b"PX ");
        write_number(out, self.x);
        out.push(b' ');
        write_number(out, self.y);
        out.push(b'\n');
    }
}

impl<C: WireEncode> CommandSequence<C> {
    /// Serializes the whole sequence into one contiguous buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len() * MAX_COMMAND_LEN);
        for command in self {
            command.encode_into(&mut out);
        }
        out
    }
}

/// Builds one command per pixel of `img`, translated by `origin`.
///
/// Commands come out in raster order: every `x` of row 0, then row 1, and so on.
/// The alpha channel is ignored. Coordinates past `u32::MAX` saturate; [`flut`]
/// rejects such placements up front.
///
/// [`flut`]: crate::flut()
///
/// # Example
/// ```
/// use image::{Rgba, RgbaImage};
/// use pixelflut::{commands_from_image, Point};
///
/// let img = RgbaImage::from_pixel(2, 2, Rgba([0x1a, 0x2b, 0x3c, 0x00]));
/// let commands = commands_from_image(&img, Point::new(10, 20));
/// assert_eq!(commands.len(), 4);
/// assert_eq!(commands.as_slice()[1].x, 11);
/// ```
pub fn commands_from_image<I>(img: &I, origin: Point) -> CommandSequence
where
    I: GenericImageView,
    I::Pixel: Pixel<Subpixel = u8>,
{
    let (width, height) = img.dimensions();
    let mut commands = CommandSequence::with_capacity(width as usize * height as usize);
    for y in 0..height {
        for x in 0..width {
            let rgb = img.get_pixel(x, y).to_rgb();
            commands.push(PixelCommand::new(
                origin.x.saturating_add(x),
                origin.y.saturating_add(y),
                rgb.0,
            ));
        }
    }
    commands
}

/// Builds one pixel query per coordinate of `bounds`, in raster order.
pub fn queries_from_bounds(bounds: Rect) -> CommandSequence<PixelQuery> {
    let mut queries = CommandSequence::with_capacity(bounds.area());
    for y in bounds.y..bounds.bottom() {
        for x in bounds.x..bounds.right() {
            queries.push(PixelQuery::new(x, y));
        }
    }
    queries
}

/// Fast decimal formatting without allocation.
#[inline]
fn write_number(out: &mut Vec<u8>, mut n: u32) {
    if n == 0 {
        out.push(b'0');
        return;
    }

    let mut buf = [0u8; 10];
    let mut i = buf.len();

    while n > 0 {
        i -= 1;
        buf[i] = b'0' + (n % 10) as u8;
        n /= 10;
    }

    out.extend_from_slice(&buf[i..]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_encode_command() {
        let cmd = PixelCommand::new(12, 345, [0x1a, 0x2b, 0x3c]);
        assert_eq!(cmd.encode(), b"PX 12 345 1a2b3c\n");
    }

    #[test]
    fn test_encode_zero_and_max() {
        assert_eq!(
            PixelCommand::new(0, 0, [0, 0, 0]).encode(),
            b"PX 0 0 000000\n"
        );
        let max = PixelCommand::new(u32::MAX, u32::MAX, [0xff, 0xff, 0xff]).encode();
        assert_eq!(max, b"PX 4294967295 4294967295 ffffff\n");
        assert_eq!(max.len(), MAX_COMMAND_LEN);
    }

    #[test]
    fn test_encode_query() {
        assert_eq!(PixelQuery::new(7, 1080).encode(), b"PX 7 1080\n");
    }

    #[test]
    fn test_encode_sequence_concatenates() {
        let seq: CommandSequence = vec![
            PixelCommand::new(1, 2, [0xff, 0, 0]),
            PixelCommand::new(3, 4, [0, 0xff, 0]),
        ]
        .into();
        assert_eq!(seq.encode(), b"PX 1 2 ff0000\nPX 3 4 00ff00\n");
    }

    #[test]
    fn test_commands_are_row_major_and_offset() {
        let mut img = RgbaImage::new(3, 2);
        for (x, y, px) in img.enumerate_pixels_mut() {
            *px = Rgba([x as u8, y as u8, 9, 17]);
        }

        let commands = commands_from_image(&img, Point::new(100, 50));
        let coords: Vec<(u32, u32)> = commands.iter().map(|c| (c.x, c.y)).collect();
        assert_eq!(
            coords,
            vec![(100, 50), (101, 50), (102, 50), (100, 51), (101, 51), (102, 51)]
        );
        assert_eq!(commands.as_slice()[4].color, [1, 1, 9]);
    }

    #[test]
    fn test_queries_cover_bounds() {
        let queries = queries_from_bounds(Rect::new(5, 6, 2, 2));
        let coords: Vec<(u32, u32)> = queries.iter().map(|q| (q.x, q.y)).collect();
        assert_eq!(coords, vec![(5, 6), (6, 6), (5, 7), (6, 7)]);
    }
}
