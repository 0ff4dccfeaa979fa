//! Shared canvas written concurrently by the receivers of a fetch.

use std::sync::atomic::{AtomicU32, Ordering};

use image::{Rgba, RgbaImage};

use crate::decoder::PixelUpdate;
use crate::{PixelflutError, Result};

/// An axis-aligned window of the server canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    #[inline]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    #[inline]
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge.
    #[inline]
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    #[inline]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }
}

/// RGBA pixel grid covering a [`Rect`] of the server canvas.
///
/// Every pixel is one `AtomicU32`, so any number of threads may write through a
/// shared reference. Stores are `Relaxed`: a pixel is never torn, but two receivers
/// racing on the same coordinate resolve last-write-wins. That race is accepted;
/// callers wanting a consistent picture stop the receivers before calling
/// [`to_image`](Self::to_image).
///
/// Pixels that were never written read as transparent black.
pub struct Canvas {
    bounds: Rect,
    pixels: Box<[AtomicU32]>,
}

impl Canvas {
    /// Allocates a transparent canvas for `bounds`.
    ///
    /// # Errors
    ///
    /// Returns [`PixelflutError::InvalidDimensions`] for an empty rectangle.
    pub fn new(bounds: Rect) -> Result<Self> {
        if bounds.is_empty() {
            return Err(PixelflutError::InvalidDimensions {
                width: bounds.width,
                height: bounds.height,
            });
        }
        let pixels = (0..bounds.area()).map(|_| AtomicU32::new(0)).collect();
        Ok(Self { bounds, pixels })
    }

    #[inline]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> Option<usize> {
        if !self.bounds.contains(x, y) {
            return None;
        }
        let col = (x - self.bounds.x) as usize;
        let row = (y - self.bounds.y) as usize;
        Some(row * self.bounds.width as usize + col)
    }

    /// Returns the pixel at absolute canvas coordinates, or `None` outside the bounds.
    pub fn get(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.index(x, y)
            .map(|i| self.pixels[i].load(Ordering::Relaxed).to_le_bytes())
    }

    /// Writes one pixel at absolute canvas coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`PixelflutError::OutOfBounds`] when `(x, y)` is outside the bounds;
    /// the canvas is left untouched.
    pub fn set(&self, x: u32, y: u32, rgba: [u8; 4]) -> Result<()> {
        let i = self.index(x, y).ok_or(PixelflutError::OutOfBounds { x, y })?;
        self.pixels[i].store(u32::from_le_bytes(rgba), Ordering::Relaxed);
        Ok(())
    }

    /// Applies a parsed server response as a fully opaque pixel.
    pub fn apply(&self, update: &PixelUpdate) -> Result<()> {
        let [r, g, b] = update.color;
        self.set(update.x, update.y, [r, g, b, 0xff])
    }

    /// Copies the canvas into an image whose `(0, 0)` is the bounds origin.
    pub fn to_image(&self) -> RgbaImage {
        let Rect { width, .. } = self.bounds;
        RgbaImage::from_fn(width, self.bounds.height, |x, y| {
            let i = y as usize * width as usize + x as usize;
            Rgba(self.pixels[i].load(Ordering::Relaxed).to_le_bytes())
        })
    }
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("bounds", &self.bounds)
            .finish_non_exhaustive()
    }
}
