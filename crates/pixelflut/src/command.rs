//! Pixel commands and the sequence operations used to spread them over connections.

use crate::{PixelflutError, Result};

/// Canvas position, used as the origin offset when drawing an image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    #[inline]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// One `PX <x> <y> <rrggbb>` instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelCommand {
    pub x: u32,
    pub y: u32,
    pub color: [u8; 3],
}

impl PixelCommand {
    #[inline]
    pub const fn new(x: u32, y: u32, color: [u8; 3]) -> Self {
        Self { x, y, color }
    }
}

/// One `PX <x> <y>` request asking the server to report a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelQuery {
    pub x: u32,
    pub y: u32,
}

impl PixelQuery {
    #[inline]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// An ordered run of frames destined for the server.
///
/// The sequence is usually built by [`commands_from_image`](crate::commands_from_image)
/// in raster order, optionally shuffled, then split with [`chunk`](Self::chunk) so that
/// every connection owns one part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSequence<C = PixelCommand> {
    commands: Vec<C>,
}

impl<C> CommandSequence<C> {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            commands: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn push(&mut self, command: C) {
        self.commands.push(command);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[C] {
        &self.commands
    }

    pub fn iter(&self) -> std::slice::Iter<'_, C> {
        self.commands.iter()
    }

    pub fn into_vec(self) -> Vec<C> {
        self.commands
    }

    /// Uniformly permutes the sequence in place using the thread-local generator.
    pub fn shuffle(&mut self) {
        fastrand::shuffle(&mut self.commands);
    }

    /// Uniformly permutes the sequence in place using `rng`.
    ///
    /// Seeding `rng` makes the permutation reproducible.
    pub fn shuffle_with(&mut self, rng: &mut fastrand::Rng) {
        rng.shuffle(&mut self.commands);
    }

    /// Splits the sequence into exactly `n` contiguous parts.
    ///
    /// Relative order is kept inside every part. When the length is not a multiple
    /// of `n`, the leading parts hold one extra element, so part sizes never differ
    /// by more than one. With `n` larger than the length the trailing parts are empty.
    ///
    /// # Errors
    ///
    /// Returns [`PixelflutError::InvalidPartition`] if `n` is zero.
    pub fn chunk(self, n: usize) -> Result<Vec<CommandSequence<C>>> {
        if n == 0 {
            return Err(PixelflutError::InvalidPartition { conns: n });
        }

        let base = self.commands.len() / n;
        let extra = self.commands.len() % n;

        let mut parts = Vec::with_capacity(n);
        let mut rest = self.commands.into_iter();
        for i in 0..n {
            let size = if i < extra { base + 1 } else { base };
            parts.push(CommandSequence {
                commands: rest.by_ref().take(size).collect(),
            });
        }
        Ok(parts)
    }
}

impl<C> From<Vec<C>> for CommandSequence<C> {
    fn from(commands: Vec<C>) -> Self {
        Self { commands }
    }
}

impl<C> FromIterator<C> for CommandSequence<C> {
    fn from_iter<I: IntoIterator<Item = C>>(iter: I) -> Self {
        Self {
            commands: iter.into_iter().collect(),
        }
    }
}

impl<'a, C> IntoIterator for &'a CommandSequence<C> {
    type Item = &'a C;
    type IntoIter = std::slice::Iter<'a, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}
