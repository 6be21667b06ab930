use crate::model::{Bin, BinId};
use serde::{Deserialize, Serialize};

/// A fixed-height horizontal strip of the atlas.
///
/// Bins are handed out strictly left to right; `x` only moves forward and a placed
/// bin never moves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shelf {
    y: u32,
    x: u32,
    width: u32,
    height: u32,
    free: u32,
}

impl Shelf {
    pub fn new(y: u32, width: u32, height: u32) -> Self {
        Self {
            y,
            x: 0,
            width,
            height,
            free: width,
        }
    }

    pub fn y(&self) -> u32 {
        self.y
    }
    /// Next free horizontal offset.
    pub fn x(&self) -> u32 {
        self.x
    }
    pub fn width(&self) -> u32 {
        self.width
    }
    pub fn height(&self) -> u32 {
        self.height
    }
    /// Remaining allocatable width (`width - x`).
    pub fn free(&self) -> u32 {
        self.free
    }
    /// Width consumed by bins placed so far.
    pub fn used_width(&self) -> u32 {
        self.width - self.free
    }

    /// Places a `w` x `h` bin at the cursor.
    ///
    /// Returns `None` if `w` exceeds the free width or `h` exceeds the shelf height.
    /// The returned bin has a refcount of zero; the atlas takes the first reference.
    pub fn alloc(&mut self, w: u32, h: u32, id: BinId) -> Option<Bin> {
        if w > self.free || h > self.height {
            return None;
        }
        let x = self.x;
        self.x += w;
        self.free -= w;
        Some(Bin::new(id, x, self.y, w, h))
    }

    /// Widens the shelf. Fails (and changes nothing) if `width` is smaller than the
    /// current width.
    pub fn resize(&mut self, width: u32) -> bool {
        if width < self.width {
            return false;
        }
        self.free += width - self.width;
        self.width = width;
        true
    }

    /// Sets the width for shrink-to-fit, never going below the used width.
    pub(crate) fn fit_width(&mut self, width: u32) {
        self.width = width.max(self.x);
        self.free = self.width - self.x;
    }
}
