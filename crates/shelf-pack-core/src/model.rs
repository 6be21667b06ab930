use crate::error::ShelfPackError;
use crate::shelf::Shelf;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Axis-aligned rectangle (pixels). `x,y` is top-left; `w,h` are sizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
    /// Returns true if `r` lies entirely within `self`.
    pub fn contains(&self, r: &Rect) -> bool {
        r.x >= self.x
            && r.y >= self.y
            && r.x + r.w <= self.x + self.w
            && r.y + r.h <= self.y + self.h
    }
    /// Returns true if the two rectangles share at least one pixel.
    pub fn intersects(&self, r: &Rect) -> bool {
        !(self.x >= r.x + r.w || r.x >= self.x + self.w || self.y >= r.y + r.h || r.y >= self.y + self.h)
    }
    pub fn area(&self) -> u64 {
        (self.w as u64) * (self.h as u64)
    }
}

/// Identifier of a bin.
///
/// Integers and their canonical decimal string form are the same key, so
/// `BinId::from(7)` and `"7".parse::<BinId>()` look up the same bin. Any other
/// non-empty string is a named key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "RawBinId")]
pub enum BinId {
    Numeric(u64),
    Named(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBinId {
    Numeric(u64),
    Named(String),
}

impl TryFrom<RawBinId> for BinId {
    type Error = ShelfPackError;
    fn try_from(raw: RawBinId) -> Result<Self, Self::Error> {
        match raw {
            RawBinId::Numeric(n) => Ok(BinId::Numeric(n)),
            RawBinId::Named(s) => s.parse(),
        }
    }
}

impl BinId {
    /// Numeric value of the id, if it is an integer key.
    pub fn as_numeric(&self) -> Option<u64> {
        match self {
            BinId::Numeric(n) => Some(*n),
            BinId::Named(_) => None,
        }
    }
}

impl FromStr for BinId {
    type Err = ShelfPackError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ShelfPackError::InvalidId(s.to_string()));
        }
        // "007" and "+7" stay named keys: only the canonical form folds into an integer.
        let canonical = s.bytes().all(|b| b.is_ascii_digit()) && (s == "0" || !s.starts_with('0'));
        if canonical {
            if let Ok(n) = s.parse::<u64>() {
                return Ok(BinId::Numeric(n));
            }
        }
        Ok(BinId::Named(s.to_string()))
    }
}

impl TryFrom<&str> for BinId {
    type Error = ShelfPackError;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl TryFrom<String> for BinId {
    type Error = ShelfPackError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<u64> for BinId {
    fn from(n: u64) -> Self {
        BinId::Numeric(n)
    }
}

impl From<u32> for BinId {
    fn from(n: u32) -> Self {
        BinId::Numeric(n as u64)
    }
}

impl fmt::Display for BinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinId::Numeric(n) => write!(f, "{n}"),
            BinId::Named(s) => f.write_str(s),
        }
    }
}

impl Serialize for BinId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BinId::Numeric(n) => serializer.serialize_u64(*n),
            BinId::Named(s) => serializer.serialize_str(s),
        }
    }
}

/// A placed rectangle owned by the atlas.
///
/// `w`/`h` are the size most recently requested for this rectangle; `maxw`/`maxh`
/// are the backing capacity of the physical slot, which only ever grows. A bin
/// recycled from the free list may be smaller than its capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bin {
    pub id: BinId,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    pub maxw: u32,
    pub maxh: u32,
    pub refcount: u32,
}

impl Bin {
    pub(crate) fn new(id: BinId, x: u32, y: u32, w: u32, h: u32) -> Self {
        Self {
            id,
            x,
            y,
            w,
            h,
            maxw: w,
            maxh: h,
            refcount: 0,
        }
    }

    /// Requested geometry; this is what placement and overlap checks use.
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }

    /// Backing capacity `(maxw, maxh)`; only consulted for free-list reuse.
    pub fn capacity(&self) -> (u32, u32) {
        (self.maxw, self.maxh)
    }

    /// Physical slot reserved for this bin in the atlas.
    pub fn slot(&self) -> Rect {
        Rect::new(self.x, self.y, self.maxw, self.maxh)
    }
}

/// A single placement request for batch packing.
///
/// Deserialization is lenient the way atlas tooling tends to be: `width`/`height`
/// are accepted for `w`/`h`, missing dimensions become zero (and the request is
/// skipped by `pack`), and an id that is neither a non-empty string nor a
/// non-negative integer is treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackRequest {
    #[serde(
        default,
        deserialize_with = "lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<BinId>,
    #[serde(default, alias = "width")]
    pub w: u32,
    #[serde(default, alias = "height")]
    pub h: u32,
    /// Filled in by `pack` when `PackOptions::in_place` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<u32>,
}

impl PackRequest {
    pub fn new(w: u32, h: u32) -> Self {
        Self {
            w,
            h,
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<BinId>) -> Self {
        self.id = Some(id.into());
        self
    }
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<BinId>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lenient {
        Id(BinId),
        Other(serde::de::IgnoredAny),
    }
    Ok(match Lenient::deserialize(deserializer)? {
        Lenient::Id(id) => Some(id),
        Lenient::Other(_) => None,
    })
}

/// Options for batch packing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackOptions {
    /// Write the resulting `x`, `y` and `id` back into each placed request.
    #[serde(default, alias = "inPlace")]
    pub in_place: bool,
}

/// Serializable snapshot of an atlas: its extents, shelves and bins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layout {
    pub width: u32,
    pub height: u32,
    pub auto_resize: bool,
    pub shelves: Vec<Shelf>,
    /// Live bins, ordered by id.
    pub bins: Vec<Bin>,
    /// Reclaimed bins, in free-list order.
    pub free_bins: Vec<Bin>,
}

/// Statistics about atlas packing efficiency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PackStats {
    pub width: u32,
    pub height: u32,
    /// Number of live bins.
    pub num_bins: usize,
    /// Number of reclaimed bins waiting for reuse.
    pub num_free: usize,
    pub num_shelves: usize,
    /// Atlas area (width * height).
    pub total_area: u64,
    /// Area covered by live bins at their requested size.
    pub used_area: u64,
    /// Occupancy ratio: used_area / total_area (0.0 to 1.0).
    pub occupancy: f64,
}

impl Layout {
    /// Computes packing statistics for this snapshot.
    pub fn stats(&self) -> PackStats {
        let total_area = (self.width as u64) * (self.height as u64);
        let used_area: u64 = self.bins.iter().map(|b| b.rect().area()).sum();
        let occupancy = if total_area > 0 {
            used_area as f64 / total_area as f64
        } else {
            0.0
        };
        PackStats {
            width: self.width,
            height: self.height,
            num_bins: self.bins.len(),
            num_free: self.free_bins.len(),
            num_shelves: self.shelves.len(),
            total_area,
            used_area,
            occupancy,
        }
    }
}

impl PackStats {
    /// Returns a human-readable summary of the statistics.
    pub fn summary(&self) -> String {
        format!(
            "Atlas: {}x{}, Bins: {} (+{} free), Shelves: {}, Occupancy: {:.2}%, Used Area: {} px²",
            self.width,
            self.height,
            self.num_bins,
            self.num_free,
            self.num_shelves,
            self.occupancy * 100.0,
            self.used_area,
        )
    }

    /// Returns wasted space in pixels.
    pub fn wasted_area(&self) -> u64 {
        self.total_area.saturating_sub(self.used_area)
    }

    /// Returns wasted space as a percentage (0.0 to 100.0).
    pub fn waste_percentage(&self) -> f64 {
        if self.total_area > 0 {
            (self.wasted_area() as f64 / self.total_area as f64) * 100.0
        } else {
            0.0
        }
    }
}
