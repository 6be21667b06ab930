//! Shelf Best Height Fit rectangle allocator for texture atlases.
//!
//! - Placement: reclaimed bins first (least wasted area), then existing shelves
//!   (exact height, else least height waste), then a new shelf
//! - Growth: optional auto-resize doubles the smaller side when nothing fits
//! - Reuse: bins are reference counted; a released bin's slot is recycled
//! - Data model is serde-serializable; JSON export helpers are provided.
//!
//! Quick example:
//! ```
//! use shelf_pack_core::prelude::*;
//!
//! let mut sprite = ShelfPack::new(ShelfPackConfig::builder().with_dimensions(64, 64).build());
//! let mut requests = vec![
//!     PackRequest::new(12, 12).with_id(BinId::Named("a".into())),
//!     PackRequest::new(12, 16).with_id(BinId::Named("b".into())),
//! ];
//! let bins = sprite.pack(&mut requests, PackOptions { in_place: true });
//! assert_eq!(bins.len(), 2);
//! assert_eq!(requests[1].y, Some(12));
//! ```

pub mod atlas;
pub mod config;
pub mod error;
pub mod export;
pub mod free_list;
pub mod model;
pub mod shelf;

pub use atlas::*;
pub use config::*;
pub use error::*;
pub use export::*;
pub use free_list::*;
pub use model::*;
pub use shelf::*;

/// Convenience prelude for common types and functions.
/// Importing `shelf_pack_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::atlas::ShelfPack;
    pub use crate::config::{ShelfPackConfig, ShelfPackConfigBuilder};
    pub use crate::error::ShelfPackError;
    pub use crate::free_list::FreeList;
    pub use crate::model::{Bin, BinId, Layout, PackOptions, PackRequest, PackStats, Rect};
    pub use crate::shelf::Shelf;
}
