//! Map rendering.
//!
//! This module provides the base map tile source and the user marker plugin
//! drawn on top of the walkers map.

pub mod marker;
pub mod tiles;

pub use marker::UserMarkerPlugin;
pub use tiles::{tile_cache_dir, BaseTileSource};
