//! Weather overlay tile management.
//!
//! This module provides radar tile fetching from RainViewer. The tile cache
//! is rebuilt whenever the widget swaps the radar frame.

pub mod rainviewer;

pub use rainviewer::{RadarTiles, RainViewerSource};
