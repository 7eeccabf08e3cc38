//! UI components for Radar Desktop.

pub mod status_bar;

pub use status_bar::StatusBar;
