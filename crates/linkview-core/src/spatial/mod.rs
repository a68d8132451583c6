//! Spatial indexing of plotted cases
//!
//! Provides the screen-position index behind scatterplots:
//! - Grouping of cases that land on the same screen position
//! - Rectangle queries for brushing
//! - Point hit tests by glyph diameter

pub mod screen_index;

pub use screen_index::{PointGroup, ScreenIndex};
