//! linkview-stats - Statistical primitives for linked statistical graphics
//!
//! This crate provides the slice-level algorithms the plot aggregators in
//! `linkview-core` are built on:
//!
//! - **Ranking**: stable ascending order of case indices, with filtering
//! - **Binning**: anchored fixed-width histogram bins with member cases
//! - **Survival**: Kaplan-Meier estimation over rank-ordered observations
//!
//! Nothing here knows about variables, axes or change events. Inputs are
//! plain `(case, value)` streams so the same code serves whole datasets and
//! selected subsets.

pub mod binning;
pub mod ranking;
pub mod survival;

pub use binning::*;
pub use ranking::*;
pub use survival::*;
