//! linkview-core - Linked interactive statistical graphics engine
//!
//! This crate holds the data model and the update machinery behind linked
//! views: every plot of a dataset reacts to changes of its variables, its
//! axes and the shared case selection.
//!
//! # Key Components
//!
//! - **ChangeGraph**: arena of nodes that forward typed change messages to
//!   their observers, with batching and failure collection
//! - **Variable**: typed column with missing values, categories and cached
//!   rankings
//! - **SelectionMask**: primary selection plus secondary (colouring) marks
//! - **Axis**: value/geometry mapping for numeric, index and categorical
//!   layouts, with tick placement and category ordering
//! - **Plots**: histogram, Kaplan-Meier survival, scatterplot and bar chart
//!   aggregators built on `linkview-stats`
//! - **Session**: datasets, host column conversion, length-mismatch handling
//!   and blocking waits for automation threads
//!
//! Plots never draw. Hosts read their aggregates after `refresh` and map
//! them to pixels themselves.

pub mod axis;
pub mod config;
pub mod dataset;
pub mod error;
pub mod graph;
pub mod plot;
pub mod selection;
pub mod session;
pub mod spatial;
pub mod value;
pub mod variable;
pub mod wait;

pub use axis::*;
pub use config::*;
pub use dataset::*;
pub use error::*;
pub use graph::*;
pub use plot::{
    Bar, BarChartPlot, HistogramBin, HistogramPlot, PlotState, ScatterPlot, SurvivalCurve,
    SurvivalPlot,
};
pub use selection::*;
pub use session::*;
pub use spatial::*;
pub use value::*;
pub use variable::*;
pub use wait::*;
