//! Plot aggregators
//!
//! Each plot turns variables and the selection mask into screen-independent
//! aggregates (bins, survival steps, point groups, bars) laid out by its own
//! axes. Plots never draw; hosts read the aggregates after a refresh.
//!
//! A plot owns a node in the change graph that observes its variables, the
//! selection mask and its axes. Any delivered change marks the plot stale;
//! `refresh` recomputes only when needed.

pub mod barchart;
pub mod histogram;
pub mod scatter;
pub mod survival;

pub use barchart::{Bar, BarChartPlot};
pub use histogram::{HistogramBin, HistogramPlot};
pub use scatter::ScatterPlot;
pub use survival::{SurvivalCurve, SurvivalPlot};

use crate::graph::{ChangeGraph, NodeId, StaleFlag};

/// Graph membership and staleness of a plot
#[derive(Debug, Clone)]
pub struct PlotState {
    node: NodeId,
    flag: StaleFlag,
    built: Option<u64>,
}

impl PlotState {
    /// Add an observer node for a plot and subscribe it to `sources`
    pub fn attach(graph: &mut ChangeGraph, label: &str, sources: &[NodeId]) -> Self {
        let flag = StaleFlag::new();
        let node = graph.add_observer_node(label, flag.clone());
        for &source in sources {
            graph.register(node, source);
        }
        Self {
            node,
            flag,
            built: None,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Check if a change arrived since the last completed refresh
    pub fn is_stale(&self) -> bool {
        self.built != Some(self.flag.generation())
    }

    /// Token for a recomputation starting now
    pub fn begin(&self) -> u64 {
        self.flag.begin()
    }

    /// Check if no change arrived since `token` was taken
    pub fn is_current(&self, token: u64) -> bool {
        self.flag.commit(token)
    }

    /// Record a completed refresh, including changes the plot made itself
    pub fn mark_built(&mut self) {
        self.built = Some(self.flag.generation());
    }

    /// Remove the plot's node from the graph
    pub fn detach(&self, graph: &mut ChangeGraph) -> bool {
        graph.remove_node(self.node)
    }
}
