//! Histogram of a numeric variable
//!
//! The default binning aims for `default_bars` bars over the data range with
//! the anchor one bin width left of the minimum. Bin width and anchor can be
//! changed interactively; the anchor always stays within one bin width left
//! of the minimum so the smallest value never falls out of the first bin.

use crate::axis::{Axis, AxisType, Orientation};
use crate::config::{AxisConfig, HistogramConfig};
use crate::error::{LinkviewResult, VariableError};
use crate::graph::{ChangeGraph, NodeId};
use crate::plot::PlotState;
use crate::selection::SelectionMask;
use crate::value::VariableKind;
use crate::variable::Variable;
use linkview_stats::{BinSpec, Binning};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One bar of a histogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub index: usize,
    /// Inclusive lower edge
    pub lower: f64,
    /// Exclusive upper edge
    pub upper: f64,
    pub count: usize,
    /// Members that are primarily selected
    pub selected: usize,
}

/// Histogram aggregator with its x (value) and y (count) axes
#[derive(Debug)]
pub struct HistogramPlot {
    state: PlotState,
    variable: NodeId,
    x_axis: Axis,
    y_axis: Axis,
    binning: Binning,
    config: HistogramConfig,
}

fn data_range(variable: &Variable) -> LinkviewResult<(f64, f64)> {
    if variable.kind() != VariableKind::Numeric {
        return Err(VariableError::NotNumeric {
            variable: variable.name().to_string(),
        }
        .into());
    }
    Ok(variable.range().unwrap_or((0.0, 1.0)))
}

fn present_values(variable: &Variable) -> impl Iterator<Item = (usize, f64)> + '_ {
    (0..variable.len()).filter_map(move |case| variable.number_at(case).map(|v| (case, v)))
}

impl HistogramPlot {
    /// Create a histogram of a numeric variable
    pub fn new(
        graph: &mut ChangeGraph,
        variable: &Variable,
        mask: &SelectionMask,
        config: &HistogramConfig,
        axis: &AxisConfig,
    ) -> LinkviewResult<Self> {
        let (min, max) = data_range(variable)?;
        let mut width = (max - min) / f64::from(config.default_bars.max(1));
        if !(width > 0.0) {
            width = 1.0;
        }
        let spec = BinSpec::new(min - width, width)?;

        let binning = Binning::build(spec, max, config.max_bins, present_values(variable))?;

        let x_axis = Axis::new(graph, Orientation::Horizontal, AxisType::Numeric)
            .with_precision(axis.precision);
        let y_axis = Axis::new(graph, Orientation::Vertical, AxisType::Numeric)
            .with_precision(axis.precision);
        let state = PlotState::attach(
            graph,
            "histogram",
            &[variable.node(), mask.node(), x_axis.node(), y_axis.node()],
        );

        let mut plot = Self {
            state,
            variable: variable.node(),
            x_axis,
            y_axis,
            binning,
            config: config.clone(),
        };
        plot.autoscale(graph)?;
        plot.state.mark_built();
        Ok(plot)
    }

    pub fn node(&self) -> NodeId {
        self.state.node()
    }

    /// Node of the binned variable
    pub fn variable_node(&self) -> NodeId {
        self.variable
    }

    pub fn is_stale(&self) -> bool {
        self.state.is_stale()
    }

    pub fn x_axis(&self) -> &Axis {
        &self.x_axis
    }

    pub fn y_axis(&self) -> &Axis {
        &self.y_axis
    }

    /// Place both axes on screen
    pub fn set_geometry(
        &mut self,
        graph: &mut ChangeGraph,
        x: (f64, f64),
        y: (f64, f64),
    ) -> LinkviewResult<()> {
        self.x_axis
            .set_geometry(graph, Orientation::Horizontal, x.0, x.1)?;
        self.y_axis
            .set_geometry(graph, Orientation::Vertical, y.0, y.1)?;
        Ok(())
    }

    pub fn binning(&self) -> &Binning {
        &self.binning
    }

    pub fn spec(&self) -> BinSpec {
        self.binning.spec()
    }

    /// Recompute the bins if anything changed since the last refresh
    pub fn refresh(&mut self, graph: &mut ChangeGraph, variable: &Variable) -> LinkviewResult<bool> {
        if !self.is_stale() {
            return Ok(false);
        }
        let token = self.state.begin();
        let (min, max) = data_range(variable)?;
        let spec = self.binning.spec();
        let anchor = BinSpec::clamp_anchor(spec.anchor, min, spec.width);
        let binning = Binning::build(
            BinSpec::new(anchor, spec.width)?,
            max,
            self.config.max_bins,
            present_values(variable),
        )?;
        if !self.state.is_current(token) {
            return Ok(false);
        }
        self.binning = binning;
        self.autoscale(graph)?;
        self.state.mark_built();
        Ok(true)
    }

    /// Bin the variable's current values with a new anchor and width
    ///
    /// Fails without touching the bins if the width would need more than
    /// `max_bins` bins.
    fn rebin(&mut self, graph: &mut ChangeGraph, variable: &Variable, anchor: f64, width: f64) -> LinkviewResult<()> {
        let (min, max) = data_range(variable)?;
        let anchor = BinSpec::clamp_anchor(anchor, min, width);
        let spec = BinSpec::new(anchor, width)?;
        self.binning
            .rebin(spec, max, self.config.max_bins, present_values(variable))?;
        debug!(anchor, width, bins = self.binning.len(), "rebinned histogram");
        self.autoscale(graph)?;
        self.state.mark_built();
        Ok(())
    }

    /// Use a new bin width, keeping the anchor where possible
    pub fn set_bin_width(&mut self, graph: &mut ChangeGraph, variable: &Variable, width: f64) -> LinkviewResult<()> {
        let anchor = self.binning.spec().anchor;
        self.rebin(graph, variable, anchor, width)
    }

    /// Move the anchor (clamped to `[min - width, min]`)
    pub fn set_anchor(&mut self, graph: &mut ChangeGraph, variable: &Variable, anchor: f64) -> LinkviewResult<()> {
        let width = self.binning.spec().width;
        self.rebin(graph, variable, anchor, width)
    }

    /// Grow the bin width by one scaling step
    pub fn widen_bins(&mut self, graph: &mut ChangeGraph, variable: &Variable) -> LinkviewResult<()> {
        let width = self.binning.spec().width * self.config.bin_width_factor;
        self.set_bin_width(graph, variable, width)
    }

    /// Shrink the bin width by one scaling step
    pub fn narrow_bins(&mut self, graph: &mut ChangeGraph, variable: &Variable) -> LinkviewResult<()> {
        let width = self.binning.spec().width / self.config.bin_width_factor;
        self.set_bin_width(graph, variable, width)
    }

    /// Shift the anchor by `steps` nudges of `anchor_step` bin widths
    pub fn nudge_anchor(&mut self, graph: &mut ChangeGraph, variable: &Variable, steps: i32) -> LinkviewResult<()> {
        let spec = self.binning.spec();
        let anchor = spec.anchor + f64::from(steps) * self.config.anchor_step * spec.width;
        self.set_anchor(graph, variable, anchor)
    }

    /// Fit the x axis to the bins and the y axis to the tallest bar
    pub fn autoscale(&mut self, graph: &mut ChangeGraph) -> LinkviewResult<()> {
        let spec = self.binning.spec();
        let bars = self.binning.len().max(1) as f64;
        self.x_axis
            .set_value_range(graph, spec.anchor, bars * spec.width)?;
        let top = self.binning.max_count().max(1) as f64;
        self.y_axis.set_value_range(graph, 0.0, top)?;
        Ok(())
    }

    /// Summary of one bin
    pub fn bin(&self, index: usize, mask: &SelectionMask) -> Option<HistogramBin> {
        let members = self.binning.bin(index)?;
        let spec = self.binning.spec();
        Some(HistogramBin {
            index,
            lower: spec.lower_edge(index),
            upper: spec.upper_edge(index),
            count: members.len(),
            selected: members.iter().filter(|&&c| mask.is_selected(c)).count(),
        })
    }

    /// Summaries of all bins
    pub fn bins(&self, mask: &SelectionMask) -> Vec<HistogramBin> {
        (0..self.binning.len())
            .filter_map(|i| self.bin(i, mask))
            .collect()
    }

    /// Bin under a geometry position of the x axis
    pub fn bin_at_position(&self, position: f64) -> Option<usize> {
        let value = self.x_axis.position_to_value(position);
        let bin = self.binning.spec().bin_of(value);
        (bin >= 0 && (bin as usize) < self.binning.len()).then_some(bin as usize)
    }

    /// Select the cases of one bin
    pub fn select_bin(&self, graph: &mut ChangeGraph, mask: &mut SelectionMask, index: usize) -> LinkviewResult<()> {
        let members = self.binning.bin(index).unwrap_or_default();
        mask.select_only(graph, members)
    }

    /// Colour cases by bin: secondary mark `bin + 1`, 0 for unbinned cases
    pub fn color_by_bins(&self, graph: &mut ChangeGraph, mask: &mut SelectionMask) -> LinkviewResult<()> {
        let marks = self
            .binning
            .case_bins(mask.len())
            .into_iter()
            .map(|bin| bin.map_or(0, |b| b as u32 + 1))
            .collect();
        mask.assign_secondary(graph, marks)
    }
}
