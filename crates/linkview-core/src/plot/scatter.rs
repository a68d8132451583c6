//! Scatterplot of two variables
//!
//! Cases are placed with their axes' `case_position`, so numeric, index and
//! categorical axes can be mixed freely. Positions are rounded to integer
//! screen coordinates and collected in a [`ScreenIndex`]. Cases that land
//! outside the axes' geometry are not indexed but flagged, so hosts can mark
//! the border of the plot.

use crate::axis::{Axis, AxisType, Orientation};
use crate::config::{AxisConfig, ScatterConfig};
use crate::error::LinkviewResult;
use crate::graph::{ChangeGraph, NodeId};
use crate::plot::PlotState;
use crate::selection::SelectionMask;
use crate::spatial::{PointGroup, ScreenIndex};
use crate::value::VariableKind;
use crate::variable::Variable;
use tracing::debug;

/// Scatterplot aggregator
#[derive(Debug)]
pub struct ScatterPlot {
    state: PlotState,
    x_axis: Axis,
    y_axis: Axis,
    index: ScreenIndex,
    out_of_area: Vec<bool>,
}

fn default_axis_type(variable: &Variable) -> AxisType {
    if variable.kind() == VariableKind::Numeric && !variable.is_categorized() {
        AxisType::Numeric
    } else {
        AxisType::EquidistantByCategory
    }
}

impl ScatterPlot {
    /// Create a scatterplot of `y` against `x`
    ///
    /// Categorized or text variables get a categorical axis; they must be
    /// categorized for their cases to be placed.
    pub fn new(
        graph: &mut ChangeGraph,
        x: &Variable,
        y: &Variable,
        mask: &SelectionMask,
        config: &ScatterConfig,
        axis: &AxisConfig,
    ) -> LinkviewResult<Self> {
        let mut x_axis = Axis::new(graph, Orientation::Horizontal, default_axis_type(x))
            .with_precision(axis.precision);
        let mut y_axis = Axis::new(graph, Orientation::Vertical, default_axis_type(y))
            .with_precision(axis.precision);
        x_axis.set_default_range(graph, x, true)?;
        y_axis.set_default_range(graph, y, true)?;

        let state = PlotState::attach(
            graph,
            "scatterplot",
            &[x.node(), y.node(), mask.node(), x_axis.node(), y_axis.node()],
        );
        Ok(Self {
            state,
            x_axis,
            y_axis,
            index: ScreenIndex::new(config.point_diameter),
            out_of_area: Vec::new(),
        })
    }

    pub fn node(&self) -> NodeId {
        self.state.node()
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

    /// Change the layout of one axis
    pub fn set_axis_type(
        &mut self,
        graph: &mut ChangeGraph,
        orientation: Orientation,
        axis_type: AxisType,
        variable: &Variable,
    ) -> LinkviewResult<bool> {
        match orientation {
            Orientation::Horizontal => self.x_axis.set_type(graph, axis_type, variable),
            Orientation::Vertical => self.y_axis.set_type(graph, axis_type, variable),
        }
    }

    /// Fit both value ranges to the variables
    pub fn autoscale(&mut self, graph: &mut ChangeGraph, x: &Variable, y: &Variable) -> LinkviewResult<()> {
        self.x_axis.set_default_range(graph, x, false)?;
        self.y_axis.set_default_range(graph, y, false)?;
        Ok(())
    }

    /// Rebuild the screen index if anything changed since the last refresh
    pub fn refresh(&mut self, x: &Variable, y: &Variable) -> bool {
        if !self.is_stale() {
            return false;
        }
        let token = self.state.begin();

        let cases = x.len().min(y.len());
        let mut index = ScreenIndex::new(self.index.diameter());
        let mut out_of_area = vec![false; cases];
        for case in 0..cases {
            let (Some(px), Some(py)) = (
                self.x_axis.case_position(x, case),
                self.y_axis.case_position(y, case),
            ) else {
                continue;
            };
            if !(px.is_finite() && py.is_finite()) {
                continue;
            }
            if self.x_axis.clip(px) != px || self.y_axis.clip(py) != py {
                out_of_area[case] = true;
                continue;
            }
            index.insert(case, px.round() as i32, py.round() as i32);
        }

        if !self.state.is_current(token) {
            return false;
        }
        debug!(groups = index.len(), cases, "rebuilt scatterplot index");
        self.index = index;
        self.out_of_area = out_of_area;
        self.state.mark_built();
        true
    }

    pub fn index(&self) -> &ScreenIndex {
        &self.index
    }

    /// Point groups in creation order
    pub fn groups(&self) -> &[PointGroup] {
        self.index.groups()
    }

    /// Check if a case lies outside the plot area
    pub fn is_out_of_area(&self, case: usize) -> bool {
        self.out_of_area.get(case).copied().unwrap_or(false)
    }

    /// Number of cases outside the plot area
    pub fn out_of_area_count(&self) -> usize {
        self.out_of_area.iter().filter(|&&o| o).count()
    }

    /// Cases inside a screen rectangle
    pub fn cases_in_rect(&self, x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<usize> {
        self.index.cases_in_rect(x0, y0, x1, y1)
    }

    /// Cases whose glyph covers a screen point
    pub fn cases_at(&self, px: i32, py: i32) -> Vec<usize> {
        self.index
            .groups_containing(px, py)
            .into_iter()
            .filter_map(|g| self.index.group(g))
            .flat_map(|g| g.cases.iter().copied())
            .collect()
    }

    /// Brush: make the cases inside a rectangle the selection
    pub fn select_rect(
        &self,
        graph: &mut ChangeGraph,
        mask: &mut SelectionMask,
        corners: (i32, i32, i32, i32),
    ) -> LinkviewResult<usize> {
        let cases = self.cases_in_rect(corners.0, corners.1, corners.2, corners.3);
        mask.select_only(graph, &cases)?;
        Ok(cases.len())
    }
}
