//! Bar chart of a categorized variable

use crate::axis::{Axis, AxisType, Orientation, Tick};
use crate::config::AxisConfig;
use crate::error::LinkviewResult;
use crate::graph::{ChangeGraph, NodeId};
use crate::plot::PlotState;
use crate::selection::SelectionMask;
use crate::variable::Variable;
use serde::{Deserialize, Serialize};

/// One bar, in display order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub category: usize,
    pub label: String,
    pub count: usize,
    pub selected: usize,
    /// Geometry interval along the category axis
    pub low: f64,
    pub high: f64,
}

/// Bar chart aggregator
#[derive(Debug)]
pub struct BarChartPlot {
    state: PlotState,
    x_axis: Axis,
    y_axis: Axis,
    members: Vec<Vec<usize>>,
    labels: Vec<String>,
}

impl BarChartPlot {
    /// Create a bar chart; the variable is categorized if it is not yet
    pub fn new(
        graph: &mut ChangeGraph,
        variable: &mut Variable,
        mask: &SelectionMask,
        axis: &AxisConfig,
    ) -> LinkviewResult<Self> {
        variable.categorize(graph, false)?;
        let x_axis = Axis::new(graph, Orientation::Horizontal, AxisType::EquidistantByCategory)
            .with_precision(axis.precision);
        let y_axis = Axis::new(graph, Orientation::Vertical, AxisType::Numeric)
            .with_precision(axis.precision);
        let state = PlotState::attach(
            graph,
            "barchart",
            &[variable.node(), mask.node(), x_axis.node(), y_axis.node()],
        );
        let mut plot = Self {
            state,
            x_axis,
            y_axis,
            members: Vec::new(),
            labels: Vec::new(),
        };
        plot.x_axis.set_default_range(graph, variable, true)?;
        plot.refresh(graph, variable)?;
        Ok(plot)
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

    /// Switch between equal-width and proportional-width bars
    pub fn set_proportional(
        &mut self,
        graph: &mut ChangeGraph,
        variable: &Variable,
        proportional: bool,
    ) -> LinkviewResult<bool> {
        let axis_type = if proportional {
            AxisType::ProportionalByCategory
        } else {
            AxisType::EquidistantByCategory
        };
        self.x_axis.set_type(graph, axis_type, variable)
    }

    /// Recompute category members if anything changed since the last refresh
    pub fn refresh(&mut self, graph: &mut ChangeGraph, variable: &Variable) -> LinkviewResult<bool> {
        if !self.is_stale() {
            return Ok(false);
        }
        let token = self.state.begin();
        let members = variable.category_members();
        let labels = (0..members.len())
            .map(|c| variable.category_at(c).map(ToString::to_string).unwrap_or_default())
            .collect();
        if !self.state.is_current(token) {
            return Ok(false);
        }

        self.members = members;
        self.labels = labels;
        // keeps the user's category order unless the number of categories changed
        self.x_axis.set_default_range(graph, variable, false)?;
        let top = self.members.iter().map(Vec::len).max().unwrap_or(0).max(1);
        self.y_axis.set_value_range(graph, 0.0, top as f64)?;
        self.state.mark_built();
        Ok(true)
    }

    /// Bars in display order
    pub fn bars(&self, mask: &SelectionMask) -> Vec<Bar> {
        self.x_axis
            .sequence()
            .order()
            .iter()
            .filter_map(|&category| {
                let cases = self.members.get(category)?;
                let (low, high) = self.x_axis.category_bounds(category)?;
                Some(Bar {
                    category,
                    label: self.labels.get(category).cloned().unwrap_or_default(),
                    count: cases.len(),
                    selected: cases.iter().filter(|&&c| mask.is_selected(c)).count(),
                    low,
                    high,
                })
            })
            .collect()
    }

    /// Category-axis ticks labelled with category names
    ///
    /// [`Axis::ticks`] only knows category indices.
    pub fn ticks(&self, mean_px: f64, min_px: f64) -> Vec<Tick> {
        self.x_axis
            .ticks(mean_px, min_px)
            .into_iter()
            .map(|mut tick| {
                if let Some(name) = self.labels.get(tick.value as usize) {
                    tick.label = name.clone();
                }
                tick
            })
            .collect()
    }

    /// Member cases of a category
    pub fn members(&self, category: usize) -> Option<&[usize]> {
        self.members.get(category).map(Vec::as_slice)
    }

    /// Category under a geometry position of the x axis
    pub fn bar_at_position(&self, position: f64) -> Option<usize> {
        self.x_axis.category_at_position(position)
    }

    /// Make the cases of one category the selection
    pub fn select_category(
        &self,
        graph: &mut ChangeGraph,
        mask: &mut SelectionMask,
        category: usize,
    ) -> LinkviewResult<()> {
        mask.select_only(graph, self.members(category).unwrap_or_default())
    }

    /// Move a bar to another display slot
    pub fn move_bar(&mut self, graph: &mut ChangeGraph, category: usize, position: usize) -> LinkviewResult<()> {
        self.x_axis.move_category(graph, category, position)
    }

    /// Exchange two bars
    pub fn swap_bars(&mut self, graph: &mut ChangeGraph, a: usize, b: usize) -> LinkviewResult<()> {
        self.x_axis.swap_categories(graph, a, b)
    }
}
