//! Kaplan-Meier survival plot
//!
//! Survival time comes from a numeric variable, the event indicator from a
//! second variable: a non-zero number or the configured event label marks an
//! event, everything else counts as censored. Besides the curve over all
//! cases the plot keeps curves for the selected and unselected cases,
//! weighted by their share of all cases.

use crate::axis::{Axis, AxisType, Orientation};
use crate::config::{AxisConfig, SurvivalConfig};
use crate::error::{LinkviewResult, VariableError};
use crate::graph::{ChangeGraph, NodeId};
use crate::plot::PlotState;
use crate::selection::{SelectionMask, SELECTED_MARK};
use crate::value::{Value, VariableKind};
use crate::variable::{RankFilter, Variable};
use linkview_stats::{filter_ranks, KaplanMeier, Observation, SurvivalStep};
use serde::{Deserialize, Serialize};

/// A survival curve of a subset of cases
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurvivalCurve {
    pub estimate: KaplanMeier,
    /// Share of all ranked cases that make up this curve
    pub weight: f64,
}

impl SurvivalCurve {
    pub fn steps(&self) -> &[SurvivalStep] {
        self.estimate.steps()
    }
}

/// Survival curves with time (x) and probability (y) axes
#[derive(Debug)]
pub struct SurvivalPlot {
    state: PlotState,
    x_axis: Axis,
    y_axis: Axis,
    event_label: String,
    all: SurvivalCurve,
    selected: SurvivalCurve,
    unselected: SurvivalCurve,
}

impl SurvivalPlot {
    /// Create a survival plot of `time` with events from `event`
    pub fn new(
        graph: &mut ChangeGraph,
        time: &mut Variable,
        event: &Variable,
        mask: &SelectionMask,
        config: &SurvivalConfig,
        axis: &AxisConfig,
    ) -> LinkviewResult<Self> {
        let x_axis = Axis::new(graph, Orientation::Horizontal, AxisType::Numeric)
            .with_precision(axis.precision);
        let y_axis = Axis::new(graph, Orientation::Vertical, AxisType::Numeric)
            .with_precision(axis.precision);
        let state = PlotState::attach(
            graph,
            "survival",
            &[time.node(), event.node(), mask.node(), x_axis.node(), y_axis.node()],
        );
        let empty = SurvivalCurve {
            estimate: KaplanMeier::estimate(Vec::new()),
            weight: 0.0,
        };
        let mut plot = Self {
            state,
            x_axis,
            y_axis,
            event_label: config.event_label.clone(),
            all: empty.clone(),
            selected: empty.clone(),
            unselected: empty,
        };
        plot.refresh(graph, time, event, mask)?;
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

    /// Check if a case of the event variable denotes an event
    pub fn is_event(&self, event: &Variable, case: usize) -> bool {
        match event.value_at(case) {
            Some(Value::Number(n)) => *n != 0.0 && !n.is_nan(),
            Some(Value::Text(s)) => *s == self.event_label,
            _ => false,
        }
    }

    fn estimate(&self, time: &Variable, event: &Variable, ranks: &[usize]) -> KaplanMeier {
        KaplanMeier::estimate(ranks.iter().filter_map(|&case| {
            time.number_at(case)
                .map(|t| Observation::new(t, self.is_event(event, case)))
        }))
    }

    /// Recompute the curves if anything changed since the last refresh
    pub fn refresh(
        &mut self,
        graph: &mut ChangeGraph,
        time: &mut Variable,
        event: &Variable,
        mask: &SelectionMask,
    ) -> LinkviewResult<bool> {
        if !self.is_stale() {
            return Ok(false);
        }
        if time.kind() != VariableKind::Numeric {
            return Err(VariableError::NotNumeric {
                variable: time.name().to_string(),
            }
            .into());
        }
        let token = self.state.begin();

        let ranks = time.ranked_indices(None);
        let selected = time.ranked_indices(Some(RankFilter {
            mask,
            mark: SELECTED_MARK,
        }));
        let unselected = filter_ranks(&ranks, |case| !mask.is_selected(case));
        let total = ranks.len().max(1) as f64;

        let all = SurvivalCurve {
            estimate: self.estimate(time, event, &ranks),
            weight: if ranks.is_empty() { 0.0 } else { 1.0 },
        };
        let selected = SurvivalCurve {
            estimate: self.estimate(time, event, &selected),
            weight: selected.len() as f64 / total,
        };
        let unselected = SurvivalCurve {
            estimate: self.estimate(time, event, &unselected),
            weight: unselected.len() as f64 / total,
        };

        if !self.state.is_current(token) {
            return Ok(false);
        }
        self.all = all;
        self.selected = selected;
        self.unselected = unselected;
        self.autoscale(graph, time)?;
        self.state.mark_built();
        Ok(true)
    }

    /// Fit the time axis to `[0, max time]` and the probability axis to `[0, 1]`
    pub fn autoscale(&mut self, graph: &mut ChangeGraph, time: &Variable) -> LinkviewResult<()> {
        let end = time.max().filter(|&m| m > 0.0).unwrap_or(1.0);
        self.x_axis.set_value_range(graph, 0.0, end)?;
        self.y_axis.set_value_range(graph, 0.0, 1.0)?;
        Ok(())
    }

    /// Curve over all cases
    pub fn curve(&self) -> &SurvivalCurve {
        &self.all
    }

    /// Curve over the selected cases
    pub fn selected_curve(&self) -> &SurvivalCurve {
        &self.selected
    }

    /// Curve over the unselected cases
    pub fn unselected_curve(&self) -> &SurvivalCurve {
        &self.unselected
    }

    /// Median survival time over all cases
    pub fn median(&self) -> Option<f64> {
        self.all.estimate.median()
    }

    /// Step points of a curve in geometry coordinates
    pub fn step_positions(&self, curve: &SurvivalCurve) -> Vec<(f64, f64)> {
        curve
            .steps()
            .iter()
            .map(|s| {
                (
                    self.x_axis.value_to_position(s.time),
                    self.y_axis.value_to_position(s.survival),
                )
            })
            .collect()
    }
}
