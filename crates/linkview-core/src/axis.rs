//! Axes: mapping between data values and geometry
//!
//! An axis maps the value interval `[v_begin, v_begin + v_len)` onto the
//! geometry interval `[g_begin, g_begin + g_len)`. A negative `g_len` flips
//! the axis (vertical axes usually grow upwards while screen coordinates grow
//! downwards). Geometry is screen-independent `f64`; hosts round to pixels.
//!
//! Besides plain numeric scaling an axis can lay out discrete data:
//!
//! - `EquidistantByIndex`: case `i` of `n` sits at `i / n` of the axis
//! - `EquidistantByCategory`: every category gets an equal share
//! - `ProportionalByCategory`: every category gets a share proportional to
//!   its number of cases
//!
//! Categories are laid out in the order of the axis' [`CategorySequence`],
//! which the user can rearrange without touching the variable.

use crate::error::{AxisError, LinkviewResult};
use crate::graph::{ChangeGraph, ChangeKind, NodeId};
use crate::variable::Variable;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default epsilon below which range and geometry changes are ignored
pub const DEFAULT_PRECISION: f64 = 1e-4;

/// How values are laid out along an axis
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisType {
    Numeric,
    EquidistantByIndex,
    EquidistantByCategory,
    ProportionalByCategory,
}

impl AxisType {
    /// Check if the axis lays out categories
    pub fn is_categorical(&self) -> bool {
        matches!(
            self,
            AxisType::EquidistantByCategory | AxisType::ProportionalByCategory
        )
    }

    /// Check if the axis lays out discrete items (cases or categories)
    pub fn is_discrete(&self) -> bool {
        !matches!(self, AxisType::Numeric)
    }
}

/// Axis orientation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Display order of categories
///
/// Keeps both directions of the permutation so that lookups are O(1) either
/// way.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySequence {
    /// Sequence slot -> category
    order: Vec<usize>,
    /// Category -> sequence slot
    slots: Vec<usize>,
}

impl CategorySequence {
    /// Identity sequence of `n` categories
    pub fn new(n: usize) -> Self {
        let mut seq = Self::default();
        seq.reset(n);
        seq
    }

    /// Back to identity order with `n` categories
    pub fn reset(&mut self, n: usize) {
        self.order = (0..n).collect();
        self.slots = (0..n).collect();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Sequence slot of a category
    pub fn position_of(&self, category: usize) -> Option<usize> {
        self.slots.get(category).copied()
    }

    /// Category at a sequence slot
    pub fn category_at(&self, position: usize) -> Option<usize> {
        self.order.get(position).copied()
    }

    /// Categories in display order
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    fn check(&self, category: usize) -> Result<(), AxisError> {
        if category >= self.len() {
            return Err(AxisError::CategoryOutOfRange {
                category,
                count: self.len(),
            });
        }
        Ok(())
    }

    /// Exchange the slots of two categories
    pub fn swap(&mut self, a: usize, b: usize) -> Result<(), AxisError> {
        self.check(a)?;
        self.check(b)?;
        let (pa, pb) = (self.slots[a], self.slots[b]);
        self.order.swap(pa, pb);
        self.slots[a] = pb;
        self.slots[b] = pa;
        Ok(())
    }

    /// Move a category to slot `position` (clipped), shifting the ones in
    /// between by one
    ///
    /// Time complexity: O(distance moved)
    pub fn move_to(&mut self, category: usize, position: usize) -> Result<(), AxisError> {
        self.check(category)?;
        let target = position.min(self.len() - 1);
        let mut current = self.slots[category];
        while current < target {
            let next = self.order[current + 1];
            self.order[current] = next;
            self.slots[next] = current;
            current += 1;
        }
        while current > target {
            let prev = self.order[current - 1];
            self.order[current] = prev;
            self.slots[prev] = current;
            current -= 1;
        }
        self.order[target] = category;
        self.slots[category] = target;
        Ok(())
    }
}

/// A tick mark on an axis
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Position in data coordinates (category index on categorical axes)
    pub value: f64,
    /// Position in geometry coordinates
    pub position: f64,
    /// Label text
    pub label: String,
}

/// Stateful value <-> geometry mapping
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Axis {
    node: NodeId,
    orientation: Orientation,
    axis_type: AxisType,
    v_begin: f64,
    v_len: f64,
    g_begin: f64,
    g_len: f64,
    data_count: usize,
    sequence: CategorySequence,
    /// Case counts per category, in category order
    category_counts: Vec<usize>,
    /// `log10(|v_len|)`, 0 for degenerate ranges
    log_len: f64,
    precision: f64,
}

impl Axis {
    /// Create an axis over `[0, 1)` with empty geometry
    pub fn new(graph: &mut ChangeGraph, orientation: Orientation, axis_type: AxisType) -> Self {
        let label = match orientation {
            Orientation::Horizontal => "x-axis",
            Orientation::Vertical => "y-axis",
        };
        Self {
            node: graph.add_node(label),
            orientation,
            axis_type,
            v_begin: 0.0,
            v_len: 1.0,
            g_begin: 0.0,
            g_len: 0.0,
            data_count: 1,
            sequence: CategorySequence::default(),
            category_counts: Vec::new(),
            log_len: 0.0,
            precision: DEFAULT_PRECISION,
        }
    }

    /// Use a different epsilon for change detection
    pub fn with_precision(mut self, precision: f64) -> Self {
        self.precision = precision;
        self.update_log_len();
        self
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn axis_type(&self) -> AxisType {
        self.axis_type
    }

    pub fn precision(&self) -> f64 {
        self.precision
    }

    pub fn v_begin(&self) -> f64 {
        self.v_begin
    }

    pub fn v_len(&self) -> f64 {
        self.v_len
    }

    pub fn g_begin(&self) -> f64 {
        self.g_begin
    }

    pub fn g_len(&self) -> f64 {
        self.g_len
    }

    pub fn data_count(&self) -> usize {
        self.data_count
    }

    pub fn sequence(&self) -> &CategorySequence {
        &self.sequence
    }

    /// Cached `log10(|v_len|)`
    pub fn log_len(&self) -> f64 {
        self.log_len
    }

    fn update_log_len(&mut self) {
        self.log_len = if self.v_len.abs() < self.precision {
            0.0
        } else {
            self.v_len.abs().log10()
        };
    }

    fn changed(&self, graph: &mut ChangeGraph) -> LinkviewResult<()> {
        graph.emit(self.node, ChangeKind::AxisChange)?;
        Ok(())
    }

    fn close(&self, a: f64, b: f64) -> bool {
        (a - b).abs() < self.precision
    }

    /// Place the axis on screen; returns whether anything changed
    pub fn set_geometry(
        &mut self,
        graph: &mut ChangeGraph,
        orientation: Orientation,
        begin: f64,
        length: f64,
    ) -> LinkviewResult<bool> {
        if !(begin.is_finite() && length.is_finite()) {
            return Err(AxisError::InvalidRange { begin, length }.into());
        }
        if orientation == self.orientation
            && self.close(begin, self.g_begin)
            && self.close(length, self.g_len)
        {
            return Ok(false);
        }
        self.orientation = orientation;
        self.g_begin = begin;
        self.g_len = length;
        self.changed(graph)?;
        Ok(true)
    }

    /// Set the visible value range; returns whether anything changed
    pub fn set_value_range(
        &mut self,
        graph: &mut ChangeGraph,
        begin: f64,
        length: f64,
    ) -> LinkviewResult<bool> {
        if !(begin.is_finite() && length.is_finite()) {
            return Err(AxisError::InvalidRange { begin, length }.into());
        }
        if self.close(begin, self.v_begin) && self.close(length, self.v_len) {
            return Ok(false);
        }
        self.v_begin = begin;
        self.v_len = length;
        self.update_log_len();
        debug!(begin, length, "axis value range changed");
        self.changed(graph)?;
        Ok(true)
    }

    /// Number of discrete items laid out (at least 1)
    pub fn set_data_count(&mut self, graph: &mut ChangeGraph, count: usize) -> LinkviewResult<bool> {
        let count = count.max(1);
        if count == self.data_count {
            return Ok(false);
        }
        self.data_count = count;
        self.changed(graph)?;
        Ok(true)
    }

    /// Switch the layout type and reset the value range for `variable`
    ///
    /// Switching between the two categorical types keeps the category
    /// sequence.
    pub fn set_type(
        &mut self,
        graph: &mut ChangeGraph,
        axis_type: AxisType,
        variable: &Variable,
    ) -> LinkviewResult<bool> {
        if axis_type == self.axis_type {
            return Ok(false);
        }
        let keep_sequence = self.axis_type.is_categorical() && axis_type.is_categorical();
        self.axis_type = axis_type;
        graph.batch(|g| -> LinkviewResult<()> {
            self.set_default_range(g, variable, !keep_sequence)?;
            self.changed(g)
        })??;
        Ok(true)
    }

    /// Fit the value range to `variable`
    ///
    /// Numeric axes span `[min, max]`, index axes the number of cases and
    /// categorical axes the categories (equal shares) or the cases
    /// (proportional shares). Categorical axes need a categorized variable.
    pub fn set_default_range(
        &mut self,
        graph: &mut ChangeGraph,
        variable: &Variable,
        reset_sequence: bool,
    ) -> LinkviewResult<bool> {
        match self.axis_type {
            AxisType::Numeric => {
                let (min, max) = variable.range().unwrap_or((0.0, 1.0));
                self.set_value_range(graph, min, max - min)
            }
            AxisType::EquidistantByIndex => {
                let count_changed = self.set_data_count(graph, variable.len())?;
                let range_changed = self.set_value_range(graph, 0.0, self.data_count as f64)?;
                Ok(count_changed || range_changed)
            }
            AxisType::EquidistantByCategory | AxisType::ProportionalByCategory => {
                self.category_counts = variable
                    .categories()
                    .map(|cats| cats.iter().map(|c| c.count).collect())
                    .unwrap_or_default();
                let categories = self.category_counts.len();
                if reset_sequence || self.sequence.len() != categories {
                    self.sequence.reset(categories);
                }
                let items = if self.axis_type == AxisType::EquidistantByCategory {
                    categories
                } else {
                    self.category_counts.iter().sum()
                };
                let count_changed = self.set_data_count(graph, items)?;
                let range_changed = self.set_value_range(graph, 0.0, self.data_count as f64)?;
                Ok(count_changed || range_changed)
            }
        }
    }

    // -- mapping ------------------------------------------------------------

    fn scale(&self, value: f64) -> f64 {
        if self.v_len.abs() < f64::EPSILON {
            return self.g_begin;
        }
        self.g_begin + (value - self.v_begin) * self.g_len / self.v_len
    }

    fn unscale(&self, position: f64) -> f64 {
        if self.g_len.abs() < f64::EPSILON {
            return self.v_begin;
        }
        self.v_begin + (position - self.g_begin) * self.v_len / self.g_len
    }

    /// Value interval `[start, end)` of a sequence slot
    fn slot_span(&self, slot: usize) -> Option<(f64, f64)> {
        if slot >= self.sequence.len() {
            return None;
        }
        match self.axis_type {
            AxisType::ProportionalByCategory => {
                let start: usize = self.sequence.order()[..slot]
                    .iter()
                    .map(|&c| self.category_counts.get(c).copied().unwrap_or(0))
                    .sum();
                let width = self
                    .sequence
                    .category_at(slot)
                    .and_then(|c| self.category_counts.get(c).copied())
                    .unwrap_or(0);
                Some((start as f64, (start + width) as f64))
            }
            _ => Some((slot as f64, slot as f64 + 1.0)),
        }
    }

    /// Geometry position of a value
    ///
    /// On categorical axes `value` is a category index and the result is the
    /// centre of that category, or NaN for unknown categories.
    pub fn value_to_position(&self, value: f64) -> f64 {
        if self.axis_type.is_categorical() {
            let category = (value + 0.5).floor();
            if category < 0.0 {
                return f64::NAN;
            }
            return self.category_center(category as usize).unwrap_or(f64::NAN);
        }
        self.scale(value)
    }

    /// Value at a geometry position
    ///
    /// On categorical axes this is the category index at that position, NaN
    /// outside every category.
    pub fn position_to_value(&self, position: f64) -> f64 {
        if self.axis_type.is_categorical() {
            return self
                .category_at_position(position)
                .map_or(f64::NAN, |c| c as f64);
        }
        self.unscale(position)
    }

    /// Geometry position of a case of `variable`
    pub fn case_position(&self, variable: &Variable, case: usize) -> Option<f64> {
        match self.axis_type {
            AxisType::Numeric => variable.number_at(case).map(|v| self.scale(v)),
            AxisType::EquidistantByIndex => {
                (case < variable.len()).then(|| self.scale(case as f64))
            }
            _ => variable
                .category_of_case(case)
                .and_then(|c| self.category_center(c)),
        }
    }

    /// Geometry interval `(low, high)` of a category (ordered by value, so
    /// `low > high` on flipped axes)
    pub fn category_bounds(&self, category: usize) -> Option<(f64, f64)> {
        let slot = self.sequence.position_of(category)?;
        let (start, end) = self.slot_span(slot)?;
        Some((self.scale(start), self.scale(end)))
    }

    /// Geometry centre of a category
    pub fn category_center(&self, category: usize) -> Option<f64> {
        self.category_bounds(category)
            .map(|(low, high)| (low + high) / 2.0)
    }

    /// Category covering a geometry position
    pub fn category_at_position(&self, position: f64) -> Option<usize> {
        let value = self.unscale(position);
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        let slot = match self.axis_type {
            AxisType::ProportionalByCategory => {
                let mut end = 0.0;
                (0..self.sequence.len()).find(|&slot| {
                    end += self
                        .sequence
                        .category_at(slot)
                        .and_then(|c| self.category_counts.get(c).copied())
                        .unwrap_or(0) as f64;
                    value < end
                })?
            }
            AxisType::EquidistantByCategory => value.floor() as usize,
            _ => return None,
        };
        self.sequence.category_at(slot)
    }

    /// Clamp a geometry position into the axis
    pub fn clip(&self, position: f64) -> f64 {
        let end = self.g_begin + self.g_len;
        position.clamp(self.g_begin.min(end), self.g_begin.max(end))
    }

    // -- category order -----------------------------------------------------

    /// Exchange two categories in the display order
    pub fn swap_categories(
        &mut self,
        graph: &mut ChangeGraph,
        a: usize,
        b: usize,
    ) -> LinkviewResult<()> {
        self.sequence.swap(a, b)?;
        self.changed(graph)
    }

    /// Move a category to a new display slot (clipped to the last slot)
    pub fn move_category(
        &mut self,
        graph: &mut ChangeGraph,
        category: usize,
        position: usize,
    ) -> LinkviewResult<()> {
        self.sequence.move_to(category, position)?;
        self.changed(graph)
    }

    /// Display slot of a category
    pub fn category_position(&self, category: usize) -> Option<usize> {
        self.sequence.position_of(category)
    }

    /// Category shown at a display slot
    pub fn category_at_sequence(&self, position: usize) -> Option<usize> {
        self.sequence.category_at(position)
    }

    // -- ticks --------------------------------------------------------------

    /// Distance between ticks in value units
    ///
    /// `mean_px` is the preferred and `min_px` the smallest acceptable
    /// geometric spacing between ticks. The result is `{1, 2, 5} * 10^k`.
    /// Categorical axes never go below one category per tick.
    pub fn sensible_tick_distance(&self, mean_px: f64, min_px: f64) -> f64 {
        let v_len = self.v_len.abs();
        let g_len = self.g_len.abs();
        if v_len < self.precision || g_len < self.precision || !(mean_px > 0.0) {
            return 1.0;
        }

        let mut step = 10f64.powf((v_len * mean_px / g_len).log10().round());
        if min_px >= 1.0 {
            let mut spacing = step / v_len * g_len;
            while spacing > 2.0 * mean_px {
                step /= 2.0;
                spacing /= 2.0;
            }
            if spacing < min_px / 3.0 {
                step *= 5.0;
            } else if spacing < min_px {
                step *= 2.0;
            }
            step = snap_to_ladder(step);
        }

        if self.axis_type.is_categorical() {
            step.max(1.0)
        } else {
            step
        }
    }

    /// First tick value: the first multiple of `step` not below `v_begin`
    pub fn sensible_tick_start(&self, step: f64) -> f64 {
        if self.axis_type.is_categorical() {
            return 0.0;
        }
        first_multiple(self.v_begin, step)
    }

    /// Tick marks over the visible range
    ///
    /// Categorical axes get one tick per `step` display slots, labelled with
    /// the category index. The axis holds no category names;
    /// [`crate::plot::BarChartPlot::ticks`] relabels them.
    pub fn ticks(&self, mean_px: f64, min_px: f64) -> Vec<Tick> {
        const MAX_TICKS: usize = 1000;

        let step = self.sensible_tick_distance(mean_px, min_px);
        if self.axis_type.is_categorical() {
            let stride = (step.round() as usize).max(1);
            return self
                .sequence
                .order()
                .iter()
                .step_by(stride)
                .filter_map(|&c| {
                    self.category_center(c).map(|position| Tick {
                        value: c as f64,
                        position,
                        label: c.to_string(),
                    })
                })
                .collect();
        }

        let end = self.v_begin + self.v_len;
        let (low, high) = (self.v_begin.min(end), self.v_begin.max(end));
        let mut ticks = Vec::new();
        let mut value = first_multiple(low, step);
        while value <= high + step * 1e-9 && ticks.len() < MAX_TICKS {
            ticks.push(Tick {
                value,
                position: self.scale(value),
                label: self.format_value(value),
            });
            value += step;
        }
        ticks
    }

    /// Number of decimals worth showing for values on this axis
    pub fn display_precision(&self) -> usize {
        (2.0 - self.log_len.floor()).max(0.0) as usize
    }

    /// Format a value with [`Axis::display_precision`] decimals
    pub fn format_value(&self, value: f64) -> String {
        format_number(value, self.display_precision())
    }
}

/// First multiple of `step` not below `begin`
fn first_multiple(begin: f64, step: f64) -> f64 {
    if !(step.is_finite() && step > 0.0) {
        return begin;
    }
    let mut first = step * (begin / step).trunc();
    if first < begin {
        first += step;
    }
    first
}

/// Round `step` up to the next `{1, 2, 5} * 10^k`
fn snap_to_ladder(step: f64) -> f64 {
    if !(step.is_finite() && step > 0.0) {
        return 1.0;
    }
    let magnitude = 10f64.powf(step.log10().floor());
    let residual = step / magnitude;
    let tolerance = 1e-9;

    let nice = if residual <= 1.0 + tolerance {
        1.0
    } else if residual <= 2.0 + tolerance {
        2.0
    } else if residual <= 5.0 + tolerance {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

/// Format a number with a fixed number of decimals, without "-0"
fn format_number(value: f64, precision: usize) -> String {
    let text = format!("{:.prec$}", value, prec = precision);
    if text.starts_with('-') && text[1..].chars().all(|c| c == '0' || c == '.') {
        text[1..].to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Recorder;
    use crate::value::{Value, VariableKind};

    fn numeric_axis(graph: &mut ChangeGraph, begin: f64, len: f64, g_len: f64) -> Axis {
        let mut axis = Axis::new(graph, Orientation::Horizontal, AxisType::Numeric);
        axis.set_value_range(graph, begin, len).unwrap();
        axis.set_geometry(graph, Orientation::Horizontal, 0.0, g_len)
            .unwrap();
        axis
    }

    fn categorized(graph: &mut ChangeGraph, labels: &[&str]) -> Variable {
        let mut var = Variable::from_values(
            graph,
            "grp",
            VariableKind::Text,
            labels.iter().map(|&s| Value::from(s)),
        )
        .unwrap();
        var.categorize(graph, false).unwrap();
        var
    }

    #[test]
    fn test_affine_mapping() {
        let mut graph = ChangeGraph::new();
        let axis = numeric_axis(&mut graph, 10.0, 100.0, 500.0);
        assert_eq!(axis.value_to_position(60.0), 250.0);
        assert_eq!(axis.position_to_value(250.0), 60.0);
    }

    #[test]
    fn test_flipped_axis() {
        let mut graph = ChangeGraph::new();
        let mut axis = Axis::new(&mut graph, Orientation::Vertical, AxisType::Numeric);
        axis.set_value_range(&mut graph, 0.0, 10.0).unwrap();
        axis.set_geometry(&mut graph, Orientation::Vertical, 200.0, -200.0)
            .unwrap();
        assert_eq!(axis.value_to_position(0.0), 200.0);
        assert_eq!(axis.value_to_position(10.0), 0.0);
        assert_eq!(axis.clip(250.0), 200.0);
        assert_eq!(axis.clip(-5.0), 0.0);
    }

    #[test]
    fn test_changes_within_precision_are_ignored() {
        let mut graph = ChangeGraph::new();
        let mut axis = Axis::new(&mut graph, Orientation::Horizontal, AxisType::Numeric);
        let log = Recorder::new();
        let view = graph.add_observer_node("view", log.clone());
        graph.register(view, axis.node());

        assert!(axis.set_value_range(&mut graph, 0.0, 10.0).unwrap());
        assert!(!axis.set_value_range(&mut graph, 0.00001, 10.0).unwrap());
        assert!(axis
            .set_geometry(&mut graph, Orientation::Horizontal, 0.0, 300.0)
            .unwrap());
        assert!(!axis
            .set_geometry(&mut graph, Orientation::Horizontal, 0.0, 300.0)
            .unwrap());
        assert_eq!(log.count(), 2);
        assert!(axis.set_value_range(&mut graph, f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_reference_tick_distance() {
        let mut graph = ChangeGraph::new();
        let axis = numeric_axis(&mut graph, 0.0, 100.0, 500.0);
        let step = axis.sensible_tick_distance(50.0, 20.0);
        assert_eq!(step, 10.0);
        let spacing = step / 100.0 * 500.0;
        assert!(spacing <= 100.0 && spacing >= 25.0);
    }

    #[test]
    fn test_tick_distance_ladder() {
        let mut graph = ChangeGraph::new();
        let axis = numeric_axis(&mut graph, 0.0, 7.3, 1000.0);
        let step = axis.sensible_tick_distance(40.0, 10.0);
        let mantissa = step / 10f64.powf(step.log10().floor());
        assert!([1.0, 2.0, 5.0].iter().any(|m| (mantissa - m).abs() < 1e-9));
    }

    #[test]
    fn test_degenerate_tick_distance() {
        let mut graph = ChangeGraph::new();
        let axis = Axis::new(&mut graph, Orientation::Horizontal, AxisType::Numeric);
        assert_eq!(axis.sensible_tick_distance(50.0, 20.0), 1.0);
    }

    #[test]
    fn test_tick_start() {
        let mut graph = ChangeGraph::new();
        let axis = numeric_axis(&mut graph, 3.0, 20.0, 100.0);
        assert_eq!(axis.sensible_tick_start(5.0), 5.0);
        let axis = numeric_axis(&mut graph, -7.0, 20.0, 100.0);
        assert_eq!(axis.sensible_tick_start(5.0), -5.0);
        let axis = numeric_axis(&mut graph, 10.0, 20.0, 100.0);
        assert_eq!(axis.sensible_tick_start(5.0), 10.0);
    }

    #[test]
    fn test_ticks_cover_range() {
        let mut graph = ChangeGraph::new();
        let axis = numeric_axis(&mut graph, 0.0, 100.0, 500.0);
        let ticks = axis.ticks(50.0, 20.0);
        let values: Vec<f64> = ticks.iter().map(|t| t.value).collect();
        assert_eq!(values.first(), Some(&0.0));
        assert_eq!(values.last(), Some(&100.0));
        assert_eq!(ticks.len(), 11);
        assert_eq!(ticks[1].position, 50.0);
        assert_eq!(ticks[1].label, "10");
    }

    #[test]
    fn test_display_precision() {
        let mut graph = ChangeGraph::new();
        let axis = numeric_axis(&mut graph, 0.0, 100.0, 500.0);
        assert_eq!(axis.display_precision(), 0);
        let axis = numeric_axis(&mut graph, 0.0, 0.5, 500.0);
        assert_eq!(axis.display_precision(), 3);
        assert_eq!(axis.format_value(0.25), "0.250");
        assert_eq!(axis.format_value(-0.0001), "0.000");
    }

    #[test]
    fn test_equidistant_categories() {
        let mut graph = ChangeGraph::new();
        let var = categorized(&mut graph, &["a", "b", "a", "c"]);
        let mut axis = Axis::new(&mut graph, Orientation::Horizontal, AxisType::EquidistantByCategory);
        axis.set_geometry(&mut graph, Orientation::Horizontal, 0.0, 300.0)
            .unwrap();
        axis.set_default_range(&mut graph, &var, true).unwrap();

        assert_eq!(axis.data_count(), 3);
        assert_eq!(axis.category_bounds(1), Some((100.0, 200.0)));
        assert_eq!(axis.category_center(2), Some(250.0));
        assert_eq!(axis.value_to_position(0.0), 50.0);
        assert_eq!(axis.category_at_position(120.0), Some(1));
        assert_eq!(axis.position_to_value(299.0), 2.0);
        assert_eq!(axis.case_position(&var, 2), Some(50.0));
        assert!(axis.value_to_position(9.0).is_nan());
        assert_eq!(axis.sensible_tick_start(1.0), 0.0);
        assert!(axis.sensible_tick_distance(1.0, 1.0) >= 1.0);
    }

    #[test]
    fn test_proportional_categories() {
        let mut graph = ChangeGraph::new();
        let var = categorized(&mut graph, &["a", "b", "a", "a"]);
        let mut axis = Axis::new(&mut graph, Orientation::Horizontal, AxisType::ProportionalByCategory);
        axis.set_geometry(&mut graph, Orientation::Horizontal, 0.0, 400.0)
            .unwrap();
        axis.set_default_range(&mut graph, &var, true).unwrap();

        assert_eq!(axis.data_count(), 4);
        assert_eq!(axis.category_bounds(0), Some((0.0, 300.0)));
        assert_eq!(axis.category_bounds(1), Some((300.0, 400.0)));
        assert_eq!(axis.category_at_position(310.0), Some(1));
        assert_eq!(axis.category_at_position(450.0), None);
    }

    #[test]
    fn test_category_sequence_moves() {
        let mut graph = ChangeGraph::new();
        let var = categorized(&mut graph, &["a", "b", "c", "d"]);
        let mut axis = Axis::new(&mut graph, Orientation::Horizontal, AxisType::EquidistantByCategory);
        axis.set_geometry(&mut graph, Orientation::Horizontal, 0.0, 400.0)
            .unwrap();
        axis.set_default_range(&mut graph, &var, true).unwrap();

        axis.move_category(&mut graph, 0, 10).unwrap();
        assert_eq!(axis.sequence().order(), &[1, 2, 3, 0]);
        assert_eq!(axis.category_position(0), Some(3));
        assert_eq!(axis.category_center(0), Some(350.0));

        axis.swap_categories(&mut graph, 1, 0).unwrap();
        assert_eq!(axis.sequence().order(), &[0, 2, 3, 1]);
        assert_eq!(axis.category_at_sequence(3), Some(1));
        assert!(axis.swap_categories(&mut graph, 0, 9).is_err());

        // switching to proportional keeps the order
        axis.set_type(&mut graph, AxisType::ProportionalByCategory, &var)
            .unwrap();
        assert_eq!(axis.sequence().order(), &[0, 2, 3, 1]);
        axis.set_type(&mut graph, AxisType::EquidistantByIndex, &var)
            .unwrap();
        axis.set_type(&mut graph, AxisType::EquidistantByCategory, &var)
            .unwrap();
        assert_eq!(axis.sequence().order(), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_index_axis() {
        let mut graph = ChangeGraph::new();
        let var = categorized(&mut graph, &["a", "b", "c", "d"]);
        let mut axis = Axis::new(&mut graph, Orientation::Horizontal, AxisType::EquidistantByIndex);
        axis.set_geometry(&mut graph, Orientation::Horizontal, 0.0, 400.0)
            .unwrap();
        axis.set_default_range(&mut graph, &var, true).unwrap();
        assert_eq!(axis.case_position(&var, 3), Some(300.0));
        assert_eq!(axis.case_position(&var, 4), None);
    }

    #[test]
    fn test_sequence_move_backwards() {
        let mut seq = CategorySequence::new(5);
        seq.move_to(4, 1).unwrap();
        assert_eq!(seq.order(), &[0, 4, 1, 2, 3]);
        assert_eq!(seq.position_of(2), Some(3));
        assert!(seq.move_to(5, 0).is_err());
    }

    #[test]
    fn test_snap_to_ladder() {
        assert_eq!(snap_to_ladder(2.5), 5.0);
        assert_eq!(snap_to_ladder(1.25), 2.0);
        assert_eq!(snap_to_ladder(10.0), 10.0);
        assert_eq!(snap_to_ladder(0.03), 0.05);
    }
}
