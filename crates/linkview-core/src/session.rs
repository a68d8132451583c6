//! Host-facing session
//!
//! A [`Session`] owns the change graph and every dataset. Hosts address
//! datasets and variables through [`DatasetId`] / [`VariableId`] handles and
//! feed columns in host representation: `NaN` or `i32::MIN` for missing
//! numbers, `None` for missing strings, 0-based factor codes with level
//! names, and map coordinates with `NaN` separators.
//!
//! Adding a column whose length differs from the current dataset asks the
//! installed [`MismatchResolver`]. With `no_interaction` set, or without a
//! resolver, the column goes to a new dataset.

use crate::axis::{Axis, AxisType, Orientation};
use crate::config::LinkviewConfig;
use crate::dataset::{Dataset, DatasetId, VariableId};
use crate::error::{LinkviewResult, SessionError, SessionResult};
use crate::graph::{ChangeGraph, NodeId};
use crate::plot::{BarChartPlot, HistogramPlot, ScatterPlot, SurvivalPlot};
use crate::value::{MapSegment, Value, VariableKind};
use crate::variable::Variable;
use crate::wait::EventWaiter;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Answer to a length mismatch between a new column and the current dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MismatchChoice {
    /// Put the column into a new dataset of its own
    NewDataset,
    /// Add the column to the current dataset under a fresh name
    RenameAndAdd,
    /// Do not add the column
    Abort,
}

/// Decides what to do when a column does not fit the current dataset
pub trait MismatchResolver: Send {
    fn resolve(&mut self, name: &str, len: usize, expected: usize) -> MismatchChoice;
}

impl<F> MismatchResolver for F
where
    F: FnMut(&str, usize, usize) -> MismatchChoice + Send,
{
    fn resolve(&mut self, name: &str, len: usize, expected: usize) -> MismatchChoice {
        self(name, len, expected)
    }
}

/// Where a column ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddedVariable {
    pub dataset: DatasetId,
    pub variable: VariableId,
    /// Final name, differs from the requested one after a rename
    pub name: String,
    /// An existing variable with equal contents was returned
    pub reused: bool,
}

/// Datasets, the change graph and the host protocol around them
pub struct Session {
    config: LinkviewConfig,
    graph: ChangeGraph,
    datasets: Vec<Option<Dataset>>,
    current: Option<DatasetId>,
    resolver: Option<Box<dyn MismatchResolver>>,
    /// Waiters with the dataset they watch and their observer node
    waiters: Vec<(DatasetId, NodeId, EventWaiter)>,
    control: NodeId,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("graph", &self.graph)
            .field("datasets", &self.dataset_count())
            .field("current", &self.current)
            .field("waiters", &self.waiters.len())
            .finish()
    }
}

impl Default for Session {
    fn default() -> Self {
        let mut graph = ChangeGraph::new();
        let control = graph.add_node("session");
        Self {
            config: LinkviewConfig::default(),
            control,
            graph,
            datasets: Vec::new(),
            current: None,
            resolver: None,
            waiters: Vec::new(),
        }
    }
}

/// Split coordinate columns at `NaN` into one case per run
///
/// An empty run (leading `NaN` or two `NaN`s in a row) is a missing case;
/// a trailing `NaN` does not start a new case.
fn map_cases(xs: &[f64], ys: &[f64]) -> Vec<Value> {
    let mut cases = Vec::new();
    let mut start = 0;
    for i in 0..xs.len() {
        if xs[i].is_nan() || ys[i].is_nan() {
            cases.push(run_value(&xs[start..i], &ys[start..i]));
            start = i + 1;
        }
    }
    if start < xs.len() {
        cases.push(run_value(&xs[start..], &ys[start..]));
    }
    cases
}

fn run_value(xs: &[f64], ys: &[f64]) -> Value {
    if xs.is_empty() {
        Value::Missing
    } else {
        Value::Map(MapSegment::from_coordinates(xs, ys))
    }
}

/// Mutable `a` and shared `b` from the same slice
fn pair_mut(variables: &mut [Variable], a: usize, b: usize) -> Option<(&mut Variable, &Variable)> {
    if a == b || a >= variables.len() || b >= variables.len() {
        return None;
    }
    if a < b {
        let (left, right) = variables.split_at_mut(b);
        Some((&mut left[a], &right[0]))
    } else {
        let (left, right) = variables.split_at_mut(a);
        Some((&mut right[0], &left[b]))
    }
}

impl Session {
    /// Create a session after validating the configuration
    pub fn new(config: LinkviewConfig) -> LinkviewResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    pub fn config(&self) -> &LinkviewConfig {
        &self.config
    }

    pub fn graph(&self) -> &ChangeGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut ChangeGraph {
        &mut self.graph
    }

    /// Install the handler asked on length mismatches
    pub fn set_resolver(&mut self, resolver: impl MismatchResolver + 'static) {
        self.resolver = Some(Box::new(resolver));
    }

    // -- datasets -------------------------------------------------------------

    /// Create an empty dataset and make it current
    pub fn new_dataset(&mut self, name: impl Into<String>) -> DatasetId {
        let name = name.into();
        let id = DatasetId(self.datasets.len());
        info!(dataset = %id, name = %name, "created dataset");
        self.datasets.push(Some(Dataset::new(&mut self.graph, name)));
        self.current = Some(id);
        id
    }

    /// Make a dataset current
    pub fn select_dataset(&mut self, id: DatasetId) -> SessionResult<()> {
        self.dataset(id)?;
        self.current = Some(id);
        Ok(())
    }

    /// Make the first dataset called `name` current
    pub fn select_dataset_by_name(&mut self, name: &str) -> Option<DatasetId> {
        let id = self
            .datasets
            .iter()
            .position(|d| d.as_ref().is_some_and(|d| d.name() == name))
            .map(DatasetId)?;
        self.current = Some(id);
        Some(id)
    }

    pub fn current_dataset(&self) -> Option<DatasetId> {
        self.current
    }

    /// Number of live datasets
    pub fn dataset_count(&self) -> usize {
        self.datasets.iter().flatten().count()
    }

    /// Drop a dataset and its graph nodes
    ///
    /// Other handles stay valid. Waiters on the dataset get a break. If the
    /// current dataset is removed, the last remaining one becomes current.
    pub fn remove_dataset(&mut self, id: DatasetId) -> SessionResult<()> {
        let dataset = self
            .datasets
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(SessionError::UnknownDataset(id.0))?;
        dataset.detach(&mut self.graph);
        let control = self.control;
        let graph = &mut self.graph;
        self.waiters.retain(|(watched, node, waiter)| {
            if *watched != id {
                return true;
            }
            graph.remove_node(*node);
            waiter.post_break(control);
            false
        });
        debug!(dataset = %id, name = dataset.name(), "removed dataset");

        if self.current == Some(id) {
            self.current = self
                .datasets
                .iter()
                .rposition(Option::is_some)
                .map(DatasetId);
        }
        Ok(())
    }

    pub fn dataset(&self, id: DatasetId) -> SessionResult<&Dataset> {
        self.datasets
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(SessionError::UnknownDataset(id.0))
    }

    pub fn dataset_mut(&mut self, id: DatasetId) -> SessionResult<&mut Dataset> {
        self.datasets
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(SessionError::UnknownDataset(id.0))
    }

    /// The graph and a dataset, for calling mutations on the dataset's parts
    pub fn split_mut(&mut self, id: DatasetId) -> SessionResult<(&mut ChangeGraph, &mut Dataset)> {
        let dataset = self
            .datasets
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(SessionError::UnknownDataset(id.0))?;
        Ok((&mut self.graph, dataset))
    }

    pub fn variable(&self, dataset: DatasetId, variable: VariableId) -> SessionResult<&Variable> {
        self.dataset(dataset)?
            .variable(variable)
            .ok_or(SessionError::UnknownVariable {
                dataset: dataset.0,
                variable: variable.0,
            })
    }

    fn variable_parts(
        &mut self,
        dataset: DatasetId,
        variable: VariableId,
    ) -> SessionResult<(&mut ChangeGraph, &mut Variable)> {
        let (graph, ds) = self.split_mut(dataset)?;
        let var = ds
            .variable_mut(variable)
            .ok_or(SessionError::UnknownVariable {
                dataset: dataset.0,
                variable: variable.0,
            })?;
        Ok((graph, var))
    }

    // -- column constructors --------------------------------------------------

    /// Add a numeric column; `NaN` is missing
    pub fn add_numbers(&mut self, name: &str, numbers: &[f64]) -> LinkviewResult<AddedVariable> {
        let values = numbers.iter().map(|&n| Value::from(n)).collect();
        self.add_column(name, VariableKind::Numeric, values, None)
    }

    /// Add an integer column; `i32::MIN` is missing
    pub fn add_integers(&mut self, name: &str, integers: &[i32]) -> LinkviewResult<AddedVariable> {
        let values = integers
            .iter()
            .map(|&i| {
                if i == i32::MIN {
                    Value::Missing
                } else {
                    Value::Number(f64::from(i))
                }
            })
            .collect();
        self.add_column(name, VariableKind::Numeric, values, None)
    }

    /// Add a string column; `None` is missing
    pub fn add_strings(&mut self, name: &str, strings: &[Option<&str>]) -> LinkviewResult<AddedVariable> {
        let values = strings
            .iter()
            .map(|s| s.map_or(Value::Missing, Value::from))
            .collect();
        self.add_column(name, VariableKind::Text, values, None)
    }

    /// Add a factor from 0-based level codes
    ///
    /// Codes outside the level list are missing. The variable comes out
    /// categorized with its categories in level order.
    pub fn add_factor(
        &mut self,
        name: &str,
        codes: &[i32],
        levels: &[&str],
    ) -> LinkviewResult<AddedVariable> {
        let values = codes
            .iter()
            .map(|&code| {
                usize::try_from(code)
                    .ok()
                    .and_then(|c| levels.get(c))
                    .map_or(Value::Missing, |&level| Value::from(level))
            })
            .collect();
        let levels: Vec<String> = levels.iter().map(ToString::to_string).collect();
        self.add_column(name, VariableKind::Text, values, Some(&levels))
    }

    /// Add a map column from coordinate columns with `NaN` separators
    pub fn add_map(&mut self, name: &str, xs: &[f64], ys: &[f64]) -> LinkviewResult<AddedVariable> {
        if xs.len() != ys.len() {
            return Err(SessionError::InvalidInput(format!(
                "map '{}' has {} x and {} y coordinates",
                name,
                xs.len(),
                ys.len()
            ))
            .into());
        }
        self.add_column(name, VariableKind::Map, map_cases(xs, ys), None)
    }

    fn resolve_mismatch(&mut self, name: &str, len: usize, expected: usize) -> MismatchChoice {
        if self.config.interaction.no_interaction {
            return MismatchChoice::NewDataset;
        }
        self.resolver
            .as_mut()
            .map_or(MismatchChoice::NewDataset, |r| r.resolve(name, len, expected))
    }

    fn add_column(
        &mut self,
        name: &str,
        kind: VariableKind,
        values: Vec<Value>,
        levels: Option<&[String]>,
    ) -> LinkviewResult<AddedVariable> {
        let len = values.len();
        let mut target = match self.current {
            Some(id) if self.dataset(id).is_ok() => id,
            _ => self.new_dataset(name),
        };
        let mut final_name = name.to_string();

        let dataset = self.dataset(target)?;
        let expected = dataset.case_count();
        if dataset.variable_count() > 0 && expected != len {
            let choice = self.resolve_mismatch(name, len, expected);
            warn!(variable = name, len, expected, ?choice, "length mismatch");
            match choice {
                MismatchChoice::Abort => {
                    return Err(SessionError::LengthMismatchAborted {
                        name: name.to_string(),
                        len,
                        expected,
                    }
                    .into())
                }
                MismatchChoice::NewDataset => target = self.new_dataset(name),
                MismatchChoice::RenameAndAdd => {
                    let dataset = self.dataset(target)?;
                    if dataset.find(name).is_some() {
                        final_name = dataset.fresh_name(name);
                    }
                }
            }
        } else if let Some(existing) = dataset.find(name) {
            let same = kind != VariableKind::Map
                && dataset
                    .variable(existing)
                    .is_some_and(|v| v.has_equal_values(&values));
            if same {
                debug!(variable = name, "re-using variable with equal contents");
                return Ok(AddedVariable {
                    dataset: target,
                    variable: existing,
                    name: final_name,
                    reused: true,
                });
            }
            final_name = dataset.fresh_name(name);
        }

        let mut variable = Variable::from_values(&mut self.graph, final_name.clone(), kind, values)?;
        variable.set_rank_caching(self.config.ranking.cache_ranks);
        if let Some(levels) = levels {
            variable.seed_categories(levels);
        }
        let Self {
            graph,
            datasets,
            waiters,
            ..
        } = self;
        let dataset = datasets
            .get_mut(target.0)
            .and_then(Option::as_mut)
            .ok_or(SessionError::UnknownDataset(target.0))?;
        let node = variable.node();
        let id = dataset.push(variable);
        for (_, observer, _) in waiters.iter().filter(|(watched, _, _)| *watched == target) {
            graph.register(*observer, node);
        }
        debug!(dataset = %target, variable = %final_name, cases = len, "added variable");
        Ok(AddedVariable {
            dataset: target,
            variable: id,
            name: final_name,
            reused: false,
        })
    }

    // -- accessors -------------------------------------------------------------

    pub fn number_at(&self, dataset: DatasetId, variable: VariableId, case: usize) -> SessionResult<Option<f64>> {
        Ok(self.variable(dataset, variable)?.number_at(case))
    }

    pub fn text_at(&self, dataset: DatasetId, variable: VariableId, case: usize) -> SessionResult<Option<String>> {
        Ok(self.variable(dataset, variable)?.text_at(case))
    }

    /// Whole column as numbers, `NaN` for missing
    pub fn numbers(&self, dataset: DatasetId, variable: VariableId) -> SessionResult<Vec<f64>> {
        Ok(self.variable(dataset, variable)?.to_numbers())
    }

    /// Whole column as strings, `None` for missing
    pub fn strings(&self, dataset: DatasetId, variable: VariableId) -> SessionResult<Vec<Option<String>>> {
        Ok(self.variable(dataset, variable)?.to_strings())
    }

    /// Overwrite a column with numbers of the same length
    pub fn replace_numbers(
        &mut self,
        dataset: DatasetId,
        variable: VariableId,
        numbers: &[f64],
    ) -> LinkviewResult<()> {
        let (graph, var) = self.variable_parts(dataset, variable)?;
        var.replace_all(graph, numbers.iter().map(|&n| Value::from(n)).collect())
    }

    /// Overwrite a column with strings of the same length
    pub fn replace_strings(
        &mut self,
        dataset: DatasetId,
        variable: VariableId,
        strings: &[Option<&str>],
    ) -> LinkviewResult<()> {
        let (graph, var) = self.variable_parts(dataset, variable)?;
        var.replace_all(
            graph,
            strings
                .iter()
                .map(|s| s.map_or(Value::Missing, Value::from))
                .collect(),
        )
    }

    /// Select exactly `cases` in a dataset
    pub fn select_cases(&mut self, dataset: DatasetId, cases: &[usize]) -> LinkviewResult<()> {
        let (graph, ds) = self.split_mut(dataset)?;
        ds.mask_mut().select_only(graph, cases)
    }

    /// Selected cases of a dataset
    pub fn selected_cases(&self, dataset: DatasetId) -> SessionResult<Vec<usize>> {
        Ok(self.dataset(dataset)?.mask().selected_cases())
    }

    /// Free-standing axis using the configured precision
    pub fn new_axis(&mut self, orientation: Orientation, axis_type: AxisType) -> Axis {
        Axis::new(&mut self.graph, orientation, axis_type).with_precision(self.config.axis.precision)
    }

    // -- plots -------------------------------------------------------------------

    pub fn histogram(&mut self, dataset: DatasetId, variable: VariableId) -> LinkviewResult<HistogramPlot> {
        let config = self.config.histogram.clone();
        let axis = self.config.axis.clone();
        let (graph, ds) = self.split_mut(dataset)?;
        let (variables, mask) = ds.parts_mut();
        let var = variables.get(variable.0).ok_or(SessionError::UnknownVariable {
            dataset: dataset.0,
            variable: variable.0,
        })?;
        HistogramPlot::new(graph, var, mask, &config, &axis)
    }

    pub fn barchart(&mut self, dataset: DatasetId, variable: VariableId) -> LinkviewResult<BarChartPlot> {
        let axis = self.config.axis.clone();
        let (graph, ds) = self.split_mut(dataset)?;
        let (variables, mask) = ds.parts_mut();
        let var = variables
            .get_mut(variable.0)
            .ok_or(SessionError::UnknownVariable {
                dataset: dataset.0,
                variable: variable.0,
            })?;
        BarChartPlot::new(graph, var, mask, &axis)
    }

    pub fn scatterplot(
        &mut self,
        dataset: DatasetId,
        x: VariableId,
        y: VariableId,
    ) -> LinkviewResult<ScatterPlot> {
        let config = self.config.scatter.clone();
        let axis = self.config.axis.clone();
        let (graph, ds) = self.split_mut(dataset)?;
        let unknown = |v: VariableId| SessionError::UnknownVariable {
            dataset: dataset.0,
            variable: v.0,
        };
        let xv = ds.variable(x).ok_or_else(|| unknown(x))?;
        let yv = ds.variable(y).ok_or_else(|| unknown(y))?;
        ScatterPlot::new(graph, xv, yv, ds.mask(), &config, &axis)
    }

    pub fn survival(
        &mut self,
        dataset: DatasetId,
        time: VariableId,
        event: VariableId,
    ) -> LinkviewResult<SurvivalPlot> {
        let config = self.config.survival.clone();
        let axis = self.config.axis.clone();
        let (graph, ds) = self.split_mut(dataset)?;
        let (variables, mask) = ds.parts_mut();
        let (time_var, event_var) = pair_mut(variables, time.0, event.0).ok_or_else(|| {
            SessionError::InvalidInput(format!(
                "survival needs two distinct variables of dataset {}, got {} and {}",
                dataset, time, event
            ))
        })?;
        SurvivalPlot::new(graph, time_var, event_var, mask, &config, &axis)
    }

    // -- automation ------------------------------------------------------------

    /// Waiter notified of changes to the current dataset's mask and variables
    pub fn event_waiter(&mut self) -> SessionResult<EventWaiter> {
        let current = self
            .current
            .ok_or_else(|| SessionError::InvalidInput("no current dataset".to_string()))?;
        let waiter = EventWaiter::new();
        let (graph, ds) = self.split_mut(current)?;
        let node = graph.add_observer_node("waiter", waiter.clone());
        graph.register(node, ds.mask().node());
        for variable in ds.variables() {
            graph.register(node, variable.node());
        }
        self.waiters.push((current, node, waiter.clone()));
        Ok(waiter)
    }

    /// Wake every thread blocked in a waiter of this session
    pub fn send_break(&self) {
        for (_, _, waiter) in &self.waiters {
            waiter.post_break(self.control);
        }
    }
}
