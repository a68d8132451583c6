//! Datasets: variables over a common set of cases plus their selection

use crate::graph::ChangeGraph;
use crate::selection::SelectionMask;
use crate::variable::Variable;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle of a dataset within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DatasetId(pub usize);

/// Handle of a variable within its dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariableId(pub usize);

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Named collection of variables sharing one selection mask
#[derive(Debug)]
pub struct Dataset {
    name: String,
    variables: Vec<Variable>,
    mask: SelectionMask,
}

impl Dataset {
    /// Create an empty dataset
    pub fn new(graph: &mut ChangeGraph, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: Vec::new(),
            mask: SelectionMask::new(graph, 0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of cases (length of the first variable)
    pub fn case_count(&self) -> usize {
        self.variables.first().map_or(0, Variable::len)
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, id: VariableId) -> Option<&Variable> {
        self.variables.get(id.0)
    }

    pub fn variable_mut(&mut self, id: VariableId) -> Option<&mut Variable> {
        self.variables.get_mut(id.0)
    }

    /// Handle of the variable called `name`
    pub fn find(&self, name: &str) -> Option<VariableId> {
        self.variables
            .iter()
            .position(|v| v.name() == name)
            .map(VariableId)
    }

    pub fn mask(&self) -> &SelectionMask {
        &self.mask
    }

    pub fn mask_mut(&mut self) -> &mut SelectionMask {
        &mut self.mask
    }

    /// Variables and mask borrowed at the same time
    pub fn parts_mut(&mut self) -> (&mut [Variable], &mut SelectionMask) {
        (&mut self.variables, &mut self.mask)
    }

    /// Add a variable; the mask grows to cover its cases
    pub fn push(&mut self, variable: Variable) -> VariableId {
        if variable.len() > self.mask.len() {
            self.mask.resize(variable.len());
        }
        self.variables.push(variable);
        VariableId(self.variables.len() - 1)
    }

    /// Unused variable name derived from `base`: `base.1`, `base.2`, ...
    ///
    /// An empty base yields `temp.N`.
    pub fn fresh_name(&self, base: &str) -> String {
        let base = if base.is_empty() { "temp" } else { base };
        (1..)
            .map(|n| format!("{}.{}", base, n))
            .find(|candidate| self.find(candidate).is_none())
            .unwrap_or_else(|| base.to_string())
    }

    /// Remove every node owned by this dataset from the graph
    pub(crate) fn detach(&self, graph: &mut ChangeGraph) {
        for variable in &self.variables {
            graph.remove_node(variable.node());
        }
        graph.remove_node(self.mask.node());
    }
}
