//! Per-case selection state
//!
//! Every case carries a primary mark (selected or not) and a secondary mark
//! (a small integer, used for colouring groups of cases). The combined
//! [`SelectionMask::mark_at`] value drives rank filtering: `-1` for
//! primarily selected cases, otherwise the secondary mark.

use crate::error::{LinkviewResult, VariableError};
use crate::graph::{ChangeGraph, ChangeKind, NodeId};
use serde::{Deserialize, Serialize};

/// Mark of a primarily selected case
pub const SELECTED_MARK: i64 = -1;

/// Primary and secondary selection channels of a dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionMask {
    node: NodeId,
    primary: Vec<bool>,
    secondary: Vec<u32>,
}

impl SelectionMask {
    /// Create an empty mask for `len` cases
    pub fn new(graph: &mut ChangeGraph, len: usize) -> Self {
        Self {
            node: graph.add_node("selection"),
            primary: vec![false; len],
            secondary: vec![0; len],
        }
    }

    /// Graph node changes of this mask are broadcast from
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn len(&self) -> usize {
        self.primary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }

    /// Grow or shrink, keeping existing marks and zero-filling new cases
    pub fn resize(&mut self, len: usize) {
        self.primary.resize(len, false);
        self.secondary.resize(len, 0);
    }

    fn check(&self, case: usize) -> LinkviewResult<()> {
        if case >= self.len() {
            return Err(VariableError::IndexOutOfRange {
                index: case,
                len: self.len(),
            }
            .into());
        }
        Ok(())
    }

    /// Check if a case is primarily selected (out-of-range cases are not)
    pub fn is_selected(&self, case: usize) -> bool {
        self.primary.get(case).copied().unwrap_or(false)
    }

    /// Select or deselect one case; returns whether the mark changed
    pub fn set_selected(
        &mut self,
        graph: &mut ChangeGraph,
        case: usize,
        selected: bool,
    ) -> LinkviewResult<bool> {
        self.check(case)?;
        if self.primary[case] == selected {
            return Ok(false);
        }
        self.primary[case] = selected;
        graph.emit(self.node, ChangeKind::MarkerChange)?;
        Ok(true)
    }

    /// Set the primary mark of many cases with a single event
    ///
    /// All indices are checked before anything changes.
    pub fn set_cases(
        &mut self,
        graph: &mut ChangeGraph,
        cases: &[usize],
        selected: bool,
    ) -> LinkviewResult<usize> {
        if let Some(&bad) = cases.iter().find(|&&c| c >= self.len()) {
            self.check(bad)?;
        }
        let mut changed = 0;
        for &case in cases {
            if self.primary[case] != selected {
                self.primary[case] = selected;
                changed += 1;
            }
        }
        if changed > 0 {
            graph.emit(self.node, ChangeKind::MarkerChange)?;
        }
        Ok(changed)
    }

    /// Make `cases` the whole primary selection (brushing)
    pub fn select_only(&mut self, graph: &mut ChangeGraph, cases: &[usize]) -> LinkviewResult<()> {
        if let Some(&bad) = cases.iter().find(|&&c| c >= self.len()) {
            self.check(bad)?;
        }
        let mut next = vec![false; self.len()];
        for &case in cases {
            next[case] = true;
        }
        if next != self.primary {
            self.primary = next;
            graph.emit(self.node, ChangeKind::MarkerChange)?;
        }
        Ok(())
    }

    /// Select every case
    pub fn select_all(&mut self, graph: &mut ChangeGraph) -> LinkviewResult<()> {
        self.fill_primary(graph, true)
    }

    /// Deselect every case
    pub fn clear(&mut self, graph: &mut ChangeGraph) -> LinkviewResult<()> {
        self.fill_primary(graph, false)
    }

    fn fill_primary(&mut self, graph: &mut ChangeGraph, selected: bool) -> LinkviewResult<()> {
        if self.primary.iter().all(|&s| s == selected) {
            return Ok(());
        }
        self.primary.iter_mut().for_each(|s| *s = selected);
        graph.emit(self.node, ChangeKind::MarkerChange)?;
        Ok(())
    }

    /// Swap selected and unselected cases
    pub fn invert(&mut self, graph: &mut ChangeGraph) -> LinkviewResult<()> {
        if self.is_empty() {
            return Ok(());
        }
        self.primary.iter_mut().for_each(|s| *s = !*s);
        graph.emit(self.node, ChangeKind::MarkerChange)?;
        Ok(())
    }

    /// Secondary mark of a case (0 when out of range)
    pub fn secondary_at(&self, case: usize) -> u32 {
        self.secondary.get(case).copied().unwrap_or(0)
    }

    /// Set the secondary mark of one case
    pub fn set_secondary(
        &mut self,
        graph: &mut ChangeGraph,
        case: usize,
        mark: u32,
    ) -> LinkviewResult<bool> {
        self.check(case)?;
        if self.secondary[case] == mark {
            return Ok(false);
        }
        self.secondary[case] = mark;
        graph.emit(self.node, ChangeKind::SecondaryMarkerChange)?;
        Ok(true)
    }

    /// Replace all secondary marks at once
    pub fn assign_secondary(
        &mut self,
        graph: &mut ChangeGraph,
        marks: Vec<u32>,
    ) -> LinkviewResult<()> {
        if marks.len() != self.len() {
            return Err(VariableError::LengthMismatch {
                expected: self.len(),
                actual: marks.len(),
            }
            .into());
        }
        if marks != self.secondary {
            self.secondary = marks;
            graph.emit(self.node, ChangeKind::SecondaryMarkerChange)?;
        }
        Ok(())
    }

    /// Reset every secondary mark to 0
    pub fn clear_secondary(&mut self, graph: &mut ChangeGraph) -> LinkviewResult<()> {
        if self.secondary.iter().all(|&m| m == 0) {
            return Ok(());
        }
        self.secondary.iter_mut().for_each(|m| *m = 0);
        graph.emit(self.node, ChangeKind::SecondaryMarkerChange)?;
        Ok(())
    }

    /// Combined mark: [`SELECTED_MARK`] if selected, else the secondary mark
    pub fn mark_at(&self, case: usize) -> i64 {
        if self.is_selected(case) {
            SELECTED_MARK
        } else {
            i64::from(self.secondary_at(case))
        }
    }

    /// Number of selected cases
    pub fn selected_count(&self) -> usize {
        self.primary.iter().filter(|&&s| s).count()
    }

    /// Indices of selected cases, ascending
    pub fn selected_cases(&self) -> Vec<usize> {
        self.primary
            .iter()
            .enumerate()
            .filter_map(|(case, &s)| s.then_some(case))
            .collect()
    }

    /// Share of `cases` that is selected (0 for an empty group)
    pub fn selected_proportion(&self, cases: &[usize]) -> f64 {
        if cases.is_empty() {
            return 0.0;
        }
        let selected = cases.iter().filter(|&&c| self.is_selected(c)).count();
        selected as f64 / cases.len() as f64
    }
}
