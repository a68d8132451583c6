//! Variables: named columns of case values
//!
//! A variable keeps its values in case order together with derived state
//! that views need over and over:
//!
//! - the running numeric range (`min`/`max`), widened on every insert and
//!   never shrunk on removal or replacement
//! - the number of missing values
//! - an optional category table (distinct values with occurrence counts),
//!   built the first time categorization is requested
//! - a cached ranking (case indices sorted by value), dropped on every
//!   mutation
//!
//! Mutations take the [`ChangeGraph`] and broadcast a change from the
//! variable's node unless the variable is muted. A failed mutation leaves the
//! variable untouched.

use crate::error::{LinkviewResult, VariableError, VariableResult};
use crate::graph::{ChangeGraph, ChangeKind, NodeId};
use crate::selection::SelectionMask;
use crate::value::{CategoryKey, Value, VariableKind};
use linkview_stats::{filter_ranks, rank_order};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// One entry of a category table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Representative value (`Value::Missing` for the missing category)
    pub value: Value,
    /// Number of cases in this category
    pub count: usize,
}

impl Category {
    pub fn is_missing(&self) -> bool {
        self.value.is_missing()
    }
}

/// How [`Variable::sort_categories`] orders categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortMethod {
    /// By numeric value; text that does not parse as a number goes after
    Numeric,
    /// By displayed text
    Lexicographic,
}

/// Restrict a ranking to cases with a given combined mark
#[derive(Debug, Clone, Copy)]
pub struct RankFilter<'a> {
    pub mask: &'a SelectionMask,
    /// Mark to keep, compared with [`SelectionMask::mark_at`]
    pub mark: i64,
}

#[derive(Debug, Clone, Default)]
struct CategoryTable {
    entries: Vec<Category>,
    index: HashMap<CategoryKey, usize>,
}

impl CategoryTable {
    fn scan<'a>(values: impl Iterator<Item = &'a Value>) -> Self {
        let mut table = Self::default();
        for value in values {
            table.count(value);
        }
        table
    }

    /// Count one more case of `value`, adding a category if needed
    ///
    /// Returns `true` when a new category was created.
    fn count(&mut self, value: &Value) -> bool {
        let Some(key) = value.category_key() else {
            return false;
        };
        match self.index.get(&key) {
            Some(&i) => {
                self.entries[i].count += 1;
                false
            }
            None => {
                self.index.insert(key, self.entries.len());
                let representative = if value.is_missing() {
                    Value::Missing
                } else {
                    value.clone()
                };
                self.entries.push(Category {
                    value: representative,
                    count: 1,
                });
                true
            }
        }
    }

    fn lookup(&self, value: &Value) -> Option<usize> {
        value
            .category_key()
            .and_then(|key| self.index.get(&key).copied())
    }

    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.value.category_key().map(|k| (k, i)))
            .collect();
    }

    /// Ascending by number, missing last, stable
    fn sort_numeric(&mut self) {
        self.entries.sort_by(|a, b| match (a.value.as_number(), b.value.as_number()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        self.reindex();
    }
}

/// A named column of case values
#[derive(Debug, Clone)]
pub struct Variable {
    name: String,
    kind: VariableKind,
    values: Vec<Value>,
    min: f64,
    max: f64,
    categories: Option<CategoryTable>,
    missing_count: usize,
    muted: bool,
    guessing: bool,
    cache_ranks: bool,
    ranks: Option<Arc<[usize]>>,
    node: NodeId,
}

impl Variable {
    /// Create an empty variable of a fixed kind
    ///
    /// `VariableKind::Undetermined` creates a guessing variable whose kind is
    /// taken from the first present value.
    pub fn new(graph: &mut ChangeGraph, name: impl Into<String>, kind: VariableKind) -> Self {
        let name = name.into();
        let node = graph.add_node(name.clone());
        Self {
            name,
            kind,
            values: Vec::new(),
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            categories: None,
            missing_count: 0,
            muted: false,
            guessing: kind == VariableKind::Undetermined,
            cache_ranks: true,
            ranks: None,
            node,
        }
    }

    /// Create a numeric variable
    pub fn numeric(graph: &mut ChangeGraph, name: impl Into<String>) -> Self {
        Self::new(graph, name, VariableKind::Numeric)
    }

    /// Create a text variable
    pub fn text(graph: &mut ChangeGraph, name: impl Into<String>) -> Self {
        Self::new(graph, name, VariableKind::Text)
    }

    /// Create a variable and fill it without emitting events
    pub fn from_values(
        graph: &mut ChangeGraph,
        name: impl Into<String>,
        kind: VariableKind,
        values: impl IntoIterator<Item = Value>,
    ) -> VariableResult<Self> {
        let mut variable = Self::new(graph, name, kind);
        let values: Vec<Value> = values.into_iter().map(Value::normalized).collect();
        variable.kind = variable.check_all(&values)?;
        for value in &values {
            variable.absorb(value);
        }
        variable.values = values;
        Ok(variable)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    /// Graph node changes of this variable are broadcast from
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn missing_count(&self) -> usize {
        self.missing_count
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Suppress (or re-enable) change events
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn is_guessing(&self) -> bool {
        self.guessing
    }

    pub fn set_guessing(&mut self, guessing: bool) {
        self.guessing = guessing;
    }

    /// Keep or drop the full ranking between calls
    pub fn set_rank_caching(&mut self, enabled: bool) {
        self.cache_ranks = enabled;
        if !enabled {
            self.ranks = None;
        }
    }

    /// Check if a full ranking is cached
    pub fn has_cached_ranks(&self) -> bool {
        self.ranks.is_some()
    }

    /// Smallest number ever inserted (numeric variables only)
    pub fn min(&self) -> Option<f64> {
        self.range().map(|(min, _)| min)
    }

    /// Largest number ever inserted (numeric variables only)
    pub fn max(&self) -> Option<f64> {
        self.range().map(|(_, max)| max)
    }

    /// `(min, max)` of a numeric variable that saw at least one number
    pub fn range(&self) -> Option<(f64, f64)> {
        (self.kind == VariableKind::Numeric && self.min <= self.max).then_some((self.min, self.max))
    }

    // -- validation ---------------------------------------------------------

    fn accepts(&self, kind: VariableKind, value: &Value) -> VariableResult<()> {
        let ok = match (kind, value) {
            (_, Value::Missing) => true,
            (VariableKind::Undetermined, _) => true,
            (VariableKind::Numeric, Value::Number(_)) => true,
            (VariableKind::Text, Value::Number(_) | Value::Text(_)) => true,
            (VariableKind::Map, Value::Map(_)) => true,
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(VariableError::TypeMismatch {
                variable: self.name.clone(),
                expected: kind,
                actual: value.shape_name(),
            })
        }
    }

    /// Kind the variable would have after taking `value`
    fn kind_after(&self, kind: VariableKind, value: &Value) -> VariableKind {
        match (kind, value.natural_kind()) {
            (VariableKind::Undetermined, Some(natural)) if self.guessing => natural,
            _ => kind,
        }
    }

    fn check(&self, value: &Value) -> VariableResult<VariableKind> {
        self.accepts(self.kind, value)?;
        Ok(self.kind_after(self.kind, value))
    }

    fn check_all(&self, values: &[Value]) -> VariableResult<VariableKind> {
        let mut kind = self.kind;
        for value in values {
            self.accepts(kind, value)?;
            kind = self.kind_after(kind, value);
        }
        Ok(kind)
    }

    fn check_index(&self, index: usize, len: usize) -> VariableResult<()> {
        if index >= len {
            return Err(VariableError::IndexOutOfRange { index, len });
        }
        Ok(())
    }

    // -- mutation -----------------------------------------------------------

    /// Side effects of taking a value, shared by every insertion path
    fn absorb(&mut self, value: &Value) {
        if value.is_missing() {
            self.missing_count += 1;
        } else {
            self.kind = self.kind_after(self.kind, value);
        }
        if self.kind == VariableKind::Numeric {
            if let Some(n) = value.as_number() {
                self.min = self.min.min(n);
                self.max = self.max.max(n);
            }
        }
        let numeric = self.kind == VariableKind::Numeric;
        if let Some(table) = self.categories.as_mut() {
            if table.count(value) && numeric {
                table.sort_numeric();
            }
        }
    }

    fn changed(&mut self, graph: &mut ChangeGraph, kind: ChangeKind) -> LinkviewResult<()> {
        self.ranks = None;
        if !self.muted {
            graph.emit(self.node, kind)?;
        }
        Ok(())
    }

    fn rebuild_if_categorized(&mut self) {
        if self.categories.is_some() {
            self.categories = Some(self.build_categories());
        }
    }

    /// Append a value at the end
    pub fn append(&mut self, graph: &mut ChangeGraph, value: impl Into<Value>) -> LinkviewResult<()> {
        let value = value.into().normalized();
        self.check(&value)?;
        self.absorb(&value);
        self.values.push(value);
        self.changed(graph, ChangeKind::VariableContent)
    }

    /// Insert a value before position `index` (`index == len` appends)
    pub fn insert_at(
        &mut self,
        graph: &mut ChangeGraph,
        index: usize,
        value: impl Into<Value>,
    ) -> LinkviewResult<()> {
        let value = value.into().normalized();
        self.check_index(index, self.len() + 1)?;
        self.check(&value)?;
        self.absorb(&value);
        self.values.insert(index, value);
        self.changed(graph, ChangeKind::VariableContent)
    }

    /// Remove the value at `index`
    ///
    /// The numeric range is not shrunk.
    pub fn remove_at(&mut self, graph: &mut ChangeGraph, index: usize) -> LinkviewResult<Value> {
        self.check_index(index, self.len())?;
        let removed = self.values.remove(index);
        if removed.is_missing() {
            self.missing_count -= 1;
        }
        self.rebuild_if_categorized();
        self.changed(graph, ChangeKind::VariableContent)?;
        Ok(removed)
    }

    /// Replace the value at `index`, returning the old one
    ///
    /// The numeric range is only widened.
    pub fn replace_at(
        &mut self,
        graph: &mut ChangeGraph,
        index: usize,
        value: impl Into<Value>,
    ) -> LinkviewResult<Value> {
        let value = value.into().normalized();
        self.check_index(index, self.len())?;
        self.check(&value)?;

        let old = std::mem::replace(&mut self.values[index], Value::Missing);
        if old.is_missing() {
            self.missing_count -= 1;
        }
        // the rebuild below replaces the table patched by absorb
        let table = self.categories.take();
        self.absorb(&value);
        self.categories = table;
        self.values[index] = value;
        self.rebuild_if_categorized();
        self.changed(graph, ChangeKind::VariableContent)?;
        Ok(old)
    }

    /// Replace every value at once with a single event
    pub fn replace_all(&mut self, graph: &mut ChangeGraph, values: Vec<Value>) -> LinkviewResult<()> {
        if values.len() != self.len() {
            return Err(VariableError::LengthMismatch {
                expected: self.len(),
                actual: values.len(),
            }
            .into());
        }
        let values: Vec<Value> = values.into_iter().map(Value::normalized).collect();
        self.kind = self.check_all(&values)?;

        let table = self.categories.take();
        self.missing_count = 0;
        for value in &values {
            self.absorb(value);
        }
        self.categories = table;
        self.values = values;
        self.rebuild_if_categorized();
        self.changed(graph, ChangeKind::VariableContent)
    }

    // -- categories ---------------------------------------------------------

    fn build_categories(&self) -> CategoryTable {
        let mut table = CategoryTable::scan(self.values.iter());
        if self.kind == VariableKind::Numeric {
            table.sort_numeric();
        }
        table
    }

    /// Build the category table
    ///
    /// Does nothing if the variable is already categorized, unless
    /// `force_rebuild` is set. Missing values form their own category.
    /// Categories of numeric variables are sorted ascending.
    pub fn categorize(&mut self, graph: &mut ChangeGraph, force_rebuild: bool) -> LinkviewResult<()> {
        if self.kind == VariableKind::Map {
            return Err(VariableError::NotCategorizable {
                variable: self.name.clone(),
            }
            .into());
        }
        if self.categories.is_some() && !force_rebuild {
            return Ok(());
        }
        let table = self.build_categories();
        debug!(
            variable = %self.name,
            categories = table.entries.len(),
            "categorized variable"
        );
        self.categories = Some(table);
        self.changed(graph, ChangeKind::VariableType)
    }

    /// Discard the category table
    pub fn drop_categories(&mut self, graph: &mut ChangeGraph) -> LinkviewResult<()> {
        if self.categories.take().is_none() {
            return Ok(());
        }
        self.changed(graph, ChangeKind::VariableType)
    }

    /// Seed the category table with levels in the given order
    ///
    /// Values that are not among the levels get categories after them.
    pub(crate) fn seed_categories(&mut self, levels: &[String]) {
        let mut table = CategoryTable::default();
        for level in levels {
            let value = Value::Text(level.clone());
            if table.lookup(&value).is_none() {
                table.count(&value);
                if let Some(last) = table.entries.last_mut() {
                    last.count = 0;
                }
            }
        }
        for value in &self.values {
            table.count(value);
        }
        self.categories = Some(table);
    }

    /// Reorder categories by a selection-minimum scan
    ///
    /// Each output slot takes the first smallest remaining category, so ties
    /// keep their table order. The missing category goes last. The variable
    /// is categorized first if needed.
    pub fn sort_categories(&mut self, graph: &mut ChangeGraph, method: SortMethod) -> LinkviewResult<()> {
        self.categorize(graph, false)?;
        let Some(table) = self.categories.as_mut() else {
            return Ok(());
        };

        let (mut remaining, missing): (Vec<Category>, Vec<Category>) =
            std::mem::take(&mut table.entries)
                .into_iter()
                .partition(|c| !c.is_missing());
        let mut sorted = Vec::with_capacity(remaining.len() + missing.len());
        while !remaining.is_empty() {
            let mut best = 0;
            for i in 1..remaining.len() {
                if compare_categories(&remaining[i].value, &remaining[best].value, method)
                    == Ordering::Less
                {
                    best = i;
                }
            }
            sorted.push(remaining.remove(best));
        }
        sorted.extend(missing);
        table.entries = sorted;
        table.reindex();

        debug!(variable = %self.name, ?method, "sorted categories");
        self.changed(graph, ChangeKind::VariableType)
    }

    pub fn is_categorized(&self) -> bool {
        self.categories.is_some()
    }

    /// The category table, if built
    pub fn categories(&self) -> Option<&[Category]> {
        self.categories.as_ref().map(|t| t.entries.as_slice())
    }

    /// Number of categories (0 if not categorized)
    pub fn num_categories(&self) -> usize {
        self.categories().map_or(0, <[Category]>::len)
    }

    /// Category index of a value
    pub fn category_index_of(&self, value: &Value) -> Option<usize> {
        self.categories.as_ref().and_then(|t| t.lookup(value))
    }

    /// Category index of a case
    pub fn category_of_case(&self, case: usize) -> Option<usize> {
        self.values.get(case).and_then(|v| self.category_index_of(v))
    }

    /// Representative value of a category
    pub fn category_at(&self, category: usize) -> Option<&Value> {
        self.categories()
            .and_then(|c| c.get(category))
            .map(|c| &c.value)
    }

    /// Number of cases in a category
    pub fn category_count_at(&self, category: usize) -> Option<usize> {
        self.categories()
            .and_then(|c| c.get(category))
            .map(|c| c.count)
    }

    /// Cases of every category, in case order
    pub fn category_members(&self) -> Vec<Vec<usize>> {
        let mut members = vec![Vec::new(); self.num_categories()];
        for case in 0..self.len() {
            if let Some(cat) = self.category_of_case(case) {
                members[cat].push(case);
            }
        }
        members
    }

    // -- ranking ------------------------------------------------------------

    /// Case indices sorted by ascending value, missing values left out
    ///
    /// Ties keep case order. With a filter only cases whose combined mark
    /// equals `filter.mark` are kept, in rank order. Non-numeric, categorized
    /// and empty variables have no ranking.
    pub fn ranked_indices(&mut self, filter: Option<RankFilter<'_>>) -> Arc<[usize]> {
        if self.kind != VariableKind::Numeric || self.categories.is_some() || self.is_empty() {
            return Arc::from(Vec::new());
        }

        let full = match &self.ranks {
            Some(ranks) => Arc::clone(ranks),
            None => {
                let column: Vec<Option<f64>> = self.values.iter().map(Value::as_number).collect();
                let ranks: Arc<[usize]> = Arc::from(rank_order(&column));
                debug!(variable = %self.name, ranked = ranks.len(), "ranked variable");
                if self.cache_ranks {
                    self.ranks = Some(Arc::clone(&ranks));
                }
                ranks
            }
        };

        match filter {
            None => full,
            Some(RankFilter { mask, mark }) => {
                Arc::from(filter_ranks(&full, |case| mask.mark_at(case) == mark))
            }
        }
    }

    // -- access -------------------------------------------------------------

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn value_at(&self, case: usize) -> Option<&Value> {
        self.values.get(case)
    }

    /// Numeric value of a case (`None` if missing or not a number)
    pub fn number_at(&self, case: usize) -> Option<f64> {
        self.values.get(case).and_then(Value::as_number)
    }

    /// Text of a case; missing values read as `"NA"`
    pub fn text_at(&self, case: usize) -> Option<String> {
        self.values.get(case).map(ToString::to_string)
    }

    pub fn is_missing_at(&self, case: usize) -> bool {
        self.values.get(case).is_some_and(Value::is_missing)
    }

    /// All values as numbers, NaN for missing and non-numeric values
    pub fn to_numbers(&self) -> Vec<f64> {
        self.values
            .iter()
            .map(|v| v.as_number().unwrap_or(f64::NAN))
            .collect()
    }

    /// All values as text, `None` for missing values
    pub fn to_strings(&self) -> Vec<Option<String>> {
        self.values
            .iter()
            .map(|v| (!v.is_missing()).then(|| v.to_string()))
            .collect()
    }

    /// Check if the variable holds exactly these numbers (NaN matches missing)
    pub fn has_equal_numbers(&self, numbers: &[f64]) -> bool {
        self.len() == numbers.len()
            && self
                .values
                .iter()
                .zip(numbers)
                .all(|(v, &n)| match v.as_number() {
                    Some(x) => x == n,
                    None => v.is_missing() && n.is_nan(),
                })
    }

    /// Check if the variable holds exactly these values
    pub fn has_equal_values(&self, values: &[Value]) -> bool {
        self.len() == values.len()
            && self
                .values
                .iter()
                .zip(values)
                .all(|(a, b)| (a.is_missing() && b.is_missing()) || a == b)
    }
}

fn compare_categories(a: &Value, b: &Value, method: SortMethod) -> Ordering {
    match method {
        SortMethod::Numeric => {
            let key = |v: &Value| {
                v.as_number()
                    .or_else(|| v.as_text().and_then(|s| s.trim().parse::<f64>().ok()))
            };
            match (key(a), key(b)) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        }
        SortMethod::Lexicographic => a.to_string().cmp(&b.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LinkviewError;
    use crate::graph::Recorder;

    fn watched(graph: &mut ChangeGraph, variable: &Variable) -> Recorder {
        let log = Recorder::new();
        let view = graph.add_observer_node("view", log.clone());
        graph.register(view, variable.node());
        log
    }

    fn numbers(graph: &mut ChangeGraph, values: &[f64]) -> Variable {
        Variable::from_values(
            graph,
            "x",
            VariableKind::Numeric,
            values.iter().map(|&v| Value::from(v)),
        )
        .unwrap()
    }

    #[test]
    fn test_append_tracks_range_and_missing() {
        let mut graph = ChangeGraph::new();
        let mut var = Variable::numeric(&mut graph, "age");
        let log = watched(&mut graph, &var);

        var.append(&mut graph, 3.0).unwrap();
        var.append(&mut graph, Value::Missing).unwrap();
        var.append(&mut graph, -1.0).unwrap();
        var.append(&mut graph, f64::NAN).unwrap();

        assert_eq!(var.len(), 4);
        assert_eq!(var.missing_count(), 2);
        assert_eq!(var.range(), Some((-1.0, 3.0)));
        assert_eq!(log.count(), 4);
    }

    #[test]
    fn test_type_mismatch_leaves_variable_unchanged() {
        let mut graph = ChangeGraph::new();
        let mut var = Variable::numeric(&mut graph, "age");
        var.append(&mut graph, 1.0).unwrap();
        let log = watched(&mut graph, &var);

        let err = var.append(&mut graph, "old").unwrap_err();
        assert!(matches!(
            err,
            LinkviewError::Variable(VariableError::TypeMismatch { actual: "text", .. })
        ));
        assert_eq!(var.len(), 1);
        assert_eq!(log.count(), 0);
    }

    #[test]
    fn test_guessing_fixes_kind() {
        let mut graph = ChangeGraph::new();
        let mut var = Variable::new(&mut graph, "g", VariableKind::Undetermined);
        assert!(var.is_guessing());
        var.append(&mut graph, Value::Missing).unwrap();
        assert_eq!(var.kind(), VariableKind::Undetermined);
        var.append(&mut graph, "a").unwrap();
        assert_eq!(var.kind(), VariableKind::Text);
        // text variables accept numbers
        var.append(&mut graph, 2.0).unwrap();
        assert_eq!(var.text_at(2).as_deref(), Some("2"));
    }

    #[test]
    fn test_insert_and_remove() {
        let mut graph = ChangeGraph::new();
        let mut var = numbers(&mut graph, &[1.0, 2.0]);
        var.insert_at(&mut graph, 1, 10.0).unwrap();
        assert_eq!(var.to_numbers(), vec![1.0, 10.0, 2.0]);
        assert!(var.insert_at(&mut graph, 5, 0.0).is_err());

        let removed = var.remove_at(&mut graph, 1).unwrap();
        assert_eq!(removed, Value::Number(10.0));
        // range is never shrunk
        assert_eq!(var.max(), Some(10.0));
        assert!(var.remove_at(&mut graph, 9).is_err());
    }

    #[test]
    fn test_replace_widens_only() {
        let mut graph = ChangeGraph::new();
        let mut var = numbers(&mut graph, &[1.0, 5.0]);
        var.replace_at(&mut graph, 1, 2.0).unwrap();
        assert_eq!(var.range(), Some((1.0, 5.0)));
        var.replace_at(&mut graph, 0, Value::Missing).unwrap();
        assert_eq!(var.missing_count(), 1);
        var.replace_at(&mut graph, 0, -4.0).unwrap();
        assert_eq!(var.missing_count(), 0);
        assert_eq!(var.min(), Some(-4.0));
    }

    #[test]
    fn test_replace_all_single_event() {
        let mut graph = ChangeGraph::new();
        let mut var = numbers(&mut graph, &[1.0, 2.0, 3.0]);
        let log = watched(&mut graph, &var);

        let bad = vec![Value::from(1.0)];
        assert!(var.replace_all(&mut graph, bad).is_err());
        let mixed = vec![Value::from(1.0), Value::from("x"), Value::Missing];
        assert!(var.replace_all(&mut graph, mixed).is_err());
        assert_eq!(var.to_numbers(), vec![1.0, 2.0, 3.0]);

        let next = vec![Value::from(7.0), Value::Missing, Value::from(0.5)];
        var.replace_all(&mut graph, next).unwrap();
        assert_eq!(var.missing_count(), 1);
        assert_eq!(var.range(), Some((0.5, 7.0)));
        assert_eq!(log.count(), 1);
    }

    #[test]
    fn test_categorize_text() {
        let mut graph = ChangeGraph::new();
        let values = ["b", "a", "b", "", "c"]
            .iter()
            .map(|s| if s.is_empty() { Value::Missing } else { Value::from(*s) });
        let mut var =
            Variable::from_values(&mut graph, "grp", VariableKind::Text, values).unwrap();
        let log = watched(&mut graph, &var);
        var.categorize(&mut graph, false).unwrap();

        assert_eq!(var.num_categories(), 4);
        assert_eq!(var.category_at(0), Some(&Value::from("b")));
        assert_eq!(var.category_count_at(0), Some(2));
        assert_eq!(var.category_at(2), Some(&Value::Missing));
        assert_eq!(var.category_of_case(4), Some(3));
        assert_eq!(log.messages()[0].kind, ChangeKind::VariableType);

        // second request without force is a no-op
        var.categorize(&mut graph, false).unwrap();
        assert_eq!(log.count(), 1);
    }

    #[test]
    fn test_categorize_numeric_sorted() {
        let mut graph = ChangeGraph::new();
        let mut var = numbers(&mut graph, &[3.0, f64::NAN, 1.0, 3.0, 2.0]);
        var.categorize(&mut graph, true).unwrap();
        let cats: Vec<String> = var
            .categories()
            .unwrap()
            .iter()
            .map(|c| c.value.to_string())
            .collect();
        assert_eq!(cats, vec!["1", "2", "3", "NA"]);

        // a new value while categorized keeps the numeric order
        var.append(&mut graph, 0.0).unwrap();
        assert_eq!(var.category_at(0), Some(&Value::Number(0.0)));
        assert_eq!(var.category_of_case(0), Some(3));
    }

    #[test]
    fn test_remove_rebuilds_categories() {
        let mut graph = ChangeGraph::new();
        let mut var = numbers(&mut graph, &[1.0, 2.0, 2.0]);
        var.categorize(&mut graph, false).unwrap();
        var.remove_at(&mut graph, 0).unwrap();
        assert_eq!(var.num_categories(), 1);
        assert_eq!(var.category_count_at(0), Some(2));

        var.replace_at(&mut graph, 0, 5.0).unwrap();
        assert_eq!(var.num_categories(), 2);
    }

    #[test]
    fn test_map_not_categorizable() {
        let mut graph = ChangeGraph::new();
        let mut var = Variable::new(&mut graph, "shape", VariableKind::Map);
        let err = var.categorize(&mut graph, false).unwrap_err();
        assert!(matches!(
            err,
            LinkviewError::Variable(VariableError::NotCategorizable { .. })
        ));
        assert!(var.append(&mut graph, 1.0).is_err());
    }

    #[test]
    fn test_sort_categories() {
        let mut graph = ChangeGraph::new();
        let values = ["10", "9", "", "b", "9", "a"]
            .iter()
            .map(|s| if s.is_empty() { Value::Missing } else { Value::from(*s) });
        let mut var =
            Variable::from_values(&mut graph, "grp", VariableKind::Text, values).unwrap();

        var.sort_categories(&mut graph, SortMethod::Numeric).unwrap();
        let order: Vec<String> = var.categories().unwrap().iter().map(|c| c.value.to_string()).collect();
        assert_eq!(order, vec!["9", "10", "b", "a", "NA"]);

        var.sort_categories(&mut graph, SortMethod::Lexicographic).unwrap();
        let order: Vec<String> = var.categories().unwrap().iter().map(|c| c.value.to_string()).collect();
        assert_eq!(order, vec!["10", "9", "a", "b", "NA"]);
        assert_eq!(var.category_of_case(1), Some(1));
        assert_eq!(var.category_count_at(1), Some(2));
    }

    #[test]
    fn test_ranked_indices_cached_and_invalidated() {
        let mut graph = ChangeGraph::new();
        let mut var = numbers(&mut graph, &[3.0, f64::NAN, 1.0, 3.0]);
        let ranks = var.ranked_indices(None);
        assert_eq!(&*ranks, &[2, 0, 3]);
        assert!(var.has_cached_ranks());

        var.append(&mut graph, 0.0).unwrap();
        assert!(!var.has_cached_ranks());
        assert_eq!(&*var.ranked_indices(None), &[4, 2, 0, 3]);
    }

    #[test]
    fn test_ranked_indices_with_filter() {
        let mut graph = ChangeGraph::new();
        let mut var = numbers(&mut graph, &[4.0, 3.0, 2.0, 1.0]);
        let mut mask = SelectionMask::new(&mut graph, 4);
        mask.set_cases(&mut graph, &[0, 2], true).unwrap();
        mask.set_secondary(&mut graph, 1, 2).unwrap();

        let selected = var.ranked_indices(Some(RankFilter { mask: &mask, mark: -1 }));
        assert_eq!(&*selected, &[2, 0]);
        let unmarked = var.ranked_indices(Some(RankFilter { mask: &mask, mark: 0 }));
        assert_eq!(&*unmarked, &[3]);
    }

    #[test]
    fn test_no_ranking_for_text_or_categorized() {
        let mut graph = ChangeGraph::new();
        let mut text = Variable::from_values(
            &mut graph,
            "t",
            VariableKind::Text,
            vec![Value::from("a")],
        )
        .unwrap();
        assert!(text.ranked_indices(None).is_empty());

        let mut var = numbers(&mut graph, &[1.0]);
        var.categorize(&mut graph, false).unwrap();
        assert!(var.ranked_indices(None).is_empty());
    }

    #[test]
    fn test_muted_variable_is_silent() {
        let mut graph = ChangeGraph::new();
        let mut var = Variable::numeric(&mut graph, "x");
        let log = watched(&mut graph, &var);
        var.set_muted(true);
        var.append(&mut graph, 1.0).unwrap();
        assert_eq!(log.count(), 0);
        var.set_muted(false);
        var.append(&mut graph, 2.0).unwrap();
        assert_eq!(log.count(), 1);
    }

    #[test]
    fn test_seed_categories_keeps_level_order() {
        let mut graph = ChangeGraph::new();
        let values = vec![Value::from("lo"), Value::from("hi"), Value::Missing];
        let mut var = Variable::from_values(&mut graph, "f", VariableKind::Text, values).unwrap();
        var.seed_categories(&["hi".to_string(), "mid".to_string(), "lo".to_string()]);

        assert_eq!(var.num_categories(), 4);
        assert_eq!(var.category_at(1), Some(&Value::from("mid")));
        assert_eq!(var.category_count_at(1), Some(0));
        assert_eq!(var.category_of_case(0), Some(2));
        assert_eq!(var.category_members()[3], vec![2]);
    }

    #[test]
    fn test_equality_checks() {
        let mut graph = ChangeGraph::new();
        let var = numbers(&mut graph, &[1.0, f64::NAN]);
        assert!(var.has_equal_numbers(&[1.0, f64::NAN]));
        assert!(!var.has_equal_numbers(&[1.0, 2.0]));
        assert!(var.has_equal_values(&[Value::from(1.0), Value::Missing]));
        assert_eq!(var.to_strings(), vec![Some("1".to_string()), None]);
    }
}
