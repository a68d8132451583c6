//! Screen-position index
//!
//! Cases are mapped to integer screen positions. All cases on the same
//! position form one [`PointGroup`], so dense data is drawn (and hit-tested)
//! once per distinct position instead of once per case.
//!
//! Two ordered maps index the groups, one keyed by `(x, y)` and one by
//! `(y, x)`. A rectangle query takes the x-slab from the first map and the
//! y-slab from the second and keeps the groups found in both.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Cases sharing one screen position
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointGroup {
    pub x: i32,
    pub y: i32,
    /// Member cases in insertion order
    pub cases: Vec<usize>,
}

impl PointGroup {
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

/// Index of point groups by screen position
#[derive(Clone, Debug, Default)]
pub struct ScreenIndex {
    groups: Vec<PointGroup>,
    by_xy: BTreeMap<(i32, i32), usize>,
    by_yx: BTreeMap<(i32, i32), usize>,
    diameter: u32,
}

impl ScreenIndex {
    /// Create an empty index for glyphs of the given diameter
    pub fn new(diameter: u32) -> Self {
        Self {
            diameter,
            ..Self::default()
        }
    }

    /// Remove all groups
    pub fn clear(&mut self) {
        self.groups.clear();
        self.by_xy.clear();
        self.by_yx.clear();
    }

    pub fn diameter(&self) -> u32 {
        self.diameter
    }

    pub fn set_diameter(&mut self, diameter: u32) {
        self.diameter = diameter;
    }

    /// Add a case at a screen position, returning its group
    pub fn insert(&mut self, case: usize, x: i32, y: i32) -> usize {
        if let Some(&group) = self.by_xy.get(&(x, y)) {
            self.groups[group].cases.push(case);
            return group;
        }
        let group = self.groups.len();
        self.groups.push(PointGroup {
            x,
            y,
            cases: vec![case],
        });
        self.by_xy.insert((x, y), group);
        self.by_yx.insert((y, x), group);
        group
    }

    /// Number of groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of indexed cases
    pub fn case_count(&self) -> usize {
        self.groups.iter().map(PointGroup::len).sum()
    }

    /// Groups in creation order
    pub fn groups(&self) -> &[PointGroup] {
        &self.groups
    }

    pub fn group(&self, index: usize) -> Option<&PointGroup> {
        self.groups.get(index)
    }

    /// Group at an exact position
    pub fn group_at(&self, x: i32, y: i32) -> Option<usize> {
        self.by_xy.get(&(x, y)).copied()
    }

    /// Groups inside the rectangle spanned by two corners (inclusive)
    ///
    /// Returns group indices in ascending order.
    pub fn query_rect(&self, x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<usize> {
        let (xl, xh) = (x0.min(x1), x0.max(x1));
        let (yl, yh) = (y0.min(y1), y0.max(y1));

        let in_x: BTreeSet<usize> = self
            .by_xy
            .range((xl, i32::MIN)..=(xh, i32::MAX))
            .map(|(_, &g)| g)
            .collect();
        let in_y: BTreeSet<usize> = self
            .by_yx
            .range((yl, i32::MIN)..=(yh, i32::MAX))
            .map(|(_, &g)| g)
            .collect();
        in_x.intersection(&in_y).copied().collect()
    }

    /// Cases inside a rectangle, group by group
    pub fn cases_in_rect(&self, x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<usize> {
        self.query_rect(x0, y0, x1, y1)
            .into_iter()
            .flat_map(|g| self.groups[g].cases.iter().copied())
            .collect()
    }

    /// Groups whose glyph covers the point `(px, py)`
    pub fn groups_containing(&self, px: i32, py: i32) -> Vec<usize> {
        let radius = f64::from(self.diameter) / 2.0;
        let reach = radius.ceil() as i32;
        self.query_rect(px - reach, py - reach, px + reach, py + reach)
            .into_iter()
            .filter(|&g| {
                let group = &self.groups[g];
                let dx = f64::from(group.x - px);
                let dy = f64::from(group.y - py);
                dx * dx + dy * dy <= radius * radius
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_positions_share_group() {
        let mut index = ScreenIndex::new(3);
        let a = index.insert(7, 10, 20);
        let b = index.insert(2, 10, 20);
        index.insert(5, 11, 20);

        assert_eq!(a, b);
        assert_eq!(index.len(), 2);
        assert_eq!(index.group(a).unwrap().cases, vec![7, 2]);
        assert_eq!(index.case_count(), 3);
        assert_eq!(index.group_at(11, 20), Some(1));
    }

    #[test]
    fn test_query_rect() {
        let mut index = ScreenIndex::new(3);
        index.insert(0, 0, 0);
        index.insert(1, 5, 5);
        index.insert(2, 5, 50);
        index.insert(3, 50, 5);
        index.insert(4, 9, 1);

        assert_eq!(index.query_rect(0, 0, 10, 10), vec![0, 1, 4]);
        // corners may come in any order
        assert_eq!(index.query_rect(10, 10, 0, 0), vec![0, 1, 4]);
        assert_eq!(index.cases_in_rect(4, 4, 60, 60), vec![1, 2, 3]);
        assert!(index.query_rect(20, 20, 30, 30).is_empty());
    }

    #[test]
    fn test_groups_containing() {
        let mut index = ScreenIndex::new(4);
        index.insert(0, 10, 10);
        index.insert(1, 12, 10);
        index.insert(2, 13, 13);

        assert_eq!(index.groups_containing(10, 10), vec![0, 1]);
        assert_eq!(index.groups_containing(12, 12), vec![1, 2]);
        assert!(index.groups_containing(30, 30).is_empty());
    }

    #[test]
    fn test_clear() {
        let mut index = ScreenIndex::new(3);
        index.insert(0, 1, 1);
        index.clear();
        assert!(index.is_empty());
        assert!(index.query_rect(0, 0, 5, 5).is_empty());
    }
}
