//! Case values and variable kinds

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a variable
///
/// A variable starts `Undetermined` when its kind is guessed from the first
/// present value; once fixed the kind never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableKind {
    Undetermined,
    Numeric,
    Text,
    Map,
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VariableKind::Undetermined => "undetermined",
            VariableKind::Numeric => "numeric",
            VariableKind::Text => "text",
            VariableKind::Map => "map",
        };
        f.write_str(name)
    }
}

/// One closed polygon of a map segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapPolygon {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    /// Polygon is a hole (lake) inside its segment
    pub is_lake: bool,
    /// Polygon outline is drawn
    pub has_border: bool,
}

impl MapPolygon {
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> Self {
        Self {
            xs,
            ys,
            is_lake: false,
            has_border: true,
        }
    }

    /// Number of vertices
    pub fn len(&self) -> usize {
        self.xs.len().min(self.ys.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bounding box as `[min_x, min_y, max_x, max_y]`
    pub fn bounds(&self) -> Option<[f64; 4]> {
        bounds_of(self.xs.iter().copied().zip(self.ys.iter().copied()))
    }
}

/// Map geometry of one case: one or more polygons
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapSegment {
    pub polygons: Vec<MapPolygon>,
}

impl MapSegment {
    pub fn new(polygons: Vec<MapPolygon>) -> Self {
        Self { polygons }
    }

    /// Build a segment from coordinate columns, splitting polygons at NaN
    ///
    /// A NaN in either column ends the current polygon. Empty runs (two NaNs
    /// in a row, leading or trailing NaN) produce no polygon.
    pub fn from_coordinates(xs: &[f64], ys: &[f64]) -> Self {
        let mut polygons = Vec::new();
        let mut px = Vec::new();
        let mut py = Vec::new();

        for (&x, &y) in xs.iter().zip(ys) {
            if x.is_nan() || y.is_nan() {
                if !px.is_empty() {
                    polygons.push(MapPolygon::new(
                        std::mem::take(&mut px),
                        std::mem::take(&mut py),
                    ));
                }
                continue;
            }
            px.push(x);
            py.push(y);
        }
        if !px.is_empty() {
            polygons.push(MapPolygon::new(px, py));
        }

        Self { polygons }
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Bounding box over all polygons as `[min_x, min_y, max_x, max_y]`
    pub fn bounds(&self) -> Option<[f64; 4]> {
        bounds_of(
            self.polygons
                .iter()
                .flat_map(|p| p.xs.iter().copied().zip(p.ys.iter().copied())),
        )
    }
}

fn bounds_of(points: impl Iterator<Item = (f64, f64)>) -> Option<[f64; 4]> {
    points.fold(None, |acc, (x, y)| match acc {
        None => Some([x, y, x, y]),
        Some([x0, y0, x1, y1]) => Some([x0.min(x), y0.min(y), x1.max(x), y1.max(y)]),
    })
}

/// A single case value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Missing,
    Number(f64),
    Text(String),
    Map(MapSegment),
}

impl Value {
    /// Replace a NaN number by `Missing`
    pub fn normalized(self) -> Self {
        match self {
            Value::Number(n) if n.is_nan() => Value::Missing,
            other => other,
        }
    }

    pub fn is_missing(&self) -> bool {
        match self {
            Value::Missing => true,
            Value::Number(n) => n.is_nan(),
            _ => false,
        }
    }

    /// Numeric content, if any
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) if !n.is_nan() => Some(*n),
            _ => None,
        }
    }

    /// Text content, if any
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapSegment> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Short name of the value's shape, for error messages
    pub fn shape_name(&self) -> &'static str {
        match self {
            Value::Missing => "missing",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Map(_) => "map",
        }
    }

    /// The kind a guessing variable takes on from this value
    pub fn natural_kind(&self) -> Option<VariableKind> {
        match self {
            Value::Missing => None,
            Value::Number(n) if n.is_nan() => None,
            Value::Number(_) => Some(VariableKind::Numeric),
            Value::Text(_) => Some(VariableKind::Text),
            Value::Map(_) => Some(VariableKind::Map),
        }
    }

    /// Key identifying the category this value belongs to
    ///
    /// Map values have no category.
    pub fn category_key(&self) -> Option<CategoryKey> {
        match self {
            Value::Missing => Some(CategoryKey::Missing),
            Value::Number(n) if n.is_nan() => Some(CategoryKey::Missing),
            // -0.0 and 0.0 are the same category
            Value::Number(n) => Some(CategoryKey::Number((n + 0.0).to_bits())),
            Value::Text(s) => Some(CategoryKey::Text(s.clone())),
            Value::Map(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => f.write_str("NA"),
            Value::Number(n) if n.is_nan() => f.write_str("NA"),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
            Value::Map(m) => write!(f, "map({} polygons)", m.len()),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n).normalized()
    }
}

impl From<Option<f64>> for Value {
    fn from(n: Option<f64>) -> Self {
        n.map(Value::from).unwrap_or(Value::Missing)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Option<String>> for Value {
    fn from(s: Option<String>) -> Self {
        s.map(Value::Text).unwrap_or(Value::Missing)
    }
}

impl From<MapSegment> for Value {
    fn from(m: MapSegment) -> Self {
        Value::Map(m)
    }
}

/// Hashable identity of a category
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CategoryKey {
    Missing,
    /// Bit pattern of the number
    Number(u64),
    Text(String),
}
