//! Anchored fixed-width histogram binning
//!
//! A binning is described by an anchor (the left edge of bin 0) and a bin
//! width. Value `x` falls into bin `floor((x - anchor) / width)`. The number
//! of bins is chosen so that the largest value is always covered:
//! `floor((max - anchor) / width) + 1`.
//!
//! The bin count is capped: a width so small that the range would need more
//! than the limit of bins is rejected instead of allocated.
//!
//! Every bin keeps the indices of its member cases (in case order), so a
//! linked view can highlight exactly the cases behind a bar.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while describing a binning
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BinningError {
    #[error("Bin width must be positive and finite, got {0}")]
    InvalidWidth(f64),

    #[error("Bin anchor must be finite, got {0}")]
    InvalidAnchor(f64),

    #[error("Binning needs {requested} bins, limit is {limit}")]
    TooManyBins { requested: f64, limit: usize },
}

/// Bin limit used when the caller has no configured one
pub const DEFAULT_MAX_BINS: usize = 10_000;

/// Result type for binning operations
pub type BinningResult<T> = Result<T, BinningError>;

/// Anchor and width of a histogram binning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinSpec {
    /// Left edge of bin 0
    pub anchor: f64,
    /// Width of every bin
    pub width: f64,
}

impl BinSpec {
    /// Create a validated bin specification
    pub fn new(anchor: f64, width: f64) -> BinningResult<Self> {
        if !(width.is_finite() && width > 0.0) {
            return Err(BinningError::InvalidWidth(width));
        }
        if !anchor.is_finite() {
            return Err(BinningError::InvalidAnchor(anchor));
        }
        Ok(Self { anchor, width })
    }

    /// Bin index of a value (may be negative for values left of the anchor)
    pub fn bin_of(&self, value: f64) -> i64 {
        ((value - self.anchor) / self.width).floor() as i64
    }

    /// Number of bins needed to cover values up to `max`
    ///
    /// Returns 0 when `max` lies left of the anchor, and
    /// [`BinningError::TooManyBins`] when more than `limit` bins are needed.
    pub fn bin_count(&self, max: f64, limit: usize) -> BinningResult<usize> {
        if !max.is_finite() || max < self.anchor {
            return Ok(0);
        }
        let span = ((max - self.anchor) / self.width).floor();
        let too_many = BinningError::TooManyBins {
            requested: span + 1.0,
            limit,
        };
        if !(span < limit as f64) {
            return Err(too_many);
        }
        (span as usize)
            .checked_add(1)
            .filter(|&count| count <= limit)
            .ok_or(too_many)
    }

    /// Lower (inclusive) edge of bin `index`
    pub fn lower_edge(&self, index: usize) -> f64 {
        self.anchor + index as f64 * self.width
    }

    /// Upper (exclusive) edge of bin `index`
    pub fn upper_edge(&self, index: usize) -> f64 {
        self.anchor + (index + 1) as f64 * self.width
    }

    /// Clamp an anchor into `[min - width, min]`
    ///
    /// Keeps the data minimum inside the first bin while the anchor is
    /// dragged around.
    pub fn clamp_anchor(anchor: f64, min: f64, width: f64) -> f64 {
        anchor.max(min - width).min(min)
    }
}

/// Cases grouped into histogram bins
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Binning {
    spec: BinSpec,
    bins: Vec<Vec<usize>>,
    max_count: usize,
    /// Present values that fell outside every bin
    outside: usize,
}

impl Binning {
    /// Bin a stream of `(case, value)` pairs
    ///
    /// `max` is the largest value the histogram must cover (usually the
    /// variable maximum); at most `limit` bins are created. NaN values are
    /// skipped.
    ///
    /// Time complexity: O(n + bins)
    pub fn build<I>(spec: BinSpec, max: f64, limit: usize, cases: I) -> BinningResult<Self>
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        let count = spec.bin_count(max, limit)?;
        let mut binning = Self {
            spec,
            bins: Vec::new(),
            max_count: 0,
            outside: 0,
        };
        binning.fill(count, cases);
        Ok(binning)
    }

    /// Re-bin with a new specification, reusing the bin storage
    ///
    /// Leaves the binning unchanged when the new specification needs too
    /// many bins.
    pub fn rebin<I>(&mut self, spec: BinSpec, max: f64, limit: usize, cases: I) -> BinningResult<()>
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        let count = spec.bin_count(max, limit)?;
        self.spec = spec;
        self.fill(count, cases);
        Ok(())
    }

    fn fill<I>(&mut self, count: usize, cases: I)
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        self.bins.iter_mut().for_each(Vec::clear);
        self.bins.resize_with(count, Vec::new);
        self.max_count = 0;
        self.outside = 0;

        for (case, value) in cases {
            if value.is_nan() {
                continue;
            }
            let bin = self.spec.bin_of(value);
            if bin < 0 || bin as usize >= count {
                self.outside += 1;
                continue;
            }
            let members = &mut self.bins[bin as usize];
            members.push(case);
            self.max_count = self.max_count.max(members.len());
        }
    }

    /// The specification the bins were built with
    pub fn spec(&self) -> BinSpec {
        self.spec
    }

    /// Number of bins
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// Check if there are no bins
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Member cases of a bin
    pub fn bin(&self, index: usize) -> Option<&[usize]> {
        self.bins.get(index).map(Vec::as_slice)
    }

    /// All bins in order
    pub fn bins(&self) -> &[Vec<usize>] {
        &self.bins
    }

    /// Case counts per bin
    pub fn counts(&self) -> Vec<usize> {
        self.bins.iter().map(Vec::len).collect()
    }

    /// Largest bin count (for autoscaling the count axis)
    pub fn max_count(&self) -> usize {
        self.max_count
    }

    /// Number of binned cases
    pub fn total(&self) -> usize {
        self.bins.iter().map(Vec::len).sum()
    }

    /// Number of present values outside every bin
    pub fn outside(&self) -> usize {
        self.outside
    }

    /// Map every case to its bin (`None` for unbinned cases)
    pub fn case_bins(&self, case_count: usize) -> Vec<Option<usize>> {
        let mut map = vec![None; case_count];
        for (bin, members) in self.bins.iter().enumerate() {
            for &case in members {
                if let Some(slot) = map.get_mut(case) {
                    *slot = Some(bin);
                }
            }
        }
        map
    }
}
