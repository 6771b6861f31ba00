//! WGS84 bounding box type and coordinate-array trimming.

use serde::{Deserialize, Serialize};

/// A WGS84 `(lon_min, lat_min, lon_max, lat_max)` bounding box.
///
/// Coordinates are degrees. Invariant: `min_x <= max_x` and `min_y <= max_y`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub const WHOLE_EARTH: BoundingBox = BoundingBox {
        min_x: -180.0,
        min_y: -90.0,
        max_x: 180.0,
        max_y: 90.0,
    };

    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self, BboxError> {
        let bbox = Self {
            min_x,
            min_y,
            max_x,
            max_y,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    fn validate(&self) -> Result<(), BboxError> {
        if self.min_x > self.max_x || self.min_y > self.max_y {
            return Err(BboxError::Inverted(*self));
        }
        Ok(())
    }

    /// Parse `"lon_min,lat_min,lon_max,lat_max"` as sent on an OpenSearch query string.
    pub fn from_query_string(s: &str) -> Result<Self, BboxError> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 4 {
            return Err(BboxError::InvalidFormat(s.to_string()));
        }
        let mut v = [0.0f64; 4];
        for (i, p) in parts.iter().enumerate() {
            v[i] = p
                .trim()
                .parse()
                .map_err(|_| BboxError::InvalidNumber(p.to_string()))?;
        }
        Self::new(v[0], v[1], v[2], v[3])
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    pub fn as_query_param(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxError {
    #[error("invalid bbox format: {0}, expected 'lon_min,lat_min,lon_max,lat_max'")]
    InvalidFormat(String),
    #[error("invalid number in bbox: {0}")]
    InvalidNumber(String),
    #[error("inverted bbox: {0:?} (min must not exceed max on either axis)")]
    Inverted(BoundingBox),
}

/// Half-open trim bounds `[lo, hi)` into a coordinate array, as offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimBounds {
    pub lo: usize,
    pub hi: usize,
}

impl TrimBounds {
    pub fn len(&self) -> usize {
        self.hi - self.lo
    }

    pub fn is_empty(&self) -> bool {
        self.hi <= self.lo
    }
}

/// Trim an ascending coordinate array to `[lo_bound, hi_bound]` inclusive, using
/// bisect-left on the lower bound and bisect-right on the upper bound, matching
/// the source project's `bisect.bisect_left`/`bisect.bisect_right` trimming.
///
/// `coord` must be sorted ascending; callers holding a descending ("flipped")
/// axis must reverse it (and remember to flip back) before calling this.
pub fn trim_ascending(coord: &[f64], lo_bound: f64, hi_bound: f64) -> TrimBounds {
    let lo = bisect_left(coord, lo_bound);
    let hi = bisect_right(coord, hi_bound);
    TrimBounds { lo, hi }
}

fn bisect_left(coord: &[f64], x: f64) -> usize {
    let mut lo = 0usize;
    let mut hi = coord.len();
    while lo < hi {
        let mid = (lo + hi) / 2;
        if coord[mid] < x {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

fn bisect_right(coord: &[f64], x: f64) -> usize {
    let mut lo = 0usize;
    let mut hi = coord.len();
    while lo < hi {
        let mid = (lo + hi) / 2;
        if coord[mid] <= x {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Trim a coordinate array that may be stored descending (flipped latitude).
/// Returns trim bounds expressed in the array's own (possibly descending) index
/// space, so callers can slice it directly without re-sorting.
pub fn trim_coord(coord: &[f64], lo_bound: f64, hi_bound: f64) -> TrimBounds {
    let ascending = coord.len() < 2 || coord[0] <= coord[coord.len() - 1];
    if ascending {
        trim_ascending(coord, lo_bound, hi_bound)
    } else {
        let reversed: Vec<f64> = coord.iter().rev().copied().collect();
        let bounds = trim_ascending(&reversed, lo_bound, hi_bound);
        TrimBounds {
            lo: coord.len() - bounds.hi,
            hi: coord.len() - bounds.lo,
        }
    }
}
