//! Generators for synthetic DAP2 binary payloads and coordinate arrays.
//!
//! These produce predictable, verifiable data patterns usable across the
//! test suite, parameterised by shape rather than hardcoded.

/// Appends a DAP2 numeric array encoding of `values` to `out`: the element
/// count repeated twice as big-endian `u32`, then the elements themselves
/// in big-endian order.
pub fn encode_dap_array_f32(out: &mut Vec<u8>, values: &[f32]) {
    let n = values.len() as u32;
    out.extend_from_slice(&n.to_be_bytes());
    out.extend_from_slice(&n.to_be_bytes());
    for v in values {
        out.extend_from_slice(&v.to_be_bytes());
    }
}

/// Same as [`encode_dap_array_f32`] but for `f64` elements.
pub fn encode_dap_array_f64(out: &mut Vec<u8>, values: &[f64]) {
    let n = values.len() as u32;
    out.extend_from_slice(&n.to_be_bytes());
    out.extend_from_slice(&n.to_be_bytes());
    for v in values {
        out.extend_from_slice(&v.to_be_bytes());
    }
}

/// Creates an ascending coordinate axis of `len` evenly spaced values
/// starting at `start` with the given `step`.
///
/// Each cell value is `start + i * step`, making reads easy to verify.
pub fn create_ascending_axis(start: f64, step: f64, len: usize) -> Vec<f64> {
    (0..len).map(|i| start + i as f64 * step).collect()
}

/// Creates a descending coordinate axis, as used by the flipped-latitude
/// test dataset (north-to-south storage order).
pub fn create_descending_axis(start: f64, step: f64, len: usize) -> Vec<f64> {
    (0..len).map(|i| start - i as f64 * step).collect()
}

/// Creates a row-major `time x lat x lon` data cube with predictable
/// values: `cell = t * 10000 + row * 100 + col`, so `grid[i]` can be
/// checked against its source indices without re-deriving the flattening.
pub fn create_test_cube(n_time: usize, n_lat: usize, n_lon: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(n_time * n_lat * n_lon);
    for t in 0..n_time {
        for row in 0..n_lat {
            for col in 0..n_lon {
                data.push((t * 10_000 + row * 100 + col) as f32);
            }
        }
    }
    data
}

/// Creates a cube filled with a constant value, useful for fill-value and
/// missing-data edge cases.
pub fn create_constant_cube(n_time: usize, n_lat: usize, n_lon: usize, value: f32) -> Vec<f32> {
    vec![value; n_time * n_lat * n_lon]
}

/// Creates a cube with NaN at the given `(t, row, col)` positions, zero
/// elsewhere.
pub fn create_cube_with_nans(
    n_time: usize,
    n_lat: usize,
    n_lon: usize,
    nan_positions: &[(usize, usize, usize)],
) -> Vec<f32> {
    let mut data = vec![0.0f32; n_time * n_lat * n_lon];
    for &(t, row, col) in nan_positions {
        if t < n_time && row < n_lat && col < n_lon {
            data[t * n_lat * n_lon + row * n_lon + col] = f32::NAN;
        }
    }
    data
}
