//! Chunk fetcher (C11): turns a Zarr chunk index into an OPeNDAP hyperslab
//! request, decodes the response into little-endian bytes, and notifies
//! registered observers of every attempt.

use std::time::{Duration, Instant};

use esa_common::{EsaCciError, TimeRange, TrimBounds};
use opendap::{read, DapArray};
use retry_client::RetryClient;

use crate::schema::ArraySpec;

/// One granule's time window and the OPeNDAP base URL serving it, indexed
/// by time-chunk position once the granule index has been established at
/// open time (§4.11, "after the index has been established").
#[derive(Debug, Clone)]
pub struct TimeSlot {
    pub range: TimeRange,
    pub opendap_url: String,
}

/// A single fetch attempt, emitted to every observer whether it succeeded
/// or failed, before any error is returned to the caller (§4.11, §9).
#[derive(Debug, Clone)]
pub struct FetchEvent {
    pub var_name: String,
    pub chunk_index: Vec<usize>,
    pub time_range: Option<TimeRange>,
    pub duration: Duration,
    pub error: Option<String>,
}

/// A single-method event sink (§9 "observer pattern... single method
/// on_fetch"). Implementations must be safe to call from within another
/// in-flight read, since an observer may itself schedule further fetches.
pub trait FetchObserver: Send + Sync {
    fn on_fetch(&self, event: &FetchEvent);
}

/// Fetches one chunk of `spec`, notifying `observers` before propagating
/// any error (§4.11).
#[allow(clippy::too_many_arguments)]
pub async fn fetch_chunk(
    retry: &RetryClient,
    time_slots: &[TimeSlot],
    spec: &ArraySpec,
    time_axis: usize,
    axis_trim: &[TrimBounds],
    flipped_axes: &[bool],
    chunk_index: &[usize],
    observers: &[Box<dyn FetchObserver>],
) -> Result<Vec<u8>, EsaCciError> {
    let started = Instant::now();
    let time_range = time_slots.get(chunk_index[time_axis]).map(|s| s.range);

    let result = fetch_chunk_inner(retry, time_slots, spec, time_axis, axis_trim, flipped_axes, chunk_index).await;
    let duration = started.elapsed();

    let event = FetchEvent {
        var_name: spec.name.clone(),
        chunk_index: chunk_index.to_vec(),
        time_range,
        duration,
        error: result.as_ref().err().map(|e| e.to_string()),
    };
    for observer in observers {
        observer.on_fetch(&event);
    }

    result
}

async fn fetch_chunk_inner(
    retry: &RetryClient,
    time_slots: &[TimeSlot],
    spec: &ArraySpec,
    time_axis: usize,
    axis_trim: &[TrimBounds],
    flipped_axes: &[bool],
    chunk_index: &[usize],
) -> Result<Vec<u8>, EsaCciError> {
    let slot = time_slots.get(chunk_index[time_axis]).ok_or_else(|| {
        EsaCciError::InvalidArgument(format!(
            "time chunk index {} out of range (have {} slots)",
            chunk_index[time_axis],
            time_slots.len()
        ))
    })?;

    let mut slices = Vec::with_capacity(spec.shape.len());
    let mut local_shape = Vec::with_capacity(spec.shape.len());
    for axis in 0..spec.shape.len() {
        if axis == time_axis {
            let len = spec.chunks[time_axis];
            slices.push((0, len));
            local_shape.push(len);
            continue;
        }

        let chunk_size = spec.chunks[axis];
        let axis_len = spec.shape[axis];
        let e_start = chunk_index[axis] * chunk_size;
        let e_stop = (e_start + chunk_size).min(axis_len);
        local_shape.push(e_stop - e_start);

        let trim = axis_trim[axis];
        if flipped_axes[axis] {
            slices.push((trim.hi - e_stop, trim.hi - e_start));
        } else {
            slices.push((trim.lo + e_start, trim.lo + e_stop));
        }
    }

    let array = read(retry, &slot.opendap_url, &spec.name, &slices).await?;
    Ok(reshape_flip_and_encode(array, &local_shape, flipped_axes))
}

/// Reverses every flipped axis within the chunk's own local shape, then
/// flattens to little-endian bytes in the variable's native Zarr dtype
/// (§4.11, §6 "chunk byte order is always little-endian").
fn reshape_flip_and_encode(array: DapArray, shape: &[usize], flipped_axes: &[bool]) -> Vec<u8> {
    if !flipped_axes.iter().any(|&f| f) {
        return encode_little_endian(array);
    }
    match array {
        DapArray::U8(v) => encode_u8(flip(v, shape, flipped_axes)),
        DapArray::U16(v) => encode_u16(flip(v, shape, flipped_axes)),
        DapArray::U32(v) => encode_u32(flip(v, shape, flipped_axes)),
        DapArray::F32(v) => encode_f32(flip(v, shape, flipped_axes)),
        DapArray::F64(v) => encode_f64(flip(v, shape, flipped_axes)),
    }
}

fn encode_little_endian(array: DapArray) -> Vec<u8> {
    match array {
        DapArray::U8(v) => encode_u8(v),
        DapArray::U16(v) => encode_u16(v),
        DapArray::U32(v) => encode_u32(v),
        DapArray::F32(v) => encode_f32(v),
        DapArray::F64(v) => encode_f64(v),
    }
}

fn encode_u8(v: Vec<u8>) -> Vec<u8> {
    v
}
fn encode_u16(v: Vec<u16>) -> Vec<u8> {
    v.iter().flat_map(|x| x.to_le_bytes()).collect()
}
fn encode_u32(v: Vec<u32>) -> Vec<u8> {
    v.iter().flat_map(|x| x.to_le_bytes()).collect()
}
fn encode_f32(v: Vec<f32>) -> Vec<u8> {
    v.iter().flat_map(|x| x.to_le_bytes()).collect()
}
fn encode_f64(v: Vec<f64>) -> Vec<u8> {
    v.iter().flat_map(|x| x.to_le_bytes()).collect()
}

/// Reverses index order along every flipped axis of a row-major array of
/// shape `shape`, leaving non-flipped axes untouched.
fn flip<T: Clone>(values: Vec<T>, shape: &[usize], flipped_axes: &[bool]) -> Vec<T> {
    let strides = row_major_strides(shape);
    let total: usize = shape.iter().product();
    let mut out = values.clone();
    for idx in 0..total {
        let multi = unravel_index(idx, shape, &strides);
        let mut src_multi = multi.clone();
        for (axis, &flipped) in flipped_axes.iter().enumerate() {
            if flipped {
                src_multi[axis] = shape[axis] - 1 - multi[axis];
            }
        }
        let src_idx = ravel_index(&src_multi, &strides);
        out[idx] = values[src_idx].clone();
    }
    out
}

fn row_major_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

fn unravel_index(mut idx: usize, shape: &[usize], strides: &[usize]) -> Vec<usize> {
    let mut multi = vec![0usize; shape.len()];
    for i in 0..shape.len() {
        multi[i] = idx / strides[i];
        idx %= strides[i];
    }
    multi
}

fn ravel_index(multi: &[usize], strides: &[usize]) -> usize {
    multi.iter().zip(strides).map(|(&m, &s)| m * s).sum()
}

/// Parses a chunk key's dotted suffix (`"<i0>.<i1>..."`, §4.9) into its
/// integer components.
pub fn parse_chunk_suffix(suffix: &str) -> Option<Vec<usize>> {
    suffix.split('.').map(|s| s.parse().ok()).collect()
}
