//! OPeNDAP client (C4): fetches `.dds`+`.das` to build a typed dataset
//! schema, and `.dods` hyperslab requests for chunk data.

use std::collections::BTreeMap;

use esa_common::error::EsaCciError;
use retry_client::RetryClient;

use crate::das::{parse_das, Das};
use crate::dds::{parse_dds, DapDtype, Dds};

/// A single variable's merged DDS shape and DAS attributes.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub dtype: DapDtype,
    pub dimensions: Vec<String>,
    pub shape: Vec<usize>,
    pub attributes: BTreeMap<String, String>,
}

impl Variable {
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn fill_value(&self) -> Option<f64> {
        self.attributes.get("fill_value").and_then(|v| v.parse().ok())
    }

    pub fn chunk_sizes(&self) -> Option<Vec<usize>> {
        self.attributes.get("chunk_sizes").map(|v| {
            v.split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect()
        })
    }
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    pub variables: Vec<Variable>,
    pub global_attributes: BTreeMap<String, String>,
}

impl Dataset {
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }
}

/// Opens an OPeNDAP dataset at `base_url` (without a `.dds`/`.das`/`.dods`
/// suffix): fetches the DDS and DAS in parallel, then merges them.
pub async fn open(retry: &RetryClient, base_url: &str) -> Result<Dataset, EsaCciError> {
    let dds_url = format!("{base_url}.dds");
    let das_url = format!("{base_url}.das");

    let (dds_body, das_body) = tokio::join!(retry.get(&dds_url), retry.get(&das_url));
    let dds_text = String::from_utf8_lossy(&dds_body?).into_owned();
    let das_text = das_body.map(|b| String::from_utf8_lossy(&b).into_owned()).unwrap_or_default();

    let dds: Dds = parse_dds(&dds_text)?;
    let das: Das = parse_das(&das_text);

    let variables = dds
        .variables
        .into_iter()
        .map(|v| {
            let attributes = das.variables.get(&v.name).cloned().unwrap_or_default();
            Variable {
                name: v.name,
                dtype: v.dtype,
                dimensions: v.dimensions,
                shape: v.shape,
                attributes,
            }
        })
        .collect();

    Ok(Dataset {
        name: dds.dataset_name,
        variables,
        global_attributes: das.global,
    })
}

/// Decoded chunk data in its native dtype, prior to any little-endian
/// re-encoding the chunk fetcher (C11) performs for the Zarr wire format.
#[derive(Debug, Clone, PartialEq)]
pub enum DapArray {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl DapArray {
    pub fn len(&self) -> usize {
        match self {
            DapArray::U8(v) => v.len(),
            DapArray::U16(v) => v.len(),
            DapArray::U32(v) => v.len(),
            DapArray::F32(v) => v.len(),
            DapArray::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fetches one variable's hyperslab as `<path>.dods?<variable_id><hyperslab>`,
/// where `slices` is an inclusive `[start, stop)` half-open range per axis
/// translated to DAP2's inclusive-end `[start:1:stop-1]` notation (§4.4).
pub async fn read(
    retry: &RetryClient,
    base_url: &str,
    variable_id: &str,
    slices: &[(usize, usize)],
) -> Result<DapArray, EsaCciError> {
    let mut hyperslab = String::new();
    for (start, stop) in slices {
        let stop_inclusive = stop.saturating_sub(1);
        hyperslab.push_str(&format!("[{start}:1:{stop_inclusive}]"));
    }
    let url = format!("{base_url}.dods?{variable_id}{hyperslab}");
    let body = retry.get(&url).await?;
    decode_dods_response(&body, variable_id)
}

const DATA_MARKER: &[u8] = b"\nData:\n";

fn decode_dods_response(body: &[u8], variable_id: &str) -> Result<DapArray, EsaCciError> {
    let marker_pos = find_subslice(body, DATA_MARKER).ok_or_else(|| {
        EsaCciError::granule_unavailable(variable_id, "dods response", "missing Data: marker")
    })?;
    let dds_text = String::from_utf8_lossy(&body[..marker_pos]).into_owned();
    let raw = &body[marker_pos + DATA_MARKER.len()..];

    let dds = parse_dds(&dds_text)?;
    let var = dds
        .variables
        .first()
        .ok_or_else(|| EsaCciError::metadata_unavailable(variable_id, "empty DDS in dods response"))?;

    decode_array(var.dtype, raw)
        .ok_or_else(|| EsaCciError::granule_unavailable(variable_id, "dods response", "truncated or malformed payload"))
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Decodes a DAP2-framed numeric array: an element count repeated twice as
/// big-endian `u32`, followed by the elements themselves in big-endian
/// order with no inter-element padding. This store only ever fetches the
/// five numeric dtypes it can expose as Zarr chunk data (§6); byte/short
/// values are not 4-byte-padded the way the full DAP2 wire format pads
/// them, since every producer and consumer of this payload in this
/// workspace uses the same simplified convention.
fn decode_array(dtype: DapDtype, raw: &[u8]) -> Option<DapArray> {
    if raw.len() < 8 {
        return None;
    }
    let count_a = u32::from_be_bytes(raw[0..4].try_into().ok()?) as usize;
    let count_b = u32::from_be_bytes(raw[4..8].try_into().ok()?) as usize;
    if count_a != count_b {
        return None;
    }
    let elements = &raw[8..];

    match dtype {
        DapDtype::Byte => {
            if elements.len() < count_a {
                return None;
            }
            Some(DapArray::U8(elements[..count_a].to_vec()))
        }
        DapDtype::UInt16 => decode_fixed(elements, count_a, u16::from_be_bytes).map(DapArray::U16),
        DapDtype::UInt32 => decode_fixed(elements, count_a, u32::from_be_bytes).map(DapArray::U32),
        DapDtype::Float32 => decode_fixed(elements, count_a, f32::from_be_bytes).map(DapArray::F32),
        DapDtype::Float64 => decode_fixed(elements, count_a, f64::from_be_bytes).map(DapArray::F64),
        DapDtype::Int16 | DapDtype::Int32 | DapDtype::Str => None,
    }
}

fn decode_fixed<T, const N: usize>(
    elements: &[u8],
    count: usize,
    from_be_bytes: fn([u8; N]) -> T,
) -> Option<Vec<T>> {
    if elements.len() < count * N {
        return None;
    }
    let mut out = Vec::with_capacity(count);
    for chunk in elements[..count * N].chunks_exact(N) {
        out.push(from_be_bytes(chunk.try_into().ok()?));
    }
    Some(out)
}
