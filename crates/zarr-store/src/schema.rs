//! Frozen per-array Zarr v2 schema (§6): the `.zarray`/`.zattrs` JSON shapes
//! and the typed record they're built from once per dataset open.

use std::collections::BTreeMap;

use opendap::DapDtype;
use serde_json::{json, Value};

/// The Blosc compressor descriptor used for embedded static coordinate
/// chunks (§6); data-variable chunks always report `compressor: null`
/// since their bytes come straight off the wire uncompressed.
pub fn blosc_compressor_json() -> Value {
    json!({
        "id": "blosc",
        "cname": crate::blosc::CNAME,
        "clevel": crate::blosc::CLEVEL,
        "shuffle": crate::blosc::SHUFFLE,
        "blocksize": 0,
    })
}

/// One array's frozen shape, dtype, chunking and attributes. Built once at
/// open time from the merged OPeNDAP/DRS/descxml metadata and never
/// mutated afterwards (§9 "dynamic metadata -> static schema").
#[derive(Debug, Clone)]
pub struct ArraySpec {
    pub name: String,
    pub dtype: DapDtype,
    pub dimensions: Vec<String>,
    pub shape: Vec<usize>,
    pub chunks: Vec<usize>,
    pub fill_value: Option<f64>,
    pub attributes: BTreeMap<String, String>,
    pub static_bytes: Option<Vec<u8>>,
}

impl ArraySpec {
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn num_chunks_per_axis(&self) -> Vec<usize> {
        self.shape
            .iter()
            .zip(&self.chunks)
            .map(|(&size, &chunk)| size.div_ceil(chunk.max(1)))
            .collect()
    }

    /// `<name>/.zarray` JSON (§6). Embedded static arrays (materialised
    /// coordinates) are Blosc-compressed; every other array reports
    /// `compressor: null` because its bytes are forwarded unmodified from
    /// the remote OPeNDAP response.
    pub fn zarray_json(&self) -> Value {
        let zarr_dtype = self.dtype.zarr_dtype().unwrap_or("<f8");
        json!({
            "zarr_format": 2,
            "shape": self.shape,
            "chunks": self.chunks,
            "dtype": zarr_dtype,
            "compressor": if self.static_bytes.is_some() { blosc_compressor_json() } else { Value::Null },
            "fill_value": self.fill_value,
            "filters": Value::Null,
            "order": "C",
        })
    }

    /// `<name>/.zattrs` JSON (§6): `_ARRAY_DIMENSIONS` plus the variable's
    /// own attributes (units, long_name, standard_name, ...).
    pub fn zattrs_json(&self) -> Value {
        let mut attrs: serde_json::Map<String, Value> = self
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        attrs.insert(
            "_ARRAY_DIMENSIONS".to_string(),
            Value::Array(self.dimensions.iter().cloned().map(Value::String).collect()),
        );
        Value::Object(attrs)
    }
}
