//! Virtual Zarr store (C9): resolves a DRS id into a catalog entry,
//! aggregates its metadata, and freezes a browsable Zarr v2 key space over
//! it. Coordinate variables are materialised inline as Blosc-compressed
//! static chunks; data variables are left as lazily-fetched remote chunks
//! (§4.9).

use std::collections::BTreeMap;
use std::sync::Arc;

use catalog::{Catalog, DatasetResolver, ExclusionLists, MetadataAggregator};
use esa_common::bbox::{trim_coord, TrimBounds};
use esa_common::config::{CubeParams, StoreConfig};
use esa_common::{EsaCciError, TimeRange};
use granule_index::{plan_time_ranges, GranuleEntry, GranuleIndex};
use opendap::{read, DapArray};
use opensearch::OpenSearchClient;
use retry_client::{RetryClient, RetryClientConfig};
use serde_json::{json, Value};

use crate::chunk_planner::plan_chunks;
use crate::fetcher::{fetch_chunk, FetchObserver, TimeSlot};
use crate::schema::ArraySpec;

/// Fixed CF attributes for the synthesised `time`/`time_bnds` coordinate
/// pair (§4.9): every dataset gets the same calendar and bounds wiring
/// regardless of its own native time encoding.
const TIME_UNITS: &str = "seconds since 1970-01-01T00:00:00Z";
const TIME_CALENDAR: &str = "proleptic_gregorian";

/// Resolves dataset ids and opens them as virtual Zarr stores (C1-C9
/// wiring).
pub struct Store {
    opensearch: OpenSearchClient,
    retry: Arc<RetryClient>,
    endpoint: String,
    config: StoreConfig,
    exclusions: ExclusionLists,
    catalog: Catalog,
}

impl Store {
    pub fn new(config: StoreConfig, exclusions: ExclusionLists) -> Result<Self, EsaCciError> {
        let retry_config = RetryClientConfig {
            num_retries: config.num_retries,
            backoff_ceiling_max_ms: config.retry_backoff_max_ms as f64,
            backoff_base: config.retry_backoff_base,
        };
        let retry = Arc::new(RetryClient::new(retry_config.clone())?);
        let opensearch = OpenSearchClient::new(RetryClient::new(retry_config)?);
        let endpoint = config.endpoint_url.clone();
        Ok(Self {
            opensearch,
            retry,
            endpoint,
            config,
            exclusions,
            catalog: Catalog::new(),
        })
    }

    /// Opens `params.dataset_id` as a virtual Zarr store (§4.9): resolves
    /// the DRS id, aggregates its metadata, fetches every granule covering
    /// the requested time range, and freezes the resulting key space.
    /// Fails if no granule covers the requested time range.
    #[tracing::instrument(skip(self, observers), fields(dataset_id = %params.dataset_id))]
    pub async fn open(
        &mut self,
        params: CubeParams,
        observers: Vec<Box<dyn FetchObserver>>,
    ) -> Result<Dataset, EsaCciError> {
        let resolver = DatasetResolver::with_warnings(
            &self.opensearch,
            &self.retry,
            self.endpoint.clone(),
            self.exclusions.clone(),
            self.config.only_consider_cube_ready,
            self.config.enable_warnings,
        );
        resolver.ensure_known(&mut self.catalog, &params.dataset_id).await?;
        let entry = self
            .catalog
            .get(&params.dataset_id)
            .ok_or_else(|| EsaCciError::NotFound(params.dataset_id.clone()))?
            .clone();

        let aggregator = MetadataAggregator::new(&self.opensearch, &self.retry, self.endpoint.clone());
        let metadata = aggregator.aggregate(&entry).await?;

        let mut granule_index = GranuleIndex::new(entry.parent_id.clone(), params.dataset_id.clone());
        granule_index
            .query(&self.opensearch, &self.endpoint, params.time_range.start, params.time_range.end)
            .await?;
        if granule_index.entries().is_empty() {
            return Err(EsaCciError::granule_unavailable(
                &params.dataset_id,
                "open",
                "no granule covers the requested time range",
            ));
        }

        // The `time`/`time_bnds` coordinate reflects C8's calendar-aligned
        // windows (day/month/year), not the raw per-granule bounds; each
        // window is then matched back to the granule covering it for the
        // fetcher (§4.8, §4.9). The match draws on the index's full fetched
        // entry list rather than `query`'s own strict-bisect result, since a
        // window can legitimately be covered by a granule whose own bounds
        // extend slightly past it.
        let windows = plan_time_ranges(
            &mut granule_index,
            &self.opensearch,
            &self.endpoint,
            &metadata.time_frequency,
            params.time_range.start,
            params.time_range.end,
        )
        .await?;
        let time_slots = build_time_slots(&params.dataset_id, &windows, granule_index.entries())?;
        let first_granule_url = time_slots[0].opendap_url.clone();

        let lat = fetch_coordinate(&self.retry, &first_granule_url, "lat").await?;
        let lon = fetch_coordinate(&self.retry, &first_granule_url, "lon").await?;

        let lat_trim = trim_coord(&lat, params.bbox.min_y, params.bbox.max_y);
        let lon_trim = trim_coord(&lon, params.bbox.min_x, params.bbox.max_x);
        let lat_flipped = is_descending(&lat);
        let lon_flipped = is_descending(&lon);

        let mut arrays: BTreeMap<String, ArraySpec> = BTreeMap::new();
        let mut coord_trim: BTreeMap<String, TrimBounds> = BTreeMap::new();
        let mut coord_flipped: BTreeMap<String, bool> = BTreeMap::new();
        coord_trim.insert("lat".to_string(), lat_trim);
        coord_trim.insert("lon".to_string(), lon_trim);
        coord_flipped.insert("lat".to_string(), lat_flipped);
        coord_flipped.insert("lon".to_string(), lon_flipped);

        arrays.insert(
            "lat".to_string(),
            static_coord_array("lat", exposed_ascending(&lat, lat_trim, lat_flipped), "degrees_north")?,
        );
        arrays.insert(
            "lon".to_string(),
            static_coord_array("lon", exposed_ascending(&lon, lon_trim, lon_flipped), "degrees_east")?,
        );

        let time_values: Vec<f64> = time_slots.iter().map(|s| s.range.midpoint_epoch_seconds()).collect();
        arrays.insert("time".to_string(), static_time_array(&time_values)?);
        let time_bnds: Vec<f64> = time_slots
            .iter()
            .flat_map(|s| [s.range.start.timestamp() as f64, s.range.end.timestamp() as f64])
            .collect();
        arrays.insert(
            "time_bnds".to_string(),
            static_time_bnds_array(time_slots.len(), &time_bnds)?,
        );

        let selected_variables: Vec<&str> = match &params.variable_names {
            Some(names) => names.iter().map(String::as_str).collect(),
            None => metadata.data_variables(),
        };

        for var_name in selected_variables {
            let Some(info) = metadata.variable_infos.get(var_name) else {
                continue;
            };
            let has_time = info.dimensions.first().map(String::as_str) == Some("time");
            let mut dimensions = info.dimensions.clone();
            let mut shape = info.shape.clone();
            let mut file_chunks = info.file_chunk_sizes.clone();
            if !has_time {
                dimensions.insert(0, "time".to_string());
                shape.insert(0, time_slots.len());
                file_chunks.insert(0, 1);
            } else {
                shape[0] = time_slots.len();
                if file_chunks.is_empty() {
                    file_chunks = vec![1; shape.len()];
                }
                file_chunks[0] = 1;
            }
            for (axis, dim) in dimensions.iter().enumerate() {
                if let Some(trim) = coord_trim.get(dim) {
                    shape[axis] = trim.len();
                }
            }

            let chunks = plan_chunks(&file_chunks, &shape, 0);
            arrays.insert(
                var_name.to_string(),
                ArraySpec {
                    name: var_name.to_string(),
                    dtype: info.dtype,
                    dimensions,
                    shape,
                    chunks,
                    fill_value: info.fill_value,
                    attributes: info.attributes.clone(),
                    static_bytes: None,
                },
            );
        }

        let coverage_start = time_slots.first().map(|s| s.range.start);
        let coverage_end = time_slots.last().map(|s| s.range.end);
        let coordinates: Vec<&str> = vec!["time", "time_bnds", "lat", "lon"];
        let zattrs = json!({
            "Conventions": "CF-1.7",
            "title": params.dataset_id,
            "date_created": metadata.attributes.get("date_created"),
            "processing_level": metadata.processing_level,
            "time_coverage_start": coverage_start.map(|t| t.to_rfc3339()),
            "time_coverage_end": coverage_end.map(|t| t.to_rfc3339()),
            "time_coverage_duration": match (coverage_start, coverage_end) {
                (Some(start), Some(end)) => Some(iso8601_duration(end - start)),
                _ => None,
            },
            "coordinates": coordinates,
        });

        Ok(Dataset {
            arrays,
            coord_trim,
            coord_flipped,
            time_slots,
            retry: self.retry.clone(),
            observers,
            zattrs,
        })
    }
}

/// Formats a `chrono::Duration` as an ISO-8601 duration (`PnDTnHnMnS`),
/// matching the `time_coverage_duration` attribute's documented format (§6).
fn iso8601_duration(duration: chrono::Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);
    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;
    format!("P{days}DT{hours}H{minutes}M{seconds}S")
}

/// Matches each planned window to the granule covering it, so the fetcher
/// keeps its one-granule-per-time-chunk lookup while `time`/`time_bnds`
/// themselves reflect C8's calendar windows rather than raw granule bounds
/// (§4.8, §4.9). Windows list is sorted by construction; `granules` is
/// sorted by `t_start` by the caller.
fn build_time_slots(
    dataset_id: &str,
    windows: &[TimeRange],
    granules: &[GranuleEntry],
) -> Result<Vec<TimeSlot>, EsaCciError> {
    windows
        .iter()
        .map(|window| {
            let granule = granules
                .iter()
                .find(|g| TimeRange::new(g.t_start, g.t_end).overlaps(window))
                .ok_or_else(|| {
                    EsaCciError::granule_unavailable(
                        dataset_id,
                        "open",
                        format!("no granule covers the time window {}..{}", window.start, window.end),
                    )
                })?;
            Ok(TimeSlot {
                range: *window,
                opendap_url: granule.opendap_url.clone(),
            })
        })
        .collect()
}

fn is_descending(values: &[f64]) -> bool {
    values.len() >= 2 && values[0] > values[values.len() - 1]
}

/// Slices `coord` to its trim bounds and reverses it if flipped, so the
/// exposed coordinate is always ascending (§4.9, §8).
fn exposed_ascending(coord: &[f64], trim: TrimBounds, flipped: bool) -> Vec<f64> {
    let mut slice = coord[trim.lo..trim.hi].to_vec();
    if flipped {
        slice.reverse();
    }
    slice
}

async fn fetch_coordinate(retry: &RetryClient, opendap_url: &str, name: &str) -> Result<Vec<f64>, EsaCciError> {
    let variable = opendap::open(retry, opendap_url).await?;
    let len = variable
        .variable(name)
        .map(|v| v.size())
        .ok_or_else(|| EsaCciError::metadata_unavailable(opendap_url, format!("no {name} coordinate")))?;
    let array = read(retry, opendap_url, name, &[(0, len)]).await?;
    Ok(to_f64(array))
}

fn to_f64(array: DapArray) -> Vec<f64> {
    match array {
        DapArray::U8(v) => v.into_iter().map(f64::from).collect(),
        DapArray::U16(v) => v.into_iter().map(f64::from).collect(),
        DapArray::U32(v) => v.into_iter().map(f64::from).collect(),
        DapArray::F32(v) => v.into_iter().map(f64::from).collect(),
        DapArray::F64(v) => v,
    }
}

fn static_coord_array(name: &str, values: Vec<f64>, units: &str) -> Result<ArraySpec, EsaCciError> {
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    let compressed = crate::blosc::compress(&bytes, 8)?;
    Ok(ArraySpec {
        name: name.to_string(),
        dtype: opendap::DapDtype::Float64,
        dimensions: vec![name.to_string()],
        shape: vec![values.len()],
        chunks: vec![values.len().max(1)],
        fill_value: None,
        attributes: BTreeMap::from([("units".to_string(), units.to_string())]),
        static_bytes: Some(compressed),
    })
}

fn static_time_array(values: &[f64]) -> Result<ArraySpec, EsaCciError> {
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    let compressed = crate::blosc::compress(&bytes, 8)?;
    Ok(ArraySpec {
        name: "time".to_string(),
        dtype: opendap::DapDtype::Float64,
        dimensions: vec!["time".to_string()],
        shape: vec![values.len()],
        chunks: vec![values.len().max(1)],
        fill_value: None,
        attributes: BTreeMap::from([
            ("units".to_string(), TIME_UNITS.to_string()),
            ("calendar".to_string(), TIME_CALENDAR.to_string()),
            ("standard_name".to_string(), "time".to_string()),
            ("bounds".to_string(), "time_bnds".to_string()),
        ]),
        static_bytes: Some(compressed),
    })
}

fn static_time_bnds_array(num_steps: usize, flat_bounds: &[f64]) -> Result<ArraySpec, EsaCciError> {
    let bytes: Vec<u8> = flat_bounds.iter().flat_map(|v| v.to_le_bytes()).collect();
    let compressed = crate::blosc::compress(&bytes, 8)?;
    Ok(ArraySpec {
        name: "time_bnds".to_string(),
        dtype: opendap::DapDtype::Float64,
        dimensions: vec!["time".to_string(), "bnds".to_string()],
        shape: vec![num_steps, 2],
        chunks: vec![num_steps.max(1), 2],
        fill_value: None,
        attributes: BTreeMap::from([("units".to_string(), TIME_UNITS.to_string())]),
        static_bytes: Some(compressed),
    })
}

/// An opened dataset's frozen Zarr v2 key space: everything needed to
/// answer `enumerate`/`fetch-by-key` without consulting the catalog or
/// metadata aggregator again (§9 "dynamic metadata -> static schema").
pub struct Dataset {
    arrays: BTreeMap<String, ArraySpec>,
    coord_trim: BTreeMap<String, TrimBounds>,
    coord_flipped: BTreeMap<String, bool>,
    time_slots: Vec<TimeSlot>,
    retry: Arc<RetryClient>,
    observers: Vec<Box<dyn FetchObserver>>,
    zattrs: Value,
}

impl Dataset {
    pub fn arrays(&self) -> &BTreeMap<String, ArraySpec> {
        &self.arrays
    }

    /// Every key this store currently answers for: `.zgroup`, `.zattrs`,
    /// each array's `.zarray`/`.zattrs`, and every one of its chunk keys
    /// (§4.9 "`<var>/<i0>.<i1>.…`").
    pub fn keys(&self) -> Vec<String> {
        let mut keys = vec![".zgroup".to_string(), ".zattrs".to_string()];
        for (name, spec) in &self.arrays {
            keys.push(format!("{name}/.zarray"));
            keys.push(format!("{name}/.zattrs"));
            for suffix in chunk_suffixes(&spec.num_chunks_per_axis()) {
                keys.push(format!("{name}/{suffix}"));
            }
        }
        keys
    }

    pub fn contains_key(&self, key: &str) -> bool {
        if key == ".zgroup" || key == ".zattrs" {
            return true;
        }
        let Some((name, suffix)) = key.split_once('/') else {
            return false;
        };
        let Some(spec) = self.arrays.get(name) else {
            return false;
        };
        if suffix == ".zarray" || suffix == ".zattrs" {
            return true;
        }
        crate::fetcher::parse_chunk_suffix(suffix)
            .map(|index| chunk_index_in_range(&index, &spec.num_chunks_per_axis()))
            .unwrap_or(false)
    }

    /// Fetches one key's bytes (§4.9, §4.11). Data-variable chunk keys
    /// trigger a live OPeNDAP request; every other key is served from the
    /// frozen schema or an embedded static buffer.
    #[tracing::instrument(skip(self), fields(key = %key))]
    pub async fn get(&self, key: &str) -> Result<Vec<u8>, EsaCciError> {
        if key == ".zgroup" {
            return Ok(serde_json::to_vec(&json!({ "zarr_format": 2 }))?);
        }
        if key == ".zattrs" {
            return Ok(serde_json::to_vec(&self.zattrs)?);
        }
        let (name, suffix) = key
            .split_once('/')
            .ok_or_else(|| EsaCciError::NotFound(key.to_string()))?;
        let spec = self
            .arrays
            .get(name)
            .ok_or_else(|| EsaCciError::NotFound(key.to_string()))?;

        if suffix == ".zarray" {
            return Ok(serde_json::to_vec(&spec.zarray_json())?);
        }
        if suffix == ".zattrs" {
            return Ok(serde_json::to_vec(&spec.zattrs_json())?);
        }

        let chunk_index = crate::fetcher::parse_chunk_suffix(suffix)
            .ok_or_else(|| EsaCciError::NotFound(key.to_string()))?;

        if let Some(bytes) = &spec.static_bytes {
            return Ok(bytes.clone());
        }

        let time_axis = spec
            .dimensions
            .iter()
            .position(|d| d == "time")
            .unwrap_or(0);
        let axis_trim: Vec<TrimBounds> = spec
            .dimensions
            .iter()
            .enumerate()
            .map(|(i, d)| {
                self.coord_trim
                    .get(d)
                    .copied()
                    .unwrap_or(TrimBounds { lo: 0, hi: spec.shape[i] })
            })
            .collect();
        let flipped: Vec<bool> = spec
            .dimensions
            .iter()
            .map(|d| self.coord_flipped.get(d).copied().unwrap_or(false))
            .collect();

        fetch_chunk(
            &self.retry,
            &self.time_slots,
            spec,
            time_axis,
            &axis_trim,
            &flipped,
            &chunk_index,
            &self.observers,
        )
        .await
    }

    /// This store is read-only (§7, §8): any attempted mutation raises.
    pub fn set(&mut self, key: &str) -> Result<(), EsaCciError> {
        Err(EsaCciError::ReadOnly { operation: "set", key: key.to_string() })
    }

    pub fn delete(&mut self, key: &str) -> Result<(), EsaCciError> {
        Err(EsaCciError::ReadOnly { operation: "delete", key: key.to_string() })
    }
}

fn chunk_suffixes(num_chunks_per_axis: &[usize]) -> Vec<String> {
    let mut out = vec![Vec::new()];
    for &n in num_chunks_per_axis {
        let mut next = Vec::with_capacity(out.len() * n.max(1));
        for prefix in &out {
            for i in 0..n.max(1) {
                let mut p = prefix.clone();
                p.push(i.to_string());
                next.push(p);
            }
        }
        out = next;
    }
    out.into_iter().map(|parts| parts.join(".")).collect()
}

fn chunk_index_in_range(index: &[usize], num_chunks_per_axis: &[usize]) -> bool {
    index.len() == num_chunks_per_axis.len()
        && index.iter().zip(num_chunks_per_axis).all(|(&i, &n)| i < n.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use esa_common::config::{CubeParamsBuilder, StoreConfigBuilder};
    use httpmock::MockServer;

    /// A single-variable `.dods` payload, distinct from
    /// `test_fixtures::sample_dods_payload()`: `decode_dods_response` decodes
    /// strictly using the first variable declared in the response's own DDS
    /// text, so a `lat`/`lon` hyperslab mock cannot reuse a payload whose
    /// first declared variable is `analysed_sst`.
    fn coord_dods_payload(name: &str, values: &[f64]) -> Vec<u8> {
        let dds = format!("Dataset {{\n    Float64 {name}[{name} = {}];\n}} granule;\n", values.len());
        let mut body = Vec::new();
        test_fixtures::generators::encode_dap_array_f64(&mut body, values);
        let mut payload = Vec::with_capacity(dds.len() + 7 + body.len());
        payload.extend_from_slice(dds.as_bytes());
        payload.extend_from_slice(b"\nData:\n");
        payload.extend_from_slice(&body);
        payload
    }

    #[tokio::test]
    async fn opens_a_monthly_dataset_across_the_requested_range_into_calendar_aligned_windows() {
        let server = MockServer::start_async().await;
        let drs_id = test_fixtures::SAMPLE_DRS_IDS[0];

        // DatasetResolver::ensure_known's catalog-wide lookup.
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET)
                    .query_param("parentIdentifier", "cci")
                    .query_param("drsId", drs_id);
                then.status(200).json_body(json!({
                    "properties": { "totalResults": 1 },
                    "features": [ {
                        "id": "parent-1",
                        "properties": { "drsIds": [drs_id] },
                        "links": []
                    } ]
                }));
            })
            .await;

        // MetadataAggregator::aggregate's first-granule probe.
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET)
                    .query_param("parentIdentifier", "parent-1")
                    .query_param("drsId", drs_id)
                    .query_param("maximumRecords", "1");
                then.status(200).json_body(json!({
                    "properties": { "totalResults": 1 },
                    "features": [ {
                        "id": "agg-granule",
                        "properties": {},
                        "links": [ { "href": format!("{}/agg-granule", server.base_url()), "rel": "via", "title": "Opendap" } ]
                    } ]
                }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET).path("/agg-granule.dds");
                then.status(200).body(test_fixtures::SAMPLE_DDS);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET).path("/agg-granule.das");
                then.status(200).body(test_fixtures::SAMPLE_DAS);
            })
            .await;

        // GranuleIndex::query's range fetch, returning one granule per
        // calendar month, each bounded exactly at the month it covers.
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET)
                    .query_param("parentIdentifier", "parent-1")
                    .query_param("drsId", drs_id)
                    .query_param_exists("startDate")
                    .query_param_exists("endDate");
                then.status(200).json_body(json!({
                    "properties": { "totalResults": 4 },
                    "features": [
                        {
                            "id": "g1",
                            "properties": { "date": "2010-02-01T00:00:00Z/2010-03-01T00:00:00Z" },
                            "links": [ { "href": format!("{}/g1", server.base_url()), "rel": "via", "title": "Opendap" } ]
                        },
                        {
                            "id": "g2",
                            "properties": { "date": "2010-03-01T00:00:00Z/2010-04-01T00:00:00Z" },
                            "links": [ { "href": format!("{}/g2", server.base_url()), "rel": "via", "title": "Opendap" } ]
                        },
                        {
                            "id": "g3",
                            "properties": { "date": "2010-04-01T00:00:00Z/2010-05-01T00:00:00Z" },
                            "links": [ { "href": format!("{}/g3", server.base_url()), "rel": "via", "title": "Opendap" } ]
                        },
                        {
                            "id": "g4",
                            "properties": { "date": "2010-05-01T00:00:00Z/2010-06-01T00:00:00Z" },
                            "links": [ { "href": format!("{}/g4", server.base_url()), "rel": "via", "title": "Opendap" } ]
                        }
                    ]
                }));
            })
            .await;

        // The store's lat/lon coordinate fetch, against the first window's
        // matched granule (`g1`).
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET).path("/g1.dds");
                then.status(200).body(test_fixtures::SAMPLE_DDS);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET).path("/g1.das");
                then.status(200).body(test_fixtures::SAMPLE_DAS);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET)
                    .path("/g1.dods")
                    .query_param_exists("lat[0:1:2]");
                then.status(200).body(coord_dods_payload("lat", &[40.0, 41.0, 42.0]));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET)
                    .path("/g1.dods")
                    .query_param_exists("lon[0:1:3]");
                then.status(200).body(coord_dods_payload("lon", &[-10.0, -9.0, -8.0, -7.0]));
            })
            .await;

        let config = StoreConfigBuilder::new().endpoint_url(server.base_url()).build().unwrap();
        let mut store = Store::new(config, ExclusionLists::default()).unwrap();
        let params = CubeParamsBuilder::new()
            .dataset_id(drs_id)
            .time_range_str("2010-02-10T00:00:00", "2010-05-20T00:00:00")
            .unwrap()
            .build()
            .unwrap();

        let dataset = store.open(params, Vec::new()).await.unwrap();

        assert_eq!(dataset.time_slots.len(), 4);
        assert_eq!(
            dataset.time_slots.iter().map(|s| s.range.start.format("%Y-%m-%d").to_string()).collect::<Vec<_>>(),
            vec!["2010-02-01", "2010-03-01", "2010-04-01", "2010-05-01"]
        );
        assert_eq!(
            dataset.time_slots.iter().map(|s| s.range.end.format("%Y-%m-%d").to_string()).collect::<Vec<_>>(),
            vec!["2010-03-01", "2010-04-01", "2010-05-01", "2010-06-01"]
        );
        assert_eq!(
            dataset.time_slots.iter().map(|s| s.opendap_url.clone()).collect::<Vec<_>>(),
            vec![
                format!("{}/g1", server.base_url()),
                format!("{}/g2", server.base_url()),
                format!("{}/g3", server.base_url()),
                format!("{}/g4", server.base_url()),
            ]
        );

        let time_array = dataset.arrays().get("time").unwrap();
        assert_eq!(time_array.shape, vec![4]);
        let time_bnds_array = dataset.arrays().get("time_bnds").unwrap();
        assert_eq!(time_bnds_array.shape, vec![4, 2]);
    }

    #[test]
    fn chunk_suffixes_enumerates_the_cartesian_product() {
        let suffixes = chunk_suffixes(&[2, 1]);
        assert_eq!(suffixes, vec!["0.0".to_string(), "1.0".to_string()]);
    }

    #[test]
    fn chunk_index_in_range_rejects_out_of_bounds() {
        assert!(chunk_index_in_range(&[1, 2], &[2, 3]));
        assert!(!chunk_index_in_range(&[2, 2], &[2, 3]));
    }

    #[test]
    fn exposed_ascending_reverses_only_when_flipped() {
        let coord = vec![80.0, 40.0, 10.0, 0.0, -10.0, -40.0, -80.0];
        let trim = TrimBounds { lo: 2, hi: 5 };
        let exposed = exposed_ascending(&coord, trim, true);
        assert_eq!(exposed, vec![-10.0, 0.0, 10.0]);
    }
}
