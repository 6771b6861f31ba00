//! Metadata aggregator (C6): merges the DRS id's own facet decomposition,
//! the dataset's descxml document, and its first granule's OPeNDAP schema
//! into one frozen record.

use std::collections::BTreeMap;

use esa_common::{BoundingBox, EsaCciError};
use opendap::{DapDtype, Variable as OpendapVariable};
use opensearch::{OpenSearchClient, OpenSearchQuery};
use retry_client::RetryClient;

use crate::resolver::CatalogEntry;

/// A variable's merged shape, dtype and attributes (§3 `variable_infos`).
#[derive(Debug, Clone)]
pub struct VariableInfo {
    pub dtype: DapDtype,
    pub dimensions: Vec<String>,
    pub shape: Vec<usize>,
    pub size: usize,
    pub file_chunk_sizes: Vec<usize>,
    pub fill_value: Option<f64>,
    pub attributes: BTreeMap<String, String>,
}

/// A catalog-reported variable summary: name plus the two attributes a
/// human-facing listing cares about.
#[derive(Debug, Clone)]
pub struct VariableSummary {
    pub name: String,
    pub units: Option<String>,
    pub long_name: Option<String>,
}

/// Names never offered as data variables by [`DatasetMetadata::data_variables`]:
/// coordinate and bounds variables in the fixed vocabulary (§4.6).
const COORDINATE_LIKE_NAMES: &[&str] = &[
    "time",
    "time_bnds",
    "lat",
    "lon",
    "latitude",
    "longitude",
    "lat_bnds",
    "lon_bnds",
    "layers",
    "view",
];

fn is_coordinate_like(name: &str) -> bool {
    COORDINATE_LIKE_NAMES.contains(&name)
        || (name.contains("hist") && (name.ends_with("_bin_centre") || name.ends_with("_bin_border")))
}

/// Threshold below which a scalar string variable is folded into global
/// attributes instead of exposed as a data variable (§4.6): `512^2`.
const SCALAR_STRING_PROMOTION_THRESHOLD: usize = 512 * 512;

#[derive(Debug, Clone)]
pub struct DatasetMetadata {
    pub dims: BTreeMap<String, usize>,
    pub variable_infos: BTreeMap<String, VariableInfo>,
    pub attributes: BTreeMap<String, String>,
    pub variables: Vec<VariableSummary>,
    pub bbox: BoundingBox,
    pub spatial_resolution: Option<f64>,
    pub temporal_coverage: Option<(String, String)>,
    pub time_dimension_size: usize,
    pub ecv: String,
    pub time_frequency: String,
    pub processing_level: String,
    pub data_type: String,
    pub sensor_id: String,
    pub platform_id: String,
    pub product_string: String,
    pub product_version: String,
}

impl DatasetMetadata {
    /// Variables selected by `describe` (§4.6): drop the fixed coordinate
    /// vocabulary and anything with zero dimensions or a non-numeric dtype.
    pub fn data_variables(&self) -> Vec<&str> {
        self.variable_infos
            .iter()
            .filter(|(name, info)| {
                !is_coordinate_like(name)
                    && !info.dimensions.is_empty()
                    && !matches!(info.dtype, DapDtype::Str)
            })
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

pub struct MetadataAggregator<'a> {
    opensearch: &'a OpenSearchClient,
    retry: &'a RetryClient,
    endpoint: String,
}

impl<'a> MetadataAggregator<'a> {
    pub fn new(opensearch: &'a OpenSearchClient, retry: &'a RetryClient, endpoint: impl Into<String>) -> Self {
        Self {
            opensearch,
            retry,
            endpoint: endpoint.into(),
        }
    }

    /// Aggregates metadata for one resolved catalog entry (§4.6): fetches
    /// the first granule with `maximumRecords=1`, opens its OPeNDAP schema,
    /// and merges it with the entry's DRS-derived facets and descxml.
    pub async fn aggregate(&self, entry: &CatalogEntry) -> Result<DatasetMetadata, EsaCciError> {
        let query = OpenSearchQuery::new()
            .with("parentIdentifier", entry.parent_id.as_str())
            .with("drsId", entry.drs_id_str.as_str())
            .maximum_records(1);

        let mut features = Vec::new();
        let total_results = self
            .opensearch
            .list(&self.endpoint, &query, &mut features, |acc, fs| acc.extend(fs))
            .await?;

        let first = features.first().ok_or_else(|| {
            EsaCciError::granule_unavailable(entry.drs_id_str.as_str(), "first granule lookup", "no granules returned")
        })?;
        let opendap_url = first.opendap_link().ok_or_else(|| {
            EsaCciError::granule_unavailable(entry.drs_id_str.as_str(), "first granule", "feature has no Opendap link")
        })?;

        let dataset = opendap::open(self.retry, opendap_url).await?;

        let dims = derive_dims(&dataset.variables);
        let variable_infos = dataset
            .variables
            .iter()
            .map(|v| (v.name.clone(), variable_info(v)))
            .collect();
        let variables = dataset.variables.iter().map(variable_summary).collect();

        let time_len = dataset.variable("time").map(|v| v.size()).unwrap_or(1);
        let time_dimension_size = total_results as usize * time_len;

        let descxml = entry.descxml.clone().unwrap_or_default();
        let bbox = descxml
            .bbox
            .and_then(|(min_x, min_y, max_x, max_y)| BoundingBox::new(min_x, min_y, max_x, max_y).ok())
            .unwrap_or(BoundingBox::WHOLE_EARTH);
        let spatial_resolution = dims
            .get("lon")
            .filter(|&&n| n > 1)
            .map(|&n| bbox.width() / n as f64);

        Ok(DatasetMetadata {
            dims,
            variable_infos,
            attributes: dataset.global_attributes.clone(),
            variables,
            bbox,
            spatial_resolution,
            temporal_coverage: descxml.temporal_coverage,
            time_dimension_size,
            ecv: entry.drs_id.ecv.clone(),
            time_frequency: entry.drs_id.frequency.clone(),
            processing_level: entry.drs_id.level.clone(),
            data_type: entry.drs_id.kind.clone(),
            sensor_id: entry.drs_id.sensor.clone(),
            platform_id: entry.drs_id.platform.clone(),
            product_string: entry.drs_id.product.clone(),
            product_version: entry.drs_id.version.clone(),
        })
    }
}

/// Derives `dims` as the union of all dimensions referenced by any
/// variable. A dimension that is not itself a variable takes its size from
/// whichever variable uses it; a `_bnds` variable's trailing, otherwise
/// undeclared dimension always contributes size 2 (§4.6).
fn derive_dims(variables: &[OpendapVariable]) -> BTreeMap<String, usize> {
    let mut dims = BTreeMap::new();
    for var in variables {
        for (dim_name, &len) in var.dimensions.iter().zip(&var.shape) {
            dims.entry(dim_name.clone()).or_insert(len);
        }
    }
    for var in variables {
        if var.name.ends_with("_bnds") {
            if let Some(last_dim) = var.dimensions.last() {
                if !variables.iter().any(|v| &v.name == last_dim) {
                    dims.insert(last_dim.clone(), 2);
                }
            }
        }
    }
    dims
}

fn variable_info(var: &OpendapVariable) -> VariableInfo {
    VariableInfo {
        dtype: var.dtype,
        dimensions: var.dimensions.clone(),
        shape: var.shape.clone(),
        size: var.size(),
        file_chunk_sizes: var.chunk_sizes().unwrap_or_else(|| var.shape.clone()),
        fill_value: var.fill_value(),
        attributes: var.attributes.clone(),
    }
}

fn variable_summary(var: &OpendapVariable) -> VariableSummary {
    VariableSummary {
        name: var.name.clone(),
        units: var.attributes.get("units").cloned(),
        long_name: var.attributes.get("long_name").cloned(),
    }
}

/// Folds small scalar-string variables into global attributes rather than
/// exposing them as data variables (§4.6). Called by the virtual Zarr
/// store once it decides which variables to materialise; kept here since
/// it only needs a `VariableInfo`, not any store state.
pub fn should_promote_to_attribute(info: &VariableInfo) -> bool {
    matches!(info.dtype, DapDtype::Str) && info.size < SCALAR_STRING_PROMOTION_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::CatalogEntry;
    use descriptor_docs::DescXmlMeta;
    use esa_common::DrsId;
    use httpmock::MockServer;
    use retry_client::RetryClientConfig;
    use serde_json::json;

    fn retry() -> RetryClient {
        RetryClient::new(RetryClientConfig::default()).unwrap()
    }

    fn entry(parent_id: &str, descxml: Option<DescXmlMeta>) -> CatalogEntry {
        CatalogEntry {
            drs_id_str: test_fixtures::SAMPLE_DRS_IDS[0].to_string(),
            drs_id: test_fixtures::SAMPLE_DRS_IDS[0].parse::<DrsId>().unwrap(),
            parent_id: parent_id.to_string(),
            descxml,
        }
    }

    #[tokio::test]
    async fn aggregates_dims_variables_and_facets_from_first_granule() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET)
                    .query_param("drsId", test_fixtures::SAMPLE_DRS_IDS[0]);
                then.status(200).json_body(json!({
                    "properties": { "totalResults": 3 },
                    "features": [ {
                        "id": "granule-1",
                        "properties": {},
                        "links": [ { "href": format!("{}/granule", server.base_url()), "rel": "via", "title": "Opendap" } ]
                    } ]
                }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET).path("/granule.dds");
                then.status(200).body(test_fixtures::SAMPLE_DDS);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET).path("/granule.das");
                then.status(200).body(test_fixtures::SAMPLE_DAS);
            })
            .await;

        let opensearch = OpenSearchClient::new(retry());
        let retry = retry();
        let aggregator = MetadataAggregator::new(&opensearch, &retry, server.base_url());

        let meta = aggregator
            .aggregate(&entry("parent-1", None))
            .await
            .unwrap();

        assert_eq!(meta.dims.get("time"), Some(&2));
        assert_eq!(meta.dims.get("lat"), Some(&3));
        assert_eq!(meta.dims.get("lon"), Some(&4));
        assert_eq!(meta.time_dimension_size, 3 * 2);
        assert_eq!(meta.ecv, "OZONE");
        assert!(meta.variable_infos.contains_key("analysed_sst"));
        assert!(meta.data_variables().contains(&"analysed_sst"));
        assert!(!meta.data_variables().contains(&"time"));
    }

    #[tokio::test]
    async fn errors_when_no_granule_has_an_opendap_link() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET);
                then.status(200).json_body(json!({
                    "properties": { "totalResults": 1 },
                    "features": [ { "id": "granule-1", "properties": {}, "links": [] } ]
                }));
            })
            .await;

        let opensearch = OpenSearchClient::new(retry());
        let retry = retry();
        let aggregator = MetadataAggregator::new(&opensearch, &retry, server.base_url());

        let err = aggregator
            .aggregate(&entry("parent-1", None))
            .await
            .unwrap_err();
        assert!(matches!(err, EsaCciError::GranuleUnavailable { .. }));
    }

    #[test]
    fn bnds_variable_contributes_a_paired_dimension_of_size_two() {
        let vars = vec![
            OpendapVariable {
                name: "lat".to_string(),
                dtype: DapDtype::Float64,
                dimensions: vec!["lat".to_string()],
                shape: vec![3],
                attributes: BTreeMap::new(),
            },
            OpendapVariable {
                name: "lat_bnds".to_string(),
                dtype: DapDtype::Float64,
                dimensions: vec!["lat".to_string(), "bnds".to_string()],
                shape: vec![3, 2],
                attributes: BTreeMap::new(),
            },
        ];
        let dims = derive_dims(&vars);
        assert_eq!(dims.get("bnds"), Some(&2));
    }

    #[test]
    fn small_scalar_string_is_promoted_to_attribute() {
        let info = VariableInfo {
            dtype: DapDtype::Str,
            dimensions: vec![],
            shape: vec![],
            size: 1,
            file_chunk_sizes: vec![],
            fill_value: None,
            attributes: BTreeMap::new(),
        };
        assert!(should_promote_to_attribute(&info));
    }
}
