//! Search/describe facade (C12): filter the known dataset ids by DRS
//! component facets, deepen the filter against resolved metadata when a
//! geospatial or sensor/platform/institute facet is supplied, and render a
//! human-readable title for a single dataset (§4.12).

use std::str::FromStr;

use catalog::{Catalog, CatalogEntry, MetadataAggregator};
use esa_common::bbox::BoundingBox;
use esa_common::drs::{normalize_frequency, DrsId};
use esa_common::time::parse_iso8601;
use esa_common::EsaCciError;
use opensearch::OpenSearchClient;
use retry_client::RetryClient;

/// Facet filter accepted by [`search`] (§6 "Search facet domain"). The first
/// six fields are cheap DRS-component equality checks; the rest require a
/// resolved metadata record and are only consulted when set.
#[derive(Debug, Clone, Default)]
pub struct SearchFacets {
    pub ecv: Option<String>,
    pub frequency: Option<String>,
    pub processing_level: Option<String>,
    pub data_type: Option<String>,
    pub product_string: Option<String>,
    pub product_version: Option<String>,
    pub institute: Option<String>,
    pub sensor: Option<String>,
    pub platform: Option<String>,
    pub bbox: Option<BoundingBox>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl SearchFacets {
    fn needs_metadata_resolution(&self) -> bool {
        self.institute.is_some()
            || self.sensor.is_some()
            || self.platform.is_some()
            || self.bbox.is_some()
            || self.start_date.is_some()
            || self.end_date.is_some()
    }

    fn matches_drs_components(&self, id: &DrsId) -> bool {
        self.ecv.as_deref().map_or(true, |v| v == id.ecv)
            && self
                .frequency
                .as_deref()
                .map_or(true, |v| normalize_frequency(v) == id.frequency)
            && self.processing_level.as_deref().map_or(true, |v| v == id.level)
            && self.data_type.as_deref().map_or(true, |v| v == id.kind)
            && self.product_string.as_deref().map_or(true, |v| v == id.product)
            && self.product_version.as_deref().map_or(true, |v| v == id.version)
    }
}

/// Filters every dataset id the catalog currently knows about by `facets`
/// (§4.12). DRS-component equality is checked first with no I/O; only if a
/// metadata-backed facet is set does each surviving candidate get its
/// aggregated record resolved (C5+C6) for the deeper filter.
pub async fn search(
    catalog: &Catalog,
    opensearch: &OpenSearchClient,
    retry: &RetryClient,
    endpoint: &str,
    facets: &SearchFacets,
) -> Result<Vec<String>, EsaCciError> {
    let mut candidates: Vec<(String, CatalogEntry)> = Vec::new();
    for drs_id_str in catalog.drs_ids() {
        let Ok(id) = DrsId::from_str(drs_id_str) else {
            continue;
        };
        if !facets.matches_drs_components(&id) {
            continue;
        }
        if let Some(entry) = catalog.get(drs_id_str) {
            candidates.push((drs_id_str.to_string(), entry.clone()));
        }
    }

    if !facets.needs_metadata_resolution() {
        return Ok(candidates.into_iter().map(|(id, _)| id).collect());
    }

    let aggregator = MetadataAggregator::new(opensearch, retry, endpoint.to_string());
    let mut matched = Vec::new();
    for (dataset_id, entry) in candidates {
        let metadata = aggregator.aggregate(&entry).await?;

        if let Some(institute) = &facets.institute {
            if metadata.attributes.get("institution").map(String::as_str) != Some(institute.as_str()) {
                continue;
            }
        }
        if let Some(sensor) = &facets.sensor {
            if &metadata.sensor_id != sensor {
                continue;
            }
        }
        if let Some(platform) = &facets.platform {
            if &metadata.platform_id != platform {
                continue;
            }
        }
        if let Some(bbox) = &facets.bbox {
            if !metadata.bbox.intersects(bbox) {
                continue;
            }
        }
        if let Some(start) = &facets.start_date {
            if !covers_start(&metadata.temporal_coverage, start) {
                continue;
            }
        }
        if let Some(end) = &facets.end_date {
            if !covers_end(&metadata.temporal_coverage, end) {
                continue;
            }
        }

        matched.push(dataset_id);
    }
    Ok(matched)
}

fn covers_start(coverage: &Option<(String, String)>, requested_start: &str) -> bool {
    let Some((_, coverage_end)) = coverage else {
        return true;
    };
    match (parse_iso8601(requested_start), parse_iso8601(coverage_end)) {
        (Ok(requested), Ok(end)) => end >= requested,
        _ => true,
    }
}

fn covers_end(coverage: &Option<(String, String)>, requested_end: &str) -> bool {
    let Some((coverage_start, _)) = coverage else {
        return true;
    };
    match (parse_iso8601(requested_end), parse_iso8601(coverage_start)) {
        (Ok(requested), Ok(start)) => start <= requested,
        _ => true,
    }
}

/// Maps a normalised frequency token to the adjective `describe` embeds in
/// its synthesised title (§4.12, §6 "Search facet domain").
fn frequency_adjective(frequency: &str) -> String {
    match normalize_frequency(frequency).as_str() {
        "day" => "daily".to_string(),
        "month" => "monthly".to_string(),
        "year" => "yearly".to_string(),
        "5-days" => "5-day".to_string(),
        "8-days" => "8-day".to_string(),
        "15-days" => "15-day".to_string(),
        "13-yrs" => "13-year".to_string(),
        "5-years" | "5 years" => "5-year".to_string(),
        "satellite-orbit-frequency" => "orbit-frequency".to_string(),
        "climatology" => "climatological".to_string(),
        other => other.to_string(),
    }
}

/// An aggregated dataset record plus the human-readable title `describe`
/// synthesises from its DRS components (§4.12).
#[derive(Debug, Clone)]
pub struct DatasetDescription {
    pub dataset_id: String,
    pub title: String,
    pub metadata: catalog::DatasetMetadata,
}

/// Resolves `dataset_id`'s DRS id and aggregated metadata, and renders the
/// title `"<ECV> CCI: <freq-adjective> <sensor> <level> <product> <type>,
/// v<version>"` (§4.12).
pub async fn describe(
    catalog: &Catalog,
    opensearch: &OpenSearchClient,
    retry: &RetryClient,
    endpoint: &str,
    dataset_id: &str,
) -> Result<DatasetDescription, EsaCciError> {
    let id = DrsId::from_str(dataset_id)
        .map_err(|e| EsaCciError::InvalidArgument(format!("'{dataset_id}' is not a valid DRS id: {e}")))?;
    let entry = catalog
        .get(dataset_id)
        .ok_or_else(|| EsaCciError::NotFound(dataset_id.to_string()))?
        .clone();

    let aggregator = MetadataAggregator::new(opensearch, retry, endpoint.to_string());
    let metadata = aggregator.aggregate(&entry).await?;

    let title = format!(
        "{} CCI: {} {} {} {} {}, v{}",
        id.ecv,
        frequency_adjective(&id.frequency),
        id.sensor,
        id.level,
        id.product,
        id.kind,
        id.version
    );

    Ok(DatasetDescription {
        dataset_id: dataset_id.to_string(),
        title,
        metadata,
    })
}
