//! Store configuration (§6) and open-time cube parameters (§3).

use crate::bbox::BoundingBox;
use crate::error::EsaCciError;
use crate::time::{parse_iso8601, TimeRange};
use chrono::{DateTime, Utc};

pub const DEFAULT_OPENSEARCH_URL: &str = "http://opensearch-test.ceda.ac.uk/opensearch/request";
pub const DEFAULT_ODD_URL: &str =
    "http://opensearch-test.ceda.ac.uk/opensearch/description.xml?parentIdentifier=cci";
pub const DEFAULT_NUM_RETRIES: u32 = 200;
pub const DEFAULT_RETRY_BACKOFF_MAX_MS: u64 = 40;
pub const DEFAULT_RETRY_BACKOFF_BASE: f64 = 1.001;
pub const DEFAULT_CRS: &str = "http://www.opengis.net/def/crs/EPSG/0/4326";
pub const COORD_MATERIALISE_THRESHOLD: usize = 1_048_576;
pub const CHUNK_ELEMENT_BUDGET: usize = 1_000_000;

/// Recognised store-wide options (§6 "Config").
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub endpoint_url: String,
    pub endpoint_description_url: String,
    pub enable_warnings: bool,
    pub num_retries: u32,
    pub retry_backoff_max_ms: u64,
    pub retry_backoff_base: f64,
    pub only_consider_cube_ready: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_OPENSEARCH_URL.to_string(),
            endpoint_description_url: DEFAULT_ODD_URL.to_string(),
            enable_warnings: false,
            num_retries: DEFAULT_NUM_RETRIES,
            retry_backoff_max_ms: DEFAULT_RETRY_BACKOFF_MAX_MS,
            retry_backoff_base: DEFAULT_RETRY_BACKOFF_BASE,
            only_consider_cube_ready: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct StoreConfigBuilder {
    config: StoreConfig,
}

impl StoreConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: StoreConfig::default(),
        }
    }

    pub fn endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint_url = url.into();
        self
    }

    pub fn endpoint_description_url(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint_description_url = url.into();
        self
    }

    pub fn enable_warnings(mut self, enable: bool) -> Self {
        self.config.enable_warnings = enable;
        self
    }

    pub fn num_retries(mut self, n: u32) -> Self {
        self.config.num_retries = n;
        self
    }

    pub fn retry_backoff_max_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_max_ms = ms;
        self
    }

    pub fn retry_backoff_base(mut self, base: f64) -> Self {
        self.config.retry_backoff_base = base;
        self
    }

    pub fn only_consider_cube_ready(mut self, only: bool) -> Self {
        self.config.only_consider_cube_ready = only;
        self
    }

    pub fn build(self) -> Result<StoreConfig, EsaCciError> {
        if self.config.retry_backoff_base <= 1.0 {
            return Err(EsaCciError::InvalidArgument(format!(
                "retry_backoff_base must be > 1.0, got {}",
                self.config.retry_backoff_base
            )));
        }
        if self.config.endpoint_url.is_empty() {
            return Err(EsaCciError::InvalidArgument(
                "endpoint_url must not be empty".to_string(),
            ));
        }
        Ok(self.config)
    }
}

/// Open-time parameters for a single dataset cube, validated the way the
/// source project's `CubeConfig` validates itself: missing mandatory fields
/// are rejected eagerly, never silently defaulted past what §3 allows.
#[derive(Debug, Clone)]
pub struct CubeParams {
    pub dataset_id: String,
    pub variable_names: Option<Vec<String>>,
    pub bbox: BoundingBox,
    pub time_range: TimeRange,
    pub crs: String,
}

#[derive(Debug, Default)]
pub struct CubeParamsBuilder {
    dataset_id: Option<String>,
    variable_names: Option<Vec<String>>,
    bbox: Option<BoundingBox>,
    time_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    crs: Option<String>,
}

impl CubeParamsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dataset_id(mut self, id: impl Into<String>) -> Self {
        self.dataset_id = Some(id.into());
        self
    }

    pub fn variable_names(mut self, names: Vec<String>) -> Self {
        self.variable_names = Some(names);
        self
    }

    pub fn bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    /// A single timestamp broadcasts to a zero-width `(t, t)` range, matching
    /// the source project's `CubeConfig` time-range normalisation.
    pub fn time_range_str(mut self, start: &str, end: &str) -> Result<Self, EsaCciError> {
        let start_dt = parse_iso8601(start)
            .map_err(|e| EsaCciError::InvalidArgument(format!("invalid start time: {e}")))?;
        let end_dt = if end.is_empty() || end == start {
            start_dt
        } else {
            parse_iso8601(end)
                .map_err(|e| EsaCciError::InvalidArgument(format!("invalid end time: {e}")))?
        };
        self.time_range = Some((start_dt, end_dt));
        Ok(self)
    }

    pub fn crs(mut self, crs: impl Into<String>) -> Self {
        self.crs = Some(crs.into());
        self
    }

    pub fn build(self) -> Result<CubeParams, EsaCciError> {
        let dataset_id = self
            .dataset_id
            .ok_or_else(|| EsaCciError::InvalidArgument("dataset_name must be given".to_string()))?;
        let (start, end) = self
            .time_range
            .ok_or_else(|| EsaCciError::InvalidArgument("time range must be given".to_string()))?;
        let crs = self.crs.unwrap_or_else(|| DEFAULT_CRS.to_string());
        if !is_wgs84_crs(&crs) {
            return Err(EsaCciError::InvalidArgument(format!(
                "unsupported crs '{crs}', only WGS84 is supported"
            )));
        }
        let bbox = self.bbox.unwrap_or(BoundingBox::WHOLE_EARTH);
        Ok(CubeParams {
            dataset_id,
            variable_names: self.variable_names,
            bbox,
            time_range: TimeRange::new(start, end),
            crs,
        })
    }
}

fn is_wgs84_crs(crs: &str) -> bool {
    crs.ends_with("/4326") || crs.ends_with("/WGS84")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_store_config_matches_documented_defaults() {
        let cfg = StoreConfig::default();
        assert_eq!(cfg.num_retries, 200);
        assert_eq!(cfg.retry_backoff_max_ms, 40);
        assert!((cfg.retry_backoff_base - 1.001).abs() < 1e-9);
        assert!(!cfg.enable_warnings);
    }

    #[test]
    fn rejects_non_increasing_backoff_base() {
        let err = StoreConfigBuilder::new()
            .retry_backoff_base(1.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, EsaCciError::InvalidArgument(_)));
    }

    #[test]
    fn cube_params_requires_dataset_id_and_time_range() {
        let err = CubeParamsBuilder::new().build().unwrap_err();
        assert!(matches!(err, EsaCciError::InvalidArgument(_)));

        let err = CubeParamsBuilder::new()
            .dataset_id("esacci.OZONE.mon.L3.NP.a.b.c.d.e")
            .build()
            .unwrap_err();
        assert!(matches!(err, EsaCciError::InvalidArgument(_)));
    }

    #[test]
    fn single_timestamp_broadcasts_to_zero_width_range() {
        let params = CubeParamsBuilder::new()
            .dataset_id("esacci.OZONE.mon.L3.NP.a.b.c.d.e")
            .time_range_str("2010-02-10T00:00:00", "2010-02-10T00:00:00")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(params.time_range.start, params.time_range.end);
    }

    #[test]
    fn rejects_non_wgs84_crs() {
        let err = CubeParamsBuilder::new()
            .dataset_id("x")
            .time_range_str("2010-01-01T00:00:00", "2010-01-02T00:00:00")
            .unwrap()
            .crs("http://www.opengis.net/def/crs/EPSG/0/3857")
            .build()
            .unwrap_err();
        assert!(matches!(err, EsaCciError::InvalidArgument(_)));
    }

    #[test]
    fn defaults_bbox_to_whole_earth() {
        let params = CubeParamsBuilder::new()
            .dataset_id("x")
            .time_range_str("2010-01-01T00:00:00", "2010-01-02T00:00:00")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(params.bbox, BoundingBox::WHOLE_EARTH);
    }
}
