//! Public facade over the virtual Zarr store (C1-C11) plus the
//! search/describe facade (C12): the single entry point external tools use
//! to discover, search and open ESA CCI Open Data Portal datasets.

pub mod search;

use std::sync::Arc;

use catalog::{Catalog, DatasetResolver, ExclusionLists};
use esa_common::config::{CubeParams, StoreConfig};
use esa_common::EsaCciError;
use opensearch::OpenSearchClient;
use retry_client::{RetryClient, RetryClientConfig};

pub use catalog::DatasetMetadata;
pub use esa_common::config::{CubeParamsBuilder, StoreConfigBuilder};
pub use search::{describe, search, DatasetDescription, SearchFacets};
pub use zarr_store::{ArraySpec, Dataset, FetchEvent, FetchObserver, TimeSlot};

/// The bundled dataset exclusion list: ids known to be incomplete or
/// otherwise unsuitable for opening (§9, "product-management artefacts").
const EXCLUDED_DATASETS: &str = include_str!("../data/excluded_datasets.txt");

/// The bundled non-cube dataset list: valid DRS ids whose data is not
/// cube-shaped, only excluded when `only_consider_cube_ready` is set (§9).
const NON_CUBE_DATASETS: &str = include_str!("../data/non_cube_datasets.txt");

/// Builds the [`ExclusionLists`] bundled with this crate.
pub fn bundled_exclusion_lists() -> ExclusionLists {
    ExclusionLists::parse(EXCLUDED_DATASETS, NON_CUBE_DATASETS)
}

/// Top-level handle onto the ESA CCI Open Data Portal (§3): resolves, opens
/// and searches datasets through one shared retry client and catalog.
///
/// `search`/`describe` (C12) need the full catalog resolved, independent of
/// any single [`open`](EsaCciStore::open) call, so this type keeps its own
/// catalog and feature-query wiring alongside the [`zarr_store::Store`] that
/// answers `open`.
pub struct EsaCciStore {
    opensearch: OpenSearchClient,
    retry: Arc<RetryClient>,
    endpoint: String,
    config: StoreConfig,
    exclusions: ExclusionLists,
    catalog: Catalog,
    store: zarr_store::Store,
}

impl EsaCciStore {
    pub fn new(config: StoreConfig, exclusions: ExclusionLists) -> Result<Self, EsaCciError> {
        let retry_config = RetryClientConfig {
            num_retries: config.num_retries,
            backoff_ceiling_max_ms: config.retry_backoff_max_ms as f64,
            backoff_base: config.retry_backoff_base,
        };
        let retry = Arc::new(RetryClient::new(retry_config.clone())?);
        let opensearch = OpenSearchClient::new(RetryClient::new(retry_config)?);
        let endpoint = config.endpoint_url.clone();
        let store = zarr_store::Store::new(config.clone(), exclusions.clone())?;
        Ok(Self {
            opensearch,
            retry,
            endpoint,
            config,
            exclusions,
            catalog: Catalog::new(),
            store,
        })
    }

    /// Convenience constructor using the bundled exclusion lists and
    /// default endpoint configuration (§6).
    pub fn with_defaults() -> Result<Self, EsaCciError> {
        Self::new(StoreConfig::default(), bundled_exclusion_lists())
    }

    fn resolver(&self) -> DatasetResolver<'_> {
        DatasetResolver::with_warnings(
            &self.opensearch,
            &self.retry,
            self.endpoint.clone(),
            self.exclusions.clone(),
            self.config.only_consider_cube_ready,
            self.config.enable_warnings,
        )
    }

    /// Resolves every dataset the catalog advertises, idempotently (§4.5).
    /// Required before [`search`] sees anything beyond already-resolved ids.
    pub async fn ensure_known_all(&mut self) -> Result<(), EsaCciError> {
        self.resolver().ensure_known_all(&mut self.catalog).await
    }

    /// Resolves a single dataset id into the catalog, idempotently (§4.5).
    pub async fn ensure_known(&mut self, dataset_id: &str) -> Result<(), EsaCciError> {
        self.resolver().ensure_known(&mut self.catalog, dataset_id).await
    }

    /// Filters known dataset ids by `facets` (C12, §4.12).
    pub async fn search(&self, facets: &SearchFacets) -> Result<Vec<String>, EsaCciError> {
        search::search(&self.catalog, &self.opensearch, &self.retry, &self.endpoint, facets).await
    }

    /// Resolves `dataset_id` and renders its descriptor record and
    /// synthesised title (C12, §4.12).
    #[tracing::instrument(skip(self), fields(dataset_id = %dataset_id))]
    pub async fn describe(&mut self, dataset_id: &str) -> Result<DatasetDescription, EsaCciError> {
        self.ensure_known(dataset_id).await?;
        search::describe(&self.catalog, &self.opensearch, &self.retry, &self.endpoint, dataset_id).await
    }

    /// Opens `params.dataset_id` as a virtual Zarr store (C9, §4.9).
    #[tracing::instrument(skip(self, observers), fields(dataset_id = %params.dataset_id))]
    pub async fn open(
        &mut self,
        params: CubeParams,
        observers: Vec<Box<dyn FetchObserver>>,
    ) -> Result<Dataset, EsaCciError> {
        self.store.open(params, observers).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use esa_common::config::StoreConfigBuilder;
    use httpmock::MockServer;
    use serde_json::json;

    #[test]
    fn bundled_exclusion_lists_parse_without_panicking() {
        let _ = bundled_exclusion_lists();
    }

    #[tokio::test]
    async fn search_filters_by_drs_components_after_resolving_the_catalog() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET).query_param("parentIdentifier", "cci");
                then.status(200).json_body(json!({
                    "properties": { "totalResults": 1 },
                    "features": [ {
                        "id": "parent-1",
                        "properties": { "drsIds": test_fixtures::SAMPLE_DRS_IDS },
                        "links": []
                    } ]
                }));
            })
            .await;

        let config = StoreConfigBuilder::new().endpoint_url(server.base_url()).build().unwrap();
        let mut store = EsaCciStore::new(config, ExclusionLists::default()).unwrap();
        store.ensure_known_all().await.unwrap();

        let facets = SearchFacets {
            ecv: Some("OZONE".to_string()),
            ..Default::default()
        };
        let matches = store.search(&facets).await.unwrap();
        assert_eq!(matches, vec![test_fixtures::SAMPLE_DRS_IDS[0].to_string()]);
    }

    #[tokio::test]
    async fn describe_synthesises_a_title_from_drs_components() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET)
                    .query_param("parentIdentifier", "cci")
                    .query_param("drsId", test_fixtures::SAMPLE_DRS_IDS[0]);
                then.status(200).json_body(json!({
                    "properties": { "totalResults": 1 },
                    "features": [ {
                        "id": "parent-1",
                        "properties": { "drsIds": test_fixtures::SAMPLE_DRS_IDS },
                        "links": []
                    } ]
                }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET)
                    .query_param("parentIdentifier", "parent-1")
                    .query_param("drsId", test_fixtures::SAMPLE_DRS_IDS[0]);
                then.status(200).json_body(json!({
                    "properties": { "totalResults": 1 },
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

        let config = StoreConfigBuilder::new().endpoint_url(server.base_url()).build().unwrap();
        let mut store = EsaCciStore::new(config, ExclusionLists::default()).unwrap();

        let description = store.describe(test_fixtures::SAMPLE_DRS_IDS[0]).await.unwrap();
        assert_eq!(description.title, "OZONE CCI: monthly multi-sensor L3 MERGED NP, vfv0002");
    }
}
