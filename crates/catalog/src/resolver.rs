//! Dataset resolver (C5): maps a DRS id to the OpenSearch "parent" feature
//! that advertises it, harvesting every other DRS id the same feature
//! advertises along the way.

use std::collections::{BTreeMap, HashSet};

use descriptor_docs::{parse_descxml, DescXmlMeta};
use esa_common::{DrsId, EsaCciError};
use futures::stream::{self, StreamExt};
use opensearch::{Feature, OpenSearchClient, OpenSearchQuery};
use retry_client::RetryClient;

const FEATURE_LOAD_CONCURRENCY: usize = 4;

/// Two opaque, one-id-per-line text files bundled with the store: one lists
/// datasets known to be incomplete, the other lists datasets that are valid
/// but not cube-shaped (§9, "product-management artefacts").
#[derive(Debug, Clone, Default)]
pub struct ExclusionLists {
    excluded: HashSet<String>,
    non_cube: HashSet<String>,
}

impl ExclusionLists {
    pub fn parse(excluded_text: &str, non_cube_text: &str) -> Self {
        Self {
            excluded: parse_lines(excluded_text),
            non_cube: parse_lines(non_cube_text),
        }
    }

    fn allows(&self, drs_id: &str, only_consider_cube_ready: bool) -> bool {
        if self.excluded.contains(drs_id) {
            return false;
        }
        !only_consider_cube_ready || !self.non_cube.contains(drs_id)
    }
}

fn parse_lines(text: &str) -> HashSet<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// A resolved DRS id: the feature that advertises it, plus whatever ISO
/// metadata that feature's descxml link yielded (reused by the metadata
/// aggregator so it doesn't have to re-fetch it).
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    /// The literal drsId string as advertised by the catalog, e.g. with an
    /// un-normalised frequency synonym (`"mon"` rather than `"month"`). Every
    /// live query against this entry must use this string, not
    /// `drs_id.to_string()`, which re-emits the normalised form and would
    /// query OpenSearch with an id it never advertised.
    pub drs_id_str: String,
    pub drs_id: DrsId,
    pub parent_id: String,
    pub descxml: Option<DescXmlMeta>,
}

#[derive(Debug, Default)]
pub struct Catalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, drs_id: &str) -> Option<&CatalogEntry> {
        self.entries.get(drs_id)
    }

    pub fn contains(&self, drs_id: &str) -> bool {
        self.entries.contains_key(drs_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn drs_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    fn install(
        &mut self,
        feature: &Feature,
        descxml: Option<DescXmlMeta>,
        exclusions: &ExclusionLists,
        only_consider_cube_ready: bool,
    ) {
        for drs_id_str in feature_drs_ids(feature) {
            if !exclusions.allows(&drs_id_str, only_consider_cube_ready) {
                continue;
            }
            let Ok(drs_id) = drs_id_str.parse::<DrsId>() else {
                continue;
            };
            self.entries.insert(
                drs_id_str.clone(),
                CatalogEntry {
                    drs_id_str,
                    drs_id,
                    parent_id: feature.id.clone(),
                    descxml: descxml.clone(),
                },
            );
        }
    }
}

/// The feature's advertised DRS ids, read from `properties.drsIds` (array)
/// or `properties.drsId` (scalar) — the same singular/plural harmonisation
/// the description-document facets use.
fn feature_drs_ids(feature: &Feature) -> Vec<String> {
    if let Some(arr) = feature.properties.get("drsIds").and_then(|v| v.as_array()) {
        return arr
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
    }
    if let Some(s) = feature.properties.get("drsId").and_then(|v| v.as_str()) {
        return vec![s.to_string()];
    }
    Vec::new()
}

/// The feature's `links` entry for its ISO-19115 descxml document. No
/// sample feature payload in this workspace carries real links, so the
/// title this looks for is a documented convention rather than an observed
/// fact; a feature without one simply yields no per-feature ISO metadata,
/// the same degrade-on-absence behaviour `parse_descxml` already applies to
/// malformed documents.
fn feature_descxml_url(feature: &Feature) -> Option<&str> {
    feature
        .links
        .iter()
        .find(|l| l.title.as_deref() == Some("ISO19115"))
        .map(|l| l.href.as_str())
}

pub struct DatasetResolver<'a> {
    opensearch: &'a OpenSearchClient,
    retry: &'a RetryClient,
    endpoint: String,
    exclusions: ExclusionLists,
    only_consider_cube_ready: bool,
    enable_warnings: bool,
}

impl<'a> DatasetResolver<'a> {
    pub fn new(
        opensearch: &'a OpenSearchClient,
        retry: &'a RetryClient,
        endpoint: impl Into<String>,
        exclusions: ExclusionLists,
        only_consider_cube_ready: bool,
    ) -> Self {
        Self::with_warnings(opensearch, retry, endpoint, exclusions, only_consider_cube_ready, false)
    }

    /// Like [`DatasetResolver::new`], but logs a `tracing::warn!` whenever a
    /// feature's descxml link fails to fetch and that feature's metadata is
    /// silently left un-enriched (§4.13 "warnings gated on `enable_warnings`").
    #[allow(clippy::too_many_arguments)]
    pub fn with_warnings(
        opensearch: &'a OpenSearchClient,
        retry: &'a RetryClient,
        endpoint: impl Into<String>,
        exclusions: ExclusionLists,
        only_consider_cube_ready: bool,
        enable_warnings: bool,
    ) -> Self {
        Self {
            opensearch,
            retry,
            endpoint: endpoint.into(),
            exclusions,
            only_consider_cube_ready,
            enable_warnings,
        }
    }

    async fn load_feature(&self, feature: Feature) -> (Feature, Option<DescXmlMeta>) {
        let descxml = match feature_descxml_url(&feature) {
            Some(url) => match self.retry.get(url).await {
                Ok(body) => Some(parse_descxml(&String::from_utf8_lossy(&body))),
                Err(err) => {
                    if self.enable_warnings {
                        tracing::warn!(feature = %feature.id, %err, "descxml fetch failed, metadata left un-enriched");
                    }
                    None
                }
            },
            None => None,
        };
        (feature, descxml)
    }

    async fn load_and_install(&self, catalog: &mut Catalog, features: Vec<Feature>) {
        let loaded: Vec<(Feature, Option<DescXmlMeta>)> = stream::iter(features)
            .map(|feature| self.load_feature(feature))
            .buffer_unordered(FEATURE_LOAD_CONCURRENCY)
            .collect()
            .await;

        for (feature, descxml) in loaded {
            catalog.install(
                &feature,
                descxml,
                &self.exclusions,
                self.only_consider_cube_ready,
            );
        }
    }

    /// Ensures `drs_id` is known to `catalog` (§4.5). A no-op if already
    /// present; otherwise issues a single `drsId`-scoped query and installs
    /// every DRS id the matching feature advertises, not just the one asked
    /// for.
    pub async fn ensure_known(&self, catalog: &mut Catalog, drs_id: &str) -> Result<(), EsaCciError> {
        if catalog.contains(drs_id) {
            return Ok(());
        }
        let query = OpenSearchQuery::new()
            .with("parentIdentifier", "cci")
            .with("drsId", drs_id);
        let mut features = Vec::new();
        self.opensearch
            .list(&self.endpoint, &query, &mut features, |acc, fs| acc.extend(fs))
            .await?;

        self.load_and_install(catalog, features).await;

        if !catalog.contains(drs_id) {
            return Err(EsaCciError::NotFound(drs_id.to_string()));
        }
        Ok(())
    }

    /// Loads the whole catalog: one `parentIdentifier=cci` query, then
    /// installs every returned feature, fetching up to 4 features' descxml
    /// documents concurrently (§4.5).
    pub async fn ensure_known_all(&self, catalog: &mut Catalog) -> Result<(), EsaCciError> {
        let query = OpenSearchQuery::new().with("parentIdentifier", "cci");
        let mut features = Vec::new();
        self.opensearch
            .list(&self.endpoint, &query, &mut features, |acc, fs| acc.extend(fs))
            .await?;

        self.load_and_install(catalog, features).await;
        Ok(())
    }
}
