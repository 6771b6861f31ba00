//! OpenSearch paginator (C2): drives `startPage`/`maximumRecords` queries
//! against the catalog endpoint until `totalResults` is exhausted, fetching
//! pages beyond the first with a bounded concurrency of 4.

use std::collections::BTreeMap;

use esa_common::error::EsaCciError;
use futures::stream::{self, StreamExt};
use retry_client::RetryClient;
use serde::Deserialize;
use tracing::{debug, instrument};

const DEFAULT_MAXIMUM_RECORDS: u32 = 10_000;
const PAGE_FETCH_CONCURRENCY: usize = 4;

/// A single OpenSearch result feature: catalog-reported facets plus the
/// links the OPeNDAP client and dataset resolver pull URLs from.
#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    pub id: String,
    #[serde(default)]
    pub properties: serde_json::Value,
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    pub href: String,
    #[serde(default)]
    pub rel: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl Feature {
    /// The `links` entry titled `Opendap`, used by the granule index (C7)
    /// and dataset resolver (C5) to build OPeNDAP request URLs.
    pub fn opendap_link(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|l| l.title.as_deref() == Some("Opendap"))
            .map(|l| l.href.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct FeatureCollectionResponse {
    #[serde(default)]
    features: Vec<Feature>,
    properties: ResponseProperties,
}

#[derive(Debug, Deserialize)]
struct ResponseProperties {
    #[serde(rename = "totalResults")]
    total_results: u64,
}

/// Query parameters for a single OpenSearch listing, beyond pagination.
#[derive(Debug, Clone, Default)]
pub struct OpenSearchQuery {
    pub params: BTreeMap<String, String>,
    pub maximum_records: Option<u32>,
}

impl OpenSearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn maximum_records(mut self, n: u32) -> Self {
        self.maximum_records = Some(n);
        self
    }
}

pub struct OpenSearchClient {
    retry: RetryClient,
}

impl OpenSearchClient {
    pub fn new(retry: RetryClient) -> Self {
        Self { retry }
    }

    /// Lists all features matching `query` at `endpoint`, invoking `extend`
    /// once per page in page order, and returns the server-reported
    /// `totalResults` (used by the metadata aggregator's `maximumRecords=1`
    /// probe to learn a dataset's granule count without paginating through
    /// it). The paginator is oblivious to what kind of accumulator `extend`
    /// folds into — a catalog map, a granule list, or nothing at all.
    #[instrument(skip(self, accumulator, extend), fields(endpoint = %endpoint))]
    pub async fn list<A>(
        &self,
        endpoint: &str,
        query: &OpenSearchQuery,
        accumulator: &mut A,
        mut extend: impl FnMut(&mut A, Vec<Feature>),
    ) -> Result<u64, EsaCciError> {
        let max_records = query.maximum_records.unwrap_or(DEFAULT_MAXIMUM_RECORDS);

        let first = self.fetch_page(endpoint, query, 1, max_records).await?;
        let total_results = first.properties.total_results;
        extend(accumulator, first.features);

        if total_results <= max_records as u64 {
            return Ok(total_results);
        }

        let total_pages = total_results.div_ceil(max_records as u64);
        debug!(total_results, total_pages, "paginating remaining pages");

        let pages: Vec<u64> = (2..=total_pages).collect();
        let mut fetched: Vec<(u64, Vec<Feature>)> = stream::iter(pages)
            .map(|page| {
                let endpoint = endpoint.to_string();
                let query = query.clone();
                async move {
                    let resp = self.fetch_page(&endpoint, &query, page, max_records).await;
                    (page, resp)
                }
            })
            .buffer_unordered(PAGE_FETCH_CONCURRENCY)
            .map(|(page, resp)| resp.map(|r| (page, r.features)))
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<Result<Vec<_>, EsaCciError>>()?;

        fetched.sort_by_key(|(page, _)| *page);
        for (_, features) in fetched {
            extend(accumulator, features);
        }

        Ok(total_results)
    }

    async fn fetch_page(
        &self,
        endpoint: &str,
        query: &OpenSearchQuery,
        page: u64,
        max_records: u32,
    ) -> Result<FeatureCollectionResponse, EsaCciError> {
        let mut url = format!(
            "{endpoint}?httpAccept=application%2Fgeo%2Bjson&startPage={page}&maximumRecords={max_records}"
        );
        for (key, value) in &query.params {
            url.push('&');
            url.push_str(&urlencode(key));
            url.push('=');
            url.push_str(&urlencode(value));
        }

        let body = self.retry.get(&url).await?;
        serde_json::from_slice(&body).map_err(EsaCciError::from)
    }
}

fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::MockServer;
    use retry_client::RetryClientConfig;
    use serde_json::json;

    fn client() -> OpenSearchClient {
        OpenSearchClient::new(RetryClient::new(RetryClientConfig::default()).unwrap())
    }

    #[test]
    fn opendap_link_picked_by_title() {
        let feature = Feature {
            id: "f1".to_string(),
            properties: serde_json::Value::Null,
            links: vec![
                Link {
                    href: "http://example/enclosure".to_string(),
                    rel: Some("enclosure".to_string()),
                    title: Some("Download".to_string()),
                },
                Link {
                    href: "http://example/opendap".to_string(),
                    rel: Some("via".to_string()),
                    title: Some("Opendap".to_string()),
                },
            ],
        };
        assert_eq!(feature.opendap_link(), Some("http://example/opendap"));
    }

    #[test]
    fn opendap_link_absent_returns_none() {
        let feature = Feature {
            id: "f1".to_string(),
            properties: serde_json::Value::Null,
            links: vec![],
        };
        assert_eq!(feature.opendap_link(), None);
    }

    #[tokio::test]
    async fn list_single_page_invokes_extend_once() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET)
                    .query_param("startPage", "1")
                    .query_param("parentIdentifier", "cci");
                then.status(200).json_body(json!({
                    "properties": { "totalResults": 1 },
                    "features": [ { "id": "f1", "properties": {}, "links": [] } ]
                }));
            })
            .await;

        let query = OpenSearchQuery::new().with("parentIdentifier", "cci");
        let mut collected = Vec::new();
        client()
            .list(&server.base_url(), &query, &mut collected, |acc, features| {
                acc.extend(features)
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].id, "f1");
    }

    #[tokio::test]
    async fn list_paginates_beyond_first_page() {
        let server = MockServer::start_async().await;
        let page1 = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET)
                    .query_param("startPage", "1")
                    .query_param("maximumRecords", "1");
                then.status(200).json_body(json!({
                    "properties": { "totalResults": 2 },
                    "features": [ { "id": "f1", "properties": {}, "links": [] } ]
                }));
            })
            .await;
        let page2 = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET)
                    .query_param("startPage", "2")
                    .query_param("maximumRecords", "1");
                then.status(200).json_body(json!({
                    "properties": { "totalResults": 2 },
                    "features": [ { "id": "f2", "properties": {}, "links": [] } ]
                }));
            })
            .await;

        let query = OpenSearchQuery::new().maximum_records(1);
        let mut collected = Vec::new();
        client()
            .list(&server.base_url(), &query, &mut collected, |acc, features| {
                acc.extend(features)
            })
            .await
            .unwrap();

        page1.assert_async().await;
        page2.assert_async().await;
        assert_eq!(collected.len(), 2);
        assert_eq!(collected[0].id, "f1");
        assert_eq!(collected[1].id, "f2");
    }
}
