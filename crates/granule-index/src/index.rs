//! Granule index (C7): per-dataset sorted `(t_start, t_end, opendap_url)`
//! list with bisecting extension on both ends.

use chrono::{DateTime, Utc};
use esa_common::time::{parse_granule_time_from_filename, parse_iso8601};
use esa_common::{EsaCciError, TimeRange};
use opensearch::{Feature, OpenSearchClient, OpenSearchQuery};

#[derive(Debug, Clone, PartialEq)]
pub struct GranuleEntry {
    pub t_start: DateTime<Utc>,
    pub t_end: DateTime<Utc>,
    pub opendap_url: String,
}

/// State per dataset: the sorted granule list plus the `[covered_lo,
/// covered_hi]` bound already fetched from the catalog (§4.7). Lookups
/// never widen the index beyond what has actually been requested. Does not
/// own an HTTP client itself — the caller passes one to every fetching
/// method, so the index can be held by a store alongside everything else it
/// owns without a self-referential borrow.
#[derive(Debug)]
pub struct GranuleIndex {
    parent_id: String,
    drs_id: String,
    entries: Vec<GranuleEntry>,
    covered: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl GranuleIndex {
    pub fn new(parent_id: impl Into<String>, drs_id: impl Into<String>) -> Self {
        Self {
            parent_id: parent_id.into(),
            drs_id: drs_id.into(),
            entries: Vec::new(),
            covered: None,
        }
    }

    pub fn entries(&self) -> &[GranuleEntry] {
        &self.entries
    }

    pub fn is_covered(&self, t0: DateTime<Utc>, t1: DateTime<Utc>) -> bool {
        matches!(self.covered, Some((lo, hi)) if lo <= t0 && t1 <= hi)
    }

    /// Ensures the index covers `[t0, t1]`, extending from whichever bound
    /// is not yet covered, then returns the sublist within it (§4.7).
    pub async fn query(
        &mut self,
        opensearch: &OpenSearchClient,
        endpoint: &str,
        t0: DateTime<Utc>,
        t1: DateTime<Utc>,
    ) -> Result<Vec<GranuleEntry>, EsaCciError> {
        match self.covered {
            None => {
                let mut fetched = self.fetch(opensearch, endpoint, Some(t0), Some(t1)).await?;
                if fetched.is_empty() {
                    fetched = self.fetch(opensearch, endpoint, None, None).await?;
                }
                fetched.sort_by_key(|e| e.t_start);
                self.entries = fetched;
                self.covered = Some((t0, t1));
            }
            Some((mut lo, mut hi)) => {
                if t0 < lo {
                    let extension = self.fetch(opensearch, endpoint, Some(t0), Some(lo)).await?;
                    self.merge(extension);
                    lo = t0;
                }
                if t1 > hi {
                    let extension = self.fetch(opensearch, endpoint, Some(hi), Some(t1)).await?;
                    self.merge(extension);
                    hi = t1;
                }
                self.covered = Some((lo, hi));
            }
        }

        Ok(self.bisect(t0, t1))
    }

    fn merge(&mut self, extension: Vec<GranuleEntry>) {
        self.entries.extend(extension);
        self.entries.sort_by_key(|e| e.t_start);
        self.entries.dedup_by(|a, b| a.opendap_url == b.opendap_url);
    }

    /// Returns the sublist with `t_start >= t0` and `t_end <= t1`, found by
    /// bisecting the sorted start-time list (§4.7, §8 "strictly sorted").
    fn bisect(&self, t0: DateTime<Utc>, t1: DateTime<Utc>) -> Vec<GranuleEntry> {
        let lo = self.entries.partition_point(|e| e.t_start < t0);
        self.entries[lo..]
            .iter()
            .take_while(|e| e.t_start <= t1)
            .filter(|e| e.t_end <= t1)
            .cloned()
            .collect()
    }

    async fn fetch(
        &self,
        opensearch: &OpenSearchClient,
        endpoint: &str,
        t0: Option<DateTime<Utc>>,
        t1: Option<DateTime<Utc>>,
    ) -> Result<Vec<GranuleEntry>, EsaCciError> {
        let mut query = OpenSearchQuery::new()
            .with("parentIdentifier", self.parent_id.as_str())
            .with("drsId", self.drs_id.as_str());
        if let Some(t0) = t0 {
            query = query.with("startDate", t0.to_rfc3339());
        }
        if let Some(t1) = t1 {
            query = query.with("endDate", t1.to_rfc3339());
        }

        let mut features = Vec::new();
        opensearch
            .list(endpoint, &query, &mut features, |acc, fs| acc.extend(fs))
            .await?;

        Ok(features.iter().filter_map(feature_to_entry).collect())
    }
}

fn feature_to_entry(feature: &Feature) -> Option<GranuleEntry> {
    let opendap_url = feature.opendap_link()?.to_string();
    let range = parse_feature_time(feature)?;
    Some(GranuleEntry {
        t_start: range.start,
        t_end: range.end,
        opendap_url,
    })
}

/// Parses a feature's time pair from `properties.date` (`"<start>/<end>"`),
/// falling back to the filename date-format priority list applied to the
/// feature's own id (§4.7).
fn parse_feature_time(feature: &Feature) -> Option<TimeRange> {
    if let Some(date) = feature.properties.get("date").and_then(|v| v.as_str()) {
        if let Some((start_s, end_s)) = date.split_once('/') {
            if let (Ok(start), Ok(end)) = (parse_iso8601(start_s), parse_iso8601(end_s)) {
                return Some(TimeRange::new(start, end));
            }
        }
    }
    parse_granule_time_from_filename(&feature.id).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use esa_common::time::parse_iso8601;
    use httpmock::MockServer;
    use retry_client::{RetryClient, RetryClientConfig};
    use serde_json::json;

    fn client() -> OpenSearchClient {
        OpenSearchClient::new(RetryClient::new(RetryClientConfig::default()).unwrap())
    }

    fn feature(id: &str, url: &str) -> serde_json::Value {
        json!({
            "id": id,
            "properties": {},
            "links": [ { "href": url, "rel": "via", "title": "Opendap" } ]
        })
    }

    #[tokio::test]
    async fn first_query_fetches_and_sorts_by_start() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET)
                    .query_param("startDate")
                    .query_param("endDate");
                then.status(200).json_body(json!({
                    "properties": { "totalResults": 2 },
                    "features": [
                        feature("ESACCI-OZONE-20100301-fv1.nc", "http://example/g2"),
                        feature("ESACCI-OZONE-20100201-fv1.nc", "http://example/g1"),
                    ]
                }));
            })
            .await;

        let opensearch = client();
        let mut index = GranuleIndex::new("parent-1", "drs-1");
        let t0 = parse_iso8601("2010-02-01T00:00:00").unwrap();
        let t1 = parse_iso8601("2010-04-01T00:00:00").unwrap();
        let result = index
            .query(&opensearch, &server.base_url(), t0, t1)
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].opendap_url, "http://example/g1");
        assert_eq!(result[1].opendap_url, "http://example/g2");
        assert!(index.is_covered(t0, t1));
    }

    #[tokio::test]
    async fn extends_lower_bound_without_refetching_upper_range() {
        let server = MockServer::start_async().await;
        let first = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET)
                    .query_param("startDate", "2010-02-01T00:00:00+00:00");
                then.status(200).json_body(json!({
                    "properties": { "totalResults": 1 },
                    "features": [ feature("ESACCI-OZONE-20100201-fv1.nc", "http://example/g1") ]
                }));
            })
            .await;
        let extension = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET)
                    .query_param("startDate", "2010-01-01T00:00:00+00:00");
                then.status(200).json_body(json!({
                    "properties": { "totalResults": 1 },
                    "features": [ feature("ESACCI-OZONE-20100115-fv1.nc", "http://example/g0") ]
                }));
            })
            .await;

        let opensearch = client();
        let mut index = GranuleIndex::new("parent-1", "drs-1");
        let t0 = parse_iso8601("2010-02-01T00:00:00").unwrap();
        let t1 = parse_iso8601("2010-03-01T00:00:00").unwrap();
        index.query(&opensearch, &server.base_url(), t0, t1).await.unwrap();
        first.assert_async().await;

        let earlier_t0 = parse_iso8601("2010-01-01T00:00:00").unwrap();
        index
            .query(&opensearch, &server.base_url(), earlier_t0, t1)
            .await
            .unwrap();
        extension.assert_async().await;

        assert_eq!(index.entries().len(), 2);
        assert!(index.entries().windows(2).all(|w| w[0].t_start <= w[1].t_start));
    }

    #[test]
    fn feature_without_opendap_link_is_skipped() {
        let feature: Feature = serde_json::from_value(json!({
            "id": "ESACCI-OZONE-20100201-fv1.nc",
            "properties": {},
            "links": []
        }))
        .unwrap();
        assert!(feature_to_entry(&feature).is_none());
    }

    #[test]
    fn date_property_takes_precedence_over_filename() {
        let feature: Feature = serde_json::from_value(json!({
            "id": "ESACCI-OZONE-20100201-fv1.nc",
            "properties": { "date": "2010-03-01T00:00:00Z/2010-03-31T23:59:59Z" },
            "links": [ { "href": "http://example/g1", "rel": "via", "title": "Opendap" } ]
        }))
        .unwrap();
        let entry = feature_to_entry(&feature).unwrap();
        assert_eq!(entry.t_start.format("%Y-%m-%d").to_string(), "2010-03-01");
    }
}
