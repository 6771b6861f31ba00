//! Time-range planner (C8): synthesises regular windows for `day`/`month`/
//! `year` frequencies, or delegates to the granule index for irregular
//! cadences (5/8/15-day, 13-year, satellite-orbit, climatology).

use chrono::{DateTime, Utc};
use esa_common::time::{daily_windows, monthly_windows, yearly_windows};
use esa_common::{normalize_frequency, EsaCciError, TimeRange};
use opensearch::OpenSearchClient;

use crate::GranuleIndex;

/// Plans the time windows covering `[t0, t1]` for `frequency` (§4.8).
pub async fn plan_time_ranges(
    index: &mut GranuleIndex,
    opensearch: &OpenSearchClient,
    endpoint: &str,
    frequency: &str,
    t0: DateTime<Utc>,
    t1: DateTime<Utc>,
) -> Result<Vec<TimeRange>, EsaCciError> {
    match normalize_frequency(frequency).as_str() {
        "day" => Ok(daily_windows(t0, t1)),
        "month" => Ok(monthly_windows(t0, t1)),
        "year" => Ok(yearly_windows(t0, t1)),
        _ => {
            let granules = index.query(opensearch, endpoint, t0, t1).await?;
            Ok(granules
                .into_iter()
                .map(|g| TimeRange::new(g.t_start, g.t_end))
                .collect())
        }
    }
}
