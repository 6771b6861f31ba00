//! DRS (Data Reference Syntax) dataset identifiers.
//!
//! `esacci.ecv.frequency.level.type.sensor.platform.product.version.drs_tail`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const FIELD_COUNT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DrsId {
    pub ecv: String,
    pub frequency: String,
    pub level: String,
    pub kind: String,
    pub sensor: String,
    pub platform: String,
    pub product: String,
    pub version: String,
    pub drs_tail: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DrsIdError {
    #[error("DRS id '{0}' does not start with 'esacci'")]
    MissingPrefix(String),
    #[error("DRS id '{0}' has {1} dotted fields, expected 10")]
    WrongFieldCount(String, usize),
}

impl DrsId {
    pub fn new(
        ecv: impl Into<String>,
        frequency: impl Into<String>,
        level: impl Into<String>,
        kind: impl Into<String>,
        sensor: impl Into<String>,
        platform: impl Into<String>,
        product: impl Into<String>,
        version: impl Into<String>,
        drs_tail: impl Into<String>,
    ) -> Self {
        Self {
            ecv: ecv.into(),
            frequency: normalize_frequency(&frequency.into()),
            level: level.into(),
            kind: kind.into(),
            sensor: sensor.into(),
            platform: platform.into(),
            product: product.into(),
            version: version.into(),
            drs_tail: drs_tail.into(),
        }
    }
}

impl FromStr for DrsId {
    type Err = DrsIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split('.').collect();
        if fields.len() != FIELD_COUNT {
            return Err(DrsIdError::WrongFieldCount(s.to_string(), fields.len()));
        }
        if fields[0] != "esacci" {
            return Err(DrsIdError::MissingPrefix(s.to_string()));
        }
        Ok(DrsId {
            ecv: fields[1].to_string(),
            frequency: normalize_frequency(fields[2]),
            level: fields[3].to_string(),
            kind: fields[4].to_string(),
            sensor: fields[5].to_string(),
            platform: fields[6].to_string(),
            product: fields[7].to_string(),
            version: fields[8].to_string(),
            drs_tail: fields[9].to_string(),
        })
    }
}

impl fmt::Display for DrsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "esacci.{}.{}.{}.{}.{}.{}.{}.{}.{}",
            self.ecv,
            self.frequency,
            self.level,
            self.kind,
            self.sensor,
            self.platform,
            self.product,
            self.version,
            self.drs_tail
        )
    }
}

/// Normalise a frequency token found in a DRS id or facet query.
///
/// `mon` and `month` are retained as synonyms of the single normalised token
/// `month` (open question, §9): several source datasets are labelled either
/// way and both must match when filtering by frequency.
pub fn normalize_frequency(token: &str) -> String {
    match token {
        "mon" | "month" => "month",
        "yr" | "year" => "year",
        "day" => "day",
        "5-days" | "5 days" => "5-days",
        "8-days" | "8 days" => "8-days",
        "15-days" | "15 days" => "15-days",
        "13-yrs" | "13 years" => "13-yrs",
        "satellite-orbit-frequency" => "satellite-orbit-frequency",
        "climatology" => "climatology",
        other => return other.to_string(),
    }
    .to_string()
}

/// Two frequency tokens are equal for filtering purposes iff they normalise
/// to the same token (covers the `mon`/`month` synonym).
pub fn frequency_matches(a: &str, b: &str) -> bool {
    normalize_frequency(a) == normalize_frequency(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ten_field_id() {
        let id: DrsId = "esacci.OZONE.mon.L3.NP.multi-sensor.multi-platform.MERGED.fv0002.r1"
            .parse()
            .unwrap();
        assert_eq!(id.ecv, "OZONE");
        assert_eq!(id.frequency, "month");
        assert_eq!(id.drs_tail, "r1");
    }

    #[test]
    fn round_trips_through_display() {
        let id: DrsId = "esacci.AEROSOL.day.L3.AAI.multi-sensor.multi-platform.MSAAI.1-7.r1"
            .parse()
            .unwrap();
        assert_eq!(
            id.to_string(),
            "esacci.AEROSOL.day.L3.AAI.multi-sensor.multi-platform.MSAAI.1-7.r1"
        );
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert!(matches!(
            "esacci.OZONE.mon".parse::<DrsId>(),
            Err(DrsIdError::WrongFieldCount(_, 3))
        ));
    }

    #[test]
    fn rejects_missing_prefix() {
        assert!(matches!(
            "notcci.OZONE.mon.L3.NP.a.b.c.d.e".parse::<DrsId>(),
            Err(DrsIdError::MissingPrefix(_))
        ));
    }

    #[test]
    fn mon_and_month_are_synonyms() {
        assert!(frequency_matches("mon", "month"));
        assert!(!frequency_matches("mon", "day"));
    }
}
