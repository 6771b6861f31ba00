//! Common types and utilities shared across the ESA CCI virtual store crates.

pub mod bbox;
pub mod config;
pub mod drs;
pub mod error;
pub mod time;

pub use bbox::{BboxError, BoundingBox, TrimBounds};
pub use config::{CubeParams, CubeParamsBuilder, StoreConfig, StoreConfigBuilder};
pub use drs::{normalize_frequency, DrsId, DrsIdError};
pub use error::{EsaCciError, EsaCciResult};
pub use time::{TimeParseError, TimeRange};
