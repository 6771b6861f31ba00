//! Granule index and time-range planner (C7+C8): the per-dataset
//! `(t_start, t_end, opendap_url)` list and the regular/irregular window
//! synthesiser built on top of it.

pub mod index;
pub mod planner;

pub use index::{GranuleEntry, GranuleIndex};
pub use planner::plan_time_ranges;
