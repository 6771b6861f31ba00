//! Virtual Zarr v2 store over the ESA CCI Open Data Portal (C9-C11):
//! resolves a dataset id into a browsable, read-only Zarr key space whose
//! coordinate arrays are materialised inline and whose data-variable chunks
//! are fetched from OPeNDAP on demand.

pub mod blosc;
pub mod chunk_planner;
pub mod fetcher;
pub mod schema;
pub mod store;

pub use fetcher::{FetchEvent, FetchObserver, TimeSlot};
pub use schema::ArraySpec;
pub use store::{Dataset, Store};
