//! OPeNDAP client (C4): DDS/DAS schema discovery and `.dods` hyperslab
//! reads against the ESA CCI Open Data Portal's granule servers.

pub mod client;
pub mod das;
pub mod dds;

pub use client::{open, read, DapArray, Dataset, Variable};
pub use das::{parse_das, Das};
pub use dds::{parse_dds, DapDtype, Dds, DdsVariable};
