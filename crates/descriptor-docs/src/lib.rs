//! Description-document parsers for the ESA CCI Open Data Portal: the
//! OpenSearch description document (facet enumeration) and the
//! ISO-19115 DESCXML metadata document (§4.3).

pub mod descxml;
pub mod odd;

pub use descxml::{parse_descxml, DescXmlMeta};
pub use odd::{parse_odd, FacetValue, OddFacets, FACET_NAMES};
