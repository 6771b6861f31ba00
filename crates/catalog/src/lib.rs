//! Dataset resolver and metadata aggregator (C5+C6): turns a DRS id into a
//! cached catalog entry, then into a frozen per-dataset metadata record.

pub mod aggregator;
pub mod resolver;

pub use aggregator::{
    should_promote_to_attribute, DatasetMetadata, MetadataAggregator, VariableInfo, VariableSummary,
};
pub use resolver::{Catalog, CatalogEntry, DatasetResolver, ExclusionLists};
