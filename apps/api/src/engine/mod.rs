//! The Collision Engine: catalog, scorer, selector, and enricher, composed by
//! the pipeline into one generation. Each submodule is independently unit
//! tested; only the pipeline wires them together against live state.

pub mod catalog;
pub mod enricher;
pub mod scorer;
pub mod selector;

pub use catalog::{CatalogHandle, CatalogSnapshot};
pub use enricher::{AnthropicEnrichmentLlm, EnrichmentLlm, NullEnrichmentLlm};
