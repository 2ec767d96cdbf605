//! Model Catalog & Router (spec.md §4.3): a scored table of models per
//! capability, plus selection functions that honour tier and
//! provider-diversity constraints.
//!
//! Structure mirrors `coordination/src/registry/mod.rs`'s split between a
//! static descriptor table and a registry wrapper, generalized here to
//! the spec's four selection functions instead of health-based ranking.

pub mod data;
pub mod router;

pub use router::{Catalog, RoutingRequest, RoutingResult};
