//! Canonical coverage-eligibility model
//!
//! Format-agnostic types shared across the gateway:
//! - Canonical inquiry and determination structures
//! - Coverage status vocabulary and aggregation
//! - Service-type display names
//! - Deterministic fingerprints for determination caching
//!
//! Nothing in this crate knows about EDI segments or FHIR resources; the
//! codecs translate to and from these types at the edges.

pub mod fingerprint;
pub mod models;
pub mod service_types;

pub use fingerprint::*;
pub use models::*;
pub use service_types::*;
