//! FHIR R4 mapping for coverage-eligibility checking
//!
//! Translates between FHIR resources and the canonical eligibility model:
//! - `CoverageEligibilityRequest` into a canonical inquiry
//! - a canonical determination into `CoverageEligibilityResponse`
//! - `OperationOutcome` construction for FHIR-surface errors
//!
//! Benefit categories are translated through a closed bidirectional table
//! against the EDI service-type vocabulary; unrecognized codes pass through
//! unchanged and are flagged so downstream consumers can detect them.

pub mod categories;
pub mod error;
pub mod mapping;
pub mod resources;

pub use categories::*;
pub use error::*;
pub use mapping::*;
pub use resources::*;
