//! Rule store and determination engine for coverage-eligibility checking
//!
//! Rules are loaded from CSV into an immutable [`RuleIndex`] keyed by
//! `(plan_code, service_type_code)`, with a wildcard plan bucket (`"*"`)
//! consulted when a plan has no applicable rule of its own. The shared
//! [`RuleStore`] swaps snapshots atomically, so a reload never tears an
//! in-flight determination.
//!
//! [`determine`] resolves each requested service-type code to its winning
//! rule (ascending priority, ties broken by rule id) and folds the per-code
//! statuses into an overall coverage status.

pub mod engine;
pub mod error;
pub mod loader;
pub mod rule;
pub mod store;

pub use engine::*;
pub use error::*;
pub use loader::*;
pub use rule::*;
pub use store::*;
