//! Audit event publishing for coverage-eligibility checks
//!
//! Every completed check produces exactly one `EligibilityChecked` event,
//! wrapped in the platform's event envelope and published on the
//! `eligibility.checked` subject. Publishing is fire-and-forget: the gateway
//! spawns the publish and failures are logged, never surfaced to the caller.
//!
//! Sinks are resolved once at startup: NATS for real deployments, a
//! structured-log sink for development, and an in-memory sink for tests.

pub mod error;
pub mod event;
pub mod publisher;
pub mod sink;

pub use error::*;
pub use event::*;
pub use publisher::*;
pub use sink::*;
