//! Fingerprint-keyed determination cache
//!
//! Completed determinations are cached under their request fingerprint with
//! a TTL differentiated by coverage status: active-member results live
//! longer than inactive ones, and nothing is served past the policy's
//! maximum age regardless of TTL. Backends are resolved once at startup
//! through [`build_cache`]: an in-process map for single instances, Redis
//! for shared deployments.

pub mod backend;
pub mod error;
pub mod memory;
pub mod record;
pub mod redis;

pub use backend::*;
pub use error::*;
pub use memory::*;
pub use record::*;
pub use self::redis::*;
