//! EDI X12 270/271 wire codec
//!
//! Translates between raw X12 interchange text and the canonical eligibility
//! model:
//! - 270 (inquiry) decode and encode
//! - 271 (response) encode and decode
//! - Envelope validation with stable diagnostic codes (ENV001..ENV011)
//!
//! Delimiters are taken from the ISA segment on decode; dates are 8-digit
//! `CCYYMMDD` on the wire and `NaiveDate` everywhere else.

pub mod decode;
pub mod encode;
pub mod error;
pub mod segment;

pub use decode::*;
pub use encode::*;
pub use error::*;
pub use segment::*;
