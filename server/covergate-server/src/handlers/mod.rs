//! HTTP request handlers

pub mod eligibility;
pub mod health;
pub mod rules;
