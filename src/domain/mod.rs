//! Core domain types and logic.

pub mod timezone;
pub mod trade;
pub mod rule;
pub mod report;
pub mod engine;
pub mod summary;
pub mod registry;
pub mod config_validation;
pub mod error;
