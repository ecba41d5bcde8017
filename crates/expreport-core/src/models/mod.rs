//! Data models: line item records and configuration.

pub mod config;
pub mod record;
