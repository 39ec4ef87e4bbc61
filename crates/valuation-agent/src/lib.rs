//! Valuation agent
//!
//! HTTP host for the valuation pipeline: configuration, the valuation
//! endpoint and the health/metrics surface.

pub mod api;
pub mod config;
