//! Qrator Exporter
//! 
//! Polls the Qrator API for per-domain traffic and mitigation statistics
//! and exposes them as Prometheus metrics.

pub mod api;
pub mod config;
pub mod core;
pub mod models;
pub mod utils;
