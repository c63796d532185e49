//! Core functionality for the Qrator exporter.
//! 
//! This module contains the core components of the exporter,
//! including the Qrator API client, the domain statistics collector
//! and the metric sink it reports to.

pub mod qrator;
pub mod collector;
pub mod sink;

pub use qrator::{QratorClient, QratorError};
pub use collector::{Collector, CycleSummary};
pub use sink::{MetricDesc, MetricKind, MetricSink, PrometheusSink};
