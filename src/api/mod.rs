//! HTTP endpoints for the Qrator exporter.
//!
//! This module provides the Prometheus scrape endpoint, a health check
//! and a landing page.

use actix_web::{web, HttpResponse, Responder};
use log::error;
use std::sync::Arc;

use crate::core::{Collector, PrometheusSink};

const LANDING_PAGE: &str = r#"<html>
<head><title>Qrator Exporter</title></head>
<body>
<h1>Qrator Exporter</h1>
<p><a href="/metrics">Metrics</a></p>
</body>
</html>"#;

/// Content type of the Prometheus text exposition format
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

pub struct ApiState {
    pub collector: Arc<Collector>,
    /// The sink the collector reports to
    pub sink: Arc<PrometheusSink>,
}

/// API configuration function for Actix-web
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/metrics").route(web::get().to(metrics)))
        .service(web::resource("/healthz").route(web::get().to(health_check)))
        .service(web::resource("/").route(web::get().to(index)));
}

/// Scrape endpoint: runs a collection cycle, then renders its output
///
/// The cycle runs in its own task so it completes even if the scraper
/// disconnects and this handler is dropped.
pub async fn metrics(state: web::Data<ApiState>) -> impl Responder {
    let collector = state.collector.clone();
    if let Err(e) = actix_rt::spawn(async move { collector.collect().await }).await {
        error!("Collection cycle did not complete: {}", e);
    }

    HttpResponse::Ok()
        .content_type(PROMETHEUS_CONTENT_TYPE)
        .body(state.sink.render())
}

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("ok\n")
}

async fn index() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(LANDING_PAGE)
}
