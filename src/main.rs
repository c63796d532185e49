//! Qrator Exporter
//!
//! This is the main entry point for the exporter.
//! It validates the Qrator credentials and starts the metrics server.

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;
use log::info;
use std::sync::Arc;
use qrator_exporter::api::{self, ApiState};
use qrator_exporter::config;
use qrator_exporter::core::{Collector, PrometheusSink};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init();

    info!("Starting qrator-exporter...");

    let config = config::load_config().context("Failed to load configuration")?;

    let sink = Arc::new(PrometheusSink::default());
    let collector = Collector::new(&config.qrator, sink.clone())
        .await
        .context("Can't create collector")?;
    collector.describe();

    let state = web::Data::new(ApiState {
        collector: Arc::new(collector),
        sink,
    });

    info!("Listening on {}:{}", config.server.host, config.server.port);
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::config)
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await?;

    Ok(())
}
