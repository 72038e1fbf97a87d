mod api;
mod dao;
mod model;
mod service;

use std::fs::OpenOptions;
use std::sync::Mutex;

use crate::api::endpoints::{ledger_export, ledger_show, record_add};
use crate::api::middleware::timing_middleware;
use crate::api::state::AppState;
use crate::dao::records::RecordStore;
use crate::model::apperror::{ApplicationError, ErrorType};
use crate::model::config::{ApplicationArguments, LoggingConfig};
use crate::service::monitoring::MonitoringService;

use actix_web::middleware::from_fn;
use actix_web::{App, HttpServer, web};
use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};
use clap::Parser;
use prometheus::IntGauge;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/**
 * Entry point: reads the configuration, opens the ledger and serves the entry page.
 */
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let args = ApplicationArguments::parse();

    let config = get_config(&args.config_file)?;

    init_tracing(&config.logging)?;

    let prometheus = PrometheusMetricsBuilder::new("")
        .endpoint("/metrics")
        .mask_unmatched_patterns("UNKNOWN")
        .build()
        .map_err(|err| std::io::Error::other(format!("Failed to create Prometheus metrics: {err}")))?;

    let records_gauge = IntGauge::new("monitoring_records", "Records in the monitoring ledger").map_err(|err| std::io::Error::other(format!("Failed to create monitoring_records gauge: {err}")))?;
    register_prometheus_metrics(&prometheus, &records_gauge)?;

    let record_store = RecordStore::new(&config.store.data_file);
    info!("Using ledger file {}", record_store.data_file().display());
    let monitoring_service = MonitoringService::new(record_store, records_gauge);

    let state = web::Data::new(AppState::new(monitoring_service, config.presenter.clone()));

    let server_init = HttpServer::new(move || {
        App::new()
            .wrap(prometheus.clone())
            .wrap(from_fn(timing_middleware))
            .app_data(state.clone())
            .service(ledger_show)
            .service(record_add)
            .service(ledger_export)
    });

    info!("Listening on {}:{}", config.server.bind_address, config.server.http_port);
    server_init.bind((config.server.bind_address.as_str(), config.server.http_port))?.workers(config.server.workers).run().await
}

/**
 * Initializes tracing for the application.
 *
 * `RUST_LOG` is honored when set, otherwise `info`. Configured directives are added on top.
 *
 * #Arguments
 * `logging`: Logging configuration.
 *
 * #Returns
 * A `Result` indicating success or failure.
 */
fn init_tracing(logging: &LoggingConfig) -> Result<(), ApplicationError> {
    let env_filter = build_env_filter(logging)?;

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(logging.target)
        .with_thread_ids(logging.thread_ids)
        .with_thread_names(logging.thread_names)
        .with_line_number(logging.line_number)
        .with_level(logging.level)
        .with_ansi(logging.ansi)
        .with_file(logging.file);

    let file_layer = match &logging.logfile {
        Some(logfile) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(logfile)
                .map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to open log file {logfile}: {err}")))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(logging.target)
                    .with_thread_ids(logging.thread_ids)
                    .with_thread_names(logging.thread_names)
                    .with_line_number(logging.line_number)
                    .with_level(logging.level)
                    .with_ansi(false)
                    .with_file(logging.file)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to initialize tracing: {err}")))?;

    Ok(())
}

/**
 * Builds the log filter from `RUST_LOG` and the configured directives.
 */
fn build_env_filter(logging: &LoggingConfig) -> Result<EnvFilter, ApplicationError> {
    let mut env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    for directive in &logging.directives {
        let directive = directive.parse::<tracing_subscriber::filter::Directive>().map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Invalid logging directive {directive}: {err}")))?;
        env_filter = env_filter.add_directive(directive);
    }
    Ok(env_filter)
}

/**
 * Registers custom Prometheus metrics.
 *
 * #Arguments
 * `prometheus_metrics`: The Prometheus metrics instance to register the gauge with.
 * `gauge`: The gauge to register.
 */
fn register_prometheus_metrics(prometheus_metrics: &PrometheusMetrics, gauge: &IntGauge) -> Result<(), std::io::Error> {
    prometheus_metrics.registry.register(Box::new(gauge.clone())).map_err(|err| std::io::Error::other(format!("Failed to register Prometheus gauge: {err}")))?;
    Ok(())
}

/**
 * Reads the configuration from the specified file.
 *
 * #Arguments
 * `config_file`: The path to the configuration file.
 *
 * #Returns
 * A `Result` containing the parsed `Config` or an `std::io::Error` if reading or parsing fails.
*/
fn get_config(config_file: &str) -> Result<model::config::Config, std::io::Error> {
    let config_str: String = std::fs::read_to_string(config_file).map_err(|err| std::io::Error::other(format!("Failed to read config file: {err}")))?;
    let config: model::config::Config = toml::from_str(&config_str).map_err(|err| std::io::Error::other(format!("Failed to parse config file: {err}")))?;
    Ok(config)
}
