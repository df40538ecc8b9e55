//! CLI entry point (`spec.md §6`): loads the config file named by the first
//! positional argument (default `config.json`), wires the resolver over an
//! in-memory document store and the known retailer adapters, and runs until
//! `ctrl_c`.
//!
//! Mirrors `original_source/webscraper/app.cpp::App::App`'s `std::exit(1)`
//! on an unreadable/invalid config file.

use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use pricehound::adapters::AdapterRegistry;
use pricehound::config::Config;
use pricehound::gateway::InMemoryStore;
use pricehound::resolver::Resolver;
use pricehound::transfer::TransferDriver;

#[tokio::main]
async fn main() {
    pricehound::logging::init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.json".to_owned());

    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(error) => {
            tracing::error!(path = %config_path, error = %error, "failed to load configuration");
            std::process::exit(1);
        }
    };

    let transfer = match TransferDriver::new(config.max_concurrent_transfers, &config.user_agent) {
        Ok(transfer) => transfer,
        Err(error) => {
            tracing::error!(error = %error, "failed to start the HTTP transfer driver");
            std::process::exit(1);
        }
    };

    let store = Arc::new(InMemoryStore::new());
    let adapters = Arc::new(AdapterRegistry::with_known_retailers());
    let _resolver = Resolver::new(
        store,
        adapters,
        transfer,
        config.max_concurrent_transfers,
        ChronoDuration::seconds(config.entry_expiry_seconds as i64),
    );

    match &config.bus {
        Some(bus) => tracing::info!(kind = ?bus.kind, host = %bus.path_or_hostname, "bus configured (wire transport out of scope, running unconnected)"),
        None => tracing::info!("no message bus configured; running with the resolver idle"),
    }

    tracing::info!("pricehound started");

    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!("failed to install ctrl-c handler");
        std::process::exit(1);
    }

    tracing::info!("shutting down");
}
