//! `pricehound`: a concurrent, multi-retailer grocery price aggregation
//! engine.
//!
//! A task delegator (bounded-concurrency scheduler, [`delegator`]) drives
//! per-retailer fetch-and-parse jobs through an HTTP transfer driver
//! ([`transfer`]) and a registry of retailer adapters ([`adapters`]); the
//! [`resolver`] ties caching (via a [`gateway::DocumentStore`]) and dispatch
//! together, and the [`bus`] front-end exposes it to the rest of the system
//! over a publish/subscribe message bus.

pub mod adapters;
pub mod bus;
pub mod config;
pub mod delegator;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod product;
pub mod resolver;
pub mod store_id;
pub mod transfer;
pub mod value;
