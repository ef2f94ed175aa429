//! Virtual try-on job service
//!
//! Accepts photo uploads, serves a garment catalog, and runs try-on jobs
//! through a queued → processing → succeeded/failed lifecycle, either with
//! a simulated compositor or by delegating to an external worker that
//! reports back over a webhook.

pub mod app_state;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
