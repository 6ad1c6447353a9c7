//! OfertaFlash server library
//!
//! Billing webhooks and checkout, provider proxies (AI, speech, social,
//! catalog) and the poster layout planner.

pub mod clients;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod security;
pub mod services;
pub mod utils;

pub use config::AppSettings;
pub use error::AppError;
