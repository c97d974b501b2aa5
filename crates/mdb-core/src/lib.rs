//! Core domain + application logic for the media download bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and the upstream
//! download services live behind ports (traits) implemented in adapter
//! crates.

pub mod cleanup;
pub mod config;
pub mod domain;
pub mod errors;
pub mod failure;
pub mod formatting;
pub mod logging;
pub mod ports;
pub mod security;

pub use errors::{Error, Result};
