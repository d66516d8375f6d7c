//! Core domain + delivery logic for webhook log notifications.
//!
//! This crate is intentionally transport-agnostic. The Discord HTTP client and
//! the `tracing` bridge live in adapter crates behind the `DeliveryPort` trait.

pub mod config;
pub mod delivery;
pub mod domain;
pub mod errors;
pub mod layout;
pub mod presenter;
pub mod sink;

pub use errors::{Error, Result};
