//! Communication with the central collector.
//!
//! Blocking HTTP with JSON bodies: agents pull configuration updates and
//! push finished aggregate intervals.

pub mod client;

pub use client::{normalize_base_url, CentralClient};
