//! optica-hex: order lifecycle core (pricing, ownership, queries, status)
//! plus its inbound HTTP adapter.

pub mod config;
pub mod errors;

pub mod application;

pub use optica_types::{domain, ports};

pub mod inbound; // HTTP adapter (server + handlers)
