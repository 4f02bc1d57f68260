//! thermod - temperature logger daemon
//!
//! Wires the sensor sampler, the store and the query engine together behind
//! a TOML configuration.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod commands;
pub mod config;
pub mod error;

pub use backend::Backend;
pub use config::{BackendKind, ThermoConfig};
pub use error::{Result, ThermodError};
