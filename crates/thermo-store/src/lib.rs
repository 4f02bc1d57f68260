//! Time-series store for temperature readings.
#![forbid(unsafe_code)]
//!
//! `thermo-store` persists readings into named resolution streams and keeps
//! a downsampling chain running behind them:
//!
//! - **Streams**: `raw`, `mean_60s`, `mean_1h`, `mean_1d`
//! - **Retention**: raw readings expire after one hour, derived streams are kept
//! - **Rollups**: each derived stream is the epoch-aligned mean of the one before it
//! - **Backends**: an embedded engine ([`MemoryStore`]) and InfluxDB 1.x ([`InfluxStore`])
//!
//! # Example
//!
//! ```rust
//! use thermo_store::{Lookback, MemoryStore, Reading, Resolution, Store};
//!
//! # tokio_test();
//! # fn tokio_test() {
//! # let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! # rt.block_on(async {
//! let store = MemoryStore::new("sensor_data");
//! store.ensure_initialized().await.unwrap();
//!
//! store.append(Resolution::Raw, Reading::now(21.5)).await.unwrap();
//!
//! let lookback: Lookback = "1h".parse().unwrap();
//! let readings = store.query(Resolution::Raw, lookback).await.unwrap();
//! assert_eq!(readings.len(), 1);
//! # });
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/thermo-store/0.1.0")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod influx;
pub mod lookback;
pub mod memory;
pub mod rollup;
pub mod store;
pub mod types;

// Re-export main types at crate root
pub use error::{Result, StoreError};
pub use influx::{InfluxConfig, InfluxStore};
pub use lookback::{Lookback, LookbackUnit};
pub use memory::MemoryStore;
pub use store::Store;
pub use types::{Aggregation, FIELD, Reading, Resolution, RetentionPolicy, RollupRule};
