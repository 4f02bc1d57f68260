//! Time-range queries over thermo streams.
#![forbid(unsafe_code)]
//!
//! The [`QueryEngine`] takes a resolution and a lookback, reads the matching
//! stream from a [`thermo_store::Store`], converts every timestamp into the
//! display timezone (`Europe/Berlin` by default) and derives the chart's axis
//! ranges.
//!
//! # Example
//!
//! ```rust
//! use thermo_query::QueryEngine;
//! use thermo_store::{MemoryStore, Store};
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! # rt.block_on(async {
//! let store = MemoryStore::new("sensor_data");
//! store.ensure_initialized().await.unwrap();
//!
//! let engine = QueryEngine::new(store);
//! let series = engine.get_series("mean_60s", "1d").await.unwrap();
//! assert!(series.is_empty());
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/thermo-query/0.1.0")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod engine;
pub mod error;
pub mod series;
pub mod window;

pub use engine::{DEFAULT_TIMEZONE, QueryEngine};
pub use error::{QueryError, Result};
pub use series::{AxisRange, DisplayRange, LocalTime, Series, SeriesPoint, UNIT, Y_MARGIN};
pub use window::QueryWindow;
