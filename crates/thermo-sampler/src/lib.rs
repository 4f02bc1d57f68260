//! Fixed-cadence sampling of a temperature sensor.
#![forbid(unsafe_code)]
//!
//! The [`Sampler`] reads a [`SensorSource`] every interval, measured from a
//! fixed start instant so lateness never accumulates, and appends each value
//! to the store's raw stream. Ticks where the sensor has no value are
//! skipped; store failures are logged and the loop carries on.

#![doc(html_root_url = "https://docs.rs/thermo-sampler/0.1.0")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod cadence;
pub mod error;
pub mod sampler;
pub mod sensor;

pub use cadence::Cadence;
pub use error::{Result, SensorError};
pub use sampler::{Clock, DEFAULT_INTERVAL, Sampler, TickOutcome, TickReport, runtime_clock};
pub use sensor::{DEFAULT_W1_DEVICE, FakeSensor, SensorSource, W1Sensor, parse_w1_slave};
