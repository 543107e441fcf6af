//! # headless-gl common
//!
//! Logging configuration shared by the headless-gl library, its integration
//! tests and its benchmarks.

pub mod logging;

pub use logging::{init_logging, try_init_logging, LogConfig, LogFormat, LoggingError};
