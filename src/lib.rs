//! Tick Ring
//!
//! A hashed timer-wheel task scheduler. Tasks are placed into a fixed ring of
//! slots by tick offset, and every tick the due tasks are grouped by kind and
//! executed in batches.

pub mod config;
pub mod error;
pub mod ring;
pub mod telemetry;

pub use error::{AppError, Result};
pub use ring::{Ring, RingBuilder, RingConfig, RingError, RingResult};
