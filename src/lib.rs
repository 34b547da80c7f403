// src/lib.rs
pub mod acquisition;
pub mod classifier;
pub mod config;
pub mod decoder;
pub mod error;
pub mod plot;
pub mod recorder;
pub mod scheduler;
pub mod segmentation;
pub mod types;
pub use error::{Anomaly, Result, SpellerError};
