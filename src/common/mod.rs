//! Common utilities and types shared across tcready

pub mod config;
pub mod error;
pub mod utils;

pub use config::{CheckerConfig, Config};
pub use error::{Error, Result};
pub use utils::{bounded, duration_millis, label_selector, parse_duration};
