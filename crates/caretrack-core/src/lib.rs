pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use error::{CareError, Result};
