//! Core constants and error types (always included).

mod constants;
mod error;

pub use constants::*;
pub use error::{ConnectionError, TransportError};
