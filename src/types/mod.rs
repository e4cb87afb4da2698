//! Shared types for the farm backend

pub mod error;
pub mod response;

pub use error::{FarmError, Result};
pub use response::{ApiResponse, ResponseKey};
