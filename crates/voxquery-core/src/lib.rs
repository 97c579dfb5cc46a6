pub mod config;
pub mod error;
pub mod types;

pub use config::VoxQueryConfig;
pub use error::{Result, VoxQueryError};
pub use types::*;
