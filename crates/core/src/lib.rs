pub mod config;
pub mod date;
pub mod error;
pub mod record;

pub use config::Config;
pub use date::*;
pub use error::*;
pub use record::*;
