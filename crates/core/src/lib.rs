pub mod config;
pub mod error;

pub use config::{load_dotenv, QueueConfig};
pub use error::ConfigError;
