//! spark configuration.
//!
//! One TOML file holds the service credentials, model tunables, session
//! behaviour and logging level. Every section has defaults, so a file only
//! needs the keys it changes. `spark --setup` fills in the credentials.

pub mod schema;
pub mod toml_loader;
pub mod toml_writer;
pub mod validation;

pub use schema::SparkConfig;
pub use toml_loader::{config_path, load_from_path, load_or_create};
pub use toml_writer::save_config_to_path;
