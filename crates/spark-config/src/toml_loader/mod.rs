//! Locating, reading and first-run creation of the config file.

mod loader;
mod template;


pub use loader::{config_path, load_from_path, load_or_create};
