pub mod errors;
pub mod id;
pub mod model;

pub use errors::{ConfigError, SparkError};
pub use id::{new_chat_id, new_chat_id_at, new_uid};
pub use model::ModelVersion;

pub type Result<T> = std::result::Result<T, SparkError>;
