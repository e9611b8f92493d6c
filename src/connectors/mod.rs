//! External Service Connectors
//!
//! Adapters for the collaborators this service does not own. Today that is the
//! user directory (identity, role, profile picture, presence flag).
//!
//! ## Architecture Pattern
//!
//! 1. Define the trait in `{service}/mod.rs` so tests can swap it
//! 2. Implement the HTTP client next to it
//! 3. Configuration in `config.rs` enables/disables it per environment
//! 4. Inject the trait object; callers never depend on the HTTP implementation
//!
//! ## Usage
//!
//! ```ignore
//! let directory = connectors::init_user_directory(&settings.connectors);
//! let lawyer = directory.get_user("lawyer-lee").await?;
//! ```

pub mod config;
pub mod errors;
pub mod user_directory;

pub use config::{ConnectorConfig, UserDirectoryConfig};
pub use errors::ConnectorError;
pub use user_directory::{StaticUserDirectory, UserDirectory, UserDirectoryClient};

pub use user_directory::init as init_user_directory;
