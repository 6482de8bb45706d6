// lib.rs - Main library file that exports all modules
pub mod chat;
pub mod config;
pub mod credentials;
pub mod summarizer_client;
pub mod summary;
pub mod types;
pub mod utils;

// Re-export commonly used types for convenience
pub use chat::*;
pub use config::*;
pub use credentials::*;
pub use summarizer_client::*;
pub use summary::*;
pub use types::*;
pub use utils::*;
