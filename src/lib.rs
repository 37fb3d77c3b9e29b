// Re-export needed modules for testing
pub mod audio;
pub mod chat; // Send/receive orchestration
pub mod config;
pub mod error;
pub mod format; // Lightweight markup to display markup
pub mod models;
pub mod persistence;
pub mod simulation; // Scripted replies and delivery acknowledgements
pub mod store;

// Re-export main types for convenience
pub use chat::ChatSession;
pub use config::ChatConfig;
pub use error::ChatError;
pub use models::*;
