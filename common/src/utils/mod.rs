//! Utility functions and helpers.

pub mod identifier;

// Re-export commonly used types
pub use identifier::IdentifierValidator;
