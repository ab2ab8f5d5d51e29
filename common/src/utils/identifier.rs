//! SQL identifier validator.
//!
//! Table and column names are spliced into statement text (quoted), so they
//! are restricted to a conservative character set.

use crate::errors::DataError;

/// Longest identifier accepted by every supported backend (MySQL caps at 64).
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Validates table and column names.
pub struct IdentifierValidator;

impl IdentifierValidator {
    /// Validates an identifier.
    ///
    /// # Arguments
    /// * `ident` - The table or column name to check
    ///
    /// # Errors
    /// Returns `DataError::TypeResolution` unless the identifier matches
    /// `[A-Za-z_][A-Za-z0-9_]*` and is at most 64 characters long.
    pub fn validate(ident: &str) -> Result<(), DataError> {
        if Self::is_valid(ident) {
            Ok(())
        } else {
            Err(DataError::TypeResolution(format!(
                "invalid identifier `{}`: expected [A-Za-z_][A-Za-z0-9_]* of at most {} characters",
                ident, MAX_IDENTIFIER_LEN
            )))
        }
    }

    /// Checks an identifier without building an error.
    pub fn is_valid(ident: &str) -> bool {
        let mut chars = ident.chars();
        let first_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
        first_ok
            && ident.len() <= MAX_IDENTIFIER_LEN
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
}
