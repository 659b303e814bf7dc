//! Storage errors.

use thiserror::Error;

/// Field name used in uniqueness conflicts on the registration number.
pub const REGISTRATION_NUMBER_FIELD: &str = "registration_number";

/// Field name used in uniqueness conflicts on email addresses.
pub const EMAIL_FIELD: &str = "email";

#[derive(Error, Debug)]
pub enum StoreError {
    /// A unique field already holds this value.
    #[error("Duplicate {field}: {value}")]
    UniquenessConflict { field: &'static str, value: String },

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// True if this is a uniqueness conflict on the given field.
    pub fn is_conflict_on(&self, field: &str) -> bool {
        matches!(self, StoreError::UniquenessConflict { field: f, .. } if *f == field)
    }
}
