//! Allocation errors.

use registration_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AllocationError {
    /// Every attempt collided with a number issued concurrently.
    #[error("Could not allocate a unique registration number after {attempts} attempts")]
    Conflict { attempts: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AllocationError {
    /// True if the caller may simply submit again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AllocationError::Conflict { .. })
    }
}
