//! Sequential, human-readable registration numbers (`TCP2025-0001`, ...).
//!
//! The allocator derives the next number from the latest issued one (or
//! from a store-managed counter) and inserts the new registration through a
//! [`RegistrationLedger`](registration_store::RegistrationLedger), whose
//! uniqueness constraint is the final guard against duplicates. Numbers
//! rejected by that constraint are recomputed from a fresh read, a bounded
//! number of times.

mod allocator;
mod error;
mod identifier;

pub use allocator::{AllocationStrategy, RegistrationNumberAllocator, DEFAULT_MAX_ATTEMPTS};
pub use error::AllocationError;
pub use identifier::{format_identifier, next_suffix, parse_suffix, DEFAULT_PREFIX, SUFFIX_WIDTH};
