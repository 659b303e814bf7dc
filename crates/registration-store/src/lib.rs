//! Storage for the Customs PACT registration backend.
//!
//! Holds registrations, contact messages and newsletter subscriptions in a
//! single in-memory registry, enforces the uniqueness constraints the
//! registration number allocator relies on, and persists every committed
//! change as an atomic JSON snapshot.

mod error;
mod persist;
mod registry;
mod store;
mod types;

pub use error::{StoreError, EMAIL_FIELD, REGISTRATION_NUMBER_FIELD};
pub use persist::{FileStore, MemoryStore, Persistence};
pub use registry::Registry;
pub use store::{Numbering, RecordStore, RegistrationLedger};
pub use types::*;
