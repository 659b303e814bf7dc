//! Registration number allocation against a shared ledger.

use crate::error::AllocationError;
use crate::identifier::{format_identifier, next_suffix, parse_suffix, DEFAULT_PREFIX};
use registration_store::{
    NewRegistration, RegistrationLedger, RegistrationRecord, StoreError,
    REGISTRATION_NUMBER_FIELD,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default number of insert attempts before giving up on a conflict.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// How a new registration gets its number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationStrategy {
    /// Read the latest number and insert in one serializable transaction
    #[default]
    Transaction,
    /// Fetch-and-increment a counter keyed by the prefix
    Sequence,
    /// Read the latest number, then insert; relies on the uniqueness
    /// constraint and retries on conflict
    Scan,
}

impl fmt::Display for AllocationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AllocationStrategy::Transaction => "transaction",
            AllocationStrategy::Sequence => "sequence",
            AllocationStrategy::Scan => "scan",
        })
    }
}

/// Hands out `PREFIX-NNNN` numbers for new registrations.
///
/// [`allocate`](Self::allocate) only computes the next candidate from the
/// current state. [`create`](Self::create) computes a number and inserts the
/// registration with it, retrying with a fresh read when the storage
/// uniqueness constraint rejects the number.
pub struct RegistrationNumberAllocator<L: ?Sized> {
    ledger: Arc<L>,
    prefix: String,
    strategy: AllocationStrategy,
    max_attempts: u32,
}

impl<L: ?Sized> Clone for RegistrationNumberAllocator<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
            prefix: self.prefix.clone(),
            strategy: self.strategy,
            max_attempts: self.max_attempts,
        }
    }
}

impl<L: RegistrationLedger + ?Sized> RegistrationNumberAllocator<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self {
            ledger,
            prefix: DEFAULT_PREFIX.to_string(),
            strategy: AllocationStrategy::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_strategy(mut self, strategy: AllocationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// At least one attempt is always made.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn strategy(&self) -> AllocationStrategy {
        self.strategy
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// The number the next registration would get, given the current state.
    ///
    /// Read-only: calling it again without an intervening write returns the
    /// same value.
    pub async fn allocate(&self) -> Result<String, StoreError> {
        let latest = self.ledger.latest_registration_number().await?;
        Ok(format_identifier(&self.prefix, next_suffix(latest.as_deref())))
    }

    /// Number a new registration and insert it.
    pub async fn create(
        &self,
        details: NewRegistration,
    ) -> Result<RegistrationRecord, AllocationError> {
        for attempt in 1..=self.max_attempts {
            match self.try_create(details.clone()).await {
                Ok(record) => {
                    info!(
                        registration_number = %record.registration_number,
                        attempt,
                        strategy = %self.strategy,
                        "Registration created"
                    );
                    return Ok(record);
                }
                Err(e) if e.is_conflict_on(REGISTRATION_NUMBER_FIELD) => {
                    warn!(attempt, error = %e, "Registration number taken, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(
            attempts = self.max_attempts,
            "Giving up on registration after repeated number conflicts"
        );
        Err(AllocationError::Conflict {
            attempts: self.max_attempts,
        })
    }

    async fn try_create(&self, details: NewRegistration) -> Result<RegistrationRecord, StoreError> {
        match self.strategy {
            AllocationStrategy::Transaction => {
                let prefix = self.prefix.clone();
                self.ledger
                    .insert_with_number(
                        details,
                        Box::new(move |latest| format_identifier(&prefix, next_suffix(latest))),
                    )
                    .await
            }
            AllocationStrategy::Sequence => {
                let number = self.next_from_sequence().await?;
                self.ledger
                    .insert_registration(RegistrationRecord::new(number, details))
                    .await
            }
            AllocationStrategy::Scan => {
                let number = self.allocate().await?;
                self.ledger
                    .insert_registration(RegistrationRecord::new(number, details))
                    .await
            }
        }
    }

    /// Take the next counter value. The counter is floored at the suffix of
    /// the latest issued number, so numbers issued before the counter
    /// existed are never handed out again.
    async fn next_from_sequence(&self) -> Result<String, StoreError> {
        let latest = self.ledger.latest_registration_number().await?;
        let floor = latest.as_deref().and_then(parse_suffix).unwrap_or(0);
        let suffix = self.ledger.next_sequence(&self.prefix, floor).await?;
        debug!(suffix, floor, "Sequence value taken");
        Ok(format_identifier(&self.prefix, suffix))
    }
}
