//! Shared record store with serialized, durable writes.

use crate::error::StoreError;
use crate::persist::Persistence;
use crate::registry::Registry;
use crate::types::*;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Derives the number for a new registration from the latest issued one.
pub type Numbering = Box<dyn FnOnce(Option<&str>) -> String + Send>;

/// The storage boundary the registration number allocator works against.
#[async_trait]
pub trait RegistrationLedger: Send + Sync {
    /// The highest issued non-empty registration number, if any.
    async fn latest_registration_number(&self) -> Result<Option<String>, StoreError>;

    /// Atomic fetch-and-increment of a named counter, never below `floor + 1`.
    async fn next_sequence(&self, key: &str, floor: u64) -> Result<u64, StoreError>;

    /// Durably insert a registration. Fails with
    /// [`StoreError::UniquenessConflict`] if its number was issued before.
    async fn insert_registration(
        &self,
        record: RegistrationRecord,
    ) -> Result<RegistrationRecord, StoreError>;

    /// Read the latest issued number, derive the next one with `numbering`
    /// and insert the registration, all in one serializable transaction.
    async fn insert_with_number(
        &self,
        details: NewRegistration,
        numbering: Numbering,
    ) -> Result<RegistrationRecord, StoreError>;
}

/// Cloneable handle to the registry and its persistence backend.
///
/// Every write runs as a serialized transaction: the write lock is held
/// while a working copy is changed and persisted, and the copy is only
/// published once the snapshot is saved. A failed change or save leaves the
/// visible state untouched.
#[derive(Clone)]
pub struct RecordStore {
    registry: Arc<RwLock<Registry>>,
    persistence: Arc<Persistence>,
}

impl RecordStore {
    /// Load the registry from the backend.
    pub async fn open(persistence: Persistence) -> Result<Self, StoreError> {
        let registry = persistence.load().await?;
        info!(
            "Record store opened ({} registrations, durable={})",
            registry.registration_count(),
            persistence.is_durable()
        );
        Ok(Self::with_registry(registry, persistence))
    }

    pub fn with_registry(registry: Registry, persistence: Persistence) -> Self {
        Self {
            registry: Arc::new(RwLock::new(registry)),
            persistence: Arc::new(persistence),
        }
    }

    /// Empty, non-durable store.
    pub fn memory() -> Self {
        Self::with_registry(Registry::new(), Persistence::memory())
    }

    /// Run a read-only closure against the current state.
    pub async fn read<T>(&self, f: impl FnOnce(&Registry) -> T) -> T {
        let registry = self.registry.read().await;
        f(&registry)
    }

    /// Run a change as one serialized, durable transaction.
    ///
    /// Each call clones the whole registry and writes a full snapshot, so
    /// write cost grows with the number of records. A `sequence` allocation
    /// pays this twice: once for the counter, once for the insert.
    pub async fn transaction<T>(
        &self,
        f: impl FnOnce(&mut Registry) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut registry = self.registry.write().await;
        let mut working = registry.clone();
        let value = f(&mut working)?;
        self.persistence.save(&working).await?;
        *registry = working;
        Ok(value)
    }

    // Registrations

    pub async fn get_registration(&self, number: &str) -> Option<RegistrationRecord> {
        self.read(|r| r.get_registration(number).cloned()).await
    }

    pub async fn list_registrations(&self, filter: &RegistrationFilter) -> Vec<RegistrationRecord> {
        self.read(|r| r.list_registrations(filter).into_iter().cloned().collect())
            .await
    }

    pub async fn email_registered(&self, email: &str) -> bool {
        self.read(|r| r.email_registered(email)).await
    }

    pub async fn registration_count(&self) -> usize {
        self.read(Registry::registration_count).await
    }

    #[instrument(skip(self))]
    pub async fn set_status(
        &self,
        numbers: &[String],
        status: RegistrationStatus,
    ) -> Result<usize, StoreError> {
        let updated = self
            .transaction(|r| Ok(r.set_status(numbers, status, Utc::now())))
            .await?;
        info!(updated, %status, "Registration status updated");
        Ok(updated)
    }

    #[instrument(skip(self, notes))]
    pub async fn set_admin_notes(
        &self,
        number: &str,
        notes: String,
    ) -> Result<RegistrationRecord, StoreError> {
        self.transaction(|r| r.set_admin_notes(number, notes, Utc::now()))
            .await
    }

    #[instrument(skip(self))]
    pub async fn delete_registration(&self, number: &str) -> Result<RegistrationRecord, StoreError> {
        let removed = self
            .transaction(|r| {
                r.delete_registration(number)
                    .ok_or_else(|| StoreError::NotFound(number.to_string()))
            })
            .await?;
        info!(registration_number = %number, "Registration deleted, number stays reserved");
        Ok(removed)
    }

    // Contact messages

    #[instrument(skip(self, message))]
    pub async fn insert_contact_message(
        &self,
        message: NewContactMessage,
    ) -> Result<ContactMessage, StoreError> {
        let stored = self
            .transaction(|r| Ok(r.insert_contact_message(ContactMessage::new(message))))
            .await?;
        debug!(id = %stored.id, "Contact message stored");
        Ok(stored)
    }

    pub async fn list_contact_messages(&self, filter: &ContactMessageFilter) -> Vec<ContactMessage> {
        self.read(|r| r.list_contact_messages(filter).into_iter().cloned().collect())
            .await
    }

    #[instrument(skip(self, reply))]
    pub async fn reply_contact_message(
        &self,
        id: Uuid,
        reply: String,
    ) -> Result<ContactMessage, StoreError> {
        let replied = self
            .transaction(|r| r.reply_contact_message(id, reply))
            .await?;
        info!(id = %replied.id, "Contact message replied");
        Ok(replied)
    }

    #[instrument(skip(self))]
    pub async fn mark_contact_messages(
        &self,
        ids: &[Uuid],
        action: MessageAction,
    ) -> Result<usize, StoreError> {
        self.transaction(|r| Ok(r.mark_contact_messages(ids, action)))
            .await
    }

    // Newsletter

    #[instrument(skip(self))]
    pub async fn subscribe(&self, email: &str) -> Result<NewsletterSubscription, StoreError> {
        self.transaction(|r| r.subscribe(email)).await
    }

    pub async fn subscription(&self, email: &str) -> Option<NewsletterSubscription> {
        self.read(|r| r.subscription(email).cloned()).await
    }

    pub async fn list_subscriptions(&self, active: Option<bool>) -> Vec<NewsletterSubscription> {
        self.read(|r| r.list_subscriptions(active).into_iter().cloned().collect())
            .await
    }

    #[instrument(skip(self))]
    pub async fn set_subscriptions_active(
        &self,
        emails: &[String],
        active: bool,
    ) -> Result<usize, StoreError> {
        self.transaction(|r| Ok(r.set_subscriptions_active(emails, active, Utc::now())))
            .await
    }

    // Dashboard

    pub async fn stats(&self) -> DashboardStats {
        self.read(|r| r.stats(Utc::now())).await
    }
}

#[async_trait]
impl RegistrationLedger for RecordStore {
    async fn latest_registration_number(&self) -> Result<Option<String>, StoreError> {
        Ok(self
            .read(|r| r.latest_registration_number().map(String::from))
            .await)
    }

    async fn next_sequence(&self, key: &str, floor: u64) -> Result<u64, StoreError> {
        self.transaction(|r| Ok(r.next_sequence(key, floor))).await
    }

    async fn insert_registration(
        &self,
        record: RegistrationRecord,
    ) -> Result<RegistrationRecord, StoreError> {
        self.transaction(|r| r.insert_registration(record)).await
    }

    async fn insert_with_number(
        &self,
        details: NewRegistration,
        numbering: Numbering,
    ) -> Result<RegistrationRecord, StoreError> {
        self.transaction(|r| {
            let number = numbering(r.latest_registration_number());
            r.insert_registration(RegistrationRecord::new(number, details))
        })
        .await
    }
}
