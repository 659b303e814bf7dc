//! In-memory registry of all site records.

use crate::error::{StoreError, EMAIL_FIELD, REGISTRATION_NUMBER_FIELD};
use crate::types::*;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

/// Snapshot schema version.
const REGISTRY_VERSION: u32 = 1;

/// Number of countries reported on the dashboard.
const TOP_COUNTRIES: usize = 10;

/// Window for "recent" registrations on the dashboard.
const RECENT_DAYS: i64 = 7;

/// All persisted records plus the bookkeeping that keeps registration
/// numbers unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registry {
    version: u32,

    /// Registrations in creation order
    #[serde(default)]
    registrations: Vec<RegistrationRecord>,

    /// Every number ever issued, including those of deleted registrations
    #[serde(default)]
    issued_numbers: HashSet<String>,

    /// Highest issued number; kept after the registration is deleted
    #[serde(default)]
    last_issued: Option<String>,

    /// Named monotonic counters
    #[serde(default)]
    sequences: HashMap<String, u64>,

    #[serde(default)]
    contact_messages: Vec<ContactMessage>,

    /// Subscriptions keyed by lower-cased email
    #[serde(default)]
    newsletter: BTreeMap<String, NewsletterSubscription>,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            version: REGISTRY_VERSION,
            registrations: Vec::new(),
            issued_numbers: HashSet::new(),
            last_issued: None,
            sequences: HashMap::new(),
            contact_messages: Vec::new(),
            newsletter: BTreeMap::new(),
        }
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // Registrations

    /// The highest-suffix registration number issued so far. Falls back to
    /// the first malformed number only while no well-formed one exists.
    pub fn latest_registration_number(&self) -> Option<&str> {
        self.last_issued.as_deref().filter(|n| !n.is_empty())
    }

    /// Fetch-and-increment a named counter. The counter never goes below
    /// `floor`, so the first value handed out is at least `floor + 1`.
    pub fn next_sequence(&mut self, key: &str, floor: u64) -> u64 {
        let counter = self.sequences.entry(key.to_string()).or_insert(0);
        *counter = (*counter).max(floor) + 1;
        *counter
    }

    /// Current value of a named counter, if it was ever used.
    pub fn sequence_value(&self, key: &str) -> Option<u64> {
        self.sequences.get(key).copied()
    }

    /// Insert a registration, enforcing uniqueness of its number (against
    /// every number ever issued) and of its email.
    pub fn insert_registration(
        &mut self,
        record: RegistrationRecord,
    ) -> Result<RegistrationRecord, StoreError> {
        if record.registration_number.trim().is_empty() {
            return Err(StoreError::InvalidRecord(
                "registration number must not be empty".into(),
            ));
        }
        if self.issued_numbers.contains(&record.registration_number) {
            return Err(StoreError::UniquenessConflict {
                field: REGISTRATION_NUMBER_FIELD,
                value: record.registration_number,
            });
        }
        if self.email_registered(&record.details.email) {
            return Err(StoreError::UniquenessConflict {
                field: EMAIL_FIELD,
                value: record.details.email.clone(),
            });
        }

        let number = record.registration_number.clone();
        if self.advances_latest(&number) {
            self.last_issued = Some(number.clone());
        }
        self.issued_numbers.insert(number);
        self.registrations.push(record.clone());
        Ok(record)
    }

    /// Inserts may land out of suffix order when writers reserve numbers
    /// ahead of inserting them; the latest number only moves forward.
    fn advances_latest(&self, number: &str) -> bool {
        match self.last_issued.as_deref().and_then(parse_suffix) {
            None => true,
            Some(current) => parse_suffix(number).is_some_and(|n| n > current),
        }
    }

    pub fn get_registration(&self, number: &str) -> Option<&RegistrationRecord> {
        self.registrations
            .iter()
            .find(|r| r.registration_number == number)
    }

    /// Registrations matching the filter, newest first.
    pub fn list_registrations(&self, filter: &RegistrationFilter) -> Vec<&RegistrationRecord> {
        self.registrations
            .iter()
            .rev()
            .filter(|r| filter.matches(r))
            .collect()
    }

    /// Remove a registration. Its number stays reserved.
    pub fn delete_registration(&mut self, number: &str) -> Option<RegistrationRecord> {
        let index = self
            .registrations
            .iter()
            .position(|r| r.registration_number == number)?;
        Some(self.registrations.remove(index))
    }

    pub fn email_registered(&self, email: &str) -> bool {
        let email = email.trim();
        self.registrations
            .iter()
            .any(|r| r.details.email.eq_ignore_ascii_case(email))
    }

    /// Set the status of every listed registration. Returns the number of
    /// registrations matched.
    pub fn set_status(
        &mut self,
        numbers: &[String],
        status: RegistrationStatus,
        now: DateTime<Utc>,
    ) -> usize {
        let mut updated = 0;
        for record in self
            .registrations
            .iter_mut()
            .filter(|r| numbers.contains(&r.registration_number))
        {
            record.status = status;
            record.updated_at = now;
            updated += 1;
        }
        updated
    }

    pub fn set_admin_notes(
        &mut self,
        number: &str,
        notes: String,
        now: DateTime<Utc>,
    ) -> Result<RegistrationRecord, StoreError> {
        let record = self
            .registrations
            .iter_mut()
            .find(|r| r.registration_number == number)
            .ok_or_else(|| StoreError::NotFound(number.to_string()))?;
        record.admin_notes = notes;
        record.updated_at = now;
        Ok(record.clone())
    }

    pub fn registration_count(&self) -> usize {
        self.registrations.len()
    }

    // Contact messages

    pub fn insert_contact_message(&mut self, message: ContactMessage) -> ContactMessage {
        self.contact_messages.push(message.clone());
        message
    }

    /// Contact messages matching `filter`, newest first.
    pub fn list_contact_messages(&self, filter: &ContactMessageFilter) -> Vec<&ContactMessage> {
        self.contact_messages
            .iter()
            .rev()
            .filter(|m| filter.matches(m))
            .collect()
    }

    /// Record the staff reply to a message. A replied message is also read.
    pub fn reply_contact_message(
        &mut self,
        id: Uuid,
        reply: String,
    ) -> Result<ContactMessage, StoreError> {
        let message = self
            .contact_messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        message.admin_reply = reply;
        message.is_replied = true;
        message.is_read = true;
        Ok(message.clone())
    }

    pub fn mark_contact_messages(&mut self, ids: &[Uuid], action: MessageAction) -> usize {
        let mut updated = 0;
        for message in self
            .contact_messages
            .iter_mut()
            .filter(|m| ids.contains(&m.id))
        {
            match action {
                MessageAction::MarkRead => message.is_read = true,
                MessageAction::MarkUnread => message.is_read = false,
                MessageAction::MarkReplied => {
                    message.is_read = true;
                    message.is_replied = true;
                }
            }
            updated += 1;
        }
        updated
    }

    // Newsletter

    pub fn subscription(&self, email: &str) -> Option<&NewsletterSubscription> {
        self.newsletter.get(&email.trim().to_lowercase())
    }

    pub fn subscribe(&mut self, email: &str) -> Result<NewsletterSubscription, StoreError> {
        let email = email.trim().to_lowercase();
        if self.newsletter.contains_key(&email) {
            return Err(StoreError::UniquenessConflict {
                field: EMAIL_FIELD,
                value: email,
            });
        }
        let subscription = NewsletterSubscription::new(email.clone());
        self.newsletter.insert(email, subscription.clone());
        Ok(subscription)
    }

    pub fn set_subscriptions_active(
        &mut self,
        emails: &[String],
        active: bool,
        now: DateTime<Utc>,
    ) -> usize {
        let mut updated = 0;
        for email in emails {
            if let Some(subscription) = self.newsletter.get_mut(&email.trim().to_lowercase()) {
                subscription.is_active = active;
                subscription.updated_at = now;
                updated += 1;
            }
        }
        updated
    }

    /// Subscriptions ordered by email, optionally only active or inactive ones.
    pub fn list_subscriptions(&self, active: Option<bool>) -> Vec<&NewsletterSubscription> {
        self.newsletter
            .values()
            .filter(|s| active.is_none_or(|a| a == s.is_active))
            .collect()
    }

    pub fn subscription_count(&self) -> usize {
        self.newsletter.len()
    }

    // Dashboard

    pub fn stats(&self, now: DateTime<Utc>) -> DashboardStats {
        let count_status = |status: RegistrationStatus| {
            self.registrations
                .iter()
                .filter(|r| r.status == status)
                .count()
        };

        let recent_cutoff = now - Duration::days(RECENT_DAYS);

        let mut by_country: HashMap<&str, usize> = HashMap::new();
        for record in &self.registrations {
            *by_country.entry(record.details.country.trim()).or_default() += 1;
        }
        let countries_count = by_country.len();

        let mut top_countries: Vec<CountryCount> = by_country
            .into_iter()
            .map(|(country, count)| CountryCount {
                country: country.to_string(),
                count,
            })
            .collect();
        top_countries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.country.cmp(&b.country)));
        top_countries.truncate(TOP_COUNTRIES);

        DashboardStats {
            total_registrations: self.registrations.len(),
            pending_registrations: count_status(RegistrationStatus::Pending),
            approved_registrations: count_status(RegistrationStatus::Approved),
            recent_registrations: self
                .registrations
                .iter()
                .filter(|r| r.created_at >= recent_cutoff)
                .count(),
            unread_messages: self.contact_messages.iter().filter(|m| !m.is_read).count(),
            countries_count,
            visa_requests: self
                .registrations
                .iter()
                .filter(|r| r.details.needs_visa_assistance)
                .count(),
            registrations_by_status: RegistrationStatus::ALL
                .into_iter()
                .map(|status| StatusCount {
                    status,
                    count: count_status(status),
                })
                .collect(),
            top_countries,
        }
    }
}
