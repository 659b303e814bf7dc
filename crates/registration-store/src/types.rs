//! Record types for registrations, contact messages and newsletter signups.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Review status of a registration.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    /// Submitted, awaiting review
    #[default]
    Pending,
    Approved,
    Rejected,
    Waitlist,
}

impl RegistrationStatus {
    pub const ALL: [RegistrationStatus; 4] = [
        RegistrationStatus::Pending,
        RegistrationStatus::Approved,
        RegistrationStatus::Rejected,
        RegistrationStatus::Waitlist,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "pending",
            RegistrationStatus::Approved => "approved",
            RegistrationStatus::Rejected => "rejected",
            RegistrationStatus::Waitlist => "waitlist",
        }
    }

    /// Human-readable label shown to staff.
    pub fn label(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "Pending Review",
            RegistrationStatus::Approved => "Approved",
            RegistrationStatus::Rejected => "Rejected",
            RegistrationStatus::Waitlist => "Waitlist",
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RegistrationStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown registration status: {}", s))
    }
}

/// Participant-supplied registration details.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewRegistration {
    pub fullname: String,
    pub organization: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub city: String,
    pub country: String,

    /// Lower-cased email address, unique across registrations
    pub email: String,
    pub phone: String,

    #[serde(default)]
    pub arrival_date: Option<NaiveDate>,
    #[serde(default)]
    pub departure_date: Option<NaiveDate>,
    #[serde(default)]
    pub needs_visa_assistance: bool,

    #[serde(default)]
    pub interested_in_panels: bool,
    #[serde(default)]
    pub interested_in_capacity_building: bool,
    #[serde(default)]
    pub interested_in_networking: bool,

    #[serde(default)]
    pub dietary_restrictions: String,
    #[serde(default = "default_true")]
    pub receive_updates: bool,
}

fn default_true() -> bool {
    true
}

/// Numeric suffix after the last `-` of a registration number, if it is a
/// plain run of digits that fits in a `u64`.
pub fn parse_suffix(registration_number: &str) -> Option<u64> {
    let tail = registration_number
        .rsplit_once('-')
        .map_or(registration_number, |(_, tail)| tail);
    if tail.is_empty() || !tail.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    tail.parse().ok()
}

/// A persisted registration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistrationRecord {
    pub id: Uuid,

    /// Human-readable identifier such as `TCP2025-0007`; never changes once issued
    pub registration_number: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub status: RegistrationStatus,
    #[serde(default)]
    pub admin_notes: String,

    #[serde(flatten)]
    pub details: NewRegistration,
}

impl RegistrationRecord {
    /// Create a pending record carrying an already allocated number.
    pub fn new(registration_number: impl Into<String>, details: NewRegistration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            registration_number: registration_number.into(),
            created_at: now,
            updated_at: now,
            status: RegistrationStatus::Pending,
            admin_notes: String::new(),
            details,
        }
    }
}

/// Subject picked on the contact form.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ContactSubject {
    General,
    Registration,
    Partnership,
    Sponsorship,
    Media,
    Technical,
    Other,
}

impl ContactSubject {
    pub fn label(&self) -> &'static str {
        match self {
            ContactSubject::General => "General Inquiry",
            ContactSubject::Registration => "Event Registration",
            ContactSubject::Partnership => "Partnership Opportunities",
            ContactSubject::Sponsorship => "Sponsorship",
            ContactSubject::Media => "Media & Press",
            ContactSubject::Technical => "Technical Support",
            ContactSubject::Other => "Other",
        }
    }
}

/// Validated contact form submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewContactMessage {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub organization: String,
    pub subject: ContactSubject,
    pub message: String,
}

/// A stored contact message with its staff-facing flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactMessage {
    pub id: Uuid,
    #[serde(flatten)]
    pub content: NewContactMessage,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub is_replied: bool,
    #[serde(default)]
    pub admin_reply: String,
    pub created_at: DateTime<Utc>,
}

impl ContactMessage {
    pub fn new(content: NewContactMessage) -> Self {
        Self {
            id: Uuid::new_v4(),
            content,
            is_read: false,
            is_replied: false,
            admin_reply: String::new(),
            created_at: Utc::now(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.content.first_name, self.content.last_name)
    }
}

/// Bulk action applied to contact messages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageAction {
    MarkRead,
    MarkUnread,
    /// Also marks the message read
    MarkReplied,
}

/// Newsletter subscriber.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewsletterSubscription {
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewsletterSubscription {
    pub fn new(email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            email: email.into(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Staff-side filter over registrations. Empty fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistrationFilter {
    pub status: Option<RegistrationStatus>,
    /// Case-insensitive exact country match
    pub country: Option<String>,
    /// Inclusive lower bound on the creation date
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound on the creation date
    pub date_to: Option<NaiveDate>,
    pub needs_visa: Option<bool>,
    pub interested_in_panels: Option<bool>,
    pub interested_in_capacity_building: Option<bool>,
    pub interested_in_networking: Option<bool>,
    /// Case-insensitive substring over number, name, email, organization, phone and country
    pub search: Option<String>,
}

impl RegistrationFilter {
    pub fn matches(&self, record: &RegistrationRecord) -> bool {
        let details = &record.details;

        if self.status.is_some_and(|s| s != record.status) {
            return false;
        }
        if let Some(country) = non_blank(&self.country) {
            if !details.country.trim().eq_ignore_ascii_case(country) {
                return false;
            }
        }
        let created = record.created_at.date_naive();
        if self.date_from.is_some_and(|from| created < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| created > to) {
            return false;
        }
        let flags = [
            (self.needs_visa, details.needs_visa_assistance),
            (self.interested_in_panels, details.interested_in_panels),
            (
                self.interested_in_capacity_building,
                details.interested_in_capacity_building,
            ),
            (self.interested_in_networking, details.interested_in_networking),
        ];
        if flags
            .iter()
            .any(|(wanted, actual)| wanted.is_some_and(|w| w != *actual))
        {
            return false;
        }
        if let Some(needle) = non_blank(&self.search) {
            let needle = needle.to_lowercase();
            let haystacks = [
                record.registration_number.as_str(),
                details.fullname.as_str(),
                details.email.as_str(),
                details.organization.as_str(),
                details.phone.as_str(),
                details.country.as_str(),
            ];
            if !haystacks
                .iter()
                .any(|h| h.to_lowercase().contains(&needle))
            {
                return false;
            }
        }
        true
    }
}

/// Staff-side filter over contact messages.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactMessageFilter {
    pub subject: Option<ContactSubject>,
    pub is_read: Option<bool>,
    pub is_replied: Option<bool>,
    /// Case-insensitive substring over first name, last name, email and message
    pub search: Option<String>,
}

impl ContactMessageFilter {
    pub fn matches(&self, message: &ContactMessage) -> bool {
        if self.subject.is_some_and(|s| s != message.content.subject) {
            return false;
        }
        if self.is_read.is_some_and(|r| r != message.is_read) {
            return false;
        }
        if self.is_replied.is_some_and(|r| r != message.is_replied) {
            return false;
        }
        match non_blank(&self.search) {
            Some(needle) => {
                let needle = needle.to_lowercase();
                let content = &message.content;
                [
                    &content.first_name,
                    &content.last_name,
                    &content.email,
                    &content.message,
                ]
                .iter()
                .any(|h| h.to_lowercase().contains(&needle))
            }
            None => true,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusCount {
    pub status: RegistrationStatus,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CountryCount {
    pub country: String,
    pub count: usize,
}

/// Summary figures for the staff dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_registrations: usize,
    pub pending_registrations: usize,
    pub approved_registrations: usize,
    /// Registrations created in the last seven days
    pub recent_registrations: usize,
    pub unread_messages: usize,
    pub countries_count: usize,
    pub visa_requests: usize,
    pub registrations_by_status: Vec<StatusCount>,
    /// At most ten entries, most registrations first
    pub top_countries: Vec<CountryCount>,
}
