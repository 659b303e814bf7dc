//! API request and response types.

use chrono::{DateTime, Utc};
use registration_store::{
    ContactMessage, MessageAction, NewsletterSubscription, RegistrationRecord,
    RegistrationStatus,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub registrations: usize,
}

/// Response after a successful registration.
#[derive(Debug, Serialize)]
pub struct RegistrationCreated {
    pub registration_number: String,
    pub status: RegistrationStatus,
    pub message: String,
}

impl From<&RegistrationRecord> for RegistrationCreated {
    fn from(record: &RegistrationRecord) -> Self {
        Self {
            registration_number: record.registration_number.clone(),
            status: record.status,
            message: format!(
                "Thank you for registering. Your registration number is {}.",
                record.registration_number
            ),
        }
    }
}

/// Query string of the public registration lookup.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegistrationLookup {
    /// Must match the registration's email
    pub email: String,
}

/// Public view of a registration's progress.
#[derive(Debug, Serialize)]
pub struct RegistrationStatusResponse {
    pub registration_number: String,
    pub fullname: String,
    pub status: RegistrationStatus,
    pub status_label: String,
    pub created_at: DateTime<Utc>,
}

impl From<RegistrationRecord> for RegistrationStatusResponse {
    fn from(record: RegistrationRecord) -> Self {
        Self {
            status_label: record.status.label().to_string(),
            registration_number: record.registration_number,
            fullname: record.details.fullname,
            status: record.status,
            created_at: record.created_at,
        }
    }
}

/// A page of the staff registration listing.
#[derive(Debug, Serialize)]
pub struct RegistrationListResponse {
    pub registrations: Vec<RegistrationRecord>,
    /// Matches across all pages
    pub total: usize,
    pub page: usize,
    pub pages: usize,
    pub page_size: usize,
}

/// Bulk status change on registrations.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationAction {
    Approve,
    Reject,
    Waitlist,
}

impl RegistrationAction {
    pub fn status(self) -> RegistrationStatus {
        match self {
            RegistrationAction::Approve => RegistrationStatus::Approved,
            RegistrationAction::Reject => RegistrationStatus::Rejected,
            RegistrationAction::Waitlist => RegistrationStatus::Waitlist,
        }
    }

    pub fn message(self, updated: usize) -> String {
        match self {
            RegistrationAction::Approve => {
                format!("{} registration(s) approved successfully.", updated)
            }
            RegistrationAction::Reject => format!("{} registration(s) rejected.", updated),
            RegistrationAction::Waitlist => {
                format!("{} registration(s) moved to waitlist.", updated)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegistrationActionRequest {
    pub action: RegistrationAction,
    pub registration_numbers: Vec<String>,
}

/// Outcome of any bulk staff action.
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub updated: usize,
    pub message: String,
}

/// Replace a registration's staff notes.
#[derive(Debug, Deserialize)]
pub struct UpdateNotesRequest {
    #[serde(default)]
    pub admin_notes: String,
}

/// Response after a contact message is stored.
#[derive(Debug, Serialize)]
pub struct ContactCreated {
    pub id: Uuid,
    pub message: String,
}

/// Staff listing of contact messages.
#[derive(Debug, Serialize)]
pub struct ContactMessagesResponse {
    pub messages: Vec<ContactMessage>,
    pub total: usize,
    pub unread: usize,
}

/// Staff reply to a contact message.
#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    #[serde(default)]
    pub admin_reply: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageActionRequest {
    pub action: MessageAction,
    pub ids: Vec<Uuid>,
}

pub fn message_action_message(action: MessageAction, updated: usize) -> String {
    let verb = match action {
        MessageAction::MarkRead => "read",
        MessageAction::MarkUnread => "unread",
        MessageAction::MarkReplied => "replied",
    };
    format!("{} message(s) marked as {}.", updated, verb)
}

/// Response after a newsletter signup.
#[derive(Debug, Serialize)]
pub struct SubscriptionCreated {
    pub email: String,
    pub message: String,
}

/// Staff listing of newsletter subscriptions.
#[derive(Debug, Serialize)]
pub struct NewsletterListResponse {
    pub subscriptions: Vec<NewsletterSubscription>,
    pub total: usize,
    pub active: usize,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NewsletterAction {
    Activate,
    Deactivate,
}

impl NewsletterAction {
    pub fn is_active(self) -> bool {
        self == NewsletterAction::Activate
    }

    pub fn message(self, updated: usize) -> String {
        match self {
            NewsletterAction::Activate => format!("{} subscription(s) activated.", updated),
            NewsletterAction::Deactivate => format!("{} subscription(s) deactivated.", updated),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewsletterActionRequest {
    pub action: NewsletterAction,
    pub emails: Vec<String>,
}
