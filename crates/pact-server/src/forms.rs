//! Validation of visitor-submitted forms and staff filters.
//!
//! Each form collects every field error before reporting, so a visitor sees
//! all problems with a submission at once.

use chrono::NaiveDate;
use regex::Regex;
use registration_store::{
    ContactMessageFilter, ContactSubject, NewContactMessage, NewRegistration, RecordStore,
    RegistrationFilter, RegistrationStatus,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Longest accepted value for free-text fields.
const MAX_TEXT_LEN: usize = 255;

/// Longest accepted email address.
const MAX_EMAIL_LEN: usize = 254;

/// Registrations per page on the staff listing.
pub const PAGE_SIZE: usize = 50;

pub const REQUIRED: &str = "This field is required.";
pub const EMAIL_REGISTERED: &str = "This email address is already registered.";
pub const EMAIL_SUBSCRIBED: &str = "This email is already subscribed.";
pub const INVALID_PHONE: &str = "Please enter a valid phone number (9-15 digits).";
pub const DEPARTURE_BEFORE_ARRIVAL: &str = "Departure date must be after arrival date.";
pub const EXPECTED_BOOLEAN: &str = "Expected true or false.";

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?1?\d{9,15}$").expect("valid phone regex"));

static PHONE_NOISE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\d+]").expect("valid phone noise regex"));

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").expect("valid email regex"));

/// Field name to error messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-field error.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn fields(&self) -> &BTreeMap<String, Vec<String>> {
        &self.0
    }

    fn finish<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

fn required_text(errors: &mut ValidationErrors, field: &str, value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
    } else {
        check_length(errors, field, value);
    }
    value.to_string()
}

fn optional_text(errors: &mut ValidationErrors, field: &str, value: &str) -> String {
    let value = value.trim();
    check_length(errors, field, value);
    value.to_string()
}

fn check_length(errors: &mut ValidationErrors, field: &str, value: &str) {
    if value.chars().count() > MAX_TEXT_LEN {
        errors.add(
            field,
            format!("Ensure this value has at most {} characters.", MAX_TEXT_LEN),
        );
    }
}

/// Lower-cased email, with an error recorded if it is blank or malformed.
fn email(errors: &mut ValidationErrors, field: &str, value: &str) -> String {
    let value = value.trim().to_lowercase();
    if value.is_empty() {
        errors.add(field, REQUIRED);
    } else if value.len() > MAX_EMAIL_LEN || !EMAIL_RE.is_match(&value) {
        errors.add(field, "Enter a valid email address.");
    }
    value
}

/// Whether a phone number has 9-15 digits once spaces and punctuation are
/// removed. A leading `+` and country code `1` are allowed.
pub fn phone_is_valid(phone: &str) -> bool {
    PHONE_RE.is_match(&PHONE_NOISE_RE.replace_all(phone, ""))
}

/// Registration form as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub fullname: String,
    pub organization: String,
    pub position: String,
    pub city: String,
    pub country: String,
    pub email: String,
    pub phone: String,
    pub arrival_date: Option<NaiveDate>,
    pub departure_date: Option<NaiveDate>,
    pub needs_visa_assistance: bool,
    pub interested_in_panels: bool,
    pub interested_in_capacity_building: bool,
    pub interested_in_networking: bool,
    pub dietary_restrictions: String,
    pub receive_updates: Option<bool>,
    pub terms_accepted: bool,
}

impl RegistrationForm {
    /// Field checks that don't need the store.
    pub fn clean(self) -> Result<NewRegistration, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let fullname = required_text(&mut errors, "fullname", &self.fullname);
        let organization = required_text(&mut errors, "organization", &self.organization);
        let position = optional_text(&mut errors, "position", &self.position);
        let city = optional_text(&mut errors, "city", &self.city);
        let country = required_text(&mut errors, "country", &self.country);
        let email = email(&mut errors, "email", &self.email);

        let phone = self.phone.trim().to_string();
        if phone.is_empty() {
            errors.add("phone", REQUIRED);
        } else if !phone_is_valid(&phone) {
            errors.add("phone", INVALID_PHONE);
        }

        if let (Some(arrival), Some(departure)) = (self.arrival_date, self.departure_date) {
            if departure <= arrival {
                errors.add("departure_date", DEPARTURE_BEFORE_ARRIVAL);
            }
        }

        if !self.terms_accepted {
            errors.add("terms_accepted", REQUIRED);
        }

        errors.finish(NewRegistration {
            fullname,
            organization,
            position,
            city,
            country,
            email,
            phone,
            arrival_date: self.arrival_date,
            departure_date: self.departure_date,
            needs_visa_assistance: self.needs_visa_assistance,
            interested_in_panels: self.interested_in_panels,
            interested_in_capacity_building: self.interested_in_capacity_building,
            interested_in_networking: self.interested_in_networking,
            dietary_restrictions: self.dietary_restrictions.trim().to_string(),
            receive_updates: self.receive_updates.unwrap_or(true),
        })
    }

    /// Full validation, including that the email isn't registered yet.
    pub async fn validate(self, store: &RecordStore) -> Result<NewRegistration, ValidationErrors> {
        let details = self.clean()?;
        if store.email_registered(&details.email).await {
            return Err(ValidationErrors::field("email", EMAIL_REGISTERED));
        }
        Ok(details)
    }
}

/// Contact form as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContactForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub organization: String,
    pub subject: String,
    pub message: String,
}

impl ContactForm {
    pub fn clean(self) -> Result<NewContactMessage, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let first_name = required_text(&mut errors, "first_name", &self.first_name);
        let last_name = required_text(&mut errors, "last_name", &self.last_name);
        let email = email(&mut errors, "email", &self.email);
        let phone = optional_text(&mut errors, "phone", &self.phone);
        let organization = optional_text(&mut errors, "organization", &self.organization);

        let subject = match parse_subject(&self.subject) {
            Ok(subject) => Some(subject),
            Err(message) => {
                errors.add("subject", message);
                None
            }
        };

        let message = self.message.trim().to_string();
        if message.is_empty() {
            errors.add("message", REQUIRED);
        }

        match subject {
            Some(subject) => errors.finish(NewContactMessage {
                first_name,
                last_name,
                email,
                phone,
                organization,
                subject,
                message,
            }),
            None => Err(errors),
        }
    }
}

fn parse_subject(value: &str) -> Result<ContactSubject, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(REQUIRED.to_string());
    }
    match value.to_ascii_lowercase().as_str() {
        "general" => Ok(ContactSubject::General),
        "registration" => Ok(ContactSubject::Registration),
        "partnership" => Ok(ContactSubject::Partnership),
        "sponsorship" => Ok(ContactSubject::Sponsorship),
        "media" => Ok(ContactSubject::Media),
        "technical" => Ok(ContactSubject::Technical),
        "other" => Ok(ContactSubject::Other),
        _ => Err(format!(
            "Select a valid choice. {} is not one of the available choices.",
            value
        )),
    }
}

/// Newsletter signup as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewsletterForm {
    pub email: String,
}

impl NewsletterForm {
    pub async fn validate(self, store: &RecordStore) -> Result<String, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let email = email(&mut errors, "email", &self.email);
        let email = errors.finish(email)?;
        if store.subscription(&email).await.is_some() {
            return Err(ValidationErrors::field("email", EMAIL_SUBSCRIBED));
        }
        Ok(email)
    }
}

/// Query string of the staff registration listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistrationQuery {
    pub status: Option<String>,
    pub country: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub needs_visa: Option<String>,
    pub interested_in_panels: Option<String>,
    pub interested_in_capacity_building: Option<String>,
    pub interested_in_networking: Option<String>,
    pub search: Option<String>,
    pub page: Option<usize>,
}

impl RegistrationQuery {
    /// Translate into a store filter. Blank values are ignored.
    pub fn filter(&self) -> Result<RegistrationFilter, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let status = match blank_to_none(&self.status) {
            Some(value) => match value.parse::<RegistrationStatus>() {
                Ok(status) => Some(status),
                Err(message) => {
                    errors.add("status", message);
                    None
                }
            },
            None => None,
        };

        let needs_visa = flag(&mut errors, "needs_visa", &self.needs_visa);
        let interested_in_panels =
            flag(&mut errors, "interested_in_panels", &self.interested_in_panels);
        let interested_in_capacity_building = flag(
            &mut errors,
            "interested_in_capacity_building",
            &self.interested_in_capacity_building,
        );
        let interested_in_networking = flag(
            &mut errors,
            "interested_in_networking",
            &self.interested_in_networking,
        );

        errors.finish(RegistrationFilter {
            status,
            country: blank_to_none(&self.country).map(String::from),
            date_from: self.date_from,
            date_to: self.date_to,
            needs_visa,
            interested_in_panels,
            interested_in_capacity_building,
            interested_in_networking,
            search: blank_to_none(&self.search).map(String::from),
        })
    }

    /// One-based page number.
    pub fn page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }
}

/// Query string of the staff contact message listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContactMessageQuery {
    pub subject: Option<String>,
    pub is_read: Option<String>,
    pub is_replied: Option<String>,
    pub search: Option<String>,
}

impl ContactMessageQuery {
    pub fn filter(&self) -> Result<ContactMessageFilter, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let subject = match blank_to_none(&self.subject).map(parse_subject) {
            Some(Ok(subject)) => Some(subject),
            Some(Err(message)) => {
                errors.add("subject", message);
                None
            }
            None => None,
        };

        let is_read = flag(&mut errors, "is_read", &self.is_read);
        let is_replied = flag(&mut errors, "is_replied", &self.is_replied);

        errors.finish(ContactMessageFilter {
            subject,
            is_read,
            is_replied,
            search: blank_to_none(&self.search).map(String::from),
        })
    }
}

/// Query string of the staff newsletter listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewsletterQuery {
    pub is_active: Option<String>,
}

impl NewsletterQuery {
    /// `None` lists every subscription.
    pub fn active(&self) -> Result<Option<bool>, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let active = flag(&mut errors, "is_active", &self.is_active);
        errors.finish(active)
    }
}

/// Tri-state query flag: blank means "any".
fn flag(errors: &mut ValidationErrors, field: &str, value: &Option<String>) -> Option<bool> {
    match blank_to_none(value)?.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => {
            errors.add(field, EXPECTED_BOOLEAN);
            None
        }
    }
}

fn blank_to_none(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
