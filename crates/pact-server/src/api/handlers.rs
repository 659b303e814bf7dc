//! HTTP request handlers.

use super::export::{registrations_csv, EXPORT_FILENAME};
use super::types::{
    message_action_message, ActionResponse, ContactCreated, ContactMessagesResponse,
    HealthResponse, MessageActionRequest, NewsletterActionRequest, NewsletterListResponse,
    RegistrationActionRequest, RegistrationCreated, RegistrationListResponse,
    RegistrationLookup, RegistrationStatusResponse, ReplyRequest, SubscriptionCreated,
    UpdateNotesRequest,
};
use super::AppState;
use crate::error::ApiError;
use crate::forms::{
    ContactForm, ContactMessageQuery, NewsletterForm, NewsletterQuery, RegistrationForm,
    RegistrationQuery, ValidationErrors, EMAIL_REGISTERED, EMAIL_SUBSCRIBED, PAGE_SIZE,
    REQUIRED,
};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use registration_number::AllocationError;
use registration_store::{ContactMessage, DashboardStats, RegistrationRecord, EMAIL_FIELD};
use tracing::{info, warn};
use uuid::Uuid;

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        registrations: state.store.registration_count().await,
    })
}

/// Submit a registration and assign its number.
pub async fn create_registration(
    State(state): State<AppState>,
    Json(form): Json<RegistrationForm>,
) -> Result<(StatusCode, Json<RegistrationCreated>), ApiError> {
    if !state.registration_open {
        return Err(ApiError::RegistrationClosed);
    }

    let details = form.validate(&state.store).await?;
    info!(country = %details.country, "Registration submitted");

    let record = match state.allocator.create(details).await {
        Ok(record) => record,
        // Lost a race with another submission for the same address
        Err(AllocationError::Store(e)) if e.is_conflict_on(EMAIL_FIELD) => {
            warn!("Registration rejected, email registered concurrently");
            return Err(ValidationErrors::field("email", EMAIL_REGISTERED).into());
        }
        Err(e) => return Err(e.into()),
    };

    Ok((StatusCode::CREATED, Json(RegistrationCreated::from(&record))))
}

/// Look up a registration by its number and the email it was made with.
///
/// A wrong or missing email is indistinguishable from an unknown number.
pub async fn get_registration(
    State(state): State<AppState>,
    Path(number): Path<String>,
    Query(lookup): Query<RegistrationLookup>,
) -> Result<Json<RegistrationStatusResponse>, ApiError> {
    let email = lookup.email.trim();
    let record = state
        .store
        .get_registration(&number)
        .await
        .filter(|r| !email.is_empty() && r.details.email.eq_ignore_ascii_case(email))
        .ok_or(ApiError::NotFound(number))?;

    Ok(Json(record.into()))
}

/// Store a contact message.
pub async fn submit_contact(
    State(state): State<AppState>,
    Json(form): Json<ContactForm>,
) -> Result<(StatusCode, Json<ContactCreated>), ApiError> {
    let content = form.clean()?;
    let subject = content.subject;
    let stored = state.store.insert_contact_message(content).await?;

    info!(id = %stored.id, subject = subject.label(), "Contact message received");

    Ok((
        StatusCode::CREATED,
        Json(ContactCreated {
            id: stored.id,
            message: "Thank you for your message. We will get back to you soon.".to_string(),
        }),
    ))
}

/// Subscribe an address to the newsletter.
pub async fn subscribe_newsletter(
    State(state): State<AppState>,
    Json(form): Json<NewsletterForm>,
) -> Result<(StatusCode, Json<SubscriptionCreated>), ApiError> {
    let email = form.validate(&state.store).await?;

    let subscription = match state.store.subscribe(&email).await {
        Ok(subscription) => subscription,
        Err(e) if e.is_conflict_on(EMAIL_FIELD) => {
            return Err(ValidationErrors::field("email", EMAIL_SUBSCRIBED).into());
        }
        Err(e) => return Err(e.into()),
    };

    info!("Newsletter subscription added");

    Ok((
        StatusCode::CREATED,
        Json(SubscriptionCreated {
            email: subscription.email,
            message: "You are now subscribed to PACT 2025 updates.".to_string(),
        }),
    ))
}

// Staff endpoints

/// Filtered, paginated registration listing, newest first.
pub async fn list_registrations(
    State(state): State<AppState>,
    Query(query): Query<RegistrationQuery>,
) -> Result<Json<RegistrationListResponse>, ApiError> {
    let filter = query.filter()?;
    let page = query.page();

    let matching = state.store.list_registrations(&filter).await;
    let total = matching.len();
    let pages = total.div_ceil(PAGE_SIZE).max(1);

    let registrations: Vec<RegistrationRecord> = matching
        .into_iter()
        .skip((page - 1).saturating_mul(PAGE_SIZE))
        .take(PAGE_SIZE)
        .collect();

    Ok(Json(RegistrationListResponse {
        registrations,
        total,
        page,
        pages,
        page_size: PAGE_SIZE,
    }))
}

/// Matching registrations as a CSV download, oldest first.
pub async fn export_registrations(
    State(state): State<AppState>,
    Query(query): Query<RegistrationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = query.filter()?;
    let mut records = state.store.list_registrations(&filter).await;
    records.reverse();
    info!(rows = records.len(), "Registrations exported");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILENAME),
            ),
        ],
        registrations_csv(&records),
    ))
}

/// Approve, reject or waitlist several registrations at once.
pub async fn registration_action(
    State(state): State<AppState>,
    Json(request): Json<RegistrationActionRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    let updated = state
        .store
        .set_status(&request.registration_numbers, request.action.status())
        .await?;

    Ok(Json(ActionResponse {
        updated,
        message: request.action.message(updated),
    }))
}

/// Replace the staff notes on a registration.
pub async fn update_notes(
    State(state): State<AppState>,
    Path(number): Path<String>,
    Json(request): Json<UpdateNotesRequest>,
) -> Result<Json<RegistrationRecord>, ApiError> {
    let record = state
        .store
        .set_admin_notes(&number, request.admin_notes)
        .await?;
    Ok(Json(record))
}

/// Delete a registration. Its number is never issued again.
pub async fn delete_registration(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_registration(&number).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Filtered contact messages, newest first.
pub async fn list_contact_messages(
    State(state): State<AppState>,
    Query(query): Query<ContactMessageQuery>,
) -> Result<Json<ContactMessagesResponse>, ApiError> {
    let filter = query.filter()?;
    let messages = state.store.list_contact_messages(&filter).await;
    let unread = messages.iter().filter(|m| !m.is_read).count();

    Ok(Json(ContactMessagesResponse {
        total: messages.len(),
        unread,
        messages,
    }))
}

/// Record the staff reply to a contact message.
pub async fn reply_contact_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ReplyRequest>,
) -> Result<Json<ContactMessage>, ApiError> {
    let reply = request.admin_reply.trim();
    if reply.is_empty() {
        return Err(ValidationErrors::field("admin_reply", REQUIRED).into());
    }
    let message = state
        .store
        .reply_contact_message(id, reply.to_string())
        .await?;
    Ok(Json(message))
}

/// Mark several contact messages read, unread or replied.
pub async fn contact_message_action(
    State(state): State<AppState>,
    Json(request): Json<MessageActionRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    let updated = state
        .store
        .mark_contact_messages(&request.ids, request.action)
        .await?;

    Ok(Json(ActionResponse {
        updated,
        message: message_action_message(request.action, updated),
    }))
}

/// Newsletter subscriptions by email, optionally only active or inactive.
pub async fn list_subscriptions(
    State(state): State<AppState>,
    Query(query): Query<NewsletterQuery>,
) -> Result<Json<NewsletterListResponse>, ApiError> {
    let subscriptions = state.store.list_subscriptions(query.active()?).await;
    let active = subscriptions.iter().filter(|s| s.is_active).count();

    Ok(Json(NewsletterListResponse {
        total: subscriptions.len(),
        active,
        subscriptions,
    }))
}

/// Activate or deactivate several newsletter subscriptions.
pub async fn newsletter_action(
    State(state): State<AppState>,
    Json(request): Json<NewsletterActionRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    let updated = state
        .store
        .set_subscriptions_active(&request.emails, request.action.is_active())
        .await?;

    Ok(Json(ActionResponse {
        updated,
        message: request.action.message(updated),
    }))
}

/// Summary figures for the staff dashboard.
pub async fn dashboard(State(state): State<AppState>) -> Json<DashboardStats> {
    Json(state.store.stats().await)
}
