//! Integration tests for the registration API.

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use pact_server::{
    api::{create_router_with_rate_limit, AppState, RequestLimiter},
    config::RegistrationConfig,
};
use registration_number::AllocationStrategy;
use registration_store::{Persistence, RecordStore};
use serde_json::{json, Value};
use tower::ServiceExt;

fn create_test_app(store: RecordStore) -> Router {
    create_test_app_with(store, RegistrationConfig::default())
}

fn create_test_app_with(store: RecordStore, registration: RegistrationConfig) -> Router {
    let state = AppState::new(store, &registration);
    create_router_with_rate_limit(state, RequestLimiter::permissive())
}

fn registration_body(n: usize) -> Value {
    json!({
        "fullname": format!("Delegate {}", n),
        "organization": "Ghana Revenue Authority",
        "country": "Ghana",
        "email": format!("delegate{}@example.com", n),
        "phone": "+233 20 123 4567",
        "arrival_date": "2025-11-10",
        "departure_date": "2025-11-14",
        "needs_visa_assistance": n % 2 == 0,
        "interested_in_panels": n % 3 == 0,
        "terms_accepted": true
    })
}

async fn send_raw(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, HeaderMap, String) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, _, text) = send_raw(app, method, uri, body).await;
    let json = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app(RecordStore::memory());

    let (status, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["registrations"], 0);
}

#[tokio::test]
async fn test_registrations_are_numbered_in_order() {
    let app = create_test_app(RecordStore::memory());

    for n in 1..=3 {
        let (status, json) =
            send(&app, "POST", "/v1/registrations", Some(registration_body(n))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["registration_number"], format!("TCP2025-000{}", n));
        assert_eq!(json["status"], "pending");
    }

    let (status, json) = send(
        &app,
        "GET",
        "/v1/registrations/TCP2025-0002?email=Delegate2@Example.com",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["fullname"], "Delegate 2");
    assert_eq!(json["status_label"], "Pending Review");
}

#[tokio::test]
async fn test_lookup_requires_registration_email() {
    let app = create_test_app(RecordStore::memory());
    send(&app, "POST", "/v1/registrations", Some(registration_body(1))).await;

    for uri in [
        "/v1/registrations/TCP2025-0001",
        "/v1/registrations/TCP2025-0001?email=",
        "/v1/registrations/TCP2025-0001?email=someone.else@example.com",
    ] {
        let (status, json) = send(&app, "GET", uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(json["code"], "NOT_FOUND");
        assert!(json.get("fullname").is_none());
        assert!(!json.to_string().contains("Delegate 1"));
    }

    // Same answer as for a number that was never issued
    let (_, unknown) = send(
        &app,
        "GET",
        "/v1/registrations/TCP2025-0404?email=delegate1@example.com",
        None,
    )
    .await;
    assert_eq!(unknown["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_unknown_registration_number() {
    let app = create_test_app(RecordStore::memory());

    let (status, json) = send(&app, "GET", "/v1/registrations/TCP2025-9999", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_registration_validation_errors() {
    let app = create_test_app(RecordStore::memory());

    let (status, json) = send(
        &app,
        "POST",
        "/v1/registrations",
        Some(json!({
            "fullname": "Ama Owusu",
            "email": "not-an-email",
            "phone": "12345",
            "arrival_date": "2025-11-12",
            "departure_date": "2025-11-11"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "VALIDATION_FAILED");
    let fields = json["fields"].as_object().unwrap();
    for field in [
        "organization",
        "country",
        "email",
        "phone",
        "departure_date",
        "terms_accepted",
    ] {
        assert!(fields.contains_key(field), "missing error for {}", field);
    }
    assert_eq!(
        json["fields"]["phone"][0],
        "Please enter a valid phone number (9-15 digits)."
    );

    // Nothing was numbered
    let (_, health) = send(&app, "GET", "/health", None).await;
    assert_eq!(health["registrations"], 0);
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let app = create_test_app(RecordStore::memory());

    let (status, _) = send(&app, "POST", "/v1/registrations", Some(registration_body(1))).await;
    assert_eq!(status, StatusCode::CREATED);

    let mut again = registration_body(2);
    again["email"] = json!("DELEGATE1@example.com");
    let (status, json) = send(&app, "POST", "/v1/registrations", Some(again)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        json["fields"]["email"][0],
        "This email address is already registered."
    );
}

#[tokio::test]
async fn test_registration_closed() {
    let registration = RegistrationConfig {
        open: false,
        ..Default::default()
    };
    let app = create_test_app_with(RecordStore::memory(), registration);

    let (status, json) = send(&app, "POST", "/v1/registrations", Some(registration_body(1))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "REGISTRATION_CLOSED");
}

#[tokio::test]
async fn test_configured_prefix_and_strategy() {
    let registration = RegistrationConfig {
        prefix: "TCP2026".into(),
        strategy: AllocationStrategy::Sequence,
        ..Default::default()
    };
    let app = create_test_app_with(RecordStore::memory(), registration);

    let (_, json) = send(&app, "POST", "/v1/registrations", Some(registration_body(1))).await;
    assert_eq!(json["registration_number"], "TCP2026-0001");
}

#[tokio::test]
async fn test_deleted_number_is_not_reissued() {
    let app = create_test_app(RecordStore::memory());

    send(&app, "POST", "/v1/registrations", Some(registration_body(1))).await;
    send(&app, "POST", "/v1/registrations", Some(registration_body(2))).await;

    let (status, _) = send(&app, "DELETE", "/v1/admin/registrations/TCP2025-0002", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "DELETE", "/v1/admin/registrations/TCP2025-0002", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, json) = send(&app, "POST", "/v1/registrations", Some(registration_body(3))).await;
    assert_eq!(json["registration_number"], "TCP2025-0003");
}

#[tokio::test]
async fn test_admin_listing_filters_and_bulk_actions() {
    let app = create_test_app(RecordStore::memory());
    for n in 1..=4 {
        send(&app, "POST", "/v1/registrations", Some(registration_body(n))).await;
    }

    let (status, json) = send(
        &app,
        "POST",
        "/v1/admin/registrations/actions",
        Some(json!({
            "action": "approve",
            "registration_numbers": ["TCP2025-0001", "TCP2025-0003", "TCP2025-0404"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["updated"], 2);
    assert_eq!(json["message"], "2 registration(s) approved successfully.");

    let (status, json) = send(&app, "GET", "/v1/admin/registrations?status=approved", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 2);
    // Newest first
    assert_eq!(json["registrations"][0]["registration_number"], "TCP2025-0003");

    let (_, json) = send(&app, "GET", "/v1/admin/registrations?needs_visa=true", None).await;
    assert_eq!(json["total"], 2);

    let (_, json) = send(&app, "GET", "/v1/admin/registrations?search=delegate4", None).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["pages"], 1);

    let (status, _) = send(&app, "GET", "/v1/admin/registrations?status=archived", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_admin_listing_interest_filters() {
    let app = create_test_app(RecordStore::memory());
    for n in 1..=6 {
        send(&app, "POST", "/v1/registrations", Some(registration_body(n))).await;
    }

    let (_, json) = send(
        &app,
        "GET",
        "/v1/admin/registrations?interested_in_panels=true",
        None,
    )
    .await;
    assert_eq!(json["total"], 2);
    assert_eq!(json["registrations"][0]["registration_number"], "TCP2025-0006");

    let (_, json) = send(
        &app,
        "GET",
        "/v1/admin/registrations?interested_in_panels=false&needs_visa=true",
        None,
    )
    .await;
    assert_eq!(json["total"], 2);

    let (_, json) = send(
        &app,
        "GET",
        "/v1/admin/registrations?interested_in_networking=",
        None,
    )
    .await;
    assert_eq!(json["total"], 6);

    let (status, json) = send(
        &app,
        "GET",
        "/v1/admin/registrations?interested_in_capacity_building=maybe",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["fields"]["interested_in_capacity_building"].is_array());
}

#[tokio::test]
async fn test_export_approved_registrations() {
    let app = create_test_app(RecordStore::memory());
    for n in 1..=3 {
        send(&app, "POST", "/v1/registrations", Some(registration_body(n))).await;
    }
    send(
        &app,
        "POST",
        "/v1/admin/registrations/actions",
        Some(json!({
            "action": "approve",
            "registration_numbers": ["TCP2025-0001", "TCP2025-0003"]
        })),
    )
    .await;

    let (status, headers, csv) = send_raw(
        &app,
        "GET",
        "/v1/admin/registrations/export?status=approved",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    assert!(headers[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains("registrations.csv"));

    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "registration_number,fullname,email,phone,organization,country,status,created_at"
    );
    assert_eq!(lines.len(), 3);
    // Oldest first
    assert!(lines[1].starts_with("\"TCP2025-0001\",\"Delegate 1\",\"delegate1@example.com\""));
    assert!(lines[2].starts_with("\"TCP2025-0003\""));
    assert!(lines[2].contains(",approved,"));

    let (status, _) = send(
        &app,
        "GET",
        "/v1/admin/registrations/export?status=archived",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_admin_notes() {
    let app = create_test_app(RecordStore::memory());
    send(&app, "POST", "/v1/registrations", Some(registration_body(1))).await;

    let (status, json) = send(
        &app,
        "PUT",
        "/v1/admin/registrations/TCP2025-0001/notes",
        Some(json!({ "admin_notes": "Invitation letter sent" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["admin_notes"], "Invitation letter sent");
    assert_eq!(json["registration_number"], "TCP2025-0001");

    let (status, _) = send(
        &app,
        "PUT",
        "/v1/admin/registrations/TCP2025-0042/notes",
        Some(json!({ "admin_notes": "?" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_contact_flow() {
    let app = create_test_app(RecordStore::memory());

    let (status, json) = send(
        &app,
        "POST",
        "/v1/contact",
        Some(json!({
            "first_name": "Fatou",
            "last_name": "Ndiaye",
            "email": "Fatou@Example.com",
            "subject": "media",
            "message": "Press accreditation request."
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = json["id"].as_str().unwrap().to_string();

    let (_, json) = send(&app, "GET", "/v1/admin/contact-messages", None).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["unread"], 1);
    assert_eq!(json["messages"][0]["email"], "fatou@example.com");

    let (status, json) = send(
        &app,
        "POST",
        "/v1/admin/contact-messages/actions",
        Some(json!({ "action": "mark_replied", "ids": [id] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "1 message(s) marked as replied.");

    let (_, json) = send(&app, "GET", "/v1/admin/contact-messages", None).await;
    assert_eq!(json["unread"], 0);
    assert_eq!(json["messages"][0]["is_replied"], true);

    let (_, json) = send(
        &app,
        "GET",
        "/v1/admin/contact-messages?is_replied=false",
        None,
    )
    .await;
    assert_eq!(json["total"], 0);

    let (status, _) = send(
        &app,
        "GET",
        "/v1/admin/contact-messages?subject=lottery",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, json) = send(
        &app,
        "POST",
        "/v1/contact",
        Some(json!({ "first_name": "Fatou", "subject": "spam" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["fields"]["subject"].is_array());
}

#[tokio::test]
async fn test_contact_message_filters() {
    let app = create_test_app(RecordStore::memory());
    for (first_name, subject, message) in [
        ("Kofi", "sponsorship", "Gold sponsor package details?"),
        ("Aisha", "media", "Interview slot with the organizers."),
        ("Kofi", "media", "Photo accreditation."),
    ] {
        send(
            &app,
            "POST",
            "/v1/contact",
            Some(json!({
                "first_name": first_name,
                "last_name": "Boateng",
                "email": format!("{}@example.com", first_name.to_lowercase()),
                "subject": subject,
                "message": message
            })),
        )
        .await;
    }

    let (_, json) = send(&app, "GET", "/v1/admin/contact-messages?subject=media", None).await;
    assert_eq!(json["total"], 2);
    // Newest first
    assert_eq!(json["messages"][0]["message"], "Photo accreditation.");

    let (_, json) = send(
        &app,
        "GET",
        "/v1/admin/contact-messages?subject=media&search=kofi",
        None,
    )
    .await;
    assert_eq!(json["total"], 1);

    let (_, json) = send(
        &app,
        "GET",
        "/v1/admin/contact-messages?search=SPONSOR",
        None,
    )
    .await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["messages"][0]["first_name"], "Kofi");

    let (_, json) = send(&app, "GET", "/v1/admin/contact-messages?is_read=true", None).await;
    assert_eq!(json["total"], 0);
}

#[tokio::test]
async fn test_reply_to_contact_message() {
    let app = create_test_app(RecordStore::memory());
    let (_, json) = send(
        &app,
        "POST",
        "/v1/contact",
        Some(json!({
            "first_name": "Chidi",
            "last_name": "Okeke",
            "email": "chidi@example.com",
            "subject": "registration",
            "message": "I registered twice by mistake."
        })),
    )
    .await;
    let id = json["id"].as_str().unwrap().to_string();
    let uri = format!("/v1/admin/contact-messages/{}/reply", id);

    let (status, json) = send(&app, "PUT", &uri, Some(json!({ "admin_reply": "  " }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["fields"]["admin_reply"][0], "This field is required.");

    let (status, json) = send(
        &app,
        "PUT",
        &uri,
        Some(json!({ "admin_reply": "We removed the duplicate." })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["admin_reply"], "We removed the duplicate.");
    assert_eq!(json["is_replied"], true);
    assert_eq!(json["is_read"], true);

    let (_, json) = send(&app, "GET", "/v1/admin/contact-messages?is_replied=true", None).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["unread"], 0);
    assert_eq!(json["messages"][0]["admin_reply"], "We removed the duplicate.");

    let (status, json) = send(
        &app,
        "PUT",
        "/v1/admin/contact-messages/6f1c2a4e-8d2b-4c1e-9a77-0b5e3f9d1c20/reply",
        Some(json!({ "admin_reply": "Hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_newsletter_flow() {
    let app = create_test_app(RecordStore::memory());

    let (status, json) = send(
        &app,
        "POST",
        "/v1/newsletter",
        Some(json!({ "email": "Reader@Example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["email"], "reader@example.com");

    let (status, json) = send(
        &app,
        "POST",
        "/v1/newsletter",
        Some(json!({ "email": "reader@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["fields"]["email"][0], "This email is already subscribed.");

    let (_, json) = send(
        &app,
        "POST",
        "/v1/admin/newsletter/actions",
        Some(json!({
            "action": "deactivate",
            "emails": ["reader@example.com", "nobody@example.com"]
        })),
    )
    .await;
    assert_eq!(json["updated"], 1);
    assert_eq!(json["message"], "1 subscription(s) deactivated.");
}

#[tokio::test]
async fn test_newsletter_listing() {
    let app = create_test_app(RecordStore::memory());
    for email in ["zara@example.com", "abebe@example.com", "moses@example.com"] {
        send(&app, "POST", "/v1/newsletter", Some(json!({ "email": email }))).await;
    }
    send(
        &app,
        "POST",
        "/v1/admin/newsletter/actions",
        Some(json!({ "action": "deactivate", "emails": ["moses@example.com"] })),
    )
    .await;

    let (status, json) = send(&app, "GET", "/v1/admin/newsletter", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 3);
    assert_eq!(json["active"], 2);
    assert_eq!(json["subscriptions"][0]["email"], "abebe@example.com");

    let (_, json) = send(&app, "GET", "/v1/admin/newsletter?is_active=false", None).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["active"], 0);
    assert_eq!(json["subscriptions"][0]["email"], "moses@example.com");

    let (_, json) = send(&app, "GET", "/v1/admin/newsletter?is_active=true", None).await;
    assert_eq!(json["total"], 2);

    let (status, json) = send(&app, "GET", "/v1/admin/newsletter?is_active=sometimes", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["fields"]["is_active"].is_array());
}

#[tokio::test]
async fn test_dashboard() {
    let app = create_test_app(RecordStore::memory());
    for n in 1..=3 {
        send(&app, "POST", "/v1/registrations", Some(registration_body(n))).await;
    }
    send(
        &app,
        "POST",
        "/v1/admin/registrations/actions",
        Some(json!({ "action": "approve", "registration_numbers": ["TCP2025-0001"] })),
    )
    .await;

    let (status, json) = send(&app, "GET", "/v1/admin/dashboard", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_registrations"], 3);
    assert_eq!(json["pending_registrations"], 2);
    assert_eq!(json["approved_registrations"], 1);
    assert_eq!(json["recent_registrations"], 3);
    assert_eq!(json["countries_count"], 1);
    assert_eq!(json["visa_requests"], 1);
    assert_eq!(json["top_countries"][0]["country"], "Ghana");
    assert_eq!(json["top_countries"][0]["count"], 3);
}

#[tokio::test]
async fn test_registrations_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registrations.json");

    let store = RecordStore::open(Persistence::file(&path)).await.unwrap();
    let app = create_test_app(store);
    send(&app, "POST", "/v1/registrations", Some(registration_body(1))).await;
    send(&app, "POST", "/v1/registrations", Some(registration_body(2))).await;
    send(&app, "DELETE", "/v1/admin/registrations/TCP2025-0002", None).await;

    let reopened = RecordStore::open(Persistence::file(&path)).await.unwrap();
    let app = create_test_app(reopened);

    let (_, health) = send(&app, "GET", "/health", None).await;
    assert_eq!(health["registrations"], 1);

    let (_, json) = send(&app, "POST", "/v1/registrations", Some(registration_body(3))).await;
    assert_eq!(json["registration_number"], "TCP2025-0003");
}

#[tokio::test]
async fn test_rate_limiting() {
    let state = AppState::new(RecordStore::memory(), &RegistrationConfig::default());
    let app = create_router_with_rate_limit(state, RequestLimiter::per_minute(1));

    let (status, _) = send(&app, "GET", "/v1/admin/dashboard", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&app, "GET", "/v1/admin/dashboard", None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["code"], "RATE_LIMIT_EXCEEDED");

    // Health checks stay reachable
    let (status, _) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
}
