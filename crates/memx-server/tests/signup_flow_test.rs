mod common;

use axum::http::StatusCode;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};

use common::{
    admin_token, fresh_database_url, send_json, setup, setup_with_config,
    spawn_stub_identity_provider, test_config, token_for,
};

fn signup_payload(name: &str) -> Value {
    json!({
        "business_name": name,
        "business_owner": "M. Rivera",
        "organization_type": "Business",
        "business_type": "Food",
        "business_scale": "Small Business",
        "number_of_employees": "1-10",
        "description": "Family restaurant",
        "physical_address": {
            "street": "123 Higuera St", "city": "San Luis Obispo", "state": "CA", "zip": "93401"
        },
        "mailing_address": {
            "street": "PO Box 9", "city": "San Luis Obispo", "state": "CA", "zip": "93401"
        },
        "point_of_contact": {
            "name": "M. Rivera", "phone_number": "805-555-0123",
            "email": "owner@casaverde.example.com"
        }
    })
}

#[tokio::test]
async fn incomplete_payload_is_rejected_with_field_errors() {
    let (router, _pool) = setup().await;

    let mut payload = signup_payload("Casa Verde");
    payload["business_name"] = Value::Null;
    payload["physical_address"]["zip"] = json!("934");

    let (status, body) = send_json(
        &router,
        "POST",
        "/v1/signups",
        Some(&token_for("applicant_1", "business")),
        Some(payload),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains("business name"));
    assert!(message.contains("5 digits"));
}

#[tokio::test]
async fn resubmission_updates_the_open_application() {
    let (router, pool) = setup().await;
    let token = token_for("applicant_1", "business");

    let (status, _) = send_json(
        &router,
        "POST",
        "/v1/signups",
        Some(&token),
        Some(signup_payload("Casa Verde")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, updated) = send_json(
        &router,
        "POST",
        "/v1/signups",
        Some(&token),
        Some(signup_payload("Casa Verde y Azul")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["profile"]["business_name"], "Casa Verde y Azul");

    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM signup_requests WHERE user_id = 'applicant_1'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn approval_provisions_the_business_with_one_year_membership() {
    let (router, pool) = setup().await;

    let (_, signup) = send_json(
        &router,
        "POST",
        "/v1/signups",
        Some(&token_for("applicant_1", "business")),
        Some(signup_payload("Casa Verde")),
    )
    .await;

    let (status, approved) = send_json(
        &router,
        "POST",
        "/v1/signups/approve",
        Some(&admin_token()),
        Some(json!({"request_id": signup["id"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(approved["business_id"].is_string());

    let (start, expiry): (DateTime<Utc>, DateTime<Utc>) = sqlx::query_as(
        "SELECT membership_start_date, membership_expiry_date FROM businesses WHERE user_id = 'applicant_1'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(expiry - start, Duration::days(365));

    let (req_status, decision): (String, Option<String>) =
        sqlx::query_as("SELECT status, decision FROM signup_requests WHERE user_id = 'applicant_1'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(req_status, "closed");
    assert_eq!(decision.as_deref(), Some("approved"));

    let queued: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM email_outbox WHERE kind = 'signup_approved' AND recipient = 'owner@casaverde.example.com'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(queued, 1);
}

#[tokio::test]
async fn closed_application_cannot_be_decided_again() {
    let (router, _pool) = setup().await;

    let (_, signup) = send_json(
        &router,
        "POST",
        "/v1/signups",
        Some(&token_for("applicant_1", "business")),
        Some(signup_payload("Casa Verde")),
    )
    .await;

    send_json(
        &router,
        "POST",
        "/v1/signups/approve",
        Some(&admin_token()),
        Some(json!({"request_id": signup["id"]})),
    )
    .await;

    let (status, _) = send_json(
        &router,
        "POST",
        "/v1/signups/approve",
        Some(&admin_token()),
        Some(json!({"request_id": signup["id"]})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn denial_fails_closed_when_the_account_cannot_be_deleted() {
    // Default config points the identity provider at an unroutable
    // endpoint, so account deletion fails.
    let (router, pool) = setup().await;

    let (_, signup) = send_json(
        &router,
        "POST",
        "/v1/signups",
        Some(&token_for("applicant_1", "business")),
        Some(signup_payload("Casa Verde")),
    )
    .await;

    let (status, _) = send_json(
        &router,
        "POST",
        "/v1/signups/deny",
        Some(&admin_token()),
        Some(json!({"request_id": signup["id"], "denial_message": "Incomplete application"})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (req_status, decision): (String, Option<String>) =
        sqlx::query_as("SELECT status, decision FROM signup_requests WHERE user_id = 'applicant_1'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(req_status, "open");
    assert_eq!(decision, None);
}

#[tokio::test]
async fn denial_closes_the_application_once_the_account_is_gone() {
    let identity_url = spawn_stub_identity_provider().await;
    let mut config = test_config(fresh_database_url().await);
    config.identity_api_url = identity_url;
    let (router, pool) = setup_with_config(config).await;

    let (_, signup) = send_json(
        &router,
        "POST",
        "/v1/signups",
        Some(&token_for("applicant_1", "business")),
        Some(signup_payload("Casa Verde")),
    )
    .await;

    let (status, _) = send_json(
        &router,
        "POST",
        "/v1/signups/deny",
        Some(&admin_token()),
        Some(json!({"request_id": signup["id"], "denial_message": "Incomplete application"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (req_status, decision, message): (String, Option<String>, Option<String>) =
        sqlx::query_as(
            "SELECT status, decision, denial_message FROM signup_requests WHERE user_id = 'applicant_1'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(req_status, "closed");
    assert_eq!(decision.as_deref(), Some("denied"));
    assert_eq!(message.as_deref(), Some("Incomplete application"));

    let queued: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM email_outbox WHERE kind = 'signup_denied'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(queued, 1);
}

#[tokio::test]
async fn listing_signups_requires_admin() {
    let (router, _pool) = setup().await;

    let (status, _) = send_json(
        &router,
        "GET",
        "/v1/signups",
        Some(&token_for("applicant_1", "business")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send_json(&router, "GET", "/v1/signups", Some(&admin_token()), None).await;
    assert_eq!(status, StatusCode::OK);
}
