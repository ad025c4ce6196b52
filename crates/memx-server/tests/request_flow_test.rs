mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::delete;
use axum::Router;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use sqlx::PgPool;

use common::{admin_token, seed_business, send_json, setup, setup_with_config, token_for};

#[tokio::test]
async fn submitting_requires_a_session() {
    let (router, _pool) = setup().await;

    let (status, _) = send_json(
        &router,
        "POST",
        "/v1/requests",
        None,
        Some(json!({"business_name": "Casa Azul"})),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn second_submission_merges_into_the_open_request() {
    let (router, pool) = setup().await;
    seed_business(&pool, "biz_1", None).await;
    let token = token_for("biz_1", "business");

    let (status, first) = send_json(
        &router,
        "POST",
        "/v1/requests",
        Some(&token),
        Some(json!({"business_name": "Casa Azul"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, second) = send_json(
        &router,
        "POST",
        "/v1/requests",
        Some(&token),
        Some(json!({"website": "casaazul.example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Merge, not replace: both fields live in the single open request.
    assert_eq!(first["id"], second["id"]);
    assert_eq!(second["new"]["business_name"], "Casa Azul");
    assert_eq!(second["new"]["website"], "casaazul.example.com");

    let open_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM change_requests WHERE user_id = 'biz_1'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(open_count, 1);
}

#[tokio::test]
async fn foreign_request_id_is_rejected() {
    let (router, pool) = setup().await;
    seed_business(&pool, "biz_1", None).await;
    seed_business(&pool, "biz_2", None).await;

    let (_, created) = send_json(
        &router,
        "POST",
        "/v1/requests",
        Some(&token_for("biz_1", "business")),
        Some(json!({"business_name": "Casa Azul"})),
    )
    .await;

    let (status, _) = send_json(
        &router,
        "POST",
        "/v1/requests",
        Some(&token_for("biz_2", "business")),
        Some(json!({"request_id": created["id"], "website": "hijack.example.com"})),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn closed_request_cannot_be_resubmitted() {
    let (router, pool) = setup().await;
    seed_business(&pool, "biz_1", None).await;

    let closed_id = uuid::Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO change_requests (id, user_id, old, new, status, decision, submitted_at, updated_at)
        VALUES ($1, 'biz_1', '{}', '{}', 'closed', 'denied', NOW(), NOW())
        "#,
    )
    .bind(closed_id)
    .execute(&pool)
    .await
    .unwrap();

    let (status, _) = send_json(
        &router,
        "POST",
        "/v1/requests",
        Some(&token_for("biz_1", "business")),
        Some(json!({"request_id": closed_id, "website": "late.example.com"})),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn approval_applies_only_supplied_fields() {
    let (router, pool) = setup().await;
    seed_business(&pool, "biz_1", None).await;

    let (_, created) = send_json(
        &router,
        "POST",
        "/v1/requests",
        Some(&token_for("biz_1", "business")),
        Some(json!({"description": "Family restaurant and catering"})),
    )
    .await;

    let (status, _) = send_json(
        &router,
        "POST",
        "/v1/requests/approve",
        Some(&admin_token()),
        Some(json!({"request_id": created["id"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (description, business_name, website): (String, String, Option<String>) =
        sqlx::query_as(
            "SELECT description, business_name, website FROM businesses WHERE user_id = 'biz_1'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();

    assert_eq!(description, "Family restaurant and catering");
    assert_eq!(business_name, "Casa Verde");
    assert_eq!(website.as_deref(), Some("casaverde.example.com"));

    // The decided request leaves the active set.
    let remaining: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM change_requests WHERE user_id = 'biz_1'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn approval_archives_history_with_thirty_day_expiry() {
    let (router, pool) = setup().await;
    seed_business(&pool, "biz_1", None).await;

    let (_, created) = send_json(
        &router,
        "POST",
        "/v1/requests",
        Some(&token_for("biz_1", "business")),
        Some(json!({"business_name": "Casa Azul"})),
    )
    .await;

    let (_, approved) = send_json(
        &router,
        "POST",
        "/v1/requests/approve",
        Some(&admin_token()),
        Some(json!({"request_id": created["id"]})),
    )
    .await;

    let (decision, decided_at, expires_at): (String, DateTime<Utc>, DateTime<Utc>) =
        sqlx::query_as("SELECT decision, decided_at, expires_at FROM request_history WHERE id = $1")
            .bind(uuid::Uuid::parse_str(approved["history_id"].as_str().unwrap()).unwrap())
            .fetch_one(&pool)
            .await
            .unwrap();

    assert_eq!(decision, "approved");
    assert_eq!(expires_at - decided_at, Duration::days(30));
}

#[tokio::test]
async fn denial_archives_without_touching_the_business() {
    let (router, pool) = setup().await;
    seed_business(&pool, "biz_1", None).await;

    let (_, created) = send_json(
        &router,
        "POST",
        "/v1/requests",
        Some(&token_for("biz_1", "business")),
        Some(json!({"business_name": "Casa Azul"})),
    )
    .await;

    let (status, denied) = send_json(
        &router,
        "POST",
        "/v1/requests/deny",
        Some(&admin_token()),
        Some(json!({"request_id": created["id"], "denial_message": "Name already taken"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let business_name: String =
        sqlx::query_scalar("SELECT business_name FROM businesses WHERE user_id = 'biz_1'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(business_name, "Casa Verde");

    let (decision, denial_message): (String, Option<String>) = sqlx::query_as(
        "SELECT decision, denial_message FROM request_history WHERE id = $1",
    )
    .bind(uuid::Uuid::parse_str(denied["history_id"].as_str().unwrap()).unwrap())
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(decision, "denied");
    assert_eq!(denial_message.as_deref(), Some("Name already taken"));

    // Denial notifications are queued for the worker, not sent inline.
    let queued: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM email_outbox WHERE kind = 'business_denied' AND recipient = 'owner@casaverde.example.com'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(queued, 1);
}

#[tokio::test]
async fn non_admin_cannot_decide_requests() {
    let (router, pool) = setup().await;
    seed_business(&pool, "biz_1", None).await;

    let (_, created) = send_json(
        &router,
        "POST",
        "/v1/requests",
        Some(&token_for("biz_1", "business")),
        Some(json!({"business_name": "Casa Azul"})),
    )
    .await;

    let (status, _) = send_json(
        &router,
        "POST",
        "/v1/requests/approve",
        Some(&token_for("biz_1", "business")),
        Some(json!({"request_id": created["id"]})),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn listing_scopes_to_the_caller_unless_admin() {
    let (router, pool) = setup().await;
    seed_business(&pool, "biz_1", None).await;
    seed_business(&pool, "biz_2", None).await;

    for user in ["biz_1", "biz_2"] {
        send_json(
            &router,
            "POST",
            "/v1/requests",
            Some(&token_for(user, "business")),
            Some(json!({"business_name": format!("{user} updated")})),
        )
        .await;
    }

    let (_, own) = send_json(
        &router,
        "GET",
        "/v1/requests?status=open",
        Some(&token_for("biz_1", "business")),
        None,
    )
    .await;
    assert_eq!(own.as_array().unwrap().len(), 1);

    let (_, all) = send_json(
        &router,
        "GET",
        "/v1/requests?status=open",
        Some(&admin_token()),
        None,
    )
    .await;
    assert_eq!(all.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn request_detail_flags_changed_fields() {
    let (router, pool) = setup().await;
    seed_business(&pool, "biz_1", None).await;

    let (_, created) = send_json(
        &router,
        "POST",
        "/v1/requests",
        Some(&token_for("biz_1", "business")),
        Some(json!({"business_name": "Casa Azul"})),
    )
    .await;

    let (status, detail) = send_json(
        &router,
        "GET",
        &format!("/v1/requests/{}", created["id"].as_str().unwrap()),
        Some(&admin_token()),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["changes"]["business_name"], true);
    // Fields absent from the submission read as changed in the display
    // diff: the new snapshot carries no value for them.
    assert_eq!(detail["changes"]["description"], true);
}

struct DeleteCounter(AtomicUsize);

async fn spawn_counting_storage() -> (String, Arc<DeleteCounter>) {
    let counter = Arc::new(DeleteCounter(AtomicUsize::new(0)));
    let shared = counter.clone();

    let router = Router::new().route(
        "/objects/:key",
        delete(
            |State(counter): State<Arc<DeleteCounter>>| async move {
                counter.0.fetch_add(1, Ordering::SeqCst);
                StatusCode::OK
            },
        ),
    )
    .with_state(shared);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    (format!("http://{}", addr), counter)
}

async fn setup_with_storage() -> (axum::Router, PgPool, Arc<DeleteCounter>) {
    let (storage_url, counter) = spawn_counting_storage().await;
    let mut config = common::test_config(common::fresh_database_url().await);
    config.storage_api_url = storage_url;
    let (router, pool) = setup_with_config(config).await;
    (router, pool, counter)
}

async fn approve_logo_change(
    router: &axum::Router,
    pool: &PgPool,
    current_logo: Option<&str>,
    patch: serde_json::Value,
) {
    seed_business(pool, "biz_logo", current_logo).await;

    let (_, created) = send_json(
        router,
        "POST",
        "/v1/requests",
        Some(&token_for("biz_logo", "business")),
        Some(patch),
    )
    .await;

    let (status, _) = send_json(
        router,
        "POST",
        "/v1/requests/approve",
        Some(&admin_token()),
        Some(json!({"request_id": created["id"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn replacing_a_custom_logo_deletes_the_old_object_once() {
    let (router, pool, counter) = setup_with_storage().await;

    approve_logo_change(
        &router,
        &pool,
        Some("https://cdn.example.com/assets/old-logo.png"),
        json!({"logo_url": "https://cdn.example.com/assets/new-logo.png"}),
    )
    .await;

    let logo: Option<String> =
        sqlx::query_scalar("SELECT logo_url FROM businesses WHERE user_id = 'biz_logo'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(
        logo.as_deref(),
        Some("https://cdn.example.com/assets/new-logo.png")
    );
    assert_eq!(counter.0.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn replacing_the_default_logo_deletes_nothing() {
    let (router, pool, counter) = setup_with_storage().await;

    approve_logo_change(
        &router,
        &pool,
        Some("https://cdn.example.com/assets/Default_Logo.jpg"),
        json!({"logo_url": "https://cdn.example.com/assets/custom.png"}),
    )
    .await;

    let logo: Option<String> =
        sqlx::query_scalar("SELECT logo_url FROM businesses WHERE user_id = 'biz_logo'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(
        logo.as_deref(),
        Some("https://cdn.example.com/assets/custom.png")
    );
    assert_eq!(counter.0.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn approval_without_logo_field_deletes_nothing() {
    let (router, pool, counter) = setup_with_storage().await;

    approve_logo_change(
        &router,
        &pool,
        Some("https://cdn.example.com/assets/old-logo.png"),
        json!({"description": "No image change"}),
    )
    .await;

    assert_eq!(counter.0.load(Ordering::SeqCst), 0);
}
