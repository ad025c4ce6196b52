#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::{delete, patch, post};
use axum::Router;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use memx_server::api::middleware::auth::SessionClaims;
use memx_server::config::Config;
use memx_server::App;
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;
use testcontainers::{runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use tower::ServiceExt;

pub const SESSION_SECRET: &str = "test-session-secret";

static TEST_CONTAINER: OnceCell<Arc<ContainerAsync<Postgres>>> = OnceCell::const_new();
static TEST_POOL: OnceCell<PgPool> = OnceCell::const_new();

async fn get_test_db() -> (PgPool, String) {
    let container = TEST_CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default()
                .start()
                .await
                .expect("Failed to start postgres container");
            Arc::new(container)
        })
        .await;

    let host = container.get_host().await.expect("Failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("Failed to get port");
    let database_url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

    let pool = TEST_POOL
        .get_or_init(|| async {
            sqlx::PgPool::connect(&database_url)
                .await
                .expect("Failed to connect to test database")
        })
        .await
        .clone();

    (pool, database_url)
}

/// Every test app gets its own database inside the shared container, so
/// concurrently running tests never see each other's rows.
pub async fn fresh_database_url() -> String {
    let (admin_pool, base_url) = get_test_db().await;

    let db_name = format!("t_{}", uuid::Uuid::new_v4().simple());
    sqlx::query(&format!(r#"CREATE DATABASE "{db_name}""#))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    let (prefix, _) = base_url
        .rsplit_once('/')
        .expect("database url has a path segment");
    format!("{prefix}/{db_name}")
}

/// Unroutable endpoint: connections fail immediately. Used for
/// collaborators a test expects to be unavailable.
pub const DEAD_ENDPOINT: &str = "http://127.0.0.1:1";

pub fn test_config(database_url: String) -> Config {
    Config {
        database_url,
        bind_address: "0.0.0.0:8080".to_string(),
        db_max_connections: 5,
        otlp_endpoint: None,
        session_secret: SESSION_SECRET.to_string(),
        identity_api_url: DEAD_ENDPOINT.to_string(),
        identity_api_key: "test-identity-key".to_string(),
        storage_api_url: DEAD_ENDPOINT.to_string(),
        storage_api_key: "test-storage-key".to_string(),
        mailer_api_url: DEAD_ENDPOINT.to_string(),
        mailer_api_key: "test-mailer-key".to_string(),
        mailer_from: "association@example.com".to_string(),
        payments_api_url: DEAD_ENDPOINT.to_string(),
        payments_access_token: "test-payments-token".to_string(),
        payments_location_id: "LOC123".to_string(),
        payments_signature_key: "test-signature-key".to_string(),
        payments_notification_url: "https://memx.example.com/v1/payments/webhook".to_string(),
    }
}

pub async fn setup() -> (Router, PgPool) {
    setup_with_config(test_config(fresh_database_url().await)).await
}

pub async fn setup_with_config(config: Config) -> (Router, PgPool) {
    let app = App::new(config).await.expect("Failed to create app");
    let pool = app.db().clone();
    (app.router(), pool)
}

/// A stub identity provider that accepts account deletion and role
/// updates. Returns its base URL.
pub async fn spawn_stub_identity_provider() -> String {
    let router = Router::new()
        .route("/users/:id", delete(|| async { StatusCode::OK }))
        .route("/users/:id/metadata", patch(|| async { StatusCode::OK }));
    spawn_stub(router).await
}

/// A stub mail relay that accepts every message. Returns its base URL.
pub async fn spawn_stub_mail_relay() -> String {
    let router = Router::new().route("/messages", post(|| async { StatusCode::OK }));
    spawn_stub(router).await
}

async fn spawn_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub listener");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    format!("http://{}", addr)
}

pub fn token_for(user_id: &str, role: &str) -> String {
    let claims = SessionClaims {
        sub: user_id.to_string(),
        role: role.to_string(),
        exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SESSION_SECRET.as_bytes()),
    )
    .expect("Failed to sign test token")
}

pub fn admin_token() -> String {
    token_for("admin_1", "admin")
}

pub async fn send_json(
    router: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }

    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

/// Inserts a business row directly and returns its id.
pub async fn seed_business(pool: &PgPool, user_id: &str, logo_url: Option<&str>) -> uuid::Uuid {
    let id = uuid::Uuid::new_v4();
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO businesses
            (id, user_id, business_name, business_owner, organization_type, business_type,
             business_scale, number_of_employees, gender, website, description,
             physical_address, mailing_address, point_of_contact, social_handles,
             logo_url, banner_url, membership_start_date, membership_expiry_date,
             last_pay_date, created_at, updated_at)
        VALUES ($1, $2, 'Casa Verde', 'M. Rivera', 'Business', 'Food',
                'Small Business', '1-10', NULL, 'casaverde.example.com', 'Family restaurant',
                $3, $4, $5, NULL,
                $6, NULL, $7, $8,
                NULL, $7, $7)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(serde_json::json!({
        "street": "123 Higuera St", "city": "San Luis Obispo", "state": "CA", "zip": "93401"
    }))
    .bind(serde_json::json!({
        "street": "PO Box 9", "city": "San Luis Obispo", "state": "CA", "zip": "93401"
    }))
    .bind(serde_json::json!({
        "name": "M. Rivera", "phone_number": "8055550123", "email": "owner@casaverde.example.com"
    }))
    .bind(logo_url)
    .bind(now)
    .bind(now + Duration::days(365))
    .execute(pool)
    .await
    .expect("Failed to seed business");

    id
}
