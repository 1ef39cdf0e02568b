//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tally_core::ai::MockBackend;
use tally_core::models::{Category, NewExpense};
use tower::ServiceExt;

fn test_config() -> ServerConfig {
    ServerConfig {
        require_auth: false,
        allowed_origins: vec![],
        ..Default::default()
    }
}

fn setup_test_app() -> Router {
    let db = Database::in_memory().unwrap();
    create_router_with_options(db, None, test_config(), Some(AIClient::mock()))
}

fn setup_app_with_db(db: Database, ai: Option<AIClient>) -> Router {
    create_router_with_options(db, None, test_config(), ai)
}

async fn get_body_json(response: axum::response::Response) -> Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> axum::response::Response {
    let body = match body {
        Some(value) => Body::from(serde_json::to_string(&value).unwrap()),
        None => Body::empty(),
    };
    app.clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap()
}

fn new_expense(amount: f64, category: Category, day: &str) -> NewExpense {
    NewExpense {
        amount,
        category,
        note: None,
        date: NaiveDate::parse_from_str(day, "%Y-%m-%d").unwrap(),
    }
}

fn seed_march(db: &Database, user: &str) {
    db.insert_expense(user, &new_expense(50.0, Category::FoodAndDining, "2024-03-01"))
        .unwrap();
    db.insert_expense(user, &new_expense(30.0, Category::Transportation, "2024-03-15"))
        .unwrap();
    db.insert_expense(user, &new_expense(12.0, Category::Shopping, "2024-04-02"))
        .unwrap();
}

// ========== Health & Auth Tests ==========

#[tokio::test]
async fn test_health() {
    let app = setup_test_app();
    let response = send(&app, "GET", "/api/health", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["ai_configured"], true);
}

#[tokio::test]
async fn test_me_without_auth_is_local_dev() {
    let app = setup_test_app();
    let response = send(&app, "GET", "/api/me", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["user"], LOCAL_DEV_USER);
    assert_eq!(json["auth_method"], "none");
}

fn secured_app() -> Router {
    let db = Database::in_memory().unwrap();
    let config = ServerConfig {
        require_auth: true,
        api_keys: parse_api_keys("service-key=alice@example.com, shared-key"),
        ..Default::default()
    };
    create_router_with_options(db, None, config, None)
}

#[tokio::test]
async fn test_requests_without_credentials_are_rejected() {
    let app = secured_app();
    let response = send(&app, "GET", "/api/expenses", None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Unauthorized");
    assert_eq!(json["statusCode"], 401);
    assert_eq!(json["retryable"], false);
}

#[tokio::test]
async fn test_health_is_public_when_auth_required() {
    let app = secured_app();
    let response = send(&app, "GET", "/api/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_access_header_authenticates() {
    let app = secured_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header(CF_ACCESS_USER_HEADER, "bob@example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["user"], "bob@example.com");
    assert_eq!(json["auth_method"], "access_header");
}

#[tokio::test]
async fn test_api_key_maps_to_user() {
    let app = secured_app();

    for (key, expected) in [
        ("service-key", "alice@example.com"),
        ("shared-key", DEFAULT_API_KEY_USER),
    ] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/me")
                    .header("authorization", format!("Bearer {}", key))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = get_body_json(response).await;
        assert_eq!(json["user"], expected);
        assert_eq!(json["auth_method"], "api_key");
    }

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header("authorization", "Bearer wrong-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[test]
fn test_parse_api_keys() {
    let keys = parse_api_keys(" a , b=bob ,, =nobody, c= ");
    assert_eq!(
        keys,
        vec![
            ApiKey {
                key: "a".into(),
                user_id: DEFAULT_API_KEY_USER.into()
            },
            ApiKey {
                key: "b".into(),
                user_id: "bob".into()
            },
        ]
    );
}

#[tokio::test]
async fn test_security_headers() {
    let app = setup_test_app();
    let response = send(&app, "GET", "/api/health", None).await;

    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(headers.contains_key("content-security-policy"));
}

// ========== Expense API Tests ==========

#[tokio::test]
async fn test_create_and_list_expenses() {
    let app = setup_test_app();

    let response = send(
        &app,
        "POST",
        "/api/expenses",
        Some(json!({
            "amount": 42.5,
            "category": "Food & Dining",
            "date": "2024-03-01",
            "note": "groceries"
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = get_body_json(response).await;
    assert_eq!(json["message"], "Expense created successfully");
    assert_eq!(json["data"]["amount"], 42.5);
    assert_eq!(json["data"]["category"], "Food & Dining");
    assert_eq!(json["data"]["user_id"], LOCAL_DEV_USER);

    send(
        &app,
        "POST",
        "/api/expenses",
        Some(json!({"amount": 10, "category": "Travel", "date": "2024-03-20"})),
    )
    .await;

    let response = send(&app, "GET", "/api/expenses", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    // Newest date first
    assert_eq!(data[0]["date"], "2024-03-20");
    assert_eq!(data[1]["date"], "2024-03-01");
}

#[tokio::test]
async fn test_list_expenses_date_filter() {
    let db = Database::in_memory().unwrap();
    seed_march(&db, LOCAL_DEV_USER);
    let app = setup_app_with_db(db, None);

    let response = send(
        &app,
        "GET",
        "/api/expenses?startDate=2024-03-10&endDate=2024-03-31",
        None,
    )
    .await;
    let json = get_body_json(response).await;
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["category"], "Transportation");

    let response = send(&app, "GET", "/api/expenses?startDate=03/10/2024", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_expense_validation() {
    let app = setup_test_app();

    let response = send(
        &app,
        "POST",
        "/api/expenses",
        Some(json!({"amount": -5, "category": "Groceries", "date": "2024-13-01"})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Validation Error");
    assert_eq!(json["message"], "Amount must be greater than 0");
    assert_eq!(json["errors"]["category"], "Invalid category");
    assert_eq!(json["errors"]["date"], "Invalid date");
    assert_eq!(json["retryable"], false);
}

#[tokio::test]
async fn test_create_expense_invalid_json() {
    let app = setup_test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/expenses")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Validation Error");
}

#[tokio::test]
async fn test_update_expense_merges_patch() {
    let db = Database::in_memory().unwrap();
    let stored = db
        .insert_expense(
            LOCAL_DEV_USER,
            &NewExpense {
                note: Some("taxi".into()),
                ..new_expense(20.0, Category::Travel, "2024-02-10")
            },
        )
        .unwrap();
    let app = setup_app_with_db(db, None);

    let response = send(
        &app,
        "PUT",
        &format!("/api/expenses/{}", stored.id),
        Some(json!({"amount": 25.75, "note": null})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["message"], "Expense updated successfully");
    assert_eq!(json["data"]["amount"], 25.75);
    assert_eq!(json["data"]["category"], "Travel");
    assert_eq!(json["data"]["note"], "taxi");
    assert_eq!(json["data"]["date"], "2024-02-10");

    // Whole merged record is validated
    let response = send(
        &app,
        "PUT",
        &format!("/api/expenses/{}", stored.id),
        Some(json!({"date": "2024-02-31"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["message"], "Invalid date");
}

#[tokio::test]
async fn test_foreign_expenses_are_not_found() {
    let db = Database::in_memory().unwrap();
    let theirs = db
        .insert_expense("mallory", &new_expense(9.0, Category::Other, "2024-01-01"))
        .unwrap();
    let app = setup_app_with_db(db.clone(), None);

    let response = send(
        &app,
        "PUT",
        &format!("/api/expenses/{}", theirs.id),
        Some(json!({"amount": 1})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = get_body_json(response).await;
    assert_eq!(
        json["message"],
        "Expense not found or you do not have permission to update it"
    );

    let response = send(&app, "DELETE", &format!("/api/expenses/{}", theirs.id), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = get_body_json(response).await;
    assert_eq!(
        json["message"],
        "Expense not found or you do not have permission to delete it"
    );

    // Untouched
    assert_eq!(
        db.get_expense("mallory", theirs.id).unwrap().unwrap().amount,
        9.0
    );

    let response = send(&app, "DELETE", "/api/expenses/not-a-number", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_expense() {
    let db = Database::in_memory().unwrap();
    let stored = db
        .insert_expense(LOCAL_DEV_USER, &new_expense(5.0, Category::Other, "2024-01-01"))
        .unwrap();
    let app = setup_app_with_db(db.clone(), None);

    let response = send(&app, "DELETE", &format!("/api/expenses/{}", stored.id), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["message"], "Expense deleted successfully");
    assert_eq!(json["success"], true);

    assert!(db.get_expense(LOCAL_DEV_USER, stored.id).unwrap().is_none());
}

// ========== Summary API Tests ==========

#[tokio::test]
async fn test_monthly_summary() {
    let db = Database::in_memory().unwrap();
    seed_march(&db, LOCAL_DEV_USER);
    let app = setup_app_with_db(db, None);

    let response = send(&app, "GET", "/api/summary/monthly?month=2&year=2024", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["data"]["total"], 80.0);
    assert_eq!(json["data"]["month"], "March");
    assert_eq!(json["data"]["year"], 2024);
    assert_eq!(json["data"]["currency"], "USD");
    assert_eq!(json["data"]["formatted_total"], "$80.00");
}

#[tokio::test]
async fn test_monthly_summary_uses_profile_currency() {
    let db = Database::in_memory().unwrap();
    seed_march(&db, LOCAL_DEV_USER);
    db.get_or_create_profile(LOCAL_DEV_USER).unwrap();
    db.update_profile(
        LOCAL_DEV_USER,
        &tally_core::models::ProfileUpdate {
            name: None,
            preferred_currency: Some("EUR".into()),
        },
    )
    .unwrap();
    let app = setup_app_with_db(db, None);

    let response = send(&app, "GET", "/api/summary/monthly?month=2&year=2024", None).await;
    let json = get_body_json(response).await;
    assert_eq!(json["data"]["formatted_total"], "80.00 €");
}

#[tokio::test]
async fn test_summary_rejects_bad_month() {
    let app = setup_test_app();
    for uri in [
        "/api/summary/monthly?month=12",
        "/api/summary/categories?month=abc",
        "/api/summary/monthly?year=twenty",
    ] {
        let response = send(&app, "GET", uri, None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
    }
}

#[tokio::test]
async fn test_category_summary() {
    let db = Database::in_memory().unwrap();
    seed_march(&db, LOCAL_DEV_USER);
    db.insert_expense("someone-else", &new_expense(1000.0, Category::Travel, "2024-03-02"))
        .unwrap();
    let app = setup_app_with_db(db, None);

    let response = send(&app, "GET", "/api/summary/categories?month=2&year=2024", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["category"], "Food & Dining");
    assert_eq!(data[0]["total"], 50.0);
    assert_eq!(data[0]["percentage"], 62.5);
    assert_eq!(data[1]["category"], "Transportation");
    assert_eq!(data[1]["percentage"], 37.5);

    // Without a window every expense of the owner counts
    let response = send(&app, "GET", "/api/summary/categories", None).await;
    let json = get_body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_daily_spending() {
    let db = Database::in_memory().unwrap();
    seed_march(&db, LOCAL_DEV_USER);
    let app = setup_app_with_db(db, None);

    let response = send(
        &app,
        "GET",
        "/api/summary/daily?startDate=2024-02-29&endDate=2024-03-02",
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 3);
    assert_eq!(data[0]["date"], "2024-02-29");
    assert_eq!(data[0]["total"], 0.0);
    assert_eq!(data[1]["total"], 50.0);

    let response = send(
        &app,
        "GET",
        "/api/summary/daily?startDate=2024-03-10&endDate=2024-03-01",
        None,
    )
    .await;
    let json = get_body_json(response).await;
    assert!(json["data"].as_array().unwrap().is_empty());

    // Default window: 30 days back through today
    let response = send(&app, "GET", "/api/summary/daily", None).await;
    let json = get_body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 31);
}

#[tokio::test]
async fn test_daily_spending_rejects_oversized_range() {
    let app = setup_test_app();

    for uri in [
        "/api/summary/daily?startDate=0001-01-01&endDate=9999-12-31",
        "/api/summary/daily?startDate=2023-01-01&endDate=2024-01-01",
        "/api/summary/daily?startDate=2000-01-01",
    ] {
        let response = send(&app, "GET", uri, None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        let json = get_body_json(response).await;
        assert_eq!(json["message"], "Date range cannot exceed 366 days");
    }

    // A full leap year is the longest accepted range
    let response = send(
        &app,
        "GET",
        "/api/summary/daily?startDate=2024-01-01&endDate=2024-12-31",
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 366);
}

// ========== Insights API Tests ==========

async fn stored_expenses_json(app: &Router) -> Value {
    let response = send(app, "GET", "/api/expenses", None).await;
    get_body_json(response).await["data"].clone()
}

#[tokio::test]
async fn test_generate_insights() {
    let db = Database::in_memory().unwrap();
    seed_march(&db, LOCAL_DEV_USER);
    let app = setup_app_with_db(db, Some(AIClient::mock()));

    let expenses = stored_expenses_json(&app).await;
    let response = send(&app, "POST", "/api/insights", Some(json!({"expenses": expenses}))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["message"], "Insights generated successfully");
    assert!(json["data"]["insights"]
        .as_str()
        .unwrap()
        .contains("Total Expenses: $92.00"));
    assert!(json["data"]["generated_at"].is_string());
}

#[tokio::test]
async fn test_insights_require_expenses() {
    let app = setup_test_app();

    for body in [json!({}), json!({"expenses": []}), json!({"expenses": "all"})] {
        let response = send(&app, "POST", "/api/insights", Some(body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = get_body_json(response).await;
        assert_eq!(
            json["message"],
            "Expense data is required and must be a non-empty array"
        );
    }
}

#[tokio::test]
async fn test_insights_reject_foreign_expenses() {
    let db = Database::in_memory().unwrap();
    seed_march(&db, LOCAL_DEV_USER);
    let theirs = db
        .insert_expense("mallory", &new_expense(7.0, Category::Other, "2024-03-03"))
        .unwrap();
    let mock = MockBackend::new();
    let app = setup_app_with_db(db, Some(AIClient::Mock(mock.clone())));

    // Another user's record
    let mut expenses = stored_expenses_json(&app).await;
    expenses
        .as_array_mut()
        .unwrap()
        .push(serde_json::to_value(&theirs).unwrap());
    let response = send(&app, "POST", "/api/insights", Some(json!({"expenses": expenses}))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Forbidden");
    assert_eq!(
        json["message"],
        "You can only generate insights for your own expenses"
    );

    // Relabeled as ours, but the id is still someone else's
    let mut forged = serde_json::to_value(&theirs).unwrap();
    forged["user_id"] = json!(LOCAL_DEV_USER);
    let response = send(&app, "POST", "/api/insights", Some(json!({"expenses": [forged]}))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn test_insights_without_backend() {
    let db = Database::in_memory().unwrap();
    seed_march(&db, LOCAL_DEV_USER);
    let app = setup_app_with_db(db, None);

    let expenses = stored_expenses_json(&app).await;
    let response = send(&app, "POST", "/api/insights", Some(json!({"expenses": expenses}))).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Configuration Error");
    assert_eq!(json["retryable"], false);
}

#[tokio::test]
async fn test_insights_backend_failure_is_classified() {
    let db = Database::in_memory().unwrap();
    seed_march(&db, LOCAL_DEV_USER);
    let app = setup_app_with_db(
        db,
        Some(AIClient::Mock(MockBackend::failing(
            "Resource has been exhausted (e.g. check quota).",
        ))),
    );

    let expenses = stored_expenses_json(&app).await;
    let response = send(&app, "POST", "/api/insights", Some(json!({"expenses": expenses}))).await;

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "AI Service Error");
    assert_eq!(json["statusCode"], 429);
    assert_eq!(json["retryable"], true);
}

// ========== Profile API Tests ==========

#[tokio::test]
async fn test_profile_created_on_first_access() {
    let app = setup_test_app();
    let response = send(&app, "GET", "/api/profile", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["data"]["id"], LOCAL_DEV_USER);
    assert_eq!(json["data"]["preferred_currency"], "USD");
    assert!(json["data"]["name"].is_null());
}

#[tokio::test]
async fn test_update_profile() {
    let app = setup_test_app();

    let response = send(
        &app,
        "PUT",
        "/api/profile",
        Some(json!({"name": "  Ada  ", "preferred_currency": "eur"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["message"], "Profile updated successfully");
    assert_eq!(json["data"]["name"], "Ada");
    assert_eq!(json["data"]["preferred_currency"], "EUR");

    let response = send(&app, "PUT", "/api/profile", Some(json!({}))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["message"], "No valid fields to update");

    let response = send(
        &app,
        "PUT",
        "/api/profile",
        Some(json!({"preferred_currency": "US1"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(
        json["errors"]["preferred_currency"],
        "Currency must contain only letters"
    );
}

#[tokio::test]
async fn test_delete_profile_removes_account() {
    let db = Database::in_memory().unwrap();
    seed_march(&db, LOCAL_DEV_USER);
    seed_march(&db, "neighbor");
    db.get_or_create_profile(LOCAL_DEV_USER).unwrap();
    let app = setup_app_with_db(db.clone(), None);

    let response = send(&app, "DELETE", "/api/profile", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["message"], "Account deleted successfully");
    assert_eq!(json["deleted_expenses"], 3);

    assert!(db.list_expenses(LOCAL_DEV_USER, None, None).unwrap().is_empty());
    assert!(db.get_profile(LOCAL_DEV_USER).unwrap().is_none());
    assert_eq!(db.list_expenses("neighbor", None, None).unwrap().len(), 3);
}

// ========== Error Mapping Tests ==========

#[test]
fn test_database_errors_are_sanitized() {
    let err = tally_core::Error::Classified(AppFailure::new(
        ErrorKind::Database,
        "near \"SELEC\": syntax error",
        500,
        false,
    ));
    let app_error = AppError::from(err);
    assert_eq!(app_error.failure().kind, ErrorKind::Database);
    assert_eq!(app_error.failure().message, "Database operation failed");

    // Retryable storage failures keep their message
    let err = tally_core::Error::Classified(AppFailure::new(
        ErrorKind::Database,
        "connection pool timeout",
        503,
        true,
    ));
    assert_eq!(
        AppError::from(err).failure().message,
        "connection pool timeout"
    );
}
