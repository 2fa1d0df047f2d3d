//! API integration tests
//!
//! Drive the full router in-process against the memory backend.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use book_catalog::{
    api,
    config::{AppConfig, StorageBackend},
    repository::Repository,
    AppState,
};

const BASE_URL: &str = "/api/v1";

fn app() -> Router {
    let mut config = AppConfig::default();
    config.storage.backend = StorageBackend::Memory;
    api::create_router(AppState::new(config, Repository::in_memory()))
}

async fn send(
    app: &Router,
    method: Method,
    path: &str,
    body: Option<Value>,
) -> (StatusCode, String) {
    let mut builder = Request::builder()
        .method(method)
        .uri(format!("{}{}", BASE_URL, path));
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).expect("request"))
        .await
        .expect("router is infallible");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    (status, String::from_utf8(bytes.to_vec()).expect("utf-8 body"))
}

async fn request(app: &Router, method: Method, path: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, text) = send(app, method, path, body).await;
    let value = serde_json::from_str(&text)
        .unwrap_or_else(|_| panic!("expected JSON body, got {:?} ({})", text, status));
    (status, value)
}

async fn seed(app: &Router) -> Value {
    let (status, body) = request(
        app,
        Method::POST,
        "/books",
        Some(json!([
            {"name": ["Book 1"], "isbn": ["1234567890"], "author": ["Author 1"], "publishYear": ["2010"]},
            {"name": "Book 2", "isbn": "0987654321", "author": ["Luffy", "Zoro"], "publishYear": 2012},
            {"name": "Book 3", "isbn": "1111111111", "author": "Zoro", "publishYear": 2015}
        ])),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

fn names(book: &Value) -> Vec<&str> {
    book["authors"]
        .as_array()
        .expect("authors array")
        .iter()
        .map(|a| a["name"].as_str().expect("author name"))
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let app = app();

    let (status, body) = request(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = request(&app, Method::GET, "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_create_book_generates_author() {
    let app = app();

    let (status, body) = request(
        &app,
        Method::POST,
        "/books",
        Some(json!([{
            "name": "Book 1",
            "isbn": "1234567890",
            "author": ["Author 1"],
            "publishYear": 2010
        }])),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let book = &body[0];
    assert_eq!(book["id"], 1);
    assert_eq!(book["name"], "Book 1");
    assert_eq!(book["publishYear"], 2010);
    assert_eq!(book["authors"][0]["id"], 1);
    assert_eq!(book["authors"][0]["name"], "Author 1");

    let (status, author) = request(&app, Method::GET, "/authors?name=Author%201", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(author["id"], 1);
}

#[tokio::test]
async fn test_create_reuses_existing_author() {
    let app = app();
    let created = seed(&app).await;

    // "Zoro" was generated for book 2 and reused by book 3
    assert_eq!(created[1]["authors"][1], created[2]["authors"][0]);
}

#[tokio::test]
async fn test_list_books_in_id_order() {
    let app = app();
    seed(&app).await;

    let (status, body) = request(&app, Method::GET, "/books", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body
        .as_array()
        .expect("array")
        .iter()
        .map(|b| b["id"].as_i64().expect("id"))
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_list_books_filters() {
    let app = app();
    seed(&app).await;

    let (_, body) = request(&app, Method::GET, "/books?from=2010&to=2013", None).await;
    assert_eq!(body.as_array().expect("array").len(), 2);

    // A single bound is ignored
    let (_, body) = request(&app, Method::GET, "/books?from=2013", None).await;
    assert_eq!(body.as_array().expect("array").len(), 3);

    let (_, body) = request(&app, Method::GET, "/books?isbn=0987654321", None).await;
    assert_eq!(body[0]["name"], "Book 2");

    // Matching on one author still returns every author of the book
    let (_, body) = request(&app, Method::GET, "/books?author=Luffy", None).await;
    assert_eq!(body.as_array().expect("array").len(), 1);
    assert_eq!(names(&body[0]), vec!["Luffy", "Zoro"]);

    let (status, text) = send(&app, Method::GET, "/books?from=abc&to=2013", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(text.contains("from"));
}

#[tokio::test]
async fn test_get_book() {
    let app = app();
    seed(&app).await;

    let (status, body) = request(&app, Method::GET, "/books/2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isbn"], "0987654321");
    assert_eq!(names(&body), vec!["Luffy", "Zoro"]);

    let (status, text) = send(&app, Method::GET, "/books/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!text.is_empty());

    let (status, _) = send(&app, Method::GET, "/books/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_book_replaces_authors() {
    let app = app();
    seed(&app).await;

    let (status, body) = request(
        &app,
        Method::PUT,
        "/books/2",
        Some(json!({"author": ["Capybara"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Book 2");
    assert_eq!(body["publishYear"], 2012);
    assert_eq!(names(&body), vec!["Capybara"]);

    // Replaced authors stay in the catalog
    let (status, _) = request(&app, Method::GET, "/authors?name=Luffy", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_update_book_merges_scalars() {
    let app = app();
    seed(&app).await;

    let (status, body) = request(
        &app,
        Method::PUT,
        "/books/1",
        Some(json!({"name": ["Renamed"], "id": 99})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], 1);
    assert_eq!(body["name"], "Renamed");
    assert_eq!(body["isbn"], "1234567890");
    assert_eq!(names(&body), vec!["Author 1"]);

    let (status, _) = send(&app, Method::PUT, "/books/42", Some(json!({"name": "x"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::PUT, "/books/1", Some(json!({"author": []}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_batch_update() {
    let app = app();
    seed(&app).await;

    let (status, body) = request(
        &app,
        Method::PUT,
        "/books",
        Some(json!([
            {"id": 1, "publishYear": 2011},
            {"id": "3", "isbn": "2222222222"}
        ])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["publishYear"], 2011);
    assert_eq!(body[1]["isbn"], "2222222222");

    let (status, text) = send(&app, Method::PUT, "/books", Some(json!([{"name": "no id"}]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(text.contains("id"));
}

#[tokio::test]
async fn test_delete_book() {
    let app = app();
    seed(&app).await;

    let (status, body) = request(&app, Method::DELETE, "/books/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Book 1");
    assert_eq!(names(&body), vec!["Author 1"]);

    let (status, _) = send(&app, Method::GET, "/books/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, "/books/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_batch_delete() {
    let app = app();
    seed(&app).await;

    let (status, body) = request(&app, Method::DELETE, "/books", Some(json!({"data": [1, 3]}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().expect("array").len(), 2);

    let (_, body) = request(&app, Method::GET, "/books", None).await;
    assert_eq!(body.as_array().expect("array").len(), 1);
    assert_eq!(body[0]["id"], 2);
}

#[tokio::test]
async fn test_batch_create_keeps_earlier_elements() {
    let app = app();

    let (status, text) = send(
        &app,
        Method::POST,
        "/books",
        Some(json!([
            {"name": "Book 1", "isbn": "1", "author": "A", "publishYear": 2001},
            {"name": "Book 2", "isbn": "2", "author": "B"},
            {"name": "Book 3", "isbn": "3", "author": "C", "publishYear": 2003}
        ])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(text.contains("publishYear"));

    let (_, body) = request(&app, Method::GET, "/books", None).await;
    let books = body.as_array().expect("array");
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["name"], "Book 1");
}

#[tokio::test]
async fn test_create_rejects_invalid_input() {
    let app = app();

    let (status, _) = send(
        &app,
        Method::POST,
        "/books",
        Some(json!([{"name": "Book", "isbn": "1", "author": "A", "publishYear": "soon"}])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/books",
        Some(json!([{"name": "", "isbn": "1", "author": "A", "publishYear": 2000}])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(format!("{}/books", BASE_URL))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .expect("request"),
        )
        .await
        .expect("router is infallible");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_authors_endpoints() {
    let app = app();

    let (status, author) = request(
        &app,
        Method::POST,
        "/authors",
        Some(json!({"name": "Nami", "birthDay": "03/07/1998"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = author["id"].as_i64().expect("id");

    let (status, body) = request(&app, Method::GET, &format!("/authors/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["birthDay"], "03/07/1998");

    // Books reuse explicitly created authors
    let (_, books) = request(
        &app,
        Method::POST,
        "/books",
        Some(json!([{"name": "Log", "isbn": "9", "author": "Nami", "publishYear": 2020}])),
    )
    .await;
    assert_eq!(books[0]["authors"][0]["id"], id);

    let (status, _) = send(&app, Method::GET, "/authors/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::GET, "/authors?name=Nobody", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::POST, "/authors", Some(json!({"name": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_author_twice_keeps_one_id() {
    let app = app();
    seed(&app).await;

    let (status, author) = request(
        &app,
        Method::POST,
        "/authors",
        Some(json!({"name": "Author 1", "birthDay": "01/01/2002"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(author["id"], 1);
    assert_eq!(author["birthDay"], "01/01/2002");

    let (_, again) = request(
        &app,
        Method::POST,
        "/authors",
        Some(json!({"name": "Author 1"})),
    )
    .await;
    assert_eq!(again, author);

    let (_, found) = request(&app, Method::GET, "/authors?name=Author%201", None).await;
    assert_eq!(found, author);

    let (_, book) = request(&app, Method::GET, "/books/1", None).await;
    assert_eq!(book["authors"][0], author);
}

#[tokio::test]
async fn test_nul_bytes_are_bad_requests() {
    let app = app();
    seed(&app).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/books",
        Some(json!([{"name": "Book\0", "isbn": "1", "author": "A", "publishYear": 2000}])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::PUT,
        "/books/1",
        Some(json!({"author": ["ok", "bad\0"]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/books?isbn=1%00", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::POST, "/authors", Some(json!({"name": "x\0"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // nothing was written
    let (_, body) = request(&app, Method::GET, "/books", None).await;
    assert_eq!(body.as_array().expect("array").len(), 3);
    let (_, book) = request(&app, Method::GET, "/books/1", None).await;
    assert_eq!(names(&book), vec!["Author 1"]);
}

#[tokio::test]
async fn test_batch_delete_without_data_is_empty() {
    let app = app();
    seed(&app).await;

    let (status, body) = request(&app, Method::DELETE, "/books", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (_, body) = request(&app, Method::GET, "/books", None).await;
    assert_eq!(body.as_array().expect("array").len(), 3);
}

#[tokio::test]
async fn test_openapi_document() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router is infallible");
    assert_eq!(response.status(), StatusCode::OK);
}
