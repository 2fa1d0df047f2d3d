//! Book endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::ApiJson;
use crate::{
    error::AppResult,
    models::{
        book::{BookQuery, DeleteBooksRequest},
        Book, BookFields, BookFilter, BookPatch,
    },
    AppState,
};

/// List books with optional filters
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookQuery),
    responses(
        (status = 200, description = "Matching books ordered by id", body = Vec<Book>),
        (status = 400, description = "Invalid year bound")
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<Vec<Book>>> {
    let filter = BookFilter::try_from(query)?;
    let books = state.services.books.get_books(&filter).await?;
    Ok(Json(books))
}

/// Get book details by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Book>> {
    let book = state.services.books.get_book(id).await?;
    Ok(Json(book))
}

/// Create books, one per element
///
/// Elements are created in order; a failing element stops the batch and
/// earlier elements remain created.
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body = Vec<BookFields>,
    responses(
        (status = 201, description = "Books created", body = Vec<Book>),
        (status = 400, description = "Missing or invalid field")
    )
)]
pub async fn create_books(
    State(state): State<AppState>,
    ApiJson(entries): ApiJson<Vec<BookFields>>,
) -> AppResult<(StatusCode, Json<Vec<Book>>)> {
    let created = state.services.books.create_books(entries).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Partially update a book
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = BookFields,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Invalid field"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ApiJson(fields): ApiJson<BookFields>,
) -> AppResult<Json<Book>> {
    let patch = BookPatch::try_from(fields)?;
    let updated = state.services.books.update_book(id, &patch).await?;
    Ok(Json(updated))
}

/// Partially update several books; each element carries its `id`
#[utoipa::path(
    put,
    path = "/books",
    tag = "books",
    request_body = Vec<BookFields>,
    responses(
        (status = 200, description = "Books updated", body = Vec<Book>),
        (status = 400, description = "Missing id or invalid field"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_books(
    State(state): State<AppState>,
    ApiJson(entries): ApiJson<Vec<BookFields>>,
) -> AppResult<Json<Vec<Book>>> {
    let updated = state.services.books.update_books(entries).await?;
    Ok(Json(updated))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Deleted book", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Book>> {
    let deleted = state.services.books.delete_book(id).await?;
    Ok(Json(deleted))
}

/// Delete several books
#[utoipa::path(
    delete,
    path = "/books",
    tag = "books",
    request_body = DeleteBooksRequest,
    responses(
        (status = 200, description = "Deleted books", body = Vec<Book>),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_books(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<DeleteBooksRequest>,
) -> AppResult<Json<Vec<Book>>> {
    let deleted = state.services.books.delete_books(&request.data).await?;
    Ok(Json(deleted))
}
