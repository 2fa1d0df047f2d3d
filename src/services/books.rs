//! Book catalog service
//!
//! Thin orchestration over the book store. Absent books become
//! [`AppError::NotFound`]. Batch operations run the single-item operation per
//! element in order and stop at the first failure; elements already processed
//! stay committed.

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookFields, BookFilter, BookPatch, NewBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct BookService {
    repository: Repository,
}

fn not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Book {} not found", id))
}

impl BookService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List books matching the filter, ordered by id
    pub async fn get_books(&self, filter: &BookFilter) -> AppResult<Vec<Book>> {
        self.repository.books.get_all(filter).await
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository
            .books
            .get_by_id(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Create a book, creating any author not yet known by name
    pub async fn create_book(
        &self,
        name: &str,
        isbn: &str,
        authors: Vec<String>,
        publish_year: i32,
    ) -> AppResult<Book> {
        let book = NewBook::new(name.to_string(), isbn.to_string(), authors, publish_year);
        self.create(&book).await
    }

    async fn create(&self, book: &NewBook) -> AppResult<Book> {
        book.validate()?;
        book.ensure_storable()?;
        self.repository.books.create(book).await
    }

    /// Best-effort batch create
    pub async fn create_books(&self, entries: Vec<BookFields>) -> AppResult<Vec<Book>> {
        let mut created = Vec::with_capacity(entries.len());
        for (idx, fields) in entries.into_iter().enumerate() {
            let book = NewBook::try_from(fields).map_err(|e| {
                tracing::warn!("Batch create stopped at element {}: {}", idx, e);
                e
            })?;
            created.push(self.create(&book).await?);
        }
        Ok(created)
    }

    /// Delete a book, returning its last state
    pub async fn delete_book(&self, id: i32) -> AppResult<Book> {
        self.repository
            .books
            .delete_by_id(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Best-effort batch delete
    pub async fn delete_books(&self, ids: &[i32]) -> AppResult<Vec<Book>> {
        let mut deleted = Vec::with_capacity(ids.len());
        for &id in ids {
            deleted.push(self.delete_book(id).await?);
        }
        Ok(deleted)
    }

    /// Merge a partial update into a book
    pub async fn update_book(&self, id: i32, patch: &BookPatch) -> AppResult<Book> {
        if patch.is_empty() {
            return self.get_book(id).await;
        }
        patch.ensure_storable()?;
        self.repository
            .books
            .update_by_id(id, patch)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Best-effort batch update; every entry must carry its `id`
    pub async fn update_books(&self, entries: Vec<BookFields>) -> AppResult<Vec<Book>> {
        let mut updated = Vec::with_capacity(entries.len());
        for mut fields in entries {
            let id = fields.take_id()?;
            let patch = BookPatch::try_from(fields)?;
            updated.push(self.update_book(id, &patch).await?);
        }
        Ok(updated)
    }
}
