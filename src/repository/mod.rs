//! Repository layer for database operations
//!
//! Stores are traits so the service layer can run on PostgreSQL in production
//! and on the in-process [`memory::MemoryRepository`] for local runs and tests.
//! Absence is always reported as `Ok(None)`; errors mean the store itself failed.

pub mod authors;
pub mod books;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{Author, Book, BookFilter, BookPatch, CreateAuthor, NewBook},
};

/// Author lookups and explicit creation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthorRepository: Send + Sync {
    async fn get_by_id(&self, id: i32) -> AppResult<Option<Author>>;

    /// Exact, case-sensitive match
    async fn get_by_name(&self, name: &str) -> AppResult<Option<Author>>;

    /// Names are unique: creating a known name returns the existing author,
    /// taking the given birth date only if none was stored.
    async fn create(&self, author: &CreateAuthor) -> AppResult<Author>;
}

/// Book persistence, including the book-author associations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Matching books ordered by ascending id
    async fn get_all(&self, filter: &BookFilter) -> AppResult<Vec<Book>>;

    async fn get_by_id(&self, id: i32) -> AppResult<Option<Book>>;

    /// Creates the book, any unknown authors and the associations atomically.
    async fn create(&self, book: &NewBook) -> AppResult<Book>;

    /// Removes associations then the book atomically; returns the pre-deletion snapshot.
    async fn delete_by_id(&self, id: i32) -> AppResult<Option<Book>>;

    /// Merges the patch into the stored book. An author list replaces the
    /// current associations as a whole.
    async fn update_by_id(&self, id: i32, patch: &BookPatch) -> AppResult<Option<Book>>;

    /// Store connectivity check
    async fn ping(&self) -> AppResult<()>;
}

/// Main repository struct holding the store handles
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn BookRepository>,
    pub authors: Arc<dyn AuthorRepository>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: Arc::new(books::BooksRepository::new(pool.clone())),
            authors: Arc::new(authors::AuthorsRepository::new(pool)),
        }
    }

    /// Repository backed by a fresh, empty memory store
    pub fn in_memory() -> Self {
        let store = Arc::new(memory::MemoryRepository::new());
        Self {
            books: store.clone(),
            authors: store,
        }
    }

    pub fn from_parts(books: Arc<dyn BookRepository>, authors: Arc<dyn AuthorRepository>) -> Self {
        Self { books, authors }
    }
}
