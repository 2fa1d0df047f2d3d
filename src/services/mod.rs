//! Business logic services

pub mod authors;
pub mod books;

use crate::repository::Repository;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub books: books::BookService,
    pub authors: authors::AuthorService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository) -> Self {
        Self {
            books: books::BookService::new(repository.clone()),
            authors: authors::AuthorService::new(repository.clone()),
            repository,
        }
    }

    /// Readiness check against the backing store
    pub async fn check_store(&self) -> crate::error::AppResult<()> {
        self.repository.books.ping().await
    }
}
