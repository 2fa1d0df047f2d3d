//! Author service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{book::reject_nul, Author, CreateAuthor},
    repository::Repository,
};

#[derive(Clone)]
pub struct AuthorService {
    repository: Repository,
}

impl AuthorService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get_author(&self, id: i32) -> AppResult<Author> {
        self.repository
            .authors
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Author {} not found", id)))
    }

    /// Exact, case-sensitive name lookup
    pub async fn find_author(&self, name: &str) -> AppResult<Author> {
        reject_nul(name, "name")?;
        self.repository
            .authors
            .get_by_name(name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Author {:?} not found", name)))
    }

    /// Create an author, or return the existing one with this exact name
    pub async fn create_author(&self, author: &CreateAuthor) -> AppResult<Author> {
        author.validate()?;
        reject_nul(&author.name, "name")?;
        reject_nul(&author.birth_date, "birthDay")?;
        self.repository.authors.create(author).await
    }
}
