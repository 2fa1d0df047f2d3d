//! In-memory implementation of the book and author stores.
//!
//! Mirrors the PostgreSQL semantics: sequential ids starting at 1, exact-name
//! author deduplication and set-replace author updates. Each write holds the
//! lock for its whole duration, so it is applied entirely or not at all.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{AuthorRepository, BookRepository};
use crate::{
    error::AppResult,
    models::{Author, Book, BookFilter, BookPatch, CreateAuthor, NewBook},
};

#[derive(Debug, Clone)]
struct BookRecord {
    id: i32,
    name: String,
    isbn: String,
    publish_year: i32,
    author_ids: Vec<i32>,
}

#[derive(Debug, Default)]
struct MemoryState {
    authors: BTreeMap<i32, Author>,
    books: BTreeMap<i32, BookRecord>,
    last_author_id: i32,
    last_book_id: i32,
}

impl MemoryState {
    fn find_author_by_name(&self, name: &str) -> Option<&Author> {
        self.authors.values().find(|a| a.name == name)
    }

    fn insert_author(&mut self, name: &str, birth_date: &str) -> Author {
        self.last_author_id += 1;
        let author = Author {
            id: self.last_author_id,
            name: name.to_string(),
            birth_date: birth_date.to_string(),
        };
        self.authors.insert(author.id, author.clone());
        tracing::info!("Created author id={} name={:?}", author.id, author.name);
        author
    }

    fn resolve_authors(&mut self, names: &[String]) -> Vec<i32> {
        let mut ids: Vec<i32> = Vec::with_capacity(names.len());
        for name in names {
            let id = match self.find_author_by_name(name) {
                Some(author) => author.id,
                None => self.insert_author(name, "").id,
            };
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    fn hydrate(&self, record: &BookRecord) -> Book {
        Book {
            id: record.id,
            name: record.name.clone(),
            isbn: record.isbn.clone(),
            publish_year: record.publish_year,
            authors: record
                .author_ids
                .iter()
                .filter_map(|id| self.authors.get(id).cloned())
                .collect(),
        }
    }
}

/// Memory-backed store implementing both [`BookRepository`] and [`AuthorRepository`]
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthorRepository for MemoryRepository {
    async fn get_by_id(&self, id: i32) -> AppResult<Option<Author>> {
        Ok(self.state.read().await.authors.get(&id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> AppResult<Option<Author>> {
        Ok(self.state.read().await.find_author_by_name(name).cloned())
    }

    async fn create(&self, author: &CreateAuthor) -> AppResult<Author> {
        let mut state = self.state.write().await;
        if let Some(stored) = state.authors.values_mut().find(|a| a.name == author.name) {
            if stored.birth_date.is_empty() {
                stored.birth_date = author.birth_date.clone();
            }
            return Ok(stored.clone());
        }
        Ok(state.insert_author(&author.name, &author.birth_date))
    }
}

#[async_trait]
impl BookRepository for MemoryRepository {
    async fn get_all(&self, filter: &BookFilter) -> AppResult<Vec<Book>> {
        let state = self.state.read().await;
        Ok(state
            .books
            .values()
            .map(|record| state.hydrate(record))
            .filter(|book| filter.matches(book))
            .collect())
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        let state = self.state.read().await;
        Ok(state.books.get(&id).map(|record| state.hydrate(record)))
    }

    async fn create(&self, book: &NewBook) -> AppResult<Book> {
        let mut state = self.state.write().await;
        let author_ids = state.resolve_authors(&book.authors);

        state.last_book_id += 1;
        let record = BookRecord {
            id: state.last_book_id,
            name: book.name.clone(),
            isbn: book.isbn.clone(),
            publish_year: book.publish_year,
            author_ids,
        };
        let created = state.hydrate(&record);
        state.books.insert(record.id, record);

        tracing::info!("Created book id={} with {} author(s)", created.id, created.authors.len());
        Ok(created)
    }

    async fn delete_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        let mut state = self.state.write().await;
        let Some(record) = state.books.remove(&id) else {
            return Ok(None);
        };
        tracing::info!("Deleted book id={}", id);
        Ok(Some(state.hydrate(&record)))
    }

    async fn update_by_id(&self, id: i32, patch: &BookPatch) -> AppResult<Option<Book>> {
        let mut state = self.state.write().await;
        if !state.books.contains_key(&id) {
            return Ok(None);
        }

        let author_ids = patch
            .authors
            .as_ref()
            .map(|names| state.resolve_authors(names));

        let Some(record) = state.books.get_mut(&id) else {
            return Ok(None);
        };

        let mut merged = Book {
            id,
            name: record.name.clone(),
            isbn: record.isbn.clone(),
            publish_year: record.publish_year,
            authors: Vec::new(),
        };
        patch.apply_to(&mut merged);

        record.name = merged.name;
        record.isbn = merged.isbn;
        record.publish_year = merged.publish_year;
        if let Some(ids) = author_ids {
            record.author_ids = ids;
        }

        let record = record.clone();
        tracing::info!("Updated book id={}", id);
        Ok(Some(state.hydrate(&record)))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
