//! Books repository for database operations.
//!
//! Authors are linked through the `book_author` junction table; `position`
//! keeps the order in which names were supplied. Every multi-statement write
//! runs inside a single transaction.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgConnection, Pool, Postgres, Row};

use super::{authors, BookRepository};
use crate::{
    error::AppResult,
    models::{Author, Book, BookFilter, BookPatch, NewBook},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

// =========================================================================
// AUTHORS (book_author junction)
// =========================================================================

/// Load authors for a set of books, grouped by book id
async fn load_authors(
    conn: &mut PgConnection,
    book_ids: &[i32],
) -> AppResult<HashMap<i32, Vec<Author>>> {
    if book_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query(
        r#"
        SELECT ba.book_id, a.id, a.name, a.birth_date
        FROM book_author ba
        JOIN author a ON a.id = ba.author_id
        WHERE ba.book_id = ANY($1)
        ORDER BY ba.book_id, ba.position
        "#,
    )
    .bind(book_ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut grouped: HashMap<i32, Vec<Author>> = HashMap::new();
    for r in rows.iter() {
        grouped.entry(r.get("book_id")).or_default().push(Author {
            id: r.get("id"),
            name: r.get("name"),
            birth_date: r.get("birth_date"),
        });
    }
    Ok(grouped)
}

async fn attach_authors(conn: &mut PgConnection, mut books: Vec<Book>) -> AppResult<Vec<Book>> {
    let ids: Vec<i32> = books.iter().map(|b| b.id).collect();
    let mut grouped = load_authors(conn, &ids).await?;
    for book in books.iter_mut() {
        book.authors = grouped.remove(&book.id).unwrap_or_default();
    }
    Ok(books)
}

async fn fetch_book(conn: &mut PgConnection, id: i32) -> AppResult<Option<Book>> {
    let book = sqlx::query_as::<_, Book>(
        "SELECT id, name, isbn, publish_year FROM book WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(mut book) = book else {
        return Ok(None);
    };
    book.authors = load_authors(conn, &[id]).await?.remove(&id).unwrap_or_default();
    Ok(Some(book))
}

/// Resolve names to authors, creating the unknown ones.
async fn resolve_authors(conn: &mut PgConnection, names: &[String]) -> AppResult<Vec<Author>> {
    let mut resolved: Vec<Author> = Vec::with_capacity(names.len());
    for name in names {
        let author = authors::resolve_or_create(conn, name).await?;
        if !resolved.iter().any(|a| a.id == author.id) {
            resolved.push(author);
        }
    }
    Ok(resolved)
}

async fn insert_links(conn: &mut PgConnection, book_id: i32, authors: &[Author]) -> AppResult<()> {
    for (idx, author) in authors.iter().enumerate() {
        sqlx::query(
            "INSERT INTO book_author (book_id, author_id, position) VALUES ($1, $2, $3)",
        )
        .bind(book_id)
        .bind(author.id)
        .bind(i16::try_from(idx).unwrap_or(i16::MAX))
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Replace all authors for a book: delete existing rows then insert new ones.
async fn replace_authors(
    conn: &mut PgConnection,
    book_id: i32,
    names: &[String],
) -> AppResult<Vec<Author>> {
    let authors = resolve_authors(conn, names).await?;

    sqlx::query("DELETE FROM book_author WHERE book_id = $1")
        .bind(book_id)
        .execute(&mut *conn)
        .await?;

    insert_links(conn, book_id, &authors).await?;
    Ok(authors)
}

#[async_trait]
impl BookRepository for BooksRepository {
    // =========================================================================
    // READ
    // =========================================================================

    async fn get_all(&self, filter: &BookFilter) -> AppResult<Vec<Book>> {
        let mut conditions = vec!["1=1".to_string()];
        let mut idx = 1;

        if filter.isbn.is_some() {
            conditions.push(format!("b.isbn = ${}", idx));
            idx += 1;
        }
        if filter.author.is_some() {
            conditions.push(format!(
                "EXISTS (SELECT 1 FROM book_author ba JOIN author a ON a.id = ba.author_id \
                 WHERE ba.book_id = b.id AND a.name = ${})",
                idx
            ));
            idx += 1;
        }
        if filter.publish_year.is_some() {
            conditions.push(format!("b.publish_year BETWEEN ${} AND ${}", idx, idx + 1));
        }

        let query = format!(
            "SELECT b.id, b.name, b.isbn, b.publish_year FROM book b WHERE {} ORDER BY b.id",
            conditions.join(" AND ")
        );
        tracing::debug!("[SQL] {}", query);

        let mut builder = sqlx::query_as::<_, Book>(&query);
        if let Some(ref isbn) = filter.isbn {
            builder = builder.bind(isbn);
        }
        if let Some(ref author) = filter.author {
            builder = builder.bind(author);
        }
        if let Some((from, to)) = filter.publish_year {
            builder = builder.bind(from).bind(to);
        }

        let mut conn = self.pool.acquire().await?;
        let books = builder.fetch_all(&mut *conn).await?;
        attach_authors(&mut conn, books).await
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        let mut conn = self.pool.acquire().await?;
        fetch_book(&mut conn, id).await
    }

    // =========================================================================
    // CREATE
    // =========================================================================

    async fn create(&self, book: &NewBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let authors = resolve_authors(&mut tx, &book.authors).await?;

        let id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO book (name, isbn, publish_year) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&book.name)
        .bind(&book.isbn)
        .bind(book.publish_year)
        .fetch_one(&mut *tx)
        .await?;

        insert_links(&mut tx, id, &authors).await?;
        tx.commit().await?;

        tracing::info!("Created book id={} with {} author(s)", id, authors.len());

        Ok(Book {
            id,
            name: book.name.clone(),
            isbn: book.isbn.clone(),
            publish_year: book.publish_year,
            authors,
        })
    }

    // =========================================================================
    // DELETE
    // =========================================================================

    async fn delete_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        let mut tx = self.pool.begin().await?;

        let Some(book) = fetch_book(&mut tx, id).await? else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM book_author WHERE book_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM book WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!("Deleted book id={}", id);

        Ok(Some(book))
    }

    // =========================================================================
    // UPDATE
    // =========================================================================

    async fn update_by_id(&self, id: i32, patch: &BookPatch) -> AppResult<Option<Book>> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Book>(
            r#"
            UPDATE book SET
                name = COALESCE($1::text, name),
                isbn = COALESCE($2::text, isbn),
                publish_year = COALESCE($3::integer, publish_year)
            WHERE id = $4
            RETURNING id, name, isbn, publish_year
            "#,
        )
        .bind(patch.name.as_deref())
        .bind(patch.isbn.as_deref())
        .bind(patch.publish_year)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut book) = updated else {
            return Ok(None);
        };

        book.authors = match patch.authors {
            Some(ref names) => replace_authors(&mut tx, id, names).await?,
            None => load_authors(&mut tx, &[id]).await?.remove(&id).unwrap_or_default(),
        };

        tx.commit().await?;
        tracing::info!("Updated book id={}", id);

        Ok(Some(book))
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
