//! Authors repository

use async_trait::async_trait;
use sqlx::{PgConnection, Pool, Postgres};

use super::AuthorRepository;
use crate::{
    error::AppResult,
    models::{Author, CreateAuthor},
};

#[derive(Clone)]
pub struct AuthorsRepository {
    pool: Pool<Postgres>,
}

impl AuthorsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

pub(crate) async fn find_by_name(conn: &mut PgConnection, name: &str) -> AppResult<Option<Author>> {
    let author = sqlx::query_as::<_, Author>(
        "SELECT id, name, birth_date FROM author WHERE name = $1",
    )
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(author)
}

/// Insert an author, or return the one already holding this name.
///
/// `author.name` is unique, so concurrent writers naming the same new author
/// converge on a single row. An empty stored birth date is filled in from
/// `birth_date`; a non-empty one is kept.
pub(crate) async fn upsert(
    conn: &mut PgConnection,
    name: &str,
    birth_date: &str,
) -> AppResult<Author> {
    let author = sqlx::query_as::<_, Author>(
        r#"
        INSERT INTO author (name, birth_date) VALUES ($1, $2)
        ON CONFLICT (name) DO UPDATE SET
            birth_date = CASE WHEN author.birth_date = '' THEN EXCLUDED.birth_date
                              ELSE author.birth_date END
        RETURNING id, name, birth_date
        "#,
    )
    .bind(name)
    .bind(birth_date)
    .fetch_one(&mut *conn)
    .await?;
    tracing::debug!("Resolved author id={} name={:?}", author.id, author.name);
    Ok(author)
}

/// Return the author with this exact name, inserting it if new.
pub(crate) async fn resolve_or_create(conn: &mut PgConnection, name: &str) -> AppResult<Author> {
    upsert(conn, name, "").await
}

#[async_trait]
impl AuthorRepository for AuthorsRepository {
    async fn get_by_id(&self, id: i32) -> AppResult<Option<Author>> {
        let author = sqlx::query_as::<_, Author>(
            "SELECT id, name, birth_date FROM author WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(author)
    }

    async fn get_by_name(&self, name: &str) -> AppResult<Option<Author>> {
        let mut conn = self.pool.acquire().await?;
        find_by_name(&mut conn, name).await
    }

    async fn create(&self, author: &CreateAuthor) -> AppResult<Author> {
        let mut conn = self.pool.acquire().await?;
        upsert(&mut conn, &author.name, &author.birth_date).await
    }
}
