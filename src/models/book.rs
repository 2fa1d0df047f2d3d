//! Book model, request payloads and the partial-update merge logic.
//!
//! Request bodies arrive as loosely typed field maps: every field may be sent
//! either as a scalar (`"Book 1"`, `2010`) or as a list of strings
//! (`["Book 1"]`). They are converted into [`NewBook`] and [`BookPatch`] before
//! reaching the service layer, so stores only ever see typed values.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::author::Author;
use crate::error::{AppError, AppResult};

/// Full book with its resolved authors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i32,
    pub name: String,
    pub isbn: String,
    pub publish_year: i32,
    /// Authors in association order
    #[sqlx(skip)]
    #[serde(default)]
    pub authors: Vec<Author>,
}

impl Book {
    pub fn author_names(&self) -> Vec<&str> {
        self.authors.iter().map(|a| a.name.as_str()).collect()
    }
}

/// A single request field value
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(i64),
    List(Vec<String>),
}

impl FieldValue {
    /// Scalar view of the value; lists yield their first element.
    pub fn first(&self) -> Option<String> {
        match self {
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Number(n) => Some(n.to_string()),
            FieldValue::List(values) => values.first().cloned(),
        }
    }

    /// List view of the value; scalars yield a single element.
    pub fn into_values(self) -> Vec<String> {
        match self {
            FieldValue::Text(s) => vec![s],
            FieldValue::Number(n) => vec![n.to_string()],
            FieldValue::List(values) => values,
        }
    }

    fn parse_int(&self, field: &str) -> AppResult<i32> {
        match self {
            FieldValue::Number(n) => i32::try_from(*n)
                .map_err(|_| AppError::Validation(format!("{} is out of range: {}", field, n))),
            other => {
                let raw = other
                    .first()
                    .ok_or_else(|| AppError::Validation(format!("{} must have a value", field)))?;
                raw.trim()
                    .parse::<i32>()
                    .map_err(|_| AppError::Validation(format!("invalid {}: {:?}", field, raw)))
            }
        }
    }
}

/// Raw book fields as sent by clients (create, update and batch update bodies)
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookFields {
    /// Only used by batch updates
    #[schema(value_type = Object)]
    pub id: Option<FieldValue>,
    #[schema(value_type = Object)]
    pub name: Option<FieldValue>,
    #[schema(value_type = Object)]
    pub isbn: Option<FieldValue>,
    /// One author name or a list of names
    #[serde(alias = "authors")]
    #[schema(value_type = Object)]
    pub author: Option<FieldValue>,
    #[schema(value_type = Object)]
    pub publish_year: Option<FieldValue>,
}

impl BookFields {
    /// Removes and parses the `id` field carried by batch update entries.
    pub fn take_id(&mut self) -> AppResult<i32> {
        self.id
            .take()
            .ok_or_else(|| AppError::Validation("id is required".to_string()))?
            .parse_int("id")
    }
}

fn required(value: Option<FieldValue>, field: &str) -> AppResult<FieldValue> {
    value.ok_or_else(|| AppError::Validation(format!("{} is required", field)))
}

/// PostgreSQL `TEXT` cannot hold NUL bytes.
pub fn reject_nul(value: &str, field: &str) -> AppResult<()> {
    if value.contains('\0') {
        return Err(AppError::Validation(format!("{} must not contain NUL bytes", field)));
    }
    Ok(())
}

fn text(value: FieldValue, field: &str) -> AppResult<String> {
    match value.first() {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(AppError::Validation(format!("{} must not be empty", field))),
    }
}

fn author_names(value: FieldValue) -> AppResult<Vec<String>> {
    let names = value.into_values();
    if names.iter().any(|n| n.is_empty()) {
        return Err(AppError::Validation("author names must not be empty".to_string()));
    }
    if names.is_empty() {
        return Err(AppError::Validation("at least one author is required".to_string()));
    }
    Ok(dedup_names(names))
}

/// Drops repeated names, keeping first occurrences in order.
pub fn dedup_names(names: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

/// Validated create request
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct NewBook {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[validate(length(min = 1, message = "isbn must not be empty"))]
    pub isbn: String,
    pub publish_year: i32,
    #[validate(length(min = 1, message = "at least one author is required"))]
    pub authors: Vec<String>,
}

impl NewBook {
    pub fn new(name: String, isbn: String, authors: Vec<String>, publish_year: i32) -> Self {
        Self {
            name,
            isbn,
            publish_year,
            authors: dedup_names(authors),
        }
    }
}

impl NewBook {
    pub fn ensure_storable(&self) -> AppResult<()> {
        reject_nul(&self.name, "name")?;
        reject_nul(&self.isbn, "isbn")?;
        self.authors.iter().try_for_each(|a| reject_nul(a, "author"))
    }
}

impl TryFrom<BookFields> for NewBook {
    type Error = AppError;

    fn try_from(fields: BookFields) -> AppResult<Self> {
        let name = text(required(fields.name, "name")?, "name")?;
        let isbn = text(required(fields.isbn, "isbn")?, "isbn")?;
        let authors = author_names(required(fields.author, "author")?)?;
        let publish_year = required(fields.publish_year, "publishYear")?.parse_int("publishYear")?;

        let book = NewBook::new(name, isbn, authors, publish_year);
        book.validate()?;
        Ok(book)
    }
}

/// Partial update; `None` leaves the attribute untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookPatch {
    pub name: Option<String>,
    pub isbn: Option<String>,
    pub publish_year: Option<i32>,
    /// Replaces the whole author set when present
    pub authors: Option<Vec<String>>,
}

impl BookPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.isbn.is_none()
            && self.publish_year.is_none()
            && self.authors.is_none()
    }

    pub fn ensure_storable(&self) -> AppResult<()> {
        for (value, field) in [(&self.name, "name"), (&self.isbn, "isbn")] {
            if let Some(value) = value {
                reject_nul(value, field)?;
            }
        }
        self.authors
            .iter()
            .flatten()
            .try_for_each(|a| reject_nul(a, "author"))
    }

    pub fn has_scalar_changes(&self) -> bool {
        self.name.is_some() || self.isbn.is_some() || self.publish_year.is_some()
    }

    /// Overwrites the scalar attributes present in the patch.
    /// Authors are resolved by the store and not touched here.
    pub fn apply_to(&self, book: &mut Book) {
        if let Some(ref name) = self.name {
            book.name = name.clone();
        }
        if let Some(ref isbn) = self.isbn {
            book.isbn = isbn.clone();
        }
        if let Some(year) = self.publish_year {
            book.publish_year = year;
        }
    }
}

impl TryFrom<BookFields> for BookPatch {
    type Error = AppError;

    fn try_from(fields: BookFields) -> AppResult<Self> {
        Ok(Self {
            name: fields.name.map(|v| text(v, "name")).transpose()?,
            isbn: fields.isbn.map(|v| text(v, "isbn")).transpose()?,
            publish_year: fields
                .publish_year
                .map(|v| v.parse_int("publishYear"))
                .transpose()?,
            authors: fields.author.map(author_names).transpose()?,
        })
    }
}

/// List query parameters (API)
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Exact ISBN
    pub isbn: Option<String>,
    /// Exact author name
    pub author: Option<String>,
    /// Lower publish year bound, ignored unless `to` is also given
    pub from: Option<String>,
    /// Upper publish year bound, ignored unless `from` is also given
    pub to: Option<String>,
}

/// Typed list filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    pub isbn: Option<String>,
    pub author: Option<String>,
    /// Inclusive range
    pub publish_year: Option<(i32, i32)>,
}

impl BookFilter {
    pub fn matches(&self, book: &Book) -> bool {
        if let Some(ref isbn) = self.isbn {
            if &book.isbn != isbn {
                return false;
            }
        }
        if let Some(ref author) = self.author {
            if !book.authors.iter().any(|a| &a.name == author) {
                return false;
            }
        }
        if let Some((from, to)) = self.publish_year {
            if book.publish_year < from || book.publish_year > to {
                return false;
            }
        }
        true
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

impl TryFrom<BookQuery> for BookFilter {
    type Error = AppError;

    fn try_from(query: BookQuery) -> AppResult<Self> {
        let publish_year = match (non_empty(query.from), non_empty(query.to)) {
            (Some(from), Some(to)) => Some((
                FieldValue::Text(from).parse_int("from")?,
                FieldValue::Text(to).parse_int("to")?,
            )),
            _ => None,
        };

        let isbn = non_empty(query.isbn);
        let author = non_empty(query.author);
        if let Some(ref isbn) = isbn {
            reject_nul(isbn, "isbn")?;
        }
        if let Some(ref author) = author {
            reject_nul(author, "author")?;
        }

        Ok(Self {
            isbn,
            author,
            publish_year,
        })
    }
}

/// Batch delete request body
#[derive(Debug, Deserialize, ToSchema)]
pub struct DeleteBooksRequest {
    /// A missing key is an empty batch
    #[serde(default)]
    pub data: Vec<i32>,
}
