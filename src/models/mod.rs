//! Data models for the book catalog

pub mod author;
pub mod book;

// Re-export commonly used types
pub use author::{Author, CreateAuthor};
pub use book::{Book, BookFields, BookFilter, BookPatch, NewBook};
