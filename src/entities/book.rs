use crate::error::ParseError;
use crate::store::Record;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A catalogued book. Identified by its ISBN, never mutated after creation.
///
/// Year stays textual: the file format stores it as text and nothing in the
/// system does arithmetic on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    pub author: String,
    pub year: String,
    pub isbn: String,
    pub category: String,
}

impl Book {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        year: impl Into<String>,
        isbn: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Book {
            title: title.into(),
            author: author.into(),
            year: year.into(),
            isbn: isbn.into(),
            category: category.into(),
        }
    }

    /// Case-insensitive substring match across every field.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        [
            &self.title,
            &self.author,
            &self.category,
            &self.year,
            &self.isbn,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&term))
    }
}

impl Record for Book {
    const COLUMNS: &'static [&'static str] = &["Title", "Author", "Year", "ISBN", "Category"];

    fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Title", self.title.clone()),
            ("Author", self.author.clone()),
            ("Year", self.year.clone()),
            ("ISBN", self.isbn.clone()),
            ("Category", self.category.clone()),
        ]
    }

    fn from_fields(fields: &HashMap<String, String>) -> Result<Self, ParseError> {
        Ok(Book {
            title: required(fields, "Title")?,
            author: required(fields, "Author")?,
            year: required(fields, "Year")?,
            isbn: required(fields, "ISBN")?,
            category: required(fields, "Category")?,
        })
    }
}

pub(crate) fn required(
    fields: &HashMap<String, String>,
    column: &'static str,
) -> Result<String, ParseError> {
    fields
        .get(column)
        .cloned()
        .ok_or(ParseError::MissingColumn(column))
}
