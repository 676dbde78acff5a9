// Error taxonomy for the library core.
//
// Business outcomes the caller is expected to handle (validation failures,
// duplicate keys, not-found, loan conflicts) are distinct variants; storage
// failures are fatal for the attempted operation and carry the I/O source.

use thiserror::Error;

/// Everything a repository or store operation can fail with.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// A required field is missing/empty or a value is malformed.
    /// Rejected before anything is written.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Registration collided with an existing unique key (ISBN, email, ID).
    #[error("duplicate {key}: {value}")]
    DuplicateKey { key: &'static str, value: String },

    /// The delete/get target does not exist.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// Issuing a loan for a book that is already loaned out.
    #[error("book already loaned: {isbn}")]
    Conflict { isbn: String },

    /// I/O failure on the backing file. Fatal for the operation; a single
    /// malformed row is never reported through this variant.
    #[error("storage error on {path}: {source}")]
    Storage {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl LibraryError {
    pub fn storage(path: impl Into<String>, source: std::io::Error) -> Self {
        LibraryError::Storage {
            path: path.into(),
            source,
        }
    }
}

/// A single row failed to parse into its record type.
///
/// `RecordStore::load_all` catches this per row, logs it, and keeps going;
/// it never aborts a load.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("missing column '{0}'")]
    MissingColumn(&'static str),

    #[error("invalid value for '{column}': {value}")]
    InvalidValue { column: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, LibraryError>;
