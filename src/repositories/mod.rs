// Per-entity repositories: business invariants layered on a RecordStore.
//
// The base repository covers the operations every entity shares; uniqueness
// keys differ per entity, so those checks live in the specific repositories.

pub mod books;
pub mod loans;
pub mod users;

pub use books::BookRepository;
pub use loans::{LoanRepository, LOAN_PERIOD_DAYS};
pub use users::{UserRegistration, UserRepository};

use crate::error::{LibraryError, Result};
use crate::store::{Record, RecordStore};

/// Shared plumbing over one `RecordStore`: list, append, remove-by-match,
/// whole-collection rewrite.
pub struct BaseRepository<R: Record> {
    store: RecordStore<R>,
}

impl<R: Record + PartialEq> BaseRepository<R> {
    pub fn new(store: RecordStore<R>) -> Self {
        BaseRepository { store }
    }

    pub fn list_all(&self) -> Result<Vec<R>> {
        self.store.load_all()
    }

    pub fn add(&self, record: &R) -> Result<()> {
        self.store.append(record)
    }

    /// Remove the one record equal to `target`, rewriting the file without
    /// it. The caller supplies the labels for the not-found error.
    pub fn remove(&self, target: &R, entity: &'static str, key: &str) -> Result<()> {
        let mut records = self.list_all()?;
        let position = records.iter().position(|r| r == target).ok_or_else(|| {
            LibraryError::NotFound {
                entity,
                key: key.to_string(),
            }
        })?;
        records.remove(position);
        self.store.replace_all(&records)
    }

    /// Rewrite the whole collection. Used whenever a field of an existing
    /// record changes, since rows cannot be updated in place.
    pub fn update_all(&self, records: &[R]) -> Result<()> {
        self.store.replace_all(records)
    }
}
