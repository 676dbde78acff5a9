use crate::entities::Loan;
use crate::error::{LibraryError, Result};
use crate::repositories::BaseRepository;
use crate::store::RecordStore;
use chrono::{DateTime, Duration, Utc};
use log::debug;
use std::path::Path;
use std::sync::Mutex;

/// An active loan older than this is late.
pub const LOAN_PERIOD_DAYS: i64 = 30;

/// Loan ledger plus the availability state machine: a book is either
/// available (no active loan row for its ISBN) or loaned (exactly one).
///
/// The repository does not check that the ISBN or user ID exist; that
/// cross-repository validation belongs to the caller, before `issue`.
pub struct LoanRepository {
    base: BaseRepository<Loan>,
    /// Serializes issue's check-then-act and the return rewrite. The flat
    /// file has no transactional guarantee, so concurrent callers must not
    /// interleave a check with another caller's append or rewrite.
    write_gate: Mutex<()>,
}

impl LoanRepository {
    /// Open (or create) the backing `loans.csv` under `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let store = RecordStore::open(data_dir.join("loans.csv"))?;
        Ok(LoanRepository {
            base: BaseRepository::new(store),
            write_gate: Mutex::new(()),
        })
    }

    pub fn list_all(&self) -> Result<Vec<Loan>> {
        self.base.list_all()
    }

    /// Loans with no return date yet.
    pub fn list_active(&self) -> Result<Vec<Loan>> {
        Ok(self.list_all()?.into_iter().filter(Loan::is_active).collect())
    }

    /// Loans that have been closed.
    pub fn list_returned(&self) -> Result<Vec<Loan>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(Loan::is_returned)
            .collect())
    }

    /// True iff some active loan row carries this ISBN.
    pub fn is_loaned(&self, isbn: &str) -> Result<bool> {
        Ok(self.list_active()?.iter().any(|loan| loan.isbn == isbn))
    }

    /// Issue the book to a user, starting now.
    ///
    /// Fails with `Conflict` if the book is already out. The availability
    /// check and the append run under the write gate as one logical step.
    pub fn issue(&self, isbn: &str, user_id: &str) -> Result<Loan> {
        let _gate = self.write_gate.lock().expect("loan write gate poisoned");

        if self.is_loaned(isbn)? {
            return Err(LibraryError::Conflict {
                isbn: isbn.to_string(),
            });
        }

        let loan = Loan::issue_now(isbn, user_id);
        self.base.add(&loan)?;
        debug!("issued {} to {}", isbn, user_id);
        Ok(loan)
    }

    /// Close the first active loan matching both keys, stamping its return
    /// date with now.
    ///
    /// Returns `false` (not an error) when there is nothing to return, so
    /// the caller can surface a soft "nothing to return" message.
    pub fn return_loan(&self, isbn: &str, user_id: &str) -> Result<bool> {
        let _gate = self.write_gate.lock().expect("loan write gate poisoned");

        let mut loans = self.list_all()?;
        let target = loans
            .iter_mut()
            .find(|loan| loan.isbn == isbn && loan.user_id == user_id && loan.is_active());

        match target {
            Some(loan) => {
                loan.close(Utc::now());
                self.base.update_all(&loans)?;
                debug!("returned {} from {}", isbn, user_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// True iff the matching active loan started more than
    /// `LOAN_PERIOD_DAYS` ago. Returned loans are never late.
    pub fn is_late(&self, isbn: &str, user_id: &str) -> Result<bool> {
        self.is_late_at(isbn, user_id, Utc::now())
    }

    /// Lateness against an explicit clock.
    pub fn is_late_at(&self, isbn: &str, user_id: &str, now: DateTime<Utc>) -> Result<bool> {
        let late = self
            .list_all()?
            .into_iter()
            .find(|loan| loan.isbn == isbn && loan.user_id == user_id && loan.is_active())
            .map(|loan| now - loan.loan_date > Duration::days(LOAN_PERIOD_DAYS))
            .unwrap_or(false);
        Ok(late)
    }

    /// Append a pre-built loan row, bypassing the availability check.
    /// For seeding and migration-style callers that already hold valid data.
    pub fn add(&self, loan: &Loan) -> Result<()> {
        self.base.add(loan)
    }

    /// Rewrite the whole ledger. Caller loads, edits in memory, hands the
    /// full corrected sequence back.
    pub fn update_all(&self, loans: &[Loan]) -> Result<()> {
        let _gate = self.write_gate.lock().expect("loan write gate poisoned");
        self.base.update_all(loans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Loan;
    use tempfile::TempDir;

    fn repo(dir: &TempDir) -> LoanRepository {
        LoanRepository::open(dir.path()).unwrap()
    }

    #[test]
    fn test_issue_and_return_cycle() {
        let dir = TempDir::new().unwrap();
        let loans = repo(&dir);

        assert!(!loans.is_loaned("001").unwrap());

        loans.issue("001", "U1").unwrap();
        assert!(loans.is_loaned("001").unwrap());
        assert_eq!(loans.list_active().unwrap().len(), 1);
        assert!(loans.list_returned().unwrap().is_empty());

        assert!(loans.return_loan("001", "U1").unwrap());
        assert!(!loans.is_loaned("001").unwrap());
        assert_eq!(loans.list_returned().unwrap().len(), 1);

        // Already closed: soft failure.
        assert!(!loans.return_loan("001", "U1").unwrap());
    }

    #[test]
    fn test_double_issue_conflicts() {
        let dir = TempDir::new().unwrap();
        let loans = repo(&dir);

        loans.issue("001", "U1").unwrap();
        let err = loans.issue("001", "U2").unwrap_err();
        assert!(matches!(err, LibraryError::Conflict { .. }));

        // The rejected issue wrote nothing.
        assert_eq!(loans.list_all().unwrap().len(), 1);
    }

    #[test]
    fn test_at_most_one_active_loan_per_isbn() {
        let dir = TempDir::new().unwrap();
        let loans = repo(&dir);

        for round in 0..3 {
            let user = format!("U{round}");
            loans.issue("001", &user).unwrap();
            assert!(loans.issue("001", "somebody-else").is_err());
            assert!(loans.return_loan("001", &user).unwrap());

            let active_for_isbn = loans
                .list_active()
                .unwrap()
                .iter()
                .filter(|loan| loan.isbn == "001")
                .count();
            assert!(active_for_isbn <= 1);
        }

        assert_eq!(loans.list_returned().unwrap().len(), 3);
    }

    #[test]
    fn test_reissue_after_return() {
        let dir = TempDir::new().unwrap();
        let loans = repo(&dir);

        loans.issue("001", "U1").unwrap();
        loans.return_loan("001", "U1").unwrap();
        loans.issue("001", "U2").unwrap();

        assert!(loans.is_loaned("001").unwrap());
        assert_eq!(loans.list_all().unwrap().len(), 2);
    }

    #[test]
    fn test_lateness_threshold() {
        let dir = TempDir::new().unwrap();
        let loans = repo(&dir);
        let now = Utc::now();

        loans
            .add(&Loan::issued_at("old", "U1", now - Duration::days(31)))
            .unwrap();
        loans
            .add(&Loan::issued_at("fresh", "U1", now - Duration::days(29)))
            .unwrap();

        let mut returned = Loan::issued_at("closed", "U1", now - Duration::days(40));
        returned.close(now - Duration::days(5));
        loans.add(&returned).unwrap();

        assert!(loans.is_late_at("old", "U1", now).unwrap());
        assert!(!loans.is_late_at("fresh", "U1", now).unwrap());
        assert!(!loans.is_late_at("closed", "U1", now).unwrap());
        assert!(!loans.is_late_at("missing", "U1", now).unwrap());
    }

    #[test]
    fn test_return_closes_first_match_in_file_order() {
        let dir = TempDir::new().unwrap();
        let loans = repo(&dir);
        let now = Utc::now();

        // Two active rows for the same keys should not happen through
        // issue(), but return_loan must still close only the first.
        loans
            .add(&Loan::issued_at("001", "U1", now - Duration::days(10)))
            .unwrap();
        loans
            .add(&Loan::issued_at("001", "U1", now - Duration::days(2)))
            .unwrap();

        assert!(loans.return_loan("001", "U1").unwrap());

        let all = loans.list_all().unwrap();
        assert!(all[0].is_returned());
        assert!(all[1].is_active());
    }
}
