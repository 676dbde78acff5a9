use crate::entities::book::required;
use crate::error::ParseError;
use crate::store::Record;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Wire format for both loan timestamps. Whole seconds, UTC; the
/// fractional-seconds variant seen in one historical dataset is not emitted
/// and does not parse (such rows are dropped at load).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One lending of a book to a user.
///
/// References to Book/User are by value (ISBN / user ID strings); existence
/// checks happen at issue time, one layer up. An empty `ReturnDate` column
/// means the loan is still active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub isbn: String,
    pub user_id: String,
    pub loan_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
}

impl Loan {
    /// A fresh loan starting now.
    pub fn issue_now(isbn: impl Into<String>, user_id: impl Into<String>) -> Self {
        Loan::issued_at(isbn, user_id, Utc::now())
    }

    pub fn issued_at(
        isbn: impl Into<String>,
        user_id: impl Into<String>,
        loan_date: DateTime<Utc>,
    ) -> Self {
        Loan {
            isbn: isbn.into(),
            user_id: user_id.into(),
            loan_date: truncate_subsec(loan_date),
            return_date: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.return_date.is_none()
    }

    pub fn is_returned(&self) -> bool {
        self.return_date.is_some()
    }

    /// Close the loan. Active → returned is the only transition; closing an
    /// already-returned loan leaves the original return date alone.
    pub fn close(&mut self, returned_at: DateTime<Utc>) {
        if self.return_date.is_none() {
            self.return_date = Some(truncate_subsec(returned_at));
        }
    }
}

/// The wire format carries whole seconds only, so in-memory timestamps are
/// kept at the same precision to make round-trips exact.
fn truncate_subsec(ts: DateTime<Utc>) -> DateTime<Utc> {
    use chrono::Timelike;
    ts.with_nanosecond(0).unwrap_or(ts)
}

fn format_ts(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_ts(column: &'static str, value: &str) -> Result<DateTime<Utc>, ParseError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| ParseError::InvalidValue {
            column,
            value: value.to_string(),
        })
}

impl Record for Loan {
    const COLUMNS: &'static [&'static str] = &["ISBN", "UserID", "LoanDate", "ReturnDate"];

    fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("ISBN", self.isbn.clone()),
            ("UserID", self.user_id.clone()),
            ("LoanDate", format_ts(self.loan_date)),
            (
                "ReturnDate",
                self.return_date.map(format_ts).unwrap_or_default(),
            ),
        ]
    }

    fn from_fields(fields: &HashMap<String, String>) -> Result<Self, ParseError> {
        let loan_date = parse_ts("LoanDate", &required(fields, "LoanDate")?)?;

        let return_raw = required(fields, "ReturnDate")?;
        let return_date = if return_raw.is_empty() {
            None
        } else {
            Some(parse_ts("ReturnDate", &return_raw)?)
        };

        Ok(Loan {
            isbn: required(fields, "ISBN")?,
            user_id: required(fields, "UserID")?,
            loan_date,
            return_date,
        })
    }
}
