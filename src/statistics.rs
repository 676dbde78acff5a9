// Read-side aggregation over the three repositories.
//
// Pure and cache-free: every call recomputes from the authoritative stores,
// so the numbers are always consistent with what is on disk. All rankings
// sort descending by count; ties keep first-occurrence order (counts are
// accumulated in encounter order and the sort is stable).

use crate::entities::{Loan, UserType};
use crate::error::Result;
use crate::repositories::{BookRepository, LoanRepository, UserRepository};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Fallback labels for joins against a missing record.
const UNKNOWN_TITLE: &str = "Unknown";
const UNKNOWN_CATEGORY: &str = "Unknown";

/// One entry of the most-loaned ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MostLoanedBook {
    pub title: String,
    pub isbn: String,
    pub count: usize,
    pub category: String,
}

/// Headline numbers across all three collections.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryStats {
    pub total_books: usize,
    pub total_users: usize,
    pub active_loans: usize,
    pub completed_loans: usize,
    pub avg_loans_per_user: f64,
    pub most_active_user: String,
    pub most_popular_category: String,
}

/// Lending profile of one user.
#[derive(Debug, Clone, Serialize)]
pub struct UserLoanStats {
    pub total_loans: usize,
    pub active_loans: usize,
    pub favorite_category: String,
    pub avg_loan_duration_days: f64,
    /// `YYYY-MM-DD` of the most recent loan, `None` if the user has never
    /// borrowed.
    pub last_loan_date: Option<String>,
}

/// Issue/return counts for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayActivity {
    /// `YYYY-MM-DD`.
    pub date: String,
    pub issued: usize,
    pub returned: usize,
}

pub struct StatisticsEngine<'a> {
    books: &'a BookRepository,
    users: &'a UserRepository,
    loans: &'a LoanRepository,
}

impl<'a> StatisticsEngine<'a> {
    pub fn new(
        books: &'a BookRepository,
        users: &'a UserRepository,
        loans: &'a LoanRepository,
    ) -> Self {
        StatisticsEngine {
            books,
            users,
            loans,
        }
    }

    /// Book count per category, most numerous first.
    pub fn books_by_category(&self) -> Result<Vec<(String, usize)>> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for book in self.books.list_all()? {
            bump(&mut counts, &book.category);
        }
        sort_desc(&mut counts);
        Ok(counts)
    }

    /// Loan count per user type, most numerous first. Loans whose user
    /// record is gone land in the visitor bucket.
    pub fn loans_by_user_type(&self) -> Result<Vec<(String, usize)>> {
        let types_by_id: HashMap<String, UserType> = self
            .users
            .list_all()?
            .into_iter()
            .map(|user| (user.id, user.user_type))
            .collect();

        let mut counts: Vec<(String, usize)> = Vec::new();
        for loan in self.loans.list_all()? {
            let user_type = types_by_id
                .get(&loan.user_id)
                .copied()
                .unwrap_or(UserType::Visitor);
            bump(&mut counts, user_type.as_str());
        }
        sort_desc(&mut counts);
        Ok(counts)
    }

    /// The `limit` most-loaned books, joined to title and category.
    pub fn most_loaned_books(&self, limit: usize) -> Result<Vec<MostLoanedBook>> {
        let info_by_isbn: HashMap<String, (String, String)> = self
            .books
            .list_all()?
            .into_iter()
            .map(|book| (book.isbn, (book.title, book.category)))
            .collect();

        let mut counts: Vec<(String, usize)> = Vec::new();
        for loan in self.loans.list_all()? {
            bump(&mut counts, &loan.isbn);
        }
        sort_desc(&mut counts);

        Ok(counts
            .into_iter()
            .take(limit)
            .map(|(isbn, count)| {
                let (title, category) = info_by_isbn.get(&isbn).cloned().unwrap_or_else(|| {
                    (UNKNOWN_TITLE.to_string(), UNKNOWN_CATEGORY.to_string())
                });
                MostLoanedBook {
                    title,
                    isbn,
                    count,
                    category,
                }
            })
            .collect())
    }

    /// Headline counts, ratios, and argmaxes over the three collections.
    pub fn summary(&self) -> Result<SummaryStats> {
        let books = self.books.list_all()?;
        let users = self.users.list_all()?;
        let loans = self.loans.list_all()?;

        let active_loans = loans.iter().filter(|l| l.is_active()).count();
        let completed_loans = loans.len() - active_loans;

        let avg_loans_per_user = if users.is_empty() {
            0.0
        } else {
            loans.len() as f64 / users.len() as f64
        };

        Ok(SummaryStats {
            total_books: books.len(),
            total_users: users.len(),
            active_loans,
            completed_loans,
            avg_loans_per_user,
            most_active_user: self.most_active_user(&loans)?,
            most_popular_category: self.most_popular_category(&books, &loans),
        })
    }

    fn most_active_user(&self, loans: &[Loan]) -> Result<String> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for loan in loans {
            bump(&mut counts, &loan.user_id);
        }
        sort_desc(&mut counts);

        let Some((user_id, count)) = counts.first() else {
            return Ok("None".to_string());
        };

        Ok(match self.users.get_by_id(user_id) {
            Ok(user) => format!("{} ({count} loans)", user.name),
            Err(_) => "Unknown".to_string(),
        })
    }

    fn most_popular_category(
        &self,
        books: &[crate::entities::Book],
        loans: &[Loan],
    ) -> String {
        let category_by_isbn: HashMap<&str, &str> = books
            .iter()
            .map(|book| (book.isbn.as_str(), book.category.as_str()))
            .collect();

        let mut counts: Vec<(String, usize)> = Vec::new();
        for loan in loans {
            let category = category_by_isbn
                .get(loan.isbn.as_str())
                .copied()
                .unwrap_or(UNKNOWN_CATEGORY);
            bump(&mut counts, category);
        }
        sort_desc(&mut counts);

        counts
            .first()
            .map(|(category, _)| category.clone())
            .unwrap_or_else(|| "None".to_string())
    }

    /// Lending profile for one user; `None` if the user does not exist.
    pub fn user_loan_stats(&self, user_id: &str) -> Result<Option<UserLoanStats>> {
        if self.users.get_by_id(user_id).is_err() {
            return Ok(None);
        }

        let user_loans: Vec<Loan> = self
            .loans
            .list_all()?
            .into_iter()
            .filter(|loan| loan.user_id == user_id)
            .collect();

        let active_loans = user_loans.iter().filter(|l| l.is_active()).count();

        let completed: Vec<&Loan> = user_loans.iter().filter(|l| l.is_returned()).collect();
        let avg_loan_duration_days = if completed.is_empty() {
            0.0
        } else {
            let total_days: i64 = completed
                .iter()
                .map(|loan| (loan.return_date.expect("completed") - loan.loan_date).num_days())
                .sum();
            total_days as f64 / completed.len() as f64
        };

        let favorite_category = self.favorite_category(&user_loans)?;

        let last_loan_date = user_loans
            .iter()
            .map(|loan| loan.loan_date)
            .max()
            .map(|ts| ts.format("%Y-%m-%d").to_string());

        Ok(Some(UserLoanStats {
            total_loans: user_loans.len(),
            active_loans,
            favorite_category,
            avg_loan_duration_days,
            last_loan_date,
        }))
    }

    fn favorite_category(&self, user_loans: &[Loan]) -> Result<String> {
        let books = self.books.list_all()?;
        let category_by_isbn: HashMap<&str, &str> = books
            .iter()
            .map(|book| (book.isbn.as_str(), book.category.as_str()))
            .collect();

        let mut counts: Vec<(String, usize)> = Vec::new();
        for loan in user_loans {
            let category = category_by_isbn
                .get(loan.isbn.as_str())
                .copied()
                .unwrap_or(UNKNOWN_CATEGORY);
            bump(&mut counts, category);
        }
        sort_desc(&mut counts);

        Ok(counts
            .first()
            .map(|(category, _)| category.clone())
            .unwrap_or_else(|| "None".to_string()))
    }

    /// Per-day issue/return counts over the trailing `days`, newest first.
    pub fn loans_timeline(&self, days: i64) -> Result<Vec<DayActivity>> {
        self.loans_timeline_at(days, Utc::now())
    }

    /// Timeline against an explicit clock.
    pub fn loans_timeline_at(&self, days: i64, now: DateTime<Utc>) -> Result<Vec<DayActivity>> {
        let window_start = (now - Duration::days(days)).date_naive();
        let window_end = now.date_naive();
        let in_window = |ts: DateTime<Utc>| {
            let day = ts.date_naive();
            window_start <= day && day <= window_end
        };

        let mut by_day: HashMap<String, (usize, usize)> = HashMap::new();
        for loan in self.loans.list_all()? {
            if in_window(loan.loan_date) {
                let key = loan.loan_date.format("%Y-%m-%d").to_string();
                by_day.entry(key).or_default().0 += 1;
            }
            if let Some(returned_at) = loan.return_date {
                if in_window(returned_at) {
                    let key = returned_at.format("%Y-%m-%d").to_string();
                    by_day.entry(key).or_default().1 += 1;
                }
            }
        }

        let mut timeline: Vec<DayActivity> = by_day
            .into_iter()
            .map(|(date, (issued, returned))| DayActivity {
                date,
                issued,
                returned,
            })
            .collect();
        // ISO dates sort lexicographically; newest day first.
        timeline.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(timeline)
    }
}

/// Count in first-occurrence order so the later stable sort keeps ties in
/// encounter order.
fn bump(counts: &mut Vec<(String, usize)>, key: &str) {
    match counts.iter_mut().find(|(k, _)| k == key) {
        Some((_, count)) => *count += 1,
        None => counts.push((key.to_string(), 1)),
    }
}

fn sort_desc(counts: &mut [(String, usize)]) {
    counts.sort_by(|a, b| b.1.cmp(&a.1));
}
