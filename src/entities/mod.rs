// Typed entity records: Book, User, Loan.
//
// Records hold validated data and know their flat-row projection; they never
// touch disk and never look at other entities. Cross-entity rules live in
// the repositories.

pub mod book;
pub mod loan;
pub mod user;

pub use book::Book;
pub use loan::{Loan, TIMESTAMP_FORMAT};
pub use user::{User, UserType};
