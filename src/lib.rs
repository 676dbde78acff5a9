// Library-management core.
//
// Flat-file persistence (one delimited file per entity), per-entity
// repositories with business invariants, the loan availability state
// machine, and a read-only statistics engine on top. Any menu or desktop
// front end is a consumer of this surface and lives elsewhere.

pub mod entities;
pub mod error;
pub mod repositories;
pub mod statistics;
pub mod store;

// Re-export commonly used types
pub use entities::{Book, Loan, User, UserType, TIMESTAMP_FORMAT};
pub use error::{LibraryError, ParseError, Result};
pub use repositories::{
    BookRepository, LoanRepository, UserRegistration, UserRepository, LOAN_PERIOD_DAYS,
};
pub use statistics::{
    DayActivity, MostLoanedBook, StatisticsEngine, SummaryStats, UserLoanStats,
};
pub use store::{Record, RecordStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
