// Demo consumer of the library core: wires the three repositories over a
// data directory and exercises the collaborator-facing surface. Real front
// ends (menu, desktop) talk to the same methods.

use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;

use biblioteca::{BookRepository, LoanRepository, StatisticsEngine, UserRepository};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let data_dir = env::var("BIBLIOTECA_DATA")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"));

    let books = BookRepository::open(&data_dir)?;
    let users = UserRepository::open(&data_dir)?;
    let loans = LoanRepository::open(&data_dir)?;

    match args.get(1).map(String::as_str) {
        None | Some("summary") => {
            let stats = StatisticsEngine::new(&books, &users, &loans);
            let summary = stats.summary().context("computing summary")?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Some("issue") => {
            let (isbn, user_id) = pair(&args)?;
            // Foreign-key checks sit here, above the loans repository.
            books.get_by_isbn(isbn).context("unknown ISBN")?;
            users.get_by_id(user_id).context("unknown user")?;
            let loan = loans.issue(isbn, user_id)?;
            println!("issued {} to {} at {}", loan.isbn, loan.user_id, loan.loan_date);
        }
        Some("return") => {
            let (isbn, user_id) = pair(&args)?;
            if loans.return_loan(isbn, user_id)? {
                println!("returned {isbn}");
            } else {
                println!("nothing to return for {isbn} / {user_id}");
            }
        }
        Some(other) => bail!("unknown command: {other} (try summary | issue | return)"),
    }

    Ok(())
}

fn pair(args: &[String]) -> Result<(&str, &str)> {
    match (args.get(2), args.get(3)) {
        (Some(isbn), Some(user_id)) => Ok((isbn, user_id)),
        _ => bail!("usage: biblioteca issue|return <ISBN> <USER_ID>"),
    }
}
