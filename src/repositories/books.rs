use crate::entities::Book;
use crate::error::{LibraryError, Result};
use crate::repositories::BaseRepository;
use crate::store::RecordStore;
use log::debug;
use std::path::Path;

/// Catalogue of books, keyed by ISBN.
pub struct BookRepository {
    base: BaseRepository<Book>,
}

impl BookRepository {
    /// Open (or create) the backing `books.csv` under `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let store = RecordStore::open(data_dir.join("books.csv"))?;
        Ok(BookRepository {
            base: BaseRepository::new(store),
        })
    }

    pub fn list_all(&self) -> Result<Vec<Book>> {
        self.base.list_all()
    }

    /// Validate and persist a new book.
    ///
    /// All five fields must be non-empty and the ISBN must be new; nothing
    /// is written when either check fails.
    pub fn register(&self, book: Book) -> Result<Book> {
        let all_present = [
            &book.title,
            &book.author,
            &book.year,
            &book.isbn,
            &book.category,
        ]
        .iter()
        .all(|field| !field.trim().is_empty());

        if !all_present {
            return Err(LibraryError::Validation(
                "all book fields are required".to_string(),
            ));
        }

        if self.isbn_exists(&book.isbn)? {
            return Err(LibraryError::DuplicateKey {
                key: "ISBN",
                value: book.isbn.clone(),
            });
        }

        self.base.add(&book)?;
        debug!("registered book {} ({})", book.title, book.isbn);
        Ok(book)
    }

    /// All books with `term` as a case-insensitive substring of any field.
    pub fn search(&self, term: &str) -> Result<Vec<Book>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|book| book.matches(term))
            .collect())
    }

    pub fn get_by_isbn(&self, isbn: &str) -> Result<Book> {
        self.list_all()?
            .into_iter()
            .find(|book| book.isbn == isbn)
            .ok_or_else(|| LibraryError::NotFound {
                entity: "book",
                key: isbn.to_string(),
            })
    }

    pub fn delete(&self, isbn: &str) -> Result<()> {
        let book = self.get_by_isbn(isbn)?;
        self.base.remove(&book, "book", isbn)
    }

    pub fn isbn_exists(&self, isbn: &str) -> Result<bool> {
        Ok(self.list_all()?.iter().any(|book| book.isbn == isbn))
    }

    /// Rewrite the whole catalogue from an in-memory edit.
    pub fn update_all(&self, books: &[Book]) -> Result<()> {
        self.base.update_all(books)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo(dir: &TempDir) -> BookRepository {
        BookRepository::open(dir.path()).unwrap()
    }

    fn dune() -> Book {
        Book::new("Dune", "Herbert", "1965", "001", "SciFi")
    }

    #[test]
    fn test_register_then_list() {
        let dir = TempDir::new().unwrap();
        let books = repo(&dir);

        books.register(dune()).unwrap();

        let all = books.list_all().unwrap();
        assert_eq!(all, vec![dune()]);
        assert!(books.isbn_exists("001").unwrap());
    }

    #[test]
    fn test_register_rejects_empty_field() {
        let dir = TempDir::new().unwrap();
        let books = repo(&dir);

        let err = books
            .register(Book::new("Dune", "", "1965", "001", "SciFi"))
            .unwrap_err();
        assert!(matches!(err, LibraryError::Validation(_)));
        assert!(books.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_register_rejects_duplicate_isbn_without_writing() {
        let dir = TempDir::new().unwrap();
        let books = repo(&dir);

        books.register(dune()).unwrap();
        let err = books
            .register(Book::new("Dune Messiah", "Herbert", "1969", "001", "SciFi"))
            .unwrap_err();

        assert!(matches!(
            err,
            LibraryError::DuplicateKey { key: "ISBN", .. }
        ));
        assert_eq!(books.list_all().unwrap().len(), 1);
    }

    #[test]
    fn test_search_matches_any_field() {
        let dir = TempDir::new().unwrap();
        let books = repo(&dir);

        books.register(dune()).unwrap();
        books
            .register(Book::new("Hobbit", "Tolkien", "1937", "002", "Fantasy"))
            .unwrap();

        assert_eq!(books.search("herb").unwrap().len(), 1);
        assert_eq!(books.search("193").unwrap().len(), 1);
        assert_eq!(books.search("0").unwrap().len(), 2);
        assert!(books.search("poetry").unwrap().is_empty());
    }

    #[test]
    fn test_delete_by_isbn() {
        let dir = TempDir::new().unwrap();
        let books = repo(&dir);

        books.register(dune()).unwrap();
        books.delete("001").unwrap();

        assert!(books.list_all().unwrap().is_empty());
        assert!(matches!(
            books.delete("001").unwrap_err(),
            LibraryError::NotFound { .. }
        ));
    }
}
