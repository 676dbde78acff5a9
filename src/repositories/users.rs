use crate::entities::User;
use crate::error::{LibraryError, Result};
use crate::repositories::BaseRepository;
use crate::store::RecordStore;
use log::debug;
use regex::Regex;
use std::path::Path;

/// `local@domain.tld`, no whitespace, exactly one `@`.
const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

/// Raw registration input, validated field by field before a `User` is
/// ever constructed.
#[derive(Debug, Clone)]
pub struct UserRegistration {
    pub name: String,
    pub email: String,
    pub id: String,
    pub user_type: String,
}

/// Registered members, keyed by user ID; email is unique as well.
pub struct UserRepository {
    base: BaseRepository<User>,
    email_shape: Regex,
}

impl UserRepository {
    /// Open (or create) the backing `users.csv` under `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let store = RecordStore::open(data_dir.join("users.csv"))?;
        Ok(UserRepository {
            base: BaseRepository::new(store),
            email_shape: Regex::new(EMAIL_PATTERN).expect("email pattern is valid"),
        })
    }

    pub fn list_all(&self) -> Result<Vec<User>> {
        self.base.list_all()
    }

    /// Validate and persist a new user.
    ///
    /// Checks run in the historical order: required fields, duplicate
    /// email, duplicate ID, email shape, then the type label. The first
    /// violation wins and nothing is written.
    pub fn register(&self, input: UserRegistration) -> Result<User> {
        let all_present = [&input.name, &input.email, &input.id, &input.user_type]
            .iter()
            .all(|field| !field.trim().is_empty());

        if !all_present {
            return Err(LibraryError::Validation(
                "all user fields are required".to_string(),
            ));
        }

        if self.email_exists(&input.email)? {
            return Err(LibraryError::DuplicateKey {
                key: "email",
                value: input.email,
            });
        }

        if self.id_exists(&input.id)? {
            return Err(LibraryError::DuplicateKey {
                key: "ID",
                value: input.id,
            });
        }

        if !self.email_shape.is_match(&input.email) {
            return Err(LibraryError::Validation(format!(
                "invalid email: {}",
                input.email
            )));
        }

        let user = User::new(input.name, input.email, input.id, &input.user_type)
            .map_err(|e| LibraryError::Validation(e.to_string()))?;

        self.base.add(&user)?;
        debug!("registered user {} ({})", user.name, user.id);
        Ok(user)
    }

    /// All users with `term` as a case-insensitive substring of any field.
    pub fn search(&self, term: &str) -> Result<Vec<User>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|user| user.matches(term))
            .collect())
    }

    pub fn get_by_id(&self, user_id: &str) -> Result<User> {
        self.list_all()?
            .into_iter()
            .find(|user| user.id.trim() == user_id.trim())
            .ok_or_else(|| LibraryError::NotFound {
                entity: "user",
                key: user_id.to_string(),
            })
    }

    pub fn delete(&self, user_id: &str) -> Result<()> {
        let user = self.get_by_id(user_id)?;
        self.base.remove(&user, "user", user_id)
    }

    pub fn email_exists(&self, email: &str) -> Result<bool> {
        Ok(self.list_all()?.iter().any(|user| user.email == email))
    }

    pub fn id_exists(&self, user_id: &str) -> Result<bool> {
        Ok(self.list_all()?.iter().any(|user| user.id == user_id))
    }

    /// Rewrite the whole membership list from an in-memory edit.
    pub fn update_all(&self, users: &[User]) -> Result<()> {
        self.base.update_all(users)
    }
}
