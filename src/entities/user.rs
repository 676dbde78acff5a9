use crate::entities::book::required;
use crate::error::ParseError;
use crate::store::Record;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Allowed user categories. Anything outside this set is rejected at
/// construction and at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserType {
    Student,
    Teacher,
    Visitor,
}

impl UserType {
    pub const ALL: &'static [UserType] = &[UserType::Student, UserType::Teacher, UserType::Visitor];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Student => "Student",
            UserType::Teacher => "Teacher",
            UserType::Visitor => "Visitor",
        }
    }

    pub fn parse(label: &str) -> Option<UserType> {
        match label {
            "Student" => Some(UserType::Student),
            "Teacher" => Some(UserType::Teacher),
            "Visitor" => Some(UserType::Visitor),
            _ => None,
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered library member, identified by a caller-supplied ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub email: String,
    pub id: String,
    pub user_type: UserType,
}

impl User {
    /// Build a user from raw input, rejecting an unknown type label.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        id: impl Into<String>,
        type_label: &str,
    ) -> Result<Self, ParseError> {
        let user_type = UserType::parse(type_label).ok_or(ParseError::InvalidValue {
            column: "Type",
            value: type_label.to_string(),
        })?;
        Ok(User {
            name: name.into(),
            email: email.into(),
            id: id.into(),
            user_type,
        })
    }

    /// Case-insensitive substring match across every field.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        [
            self.name.as_str(),
            self.email.as_str(),
            self.user_type.as_str(),
            self.id.as_str(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&term))
    }
}

impl Record for User {
    const COLUMNS: &'static [&'static str] = &["Name", "Email", "ID", "Type"];

    fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Name", self.name.clone()),
            ("Email", self.email.clone()),
            ("ID", self.id.clone()),
            ("Type", self.user_type.as_str().to_string()),
        ]
    }

    fn from_fields(fields: &HashMap<String, String>) -> Result<Self, ParseError> {
        let type_label = required(fields, "Type")?;
        let user_type = UserType::parse(&type_label).ok_or(ParseError::InvalidValue {
            column: "Type",
            value: type_label,
        })?;

        Ok(User {
            name: required(fields, "Name")?,
            email: required(fields, "Email")?,
            id: required(fields, "ID")?,
            user_type,
        })
    }
}
