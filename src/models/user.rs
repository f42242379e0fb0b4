//! Store User Models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// User gender as the profile form stores it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    /// Label used in subscriber payloads
    pub fn label(&self) -> &'static str {
        match self {
            Self::Female => "Female",
            Self::Male => "Male",
        }
    }
}

/// A registered store user with the profile fields subscriber
/// synchronization can select from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreUser {
    /// Host platform user id
    pub id: u64,
    /// Account email
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub nickname: Option<String>,
    /// Two-letter language code, when known
    pub language: Option<String>,
    /// Customer group / role
    pub role: Option<String>,
    /// Registration time
    pub registered: DateTime<Utc>,
    pub birthday: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub phone: Option<String>,
    /// Local newsletter subscription flag
    pub newsletter: bool,
}

impl StoreUser {
    pub fn new(id: u64, email: &str) -> Self {
        Self {
            id,
            email: email.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            nickname: None,
            language: None,
            role: None,
            registered: Utc::now(),
            birthday: None,
            gender: None,
            phone: None,
            newsletter: false,
        }
    }

    pub fn with_name(mut self, first_name: &str, last_name: &str) -> Self {
        self.first_name = first_name.to_string();
        self.last_name = last_name.to_string();
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }

    pub fn subscribed(mut self) -> Self {
        self.newsletter = true;
        self
    }
}
