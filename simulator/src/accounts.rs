//! Player accounts and sessions.
//!
//! Passwords are stored as argon2 PHC strings. Hashing is slow on purpose, so callers
//! hash and verify outside of any lock and only touch the store for lookups and writes.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::RngCore;
use roulette_types::MIN_PASSWORD_LENGTH;
use rust_decimal::Decimal;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("all fields are required")]
    MissingFields,
    #[error("password must be at least {} characters", MIN_PASSWORD_LENGTH)]
    PasswordTooShort,
    #[error("email is already registered")]
    EmailTaken,
    #[error("username is already taken")]
    UsernameTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("current password is incorrect")]
    WrongPassword,
    #[error("unknown account")]
    UnknownAccount,
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Hash a password into a PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AccountError> {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = SaltString::encode_b64(&salt).map_err(|e| AccountError::Hashing(e.to_string()))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AccountError::Hashing(e.to_string()))?;
    Ok(hash.to_string())
}

/// Check a password against a stored PHC string. Malformed hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

pub fn check_password_length(password: &str) -> Result<(), AccountError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AccountError::PasswordTooShort);
    }
    Ok(())
}

/// Registration input after normalization: email lower-cased, username trimmed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub password: String,
}

impl Registration {
    pub fn new(email: &str, username: &str, password: &str) -> Result<Self, AccountError> {
        let email = email.trim().to_lowercase();
        let username = username.trim().to_string();
        if email.is_empty() || username.is_empty() || password.is_empty() {
            return Err(AccountError::MissingFields);
        }
        check_password_length(password)?;
        Ok(Self {
            email,
            username,
            password: password.to_string(),
        })
    }
}

#[derive(Clone, Debug)]
pub struct Account {
    pub id: u64,
    pub email: String,
    pub username: String,
    pub balance: Decimal,
    pub created_at: u64,
    password_hash: String,
}

impl Account {
    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }
}

/// In-memory accounts keyed by username, with an email index and session tokens.
#[derive(Debug, Default)]
pub struct AccountStore {
    accounts: HashMap<String, Account>,
    emails: HashMap<String, String>,
    sessions: HashMap<String, String>,
    next_id: u64,
}

impl AccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check_available(&self, email: &str, username: &str) -> Result<(), AccountError> {
        if self.emails.contains_key(email) {
            return Err(AccountError::EmailTaken);
        }
        if self.accounts.contains_key(username) {
            return Err(AccountError::UsernameTaken);
        }
        Ok(())
    }

    /// Create an account from a normalized registration and an already computed hash.
    pub fn insert(
        &mut self,
        registration: &Registration,
        password_hash: String,
        balance: Decimal,
        created_at: u64,
    ) -> Result<&Account, AccountError> {
        self.check_available(&registration.email, &registration.username)?;
        self.next_id += 1;
        let account = Account {
            id: self.next_id,
            email: registration.email.clone(),
            username: registration.username.clone(),
            balance,
            created_at,
            password_hash,
        };
        self.emails
            .insert(account.email.clone(), account.username.clone());
        let account = self
            .accounts
            .entry(account.username.clone())
            .or_insert(account);
        Ok(account)
    }

    pub fn get(&self, username: &str) -> Option<&Account> {
        self.accounts.get(username)
    }

    pub fn get_mut(&mut self, username: &str) -> Option<&mut Account> {
        self.accounts.get_mut(username)
    }

    /// Look up by email, case-insensitively.
    pub fn find_by_email(&self, email: &str) -> Option<&Account> {
        let email = email.trim().to_lowercase();
        self.emails
            .get(&email)
            .and_then(|username| self.accounts.get(username))
    }

    pub fn set_password_hash(&mut self, username: &str, password_hash: String) -> Result<(), AccountError> {
        let account = self
            .accounts
            .get_mut(username)
            .ok_or(AccountError::UnknownAccount)?;
        account.password_hash = password_hash;
        Ok(())
    }

    pub fn open_session(&mut self, username: &str) -> Result<String, AccountError> {
        if !self.accounts.contains_key(username) {
            return Err(AccountError::UnknownAccount);
        }
        let token = Uuid::new_v4().simple().to_string();
        self.sessions.insert(token.clone(), username.to_string());
        Ok(token)
    }

    pub fn session_user(&self, token: &str) -> Option<&str> {
        self.sessions.get(token).map(String::as_str)
    }

    /// Returns whether the token was known.
    pub fn close_session(&mut self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
