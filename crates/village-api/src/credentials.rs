//! Credential store: users and their Argon2id password hashes.
//!
//! Hashes never leave this module; lookups hand back [`User`], which has no
//! password field.

use std::sync::Arc;

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use chrono::Utc;
use rand_core::{OsRng, RngCore};
use tracing::{debug, info};

use village_db::time::format_timestamp;
use village_db::{Database, DbError};
use village_types::models::{User, UserId};

use crate::error::{Error, Result};

#[derive(Clone)]
pub struct CredentialStore {
    db: Arc<Database>,
    argon2: Argon2<'static>,
    /// Verified against when the email is unknown, so both failure paths cost
    /// one full Argon2 verification.
    dummy_hash: String,
}

impl CredentialStore {
    pub fn new(db: Arc<Database>, params: Params) -> Result<Self> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut filler = [0u8; 32];
        OsRng.fill_bytes(&mut filler);
        let salt = SaltString::generate(&mut OsRng);
        let dummy_hash = argon2.hash_password(hex::encode(filler).as_bytes(), &salt)?.to_string();

        Ok(Self {
            db,
            argon2,
            dummy_hash,
        })
    }

    /// Hashes the password and inserts the user. The email's uniqueness is
    /// decided by the insert, so concurrent registrations cannot both win.
    pub fn create_user(&self, name: &str, email: &str, password: &str) -> Result<User> {
        let password_hash = self.hash(password)?;
        let now = format_timestamp(Utc::now());

        let id = match self.db.insert_user(name, email, &password_hash, &now) {
            Ok(id) => id,
            Err(DbError::UniqueViolation(_)) => {
                debug!("Registration rejected: email already registered");
                return Err(Error::Conflict("email already registered".into()));
            }
            Err(e) => return Err(e.into()),
        };

        info!("Registered user {}", id);
        self.get_by_id(id)
    }

    /// Returns the user id when the pair matches. Unknown email and wrong
    /// password produce the same error after the same amount of work.
    pub fn verify_login(&self, email: &str, password: &str) -> Result<UserId> {
        let row = self.db.get_user_by_email(email)?;

        let (user_id, stored_hash) = match &row {
            Some(row) => (Some(row.id), row.password.as_str()),
            None => (None, self.dummy_hash.as_str()),
        };

        let matches = self.verify(password, stored_hash)?;
        match (matches, user_id) {
            (true, Some(id)) => Ok(id),
            _ => Err(Error::InvalidCredentials),
        }
    }

    pub fn get_by_id(&self, id: UserId) -> Result<User> {
        let row = self.db.get_user_by_id(id)?.ok_or(Error::NotFound("user"))?;
        Ok(row.into_user()?)
    }

    pub fn get_by_email(&self, email: &str) -> Result<User> {
        let row = self.db.get_user_by_email(email)?.ok_or(Error::NotFound("user"))?;
        Ok(row.into_user()?)
    }

    fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Ok(self.argon2.hash_password(password.as_bytes(), &salt)?.to_string())
    }

    /// Argon2 re-derives with the parameters stored in the hash and compares
    /// the digests in constant time.
    fn verify(&self, password: &str, stored_hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(stored_hash)?;
        Ok(self
            .argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}
