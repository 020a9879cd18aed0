//! Password and reset-token helpers.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::{CatalogError, ValidationErrors};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Random bytes in a reset token (hex encoded to twice as many characters).
pub const RESET_TOKEN_BYTES: usize = 20;

/// Check that a new password and its confirmation agree and are long enough.
///
/// # Errors
///
/// Returns [`ValidationErrors`] on `password` or `password-confirm`.
pub fn confirm_passwords(password: &str, confirm: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if password.is_empty() {
        errors.add("password", "Password cannot be blank!");
    } else if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.add(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
        );
    }
    if confirm.is_empty() {
        errors.add("password-confirm", "Confirmed password cannot be blank!");
    } else if password != confirm {
        errors.add("password-confirm", "Oops! Your passwords do not match");
    }
    errors.into_result()
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `CatalogError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, CatalogError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| CatalogError::PasswordHash)
}

/// Verify a password against a hash.
///
/// # Errors
///
/// Returns `CatalogError::InvalidCredentials` if the password does not match
/// or the stored hash is unreadable.
pub fn verify_password(password: &str, hash: &str) -> Result<(), CatalogError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| CatalogError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| CatalogError::InvalidCredentials)
}

/// A fresh reset token: 20 random bytes, lowercase hex.
#[must_use]
pub fn generate_reset_token() -> String {
    let bytes: [u8; RESET_TOKEN_BYTES] = rand::random();
    hex::encode(bytes)
}
