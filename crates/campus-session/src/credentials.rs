//! Account registration and password checks.
//!
//! Passwords are stored as `hex(SHA-256(salt || ':' || password))` with a
//! random 16-byte salt per account.

use campus_store::{CreateUserParams, RecordStore, User};
use campus_types::{ActionError, Role};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::run_blocking;

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Input for creating an account.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Generates a fresh random salt, hex-encoded.
pub fn generate_salt() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}

/// Computes the stored digest for `password` under `salt`.
pub fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Checks `password` against a stored salt and digest.
pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    let computed = hash_password(salt, password);
    bool::from(computed.as_bytes().ct_eq(expected_hash.as_bytes()))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn validate(registration: &Registration) -> Result<(), ActionError> {
    if registration.name.trim().is_empty() {
        return Err(ActionError::InvalidInput("name is required".to_string()));
    }
    let email = registration.email.trim();
    let valid_email = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid_email {
        return Err(ActionError::InvalidInput(format!("invalid email: {email}")));
    }
    if registration.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ActionError::InvalidInput(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Creates an account. Emails are unique (case-insensitively).
///
/// # Errors
///
/// - `InvalidInput` for a blank name, malformed email, short password, or an
///   email that is already registered.
/// - `PersistenceFailure` if the store write fails.
pub async fn register(store: &RecordStore, registration: Registration) -> Result<User, ActionError> {
    validate(&registration)?;

    let salt = generate_salt();
    let params = CreateUserParams {
        name: registration.name.trim().to_string(),
        email: normalize_email(&registration.email),
        role: registration.role,
        password_hash: hash_password(&salt, &registration.password),
        password_salt: salt,
    };

    let store = store.clone();
    let user = run_blocking(move || Ok(store.create_user(&params)?)).await?;
    tracing::info!(user_id = %user.id, role = %user.role, "account registered");
    Ok(user)
}

/// Looks up an account by email and checks its password.
///
/// Unknown emails and wrong passwords are indistinguishable to the caller.
///
/// # Errors
///
/// Returns `NotAuthenticated` on bad credentials.
pub async fn authenticate(store: &RecordStore, email: &str, password: &str) -> Result<User, ActionError> {
    let store = store.clone();
    let email = normalize_email(email);
    let password = password.to_string();

    run_blocking(move || {
        let Some(stored) = store.find_credentials(&email)? else {
            tracing::info!("login rejected: unknown email");
            return Err(ActionError::NotAuthenticated);
        };
        if !verify_password(&password, &stored.password_salt, &stored.password_hash) {
            tracing::info!(user_id = %stored.user.id, "login rejected: wrong password");
            return Err(ActionError::NotAuthenticated);
        }
        Ok(stored.user)
    })
    .await
}
