use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use bcrypt::{hash, verify};
use lazy_static::lazy_static;

use crate::error::AppError;

lazy_static! {
    // Decoy hashes by cost, checked when the email is unknown so a miss costs as much
    // as a wrong password.
    static ref DECOY_HASHES: Mutex<HashMap<u32, String>> = Mutex::new(HashMap::new());
}

fn decoy_hash(cost: u32) -> Result<String, AppError> {
    let mut hashes = DECOY_HASHES.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(hashed) = hashes.get(&cost) {
        return Ok(hashed.clone());
    }
    let hashed = hash("taskdeck-unknown-user", cost)?;
    hashes.insert(cost, hashed.clone());
    Ok(hashed)
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    Ok(hash(password, cost)?)
}

pub fn verify_password(password: &str, hashed_password: &str) -> Result<bool, AppError> {
    verify(password, hashed_password)
        .map_err(|e| AppError::InternalServerError(format!("Failed to verify password: {}", e)))
}

/// Checks `password` against the stored hash, or against a decoy hash of the same
/// `cost` when there is no such user. Returns `false` in the latter case.
pub fn verify_credentials(
    password: &str,
    stored_hash: Option<&str>,
    cost: u32,
) -> Result<bool, AppError> {
    match stored_hash {
        Some(hashed) => verify_password(password, hashed),
        None => {
            // Result ignored; only the time spent matters.
            let _ = verify(password, &decoy_hash(cost)?);
            Ok(false)
        }
    }
}
