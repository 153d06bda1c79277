//! bcrypt hashing for account passwords. The cost comes from `AuthConfig::bcrypt_cost`.

use crate::error::AppError;

pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    bcrypt::hash(password, cost).map_err(|e| {
        AppError::InternalServerError(format!("Could not hash password: {}", e))
    })
}

/// A malformed stored hash is reported as a mismatch.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    match bcrypt::verify(password, password_hash) {
        Ok(matches) => Ok(matches),
        Err(bcrypt::BcryptError::InvalidHash(_)) | Err(bcrypt::BcryptError::InvalidPrefix(_)) => {
            log::warn!("stored password hash is malformed");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}
