//! Signed, time-boxed tokens for account activation and password reset.
//!
//! Registration never writes a user row. The pending account and a one-time
//! code travel inside an activation token, and the row is only created once the
//! client presents the token together with the code it received by mail.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{NewUser, UserRole};

/// Lifetime of an activation token and its one-time code.
pub const ACTIVATION_TTL_MINUTES: i64 = 5;
/// Lifetime of a password-reset link.
pub const RESET_TTL_MINUTES: i64 = 5;

const OTP_DIGITS: usize = 6;

/// Registration data held in the activation token until the code is confirmed.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PendingUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
}

impl From<PendingUser> for NewUser {
    fn from(pending: PendingUser) -> Self {
        NewUser {
            name: pending.name,
            email: pending.email,
            password_hash: pending.password_hash,
            role: pending.role,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActivationClaims {
    pub user: PendingUser,
    pub otp: String,
    pub exp: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetClaims {
    pub email: String,
    pub exp: usize,
}

/// Generates a six-digit numeric one-time code, zero-padded.
pub fn generate_otp() -> String {
    let code: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:0width$}", code, width = OTP_DIGITS)
}

pub fn issue_activation_token(
    user: PendingUser,
    otp: &str,
    secret: &str,
) -> Result<String, AppError> {
    let claims = ActivationClaims {
        user,
        otp: otp.to_string(),
        exp: expiry_in_minutes(ACTIVATION_TTL_MINUTES),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Failed to sign activation token: {}", e)))
}

/// Checks the activation token and the submitted code, returning the pending user.
///
/// An expired token yields "otp expired", a forged or malformed one "Invalid
/// activation token", and a wrong code "otp is invalid"; all are `BadRequest`.
pub fn verify_activation(token: &str, otp: &str, secret: &str) -> Result<PendingUser, AppError> {
    let claims = decode::<ActivationClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &strict_validation(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::BadRequest("otp expired".into()),
        _ => AppError::BadRequest("Invalid activation token".into()),
    })?
    .claims;

    if claims.otp != otp.trim() {
        return Err(AppError::BadRequest("otp is invalid".into()));
    }
    Ok(claims.user)
}

/// Signs a reset token for `email` and returns it with the instant it stops being valid.
pub fn issue_reset_token(email: &str, secret: &str) -> Result<(String, DateTime<Utc>), AppError> {
    let expires_at = Utc::now() + Duration::minutes(RESET_TTL_MINUTES);
    let claims = ResetClaims {
        email: email.to_string(),
        exp: expires_at.timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Failed to sign reset token: {}", e)))?;
    Ok((token, expires_at))
}

/// Returns the email a reset token was issued for.
pub fn verify_reset_token(token: &str, secret: &str) -> Result<String, AppError> {
    decode::<ResetClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &strict_validation(),
    )
    .map(|data| data.claims.email)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::BadRequest("Token expired".into()),
        _ => AppError::BadRequest("Invalid reset token".into()),
    })
}

fn expiry_in_minutes(minutes: i64) -> usize {
    (Utc::now() + Duration::minutes(minutes)).timestamp() as usize
}

// These tokens live for minutes, so the default 60 s leeway would be a sizeable share.
fn strict_validation() -> Validation {
    let mut validation = Validation::default();
    validation.leeway = 0;
    validation
}
