pub mod activation;
pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{not_blank, UserProfile, UserRole};

pub use extractors::{AuthenticatedUserId, CurrentUser};
pub use middleware::AuthMiddleware;
pub use password::{hash_password, verify_password};
pub use token::{generate_token, verify_token, Claims};

/// Represents the payload for a user login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    /// Must be at least 6 characters long.
    #[validate(length(min = 6))]
    pub password: String,
}

/// Payload of `POST /api/user/register`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100), custom = "not_blank")]
    pub name: String,
    #[validate(email)]
    pub email: String,
    /// Must be at least 6 characters long.
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    /// Defaults to `operator`. `admin` can not be self-registered.
    pub role: Option<UserRole>,
}

/// Payload of `POST /api/user/verify-user`.
#[derive(Debug, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    #[validate(length(min = 1))]
    pub activation_token: String,
    #[validate(length(min = 1, max = 6))]
    pub otp: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 6, max = 128))]
    pub password: String,
}

/// Query string of `POST /api/user/reset`.
#[derive(Debug, Deserialize)]
pub struct ResetQuery {
    pub token: String,
}

/// Response of `POST /api/user/register`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub activation_token: String,
}

/// Response structure after a successful login.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    /// The session JWT.
    pub token: String,
    pub user: UserProfile,
}
