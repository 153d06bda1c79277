use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::not_blank;

/// Role of an account. Corresponds to the `user_role` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Supervisor,
    #[default]
    Operator,
}

/// Production line an operator works on. Corresponds to the `operator_category` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(type_name = "operator_category")]
pub enum OperatorCategory {
    Plastic,
    Modelling,
    Refining,
    #[default]
    Unassigned,
}

/// A user record as stored in the database.
///
/// This type is never serialized into responses; use [`UserProfile`] for that.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub category: Option<OperatorCategory>,
    /// Public path of the uploaded profile picture, e.g. `/public/<file>`.
    pub profile_picture: Option<String>,
    /// Set when a password reset is requested and cleared once it is used.
    pub reset_password_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_supervisor(&self) -> bool {
        matches!(self.role, UserRole::Supervisor | UserRole::Admin)
    }

    pub fn is_operator(&self) -> bool {
        self.role == UserRole::Operator
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Data needed to insert a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
}

/// The public view of a user returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub category: Option<OperatorCategory>,
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            category: user.category,
            profile_picture: user.profile_picture.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Body of `PUT /api/user/my-profile`. Absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100), custom = "not_blank")]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

/// Body of `PUT /api/user/operators/{id}`.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateOperatorRequest {
    #[validate(length(min = 1, max = 100), custom = "not_blank")]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub category: Option<OperatorCategory>,
}
