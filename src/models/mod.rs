pub mod document;
pub mod task;
pub mod user;

use validator::ValidationError;

pub use document::{Document, DocumentQuery, NewDocument, DEFAULT_FILTER};
pub use task::{
    AssignRequest, Comment, CommentRequest, StatusRequest, Task, TaskInput, TaskPriority,
    TaskStatus,
};
pub use user::{
    NewUser, OperatorCategory, UpdateOperatorRequest, UpdateProfileRequest, User, UserProfile,
    UserRole,
};

/// `validator` rule rejecting strings that are empty once trimmed.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}
