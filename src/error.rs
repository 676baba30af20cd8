use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CtfError {
    #[error("You must be logged in to do that")]
    Unauthenticated,

    #[error("Admin access required")]
    Forbidden,

    #[error("Incorrect flag. Try again!")]
    IncorrectFlag,

    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Error submitting flag: {0}")]
    Submission(String),

    #[error("{0}")]
    Fetch(String),
}

impl CtfError {
    pub fn validation(message: impl Into<String>) -> Self {
        CtfError::Validation(message.into())
    }
}
