//! Identity provider: user accounts and bearer tokens.
//!
//! The table core only ever sees the [`OwnerId`](crate::core::OwnerId)
//! resolved here.

pub mod token;
pub mod users;

use thiserror::Error;

pub use token::{Claims, TokenIssuer};
pub use users::{UserAccount, UserDirectory};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("Token missing")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email '{0}' is already registered")]
    EmailTaken(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal auth error: {0}")]
    Internal(String),
}

pub type AuthResult<T> = std::result::Result<T, AuthError>;
