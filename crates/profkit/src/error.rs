use thiserror::Error;

use crate::credentials::CryptError;
use crate::events::EncodeError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Credential store not found: {0}. Run `profkit seed` to create it")]
    StoreNotFound(String),

    #[error("User already exists: {0}")]
    DuplicateUser(String),

    #[error("Password encoding error: {0}")]
    Crypt(#[from] CryptError),

    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not a profkit profile: {0}")]
    NotAProfile(String),
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INVALID_ARGUMENTS: i32 = 2;
    pub const STORE_NOT_FOUND: i32 = 3;
    pub const DATABASE_ERROR: i32 = 6;
    pub const ENCODE_ERROR: i32 = 7;
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::StoreNotFound(_) => exit_code::STORE_NOT_FOUND,
            Error::Database(_) | Error::DuplicateUser(_) | Error::NotAProfile(_) => {
                exit_code::DATABASE_ERROR
            }
            Error::Encode(_) => exit_code::ENCODE_ERROR,
            Error::InvalidArgument(_) | Error::Crypt(_) => exit_code::INVALID_ARGUMENTS,
            Error::Io(_) => exit_code::GENERAL_ERROR,
        }
    }
}
