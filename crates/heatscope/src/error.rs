use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid time range: {from} is not before {to}")]
    InvalidTimeRange { from: String, to: String },

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Fetch worker disconnected before delivering generation {0}")]
    FetchDisconnected(u64),
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INVALID_ARGUMENTS: i32 = 2;
    pub const DATABASE_ERROR: i32 = 6;
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Database(_) | Error::Query(_) => exit_code::DATABASE_ERROR,
            Error::InvalidArgument(_) | Error::InvalidTimeRange { .. } => {
                exit_code::INVALID_ARGUMENTS
            }
            _ => exit_code::GENERAL_ERROR,
        }
    }
}
