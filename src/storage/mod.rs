//! Storage Layer
//!
//! This module owns everything that touches the base directory: turning
//! client-supplied names into paths that cannot leave it, deriving stored
//! names for uploads, and the error taxonomy shared by the file service and
//! the HTTP handlers.

pub mod naming;
pub mod resolver;

use std::io;

use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub use naming::{client_basename, derive_stored_name};
pub use resolver::PathResolver;

/// Errors surfaced by storage operations
///
/// Every variant maps onto exactly one HTTP status; none of them is fatal to
/// the process.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The name could escape the base directory or is not a plain file name
    #[error("Invalid filename")]
    InvalidName(String),

    /// No stored file with this name
    #[error("Not found")]
    NotFound(String),

    /// Upload request without a file part
    #[error("No file uploaded")]
    NoFileProvided,

    /// Underlying I/O failure while listing, reading, writing or deleting
    #[error("{0}")]
    StorageUnavailable(io::Error),

    /// The client payload failed before it was fully written
    #[error("Upload interrupted: {0}")]
    UploadInterrupted(String),

    /// The requested range starts at or past the end of the file
    #[error("Range not satisfiable")]
    RangeNotSatisfiable { size: u64 },
}

impl StorageError {
    /// Classify an I/O error raised while operating on `name`.
    ///
    /// A missing file becomes `NotFound` so that a delete racing with a read
    /// reports the same error as a request for a name that never existed.
    pub fn io(name: &str, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound(name.to_string())
        } else {
            StorageError::StorageUnavailable(err)
        }
    }
}

impl ResponseError for StorageError {
    fn status_code(&self) -> StatusCode {
        match self {
            StorageError::InvalidName(_) => StatusCode::BAD_REQUEST,
            StorageError::NotFound(_) => StatusCode::NOT_FOUND,
            StorageError::NoFileProvided => StatusCode::BAD_REQUEST,
            StorageError::StorageUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            StorageError::UploadInterrupted(_) => StatusCode::BAD_REQUEST,
            StorageError::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            StorageError::NoFileProvided => {
                HttpResponse::BadRequest().json(json!({ "error": self.to_string() }))
            }
            StorageError::RangeNotSatisfiable { size } => HttpResponse::RangeNotSatisfiable()
                .insert_header((header::CONTENT_RANGE, format!("bytes */{}", size)))
                .finish(),
            _ => HttpResponse::build(self.status_code())
                .content_type("text/plain; charset=utf-8")
                .body(self.to_string()),
        }
    }
}
