//! Service layer

pub mod file_service;

pub use file_service::{FileContent, FileService, StoredFileDescriptor, StreamedContent};
