//! HTTP API
//!
//! Routes:
//! - `POST /upload` multipart upload of the `file` part
//! - `GET /files` list stored names
//! - `GET /files/{name}` download a whole file
//! - `GET /stream/{name}` download with `Range` support
//! - `DELETE /files/{name}` delete a stored file

pub mod handlers;

use actix_web::web;

pub use handlers::{delete_file, download_file, list_files, stream_file, upload};

/// Register every route on an actix app
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(upload)
        .service(list_files)
        .service(download_file)
        .service(stream_file)
        .service(delete_file);
}
