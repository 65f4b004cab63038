// HTTP request handlers
use actix_multipart::Multipart;
use actix_web::body::SizedStream;
use actix_web::http::header;
use actix_web::{delete, get, post, web, HttpRequest, HttpResponse};
use futures::StreamExt;
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::logging::in_file_scope;
use crate::storage::{client_basename, StorageError};

/// Multipart field carrying the uploaded file
pub const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Serialize)]
struct UploadResponse<'a> {
    message: &'a str,
    filename: &'a str,
    original: &'a str,
}

/// POST /upload with a multipart `file` part
#[post("/upload")]
pub async fn upload(
    mut payload: Multipart,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, StorageError> {
    let mut stored = None;

    while let Some(item) = payload.next().await {
        let mut field = match item {
            Ok(field) => field,
            Err(e) => {
                warn!("Malformed multipart body: {}", e);
                break;
            }
        };

        // A part without a filename is a plain form value, not a file.
        let original = field
            .content_disposition()
            .filter(|_| stored.is_none() && field.name() == Some(UPLOAD_FIELD))
            .and_then(|cd| cd.get_filename())
            .map(|raw| client_basename(raw).to_string());

        match original {
            Some(original) => {
                let upload = app_state.file_service.upload(&original, field);
                stored = Some(in_file_scope(original.clone(), upload).await?);
            }
            None => {
                debug!("Skipping multipart field {:?}", field.name());
                while let Some(chunk) = field.next().await {
                    if chunk.is_err() {
                        break;
                    }
                }
            }
        }
    }

    let descriptor = stored.ok_or_else(|| {
        warn!("Upload request without a file part");
        StorageError::NoFileProvided
    })?;

    Ok(HttpResponse::Ok().json(UploadResponse {
        message: "File uploaded",
        filename: &descriptor.stored_name,
        original: &descriptor.original_name,
    }))
}

/// GET /files
#[get("/files")]
pub async fn list_files(app_state: web::Data<AppState>) -> Result<HttpResponse, StorageError> {
    let names = app_state.file_service.list().await?;
    Ok(HttpResponse::Ok().json(names))
}

/// GET /files/{name}: whole file with a content type guessed from the name
#[get("/files/{name}")]
pub async fn download_file(
    path: web::Path<String>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, StorageError> {
    let name = path.into_inner();
    let content = in_file_scope(name.clone(), app_state.file_service.retrieve(&name)).await?;
    let mime = mime_guess::from_path(&name).first_or_octet_stream();

    let mut response = HttpResponse::Ok();
    response.content_type(mime.essence_str());
    if let Some(modified) = content.modified {
        response.insert_header(header::LastModified(modified.into()));
    }
    Ok(response.body(SizedStream::new(content.size, content.body)))
}

/// GET /stream/{name} with an optional Range header
#[get("/stream/{name}")]
pub async fn stream_file(
    path: web::Path<String>,
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, StorageError> {
    let name = path.into_inner();
    let range = req
        .headers()
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok());

    let content = match in_file_scope(name.clone(), app_state.file_service.stream(&name, range)).await {
        Ok(content) => content,
        Err(StorageError::NotFound(_)) => return Ok(HttpResponse::NotFound().finish()),
        Err(e) => return Err(e),
    };

    let plan = content.plan;
    let mut response = HttpResponse::build(plan.status());
    response
        .content_type("application/octet-stream")
        .insert_header((header::ACCEPT_RANGES, "bytes"));
    if let Some(content_range) = plan.content_range() {
        response.insert_header((header::CONTENT_RANGE, content_range));
    }
    Ok(response.body(SizedStream::new(plan.length(), content.body)))
}

/// DELETE /files/{name}
#[delete("/files/{name}")]
pub async fn delete_file(
    path: web::Path<String>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, StorageError> {
    let name = path.into_inner();
    in_file_scope(name.clone(), async {
        app_state.file_service.delete(&name).await?;
        info!("File deleted via API: {}", name);
        Ok::<(), StorageError>(())
    })
    .await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "File deleted" })))
}
