use crate::{
    auth::CurrentUser,
    error::AppError,
    models::{DocumentQuery, NewDocument, DEFAULT_FILTER},
    state::AppState,
    uploads::{self, Accept},
};
use actix_multipart::Multipart;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{delete, get, post, web, HttpResponse, Responder};
use serde_json::json;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use uuid::Uuid;

/// Uploads a document into the shared repository.
///
/// Expects `multipart/form-data` with `title`, an optional `filter` (defaults to
/// `General`) and a `file` field.
#[post("/uploadDocument")]
pub async fn upload_document(
    state: web::Data<AppState>,
    current: CurrentUser,
    payload: Multipart,
) -> Result<impl Responder, AppError> {
    current.require_supervisor()?;

    let form = uploads::receive(payload, &state.uploads, Accept::Any).await?;
    let Some(file) = form.file.as_ref() else {
        return Err(AppError::BadRequest("No file uploaded".into()));
    };
    let Some(title) = form.text("title") else {
        uploads::discard(&form, &state.uploads).await;
        return Err(AppError::BadRequest("Title is required".into()));
    };

    let new_document = NewDocument {
        title: title.to_string(),
        file_name: file.file_name.clone(),
        original_name: file.original_name.clone(),
        filter: form.text("filter").unwrap_or(DEFAULT_FILTER).to_string(),
        uploaded_by: Some(current.id()),
    };

    let document = match state.store.create_document(new_document).await {
        Ok(document) => document,
        Err(err) => {
            uploads::discard(&form, &state.uploads).await;
            return Err(err);
        }
    };
    log::info!(
        "document {} uploaded by {} ({} bytes)",
        document.id,
        current.id(),
        file.size
    );

    Ok(HttpResponse::Created().json(json!({ "success": true, "document": document })))
}

/// Lists documents, newest first, optionally restricted to one filter.
#[get("/documents")]
pub async fn get_documents(
    state: web::Data<AppState>,
    query: web::Query<DocumentQuery>,
) -> Result<impl Responder, AppError> {
    let filter = query
        .filter
        .as_deref()
        .map(str::trim)
        .filter(|filter| !filter.is_empty());
    let documents = state.store.list_documents(filter).await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "documents": documents })))
}

#[get("/documents/{document_id}/download")]
pub async fn download_document(
    state: web::Data<AppState>,
    document_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let document = state
        .store
        .find_document(document_id.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Document not found".into()))?;

    let path = uploads::stored_path(&state.uploads.dir, &document.file_name)
        .ok_or_else(|| AppError::NotFound("File not found".into()))?;
    let bytes = read_stored(&path).await?;

    Ok(HttpResponse::Ok()
        .content_type(content_type_for(&document.original_name))
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(document.original_name)],
        })
        .body(bytes))
}

#[delete("/documents/{document_id}")]
pub async fn delete_document(
    state: web::Data<AppState>,
    current: CurrentUser,
    document_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    current.require_supervisor()?;

    let document = state
        .store
        .find_document(document_id.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Document not found".into()))?;

    match uploads::stored_path(&state.uploads.dir, &document.file_name) {
        Some(path) => {
            if let Err(err) = fs::remove_file(&path).await {
                log::warn!("could not remove file of document {}: {}", document.id, err);
            }
        }
        None => log::warn!("document {} has no stored file name", document.id),
    }

    if !state.store.delete_document(document.id).await? {
        return Err(AppError::NotFound("Document not found".into()));
    }
    log::info!("document {} deleted by {}", document.id, current.id());

    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Document deleted" })))
}

/// Serves an uploaded file. Mounted outside `/api`, no token needed.
#[get("/public/{file_name}")]
pub async fn serve_public(
    state: web::Data<AppState>,
    file_name: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let file_name = file_name.into_inner();
    let path = uploads::stored_path(&state.uploads.dir, &file_name)
        .ok_or_else(|| AppError::NotFound("File not found".into()))?;
    let bytes = read_stored(&path).await?;

    Ok(HttpResponse::Ok()
        .content_type(content_type_for(&file_name))
        .body(bytes))
}

async fn read_stored(path: &Path) -> Result<Vec<u8>, AppError> {
    match fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            Err(AppError::NotFound("File not found".into()))
        }
        Err(err) => Err(err.into()),
    }
}

fn content_type_for(name: &str) -> &'static str {
    match uploads::extension_of(name).as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
