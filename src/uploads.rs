//! Multipart form handling and on-disk storage for uploaded files.
//!
//! Uploaded files are renamed to `<uuid>.<ext>` inside the upload directory.
//! Only names of that shape are ever served back or deleted.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use actix_multipart::Multipart;
use futures::TryStreamExt;
use lazy_static::lazy_static;
use regex::Regex;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::UploadSettings;

/// Largest accepted text field in a multipart form.
const MAX_TEXT_FIELD_BYTES: usize = 16 * 1024;

/// Name of the multipart field carrying the file.
pub const FILE_FIELD: &str = "file";

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

lazy_static! {
    static ref EXTENSION_REGEX: Regex = Regex::new(r"^[A-Za-z0-9]{1,10}$").unwrap();
    static ref STORED_NAME_REGEX: Regex = Regex::new(
        r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}(\.[a-z0-9]{1,10})?$"
    )
    .unwrap();
}

/// Which files a form accepts.
#[derive(Debug, Clone, Copy)]
pub enum Accept {
    Any,
    Extensions(&'static [&'static str]),
}

/// A file written to the upload directory.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub file_name: String,
    pub original_name: String,
    pub size: usize,
}

/// The text fields and (optional) file of a multipart form.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub fields: HashMap<String, String>,
    pub file: Option<StoredFile>,
}

impl UploadForm {
    /// Returns a trimmed, non-empty text field.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}

/// Lower-cased extension of `original_name` when it is a plain alphanumeric suffix.
pub fn extension_of(original_name: &str) -> Option<String> {
    Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| EXTENSION_REGEX.is_match(ext))
        .map(|ext| ext.to_ascii_lowercase())
}

pub fn is_stored_name(name: &str) -> bool {
    STORED_NAME_REGEX.is_match(name)
}

/// Resolves a stored name inside `dir`, refusing anything that was not generated here.
pub fn stored_path(dir: &Path, name: &str) -> Option<PathBuf> {
    is_stored_name(name).then(|| dir.join(name))
}

/// Public URL path under which a stored file is served.
pub fn public_path(file_name: &str) -> String {
    format!("/public/{}", file_name)
}

/// Reads the whole form, streaming the `file` field to disk.
///
/// Files beyond the size limit or with an unaccepted extension are rejected.
/// When reading fails at any point the stored file is removed again.
pub async fn receive(
    mut payload: Multipart,
    settings: &UploadSettings,
    accept: Accept,
) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    match read_fields(&mut payload, &mut form, settings, accept).await {
        Ok(()) => Ok(form),
        Err(err) => {
            discard(&form, settings).await;
            Err(err)
        }
    }
}

async fn read_fields(
    payload: &mut Multipart,
    form: &mut UploadForm,
    settings: &UploadSettings,
    accept: Accept,
) -> Result<(), AppError> {
    while let Some(mut field) = payload.try_next().await? {
        let disposition = field.content_disposition();
        let name = disposition.get_name().unwrap_or_default().to_string();
        let filename = disposition.get_filename().map(str::to_string);

        match filename {
            Some(original_name) if name == FILE_FIELD && form.file.is_none() => {
                let extension = validate_extension(&original_name, accept)?;
                let file_name = match extension {
                    Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
                    None => Uuid::new_v4().to_string(),
                };
                let path = settings.dir.join(&file_name);

                match write_field(&mut field, &path, settings.max_bytes).await {
                    Ok(size) => {
                        form.file = Some(StoredFile {
                            file_name,
                            original_name,
                            size,
                        })
                    }
                    Err(err) => {
                        let _ = fs::remove_file(&path).await;
                        return Err(err);
                    }
                }
            }
            Some(_) => {
                // Extra file fields are drained and dropped.
                while field.try_next().await?.is_some() {}
            }
            None => {
                let mut value = Vec::new();
                while let Some(chunk) = field.try_next().await? {
                    if value.len() + chunk.len() > MAX_TEXT_FIELD_BYTES {
                        return Err(AppError::BadRequest(format!("Field {} is too large", name)));
                    }
                    value.extend_from_slice(&chunk);
                }
                let value = String::from_utf8(value)
                    .map_err(|_| AppError::BadRequest(format!("Field {} is not UTF-8", name)))?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(())
}

/// Deletes the file of a form that will not be persisted.
pub async fn discard(form: &UploadForm, settings: &UploadSettings) {
    if let Some(file) = &form.file {
        if let Err(err) = fs::remove_file(settings.dir.join(&file.file_name)).await {
            log::warn!("could not remove discarded upload {}: {}", file.file_name, err);
        }
    }
}

fn validate_extension(original_name: &str, accept: Accept) -> Result<Option<String>, AppError> {
    let extension = extension_of(original_name);
    match accept {
        Accept::Any => Ok(extension),
        Accept::Extensions(allowed) => match extension {
            Some(ext) if allowed.contains(&ext.as_str()) => Ok(Some(ext)),
            _ => Err(AppError::BadRequest(format!(
                "Only {} files are allowed",
                allowed.join(", ")
            ))),
        },
    }
}

async fn write_field(
    field: &mut actix_multipart::Field,
    path: &Path,
    max_bytes: usize,
) -> Result<usize, AppError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).await?;
    }
    let mut file = fs::File::create(path).await?;
    let mut size = 0;
    while let Some(chunk) = field.try_next().await? {
        size += chunk.len();
        if size > max_bytes {
            return Err(AppError::BadRequest(format!(
                "File exceeds the {} byte limit",
                max_bytes
            )));
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(size)
}
