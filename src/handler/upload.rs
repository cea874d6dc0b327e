//! Image upload handler
//!
//! `POST /images` with a multipart form carrying one file in the `image`
//! field. The file is accepted only when its leading bytes sniff to one of
//! [`ACCEPTABLE_UPLOAD_TYPES`]; the client's Content-Type and the file
//! extension play no part.
//!
//! Only the sniff window is buffered. The rest of the field is streamed to
//! disk, and the file is removed again if the form later turns out to be
//! oversized or malformed.

use crate::config::AppState;
use crate::error::UploadError;
use crate::http::{self, sniff};
use crate::logger;
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes};
use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use multer::{Constraints, Field, Multipart, SizeLimit};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

pub const UPLOAD_PATH: &str = "/images";
pub const IMAGE_FIELD: &str = "image";

/// Sniffed types an upload may have
pub const ACCEPTABLE_UPLOAD_TYPES: [&str; 6] = [
    "image/x-icon",
    "image/gif",
    "image/png",
    "image/jpeg",
    "image/bmp",
    "image/webp",
];

/// The `image` form field, positioned at the start of its data
pub struct ImageField {
    pub file_name: String,
    pub field: Field<'static>,
}

/// A file written to the upload directory
#[derive(Debug)]
pub struct StoredUpload {
    pub path: PathBuf,
    pub bytes: u64,
    pub content_type: &'static str,
}

/// Handle a request addressed to [`UPLOAD_PATH`]
pub async fn handle_upload<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    match store_upload(req, state).await {
        Ok(stored) => {
            logger::log_upload_stored(&stored.path, stored.bytes, stored.content_type);
            http::build_text_response(StatusCode::CREATED, "Upload successful\n")
        }
        Err(err) => {
            logger::log_upload_rejected(&err);
            match err {
                UploadError::MethodNotAllowed(_) => {
                    http::build_405_response("POST", err.public_message())
                }
                _ => http::build_text_response(err.status(), err.public_message()),
            }
        }
    }
}

pub fn is_acceptable(content_type: &str) -> bool {
    ACCEPTABLE_UPLOAD_TYPES.contains(&content_type)
}

async fn store_upload<B>(req: Request<B>, state: &AppState) -> Result<StoredUpload, UploadError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    if req.method() != Method::POST {
        return Err(UploadError::MethodNotAllowed(req.method().clone()));
    }

    let limit = state.config.storage.max_upload_size;
    check_content_length(&req, limit)?;

    let mut multipart = open_form(req, limit)?;
    let ImageField {
        file_name,
        mut field,
    } = next_image_field(&mut multipart).await?;

    let head = read_field_head(&mut field).await?;
    let content_type = sniff::detect_content_type(&head);
    if !is_acceptable(content_type) {
        return Err(UploadError::UnsupportedType(content_type));
    }

    let partial = PartialFile::new(state.uploads.destination(&file_name)?);
    let created = state.uploads.create(partial.path()).await;
    let mut file = match created {
        Ok(file) => file,
        Err(source) => {
            return Err(UploadError::Create {
                path: partial.keep(),
                source,
            })
        }
    };

    let bytes = write_upload(&mut file, partial.path(), &head, field, &mut multipart).await?;
    drop(file);
    Ok(StoredUpload {
        path: partial.keep(),
        bytes,
        content_type,
    })
}

/// Reject early when the declared body size is already over the limit
fn check_content_length<B>(req: &Request<B>, limit: u64) -> Result<(), UploadError> {
    let declared = req
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    match declared {
        Some(size) if size > limit => Err(UploadError::TooLarge { limit }),
        _ => Ok(()),
    }
}

/// Start parsing the body as `multipart/form-data`, capped at `limit` bytes
pub fn open_form<B>(req: Request<B>, limit: u64) -> Result<Multipart<'static>, UploadError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    let boundary = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| multer::parse_boundary(ct).ok())
        .ok_or(UploadError::NotMultipart)?;

    let constraints = Constraints::new().size_limit(SizeLimit::new().whole_stream(limit));
    Ok(Multipart::with_constraints(
        req.into_body().into_data_stream(),
        boundary,
        constraints,
    ))
}

/// Skip ahead to the first file sent as [`IMAGE_FIELD`]
pub async fn next_image_field(
    multipart: &mut Multipart<'static>,
) -> Result<ImageField, UploadError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        // A plain value named "image" is not a file
        if let Some(file_name) = field.file_name().map(ToOwned::to_owned) {
            return Ok(ImageField { file_name, field });
        }
    }
    Err(UploadError::MissingField)
}

/// Collect at least [`sniff::SNIFF_LEN`] bytes of the field, or all of it
/// when shorter. Chunks of any size are accepted; an empty field cannot be
/// sniffed.
async fn read_field_head(field: &mut Field<'static>) -> Result<Vec<u8>, UploadError> {
    let mut head = Vec::with_capacity(sniff::SNIFF_LEN);
    while head.len() < sniff::SNIFF_LEN {
        match field.chunk().await? {
            Some(chunk) => head.extend_from_slice(&chunk),
            None => break,
        }
    }
    if head.is_empty() {
        return Err(UploadError::Sniff(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "upload contains no data",
        )));
    }
    Ok(head)
}

/// Write the sniffed prefix, stream the rest of the field, then consume the
/// remainder of the form so the size limit covers the whole request
async fn write_upload(
    file: &mut File,
    path: &Path,
    head: &[u8],
    mut field: Field<'static>,
    multipart: &mut Multipart<'static>,
) -> Result<u64, UploadError> {
    let write_error = |source| UploadError::Write {
        path: path.to_path_buf(),
        source,
    };

    file.write_all(head).await.map_err(write_error)?;
    let mut written = head.len() as u64;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await.map_err(write_error)?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(write_error)?;

    // multer refuses to advance while a field is still alive
    drop(field);
    while multipart.next_field().await?.is_some() {}

    Ok(written)
}

/// Destination that is removed again unless the upload completes.
///
/// Removal happens on drop, so it also covers a handler future dropped
/// mid-write by the request timeout or a broken connection.
struct PartialFile(Option<PathBuf>);

impl PartialFile {
    const fn new(path: PathBuf) -> Self {
        Self(Some(path))
    }

    fn path(&self) -> &Path {
        self.0.as_deref().unwrap_or(Path::new(""))
    }

    fn keep(mut self) -> PathBuf {
        self.0.take().unwrap_or_default()
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        let Some(path) = self.0.take() else {
            return;
        };
        if let Err(e) = std::fs::remove_file(&path) {
            if e.kind() != io::ErrorKind::NotFound {
                logger::log_warning(&format!(
                    "Failed to remove partial upload {}: {e}",
                    path.display()
                ));
            }
        }
    }
}
