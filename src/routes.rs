use std::path::Path as FilePath;
use std::sync::Arc;

use poem_openapi::param::Path;
use poem_openapi::payload::{Json, PlainText};
use poem_openapi::types::multipart::Upload;
use poem_openapi::{ApiResponse, Multipart, OpenApi};

use crate::config::UploadConfig;
use crate::controller::{Photo, PhotoController};

#[derive(Multipart)]
pub struct UploadPayload {
    /// The JPEG to store.
    file: Option<Upload>,
}

#[derive(ApiResponse)]
pub enum ListResponse {
    /// Every stored photo ordered by file name.
    #[oai(status = 200)]
    Ok(Json<Vec<Photo>>),

    /// The photos could not be read.
    #[oai(status = 500)]
    InternalError(PlainText<String>),
}

#[derive(ApiResponse)]
pub enum UploadResponse {
    /// The photo and its thumbnail were stored.
    #[oai(status = 200)]
    Ok(Json<bool>),

    /// The `file` field or its file name is missing, unusable or has an
    /// extension which is not allowed.
    #[oai(status = 400)]
    BadRequest(Json<bool>),

    /// The photo could not be stored.
    #[oai(status = 500)]
    InternalError(PlainText<String>),
}

#[derive(ApiResponse)]
pub enum DeleteResponse {
    /// `true` if the photo was deleted, `false` if no photo has the given id.
    #[oai(status = 200)]
    Ok(Json<bool>),

    /// The photo could not be deleted.
    #[oai(status = 500)]
    InternalError(PlainText<String>),
}

pub struct PhotoApi {
    controller: Arc<PhotoController>,
    uploads: UploadConfig,
}

impl PhotoApi {
    pub fn new(controller: Arc<PhotoController>, uploads: UploadConfig) -> Self {
        Self {
            controller,
            uploads,
        }
    }
}

/// Strips any directory components from a client supplied file name.
fn upload_basename(file_name: Option<&str>) -> Option<String> {
    let name = file_name?.rsplit(['/', '\\']).next()?;
    FilePath::new(name)
        .file_name()
        .and_then(|v| v.to_str())
        .map(|v| v.to_string())
}

/// Reads a path id, anything that isn't an integer falls back to `0`.
fn parse_id(raw: &str) -> i64 {
    raw.parse().unwrap_or(0)
}

#[OpenApi]
impl PhotoApi {
    /// List photos
    ///
    /// Returns every stored photo ordered by file name.
    #[oai(path = "/list", method = "get")]
    pub async fn list(&self) -> ListResponse {
        match self.controller.find_all().await {
            Ok(photos) => ListResponse::Ok(Json(photos)),
            Err(e) => {
                error!("Failed to list photos: {}", e);
                ListResponse::InternalError(PlainText(e.to_string()))
            },
        }
    }

    /// Upload a photo
    ///
    /// Stores the uploaded JPEG and generates its thumbnail.
    #[oai(path = "/upload", method = "post")]
    pub async fn upload(&self, payload: UploadPayload) -> UploadResponse {
        let file = match payload.file {
            Some(file) => file,
            None => {
                debug!("Rejecting upload without a file field");
                return UploadResponse::BadRequest(Json(false));
            },
        };

        let basename = match upload_basename(file.file_name()) {
            Some(name) => name,
            None => return UploadResponse::BadRequest(Json(false)),
        };

        if !self.uploads.is_allowed(&basename) {
            debug!("Rejecting upload {:?} due to its extension", &basename);
            return UploadResponse::BadRequest(Json(false));
        }

        let mut data = file.into_async_read();
        match self.controller.append(&basename, &mut data).await {
            Ok(_) => UploadResponse::Ok(Json(true)),
            Err(e) if e.is_validation() => {
                debug!("Rejecting upload: {}", e);
                UploadResponse::BadRequest(Json(false))
            },
            Err(e) => {
                error!("Failed to store upload {:?}: {}", &basename, e);
                UploadResponse::InternalError(PlainText(e.to_string()))
            },
        }
    }

    /// Delete a photo
    ///
    /// Removes the photo's record, original file and thumbnail. An id
    /// which is not an integer is treated as `0`, which never exists.
    #[oai(path = "/delete/:id", method = "post")]
    pub async fn delete(&self, id: Path<String>) -> DeleteResponse {
        let id = parse_id(&id.0);
        match self.controller.delete(id).await {
            Ok(_) => DeleteResponse::Ok(Json(true)),
            Err(e) if e.is_not_found() => DeleteResponse::Ok(Json(false)),
            Err(e) => {
                error!("Failed to delete photo {}: {}", id, e);
                DeleteResponse::InternalError(PlainText(e.to_string()))
            },
        }
    }
}
