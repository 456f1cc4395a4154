use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use super::errors::ErrorStore;
use super::state::{ActionResult, StoreState};
use crate::api::{ApiClient, ApiError, UploadFile};
use crate::models::UploadedFile;

const UPLOAD_IMAGE_ENDPOINT: &str = "/upload/image";

/// Form field the backend reads the file from
const UPLOAD_FIELD: &str = "file";

/// 5 MiB, matching the backend's limit
const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug)]
pub struct UploadStore {
    api: ApiClient,
    state: StoreState,
    uploads: Mutex<Vec<UploadedFile>>,
}

/// MIME type for the image extensions the backend accepts
pub fn image_mime(filename: &str) -> Option<&'static str> {
    let ext = Path::new(filename).extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

impl UploadStore {
    pub fn new(api: ApiClient, errors: Arc<ErrorStore>) -> Self {
        Self {
            api,
            state: StoreState::new("upload", errors),
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    fn uploads_mut(&self) -> MutexGuard<'_, Vec<UploadedFile>> {
        self.uploads.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Files uploaded during this session
    pub fn uploads(&self) -> Vec<UploadedFile> {
        self.uploads_mut().clone()
    }

    pub async fn upload_image_file(&self, path: &Path) -> ActionResult<UploadedFile> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let err = ApiError::Validation(format!("Cannot read {}: {}", path.display(), e));
                self.state.record("upload_image", &err);
                return Err(err);
            }
        };
        self.upload_image(&filename, bytes).await
    }

    pub async fn upload_image(&self, filename: &str, bytes: Vec<u8>) -> ActionResult<UploadedFile> {
        self.state
            .run("upload_image", async {
                let mime = image_mime(filename).ok_or_else(|| {
                    ApiError::Validation(format!("Unsupported image type: {}", filename))
                })?;
                if bytes.is_empty() {
                    return Err(ApiError::Validation("File is empty".to_string()));
                }
                if bytes.len() > MAX_UPLOAD_BYTES {
                    return Err(ApiError::Validation(format!(
                        "File is larger than {} MB",
                        MAX_UPLOAD_BYTES / (1024 * 1024)
                    )));
                }

                let file = UploadFile {
                    field: UPLOAD_FIELD.to_string(),
                    filename: filename.to_string(),
                    mime: mime.to_string(),
                    bytes,
                };
                let uploaded: UploadedFile = self.api.upload(UPLOAD_IMAGE_ENDPOINT, file).await?;
                self.uploads_mut().push(uploaded.clone());
                Ok(uploaded)
            })
            .await
    }
}
