//! 单文件上传处理器。

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Extension};
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::response::Response;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::UploadConfig;
use crate::error::ApiError;
use crate::http::html;
use crate::multipart::UploadDecoder;
use crate::storage::{Storage, StorageError};

const UPLOAD_SUCCESS: &str = r#"<h1>File uploaded successfully!</h1><a href="/">Go back</a>"#;

/// 解码 multipart 请求体并写入上传目录，同名文件直接覆盖。
pub async fn upload_file(
    headers: HeaderMap,
    Extension(storage): Extension<Arc<Storage>>,
    Extension(upload): Extension<Arc<UploadConfig>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    let decoded = UploadDecoder::new(&upload.allowed_extensions)
        .decode(content_type, body)
        .map_err(|err| {
            warn!(error = %err, "upload rejected");
            ApiError::from(err)
        })?;

    let target = storage.save_upload(&decoded).await.map_err(|err| {
        warn!(filename = decoded.filename, error = %err, "failed to save upload");
        match err {
            StorageError::Io(io_err) => ApiError::save_failed(&io_err),
            StorageError::InvalidPath => ApiError::BadRequest("Invalid file type"),
        }
    })?;

    info!(
        filename = decoded.filename,
        size = decoded.bytes.len(),
        path = ?target,
        "upload saved"
    );
    Ok(html(StatusCode::OK, UPLOAD_SUCCESS))
}

/// 上传端点只接受 POST。
pub async fn method_not_allowed(method: Method) -> ApiError {
    warn!(%method, "upload endpoint requires POST");
    ApiError::MethodNotAllowed
}

/// 上传请求体大小限制，0 表示不限制。
pub fn body_limit(max_size: u64) -> DefaultBodyLimit {
    match usize::try_from(max_size) {
        Ok(0) | Err(_) => DefaultBodyLimit::disable(),
        Ok(limit) => DefaultBodyLimit::max(limit),
    }
}
