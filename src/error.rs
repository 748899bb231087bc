//! 统一的 HTTP 错误类型：每种错误对应一个固定的 HTML 响应。

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use std::io;

use crate::multipart::DecodeError;
use crate::storage::StorageError;

#[derive(Debug)]
pub enum ApiError {
    NotFound,
    MethodNotAllowed,
    BadRequest(&'static str),
    ServerError(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> String {
        match self {
            ApiError::NotFound => "<h1>404 - File Not Found</h1>".to_string(),
            ApiError::MethodNotAllowed => "<h1>405 - Method Not Allowed</h1>".to_string(),
            ApiError::BadRequest(msg) => format!("<h1>400 - {msg}</h1>"),
            ApiError::ServerError(msg) => format!("<h1>500 - {msg}</h1>"),
        }
    }

    /// 读取失败：消息中带上底层 I/O 错误码。
    pub fn read_failed(err: &io::Error) -> Self {
        ApiError::ServerError(format!("Server Error: {}", error_code(err)))
    }

    /// 写入失败：消息中带上底层 I/O 错误码。
    pub fn save_failed(err: &io::Error) -> Self {
        ApiError::ServerError(format!("Error saving file: {}", error_code(err)))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), self.body()).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        response
    }
}

impl From<DecodeError> for ApiError {
    fn from(error: DecodeError) -> Self {
        match error {
            DecodeError::MissingBoundary => ApiError::BadRequest("Bad Request"),
            DecodeError::InvalidFileType(_) => ApiError::BadRequest("Invalid file type"),
            DecodeError::NoFileUploaded => ApiError::BadRequest("No file uploaded"),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::InvalidPath => ApiError::NotFound,
            StorageError::Io(err) => match err.kind() {
                io::ErrorKind::NotFound => ApiError::NotFound,
                _ => ApiError::read_failed(&err),
            },
        }
    }
}

/// I/O 错误的简短错误码，例如 `PermissionDenied (os error 13)`。
pub fn error_code(err: &io::Error) -> String {
    match err.raw_os_error() {
        Some(code) => format!("{:?} (os error {code})", err.kind()),
        None => format!("{:?}", err.kind()),
    }
}
