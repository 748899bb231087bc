//! 静态文件与上传文件的读取响应。

use axum::body::Body as AxumBody;
use axum::extract::Extension;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use httpdate::fmt_http_date;
use std::fs::Metadata;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::content_type::{self, Fallback};
use crate::error::ApiError;
use crate::storage::{ResolvedPath, Storage};

/// `/upload` 以外所有请求的兜底处理器：解析路径后交给 [`respond`]。
///
/// 任何方法都按读取处理，HEAD 只去掉响应体。
pub async fn serve_static(
    method: Method,
    uri: Uri,
    Extension(storage): Extension<Arc<Storage>>,
) -> Result<Response, ApiError> {
    let resolved = storage.resolve(uri.path()).await.map_err(|err| {
        debug!(%method, path = uri.path(), error = %err, "path rejected");
        ApiError::from(err)
    })?;
    respond(&resolved, method == Method::HEAD).await
}

/// 读取已解析的路径并生成唯一的响应。
///
/// 不存在 -> 404；目录 -> 其中的 `index.html`，没有则 404；
/// 普通文件 -> 200 并带上 Content-Type；读取失败 -> 500。
pub async fn respond(resolved: &ResolvedPath, head: bool) -> Result<Response, ApiError> {
    let metadata = fs::metadata(resolved.path())
        .await
        .map_err(|_| ApiError::NotFound)?;

    if metadata.is_dir() {
        let index = resolved.index_file().await?;
        let index_metadata = match fs::metadata(index.path()).await {
            Ok(meta) if meta.is_file() => meta,
            _ => return Err(ApiError::NotFound),
        };
        return read_and_build(&index, &index_metadata, Fallback::Html, head).await;
    }
    if !metadata.is_file() {
        return Err(ApiError::NotFound);
    }
    read_and_build(resolved, &metadata, Fallback::Binary, head).await
}

async fn read_and_build(
    resolved: &ResolvedPath,
    metadata: &Metadata,
    fallback: Fallback,
    head: bool,
) -> Result<Response, ApiError> {
    let path = resolved.path();
    let content = fs::read(path).await.map_err(|err| {
        warn!(path = ?path, error = %err, "read failed");
        ApiError::read_failed(&err)
    })?;

    let mut headers = HeaderMap::new();
    let mime = content_type::resolve(path, fallback);
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&mime)
            .map_err(|_| ApiError::ServerError("invalid content type".into()))?,
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(content.len()));
    if let Ok(modified) = metadata.modified()
        && let Ok(value) = HeaderValue::from_str(&fmt_http_date(modified))
    {
        headers.insert(header::LAST_MODIFIED, value);
    }
    info!(path = ?path, size = content.len(), root = ?resolved.root(), "serve file");

    let body = if head {
        AxumBody::empty()
    } else {
        AxumBody::from(content)
    };
    Ok((StatusCode::OK, headers, body).into_response())
}
