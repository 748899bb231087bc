//! 路由装配：上传端点、静态文件兜底与通用中间件。

use axum::extract::{Extension, connect_info::ConnectInfo};
use axum::http::Request;
use axum::routing::post;
use axum::{Router, middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, info_span};

use crate::config::{UPLOAD_ENDPOINT, UploadConfig};
use crate::storage::Storage;
use crate::{files, http, upload};

/// `POST /upload` 走上传，`/upload` 上的其他方法返回 405，
/// 其余请求不论方法都按路径前缀交给静态文件服务。
pub fn build_router(storage: Arc<Storage>, upload_config: Arc<UploadConfig>) -> Router {
    let upload_route = post(upload::upload_file)
        .fallback(upload::method_not_allowed)
        .layer(upload::body_limit(upload_config.max_size));

    Router::new()
        .route(UPLOAD_ENDPOINT, upload_route)
        .fallback(files::serve_static)
        .layer(middleware::from_fn(http::add_security_headers))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let client_ip = request
                        .extensions()
                        .get::<ConnectInfo<SocketAddr>>()
                        .map(|ConnectInfo(addr)| addr.ip().to_string())
                        .unwrap_or_else(|| "unknown".to_string());
                    info_span!(
                        env!("CARGO_CRATE_NAME"),
                        client_ip,
                        method = ?request.method(),
                        path = request.uri().path(),
                    )
                })
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(Extension(storage))
        .layer(Extension(upload_config))
}
