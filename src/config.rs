//! CLI 参数、环境变量与服务默认配置。

use clap::Parser;
use std::path::{Path, PathBuf};

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_UPLOAD_MAX_SIZE: u64 = 64 * 1024 * 1024;
pub const UPLOAD_ENDPOINT: &str = "/upload";
pub const UPLOADS_PREFIX: &str = "/uploads/";
pub const INDEX_FILE: &str = "index.html";
pub const PUBLIC_DIR_NAME: &str = "public";
pub const UPLOADS_DIR_NAME: &str = "uploads";
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "pdf", "txt"];

/// CLI arguments and environment configuration for the server.
#[derive(Parser, Debug)]
#[command(name = "axo-drop", version, about = "Static file server with uploads")]
pub struct Args {
    #[arg(
        short = 'b',
        long,
        env = "BIND",
        default_value = "0.0.0.0",
        help = "Bind address"
    )]
    pub host: String,
    #[arg(
        short = 'p',
        long,
        env = "PORT",
        default_value_t = DEFAULT_PORT,
        help = "HTTP port"
    )]
    pub port: u16,
    #[arg(
        long,
        env = "PUBLIC_DIR",
        help = "Directory served at / (defaults to <install dir>/public)"
    )]
    pub public_dir: Option<PathBuf>,
    #[arg(
        long,
        env = "UPLOADS_DIR",
        help = "Directory for uploaded files (defaults to <install dir>/uploads)"
    )]
    pub uploads_dir: Option<PathBuf>,
    #[arg(
        long,
        env = "UPLOAD_MAX_SIZE",
        default_value_t = DEFAULT_UPLOAD_MAX_SIZE,
        help = "Max upload body size in bytes (0 to disable)"
    )]
    pub upload_max_size: u64,
}

impl Args {
    /// 公共目录：未指定时位于安装目录下。
    pub fn public_root(&self) -> PathBuf {
        self.public_dir
            .clone()
            .unwrap_or_else(|| install_dir().join(PUBLIC_DIR_NAME))
    }

    /// 上传目录：未指定时位于安装目录下。
    pub fn uploads_root(&self) -> PathBuf {
        self.uploads_dir
            .clone()
            .unwrap_or_else(|| install_dir().join(UPLOADS_DIR_NAME))
    }
}

/// 可执行文件所在目录，获取失败时回退到当前工作目录。
pub fn install_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// 允许上传的扩展名集合（小写，不含点）。
#[derive(Debug, Clone)]
pub struct AllowedExtensions {
    extensions: Vec<String>,
}

impl AllowedExtensions {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// 判断扩展名是否在允许列表中（忽略大小写）。
    pub fn contains(&self, extension: &str) -> bool {
        let extension = extension.to_ascii_lowercase();
        self.extensions.iter().any(|allowed| *allowed == extension)
    }
}

impl Default for AllowedExtensions {
    fn default() -> Self {
        Self::new(ALLOWED_EXTENSIONS)
    }
}

/// 上传相关配置，由路由层通过 Extension 共享。
#[derive(Debug)]
pub struct UploadConfig {
    pub allowed_extensions: AllowedExtensions,
    pub max_size: u64,
}

impl UploadConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            allowed_extensions: AllowedExtensions::default(),
            max_size: args.upload_max_size,
        }
    }
}
