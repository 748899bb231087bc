use percent_encoding::percent_decode_str;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::atomic::AtomicFile;
use crate::config::{INDEX_FILE, UPLOADS_PREFIX};
use crate::multipart::DecodedUpload;

/// 请求路径所属的根目录。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Root {
    Public,
    Uploads,
}

#[derive(Clone, Debug)]
pub struct Storage {
    public: PathBuf,
    uploads: PathBuf,
}

/// 位于某个根目录之内的磁盘路径。
#[derive(Clone, Debug)]
pub struct ResolvedPath {
    root: Root,
    root_path: PathBuf,
    path: PathBuf,
}

impl ResolvedPath {
    pub fn root(&self) -> Root {
        self.root
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 目录下的 index.html，同样校验不逃逸出根目录。
    pub async fn index_file(&self) -> Result<ResolvedPath, StorageError> {
        contain(self.root, &self.root_path, self.path.join(INDEX_FILE)).await
    }
}

impl Storage {
    /// 创建上传目录（幂等）并规范化两个根目录。
    ///
    /// 公共目录不存在时只记录警告，保留配置的路径。
    pub async fn open(public: PathBuf, uploads: PathBuf) -> io::Result<Self> {
        fs::create_dir_all(&uploads).await?;
        let uploads = fs::canonicalize(&uploads).await?;
        let public = match fs::canonicalize(&public).await {
            Ok(path) => path,
            Err(err) => {
                warn!(path = ?public, error = %err, "public directory is not accessible");
                public
            }
        };
        Ok(Self { public, uploads })
    }

    pub fn public_root(&self) -> &Path {
        &self.public
    }

    pub fn uploads_root(&self) -> &Path {
        &self.uploads
    }

    fn root_path(&self, root: Root) -> &Path {
        match root {
            Root::Public => &self.public,
            Root::Uploads => &self.uploads,
        }
    }

    /// 将请求路径映射到根目录下的安全路径。
    ///
    /// 以 `/uploads/` 开头的路径落在上传目录，其余落在公共目录，`/` 对应
    /// `index.html`。`..` 不能越过根目录；存在的目标会再做一次规范化，
    /// 通过符号链接逃逸的路径返回 [`StorageError::InvalidPath`]。
    /// 不检查目标是否存在。
    pub async fn resolve(&self, url_path: &str) -> Result<ResolvedPath, StorageError> {
        let (root, remainder) = match url_path.strip_prefix(UPLOADS_PREFIX) {
            Some(rest) => (Root::Uploads, rest),
            None => (Root::Public, url_path),
        };
        let decoded = percent_decode_str(remainder)
            .decode_utf8()
            .map_err(|_| StorageError::InvalidPath)?;
        if decoded.contains('\0') {
            return Err(StorageError::InvalidPath);
        }

        let relative = if root == Root::Public && decoded == "/" {
            PathBuf::from(INDEX_FILE)
        } else {
            normalize(&decoded)
        };
        let root_path = self.root_path(root);
        contain(root, root_path, root_path.join(relative)).await
    }

    /// 将上传内容写入上传目录，同名文件直接覆盖。
    pub async fn save_upload(&self, upload: &DecodedUpload) -> Result<PathBuf, StorageError> {
        let target = self.uploads.join(normalize(&upload.filename));
        if target.parent() != Some(self.uploads.as_path()) {
            return Err(StorageError::InvalidPath);
        }
        AtomicFile::create(&target)
            .await?
            .write_all(&upload.bytes)
            .await?;
        Ok(target)
    }
}

/// 词法规范化：忽略空段与 `.`，`..` 弹出上一段且不越过根。
fn normalize(path: &str) -> PathBuf {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.iter().collect()
}

async fn contain(
    root: Root,
    root_path: &Path,
    joined: PathBuf,
) -> Result<ResolvedPath, StorageError> {
    let path = match fs::canonicalize(&joined).await {
        Ok(canonical) => {
            // 根目录可能在启动之后才创建，每次都按规范化后的根比较。
            let canonical_root = fs::canonicalize(root_path).await?;
            if !canonical.starts_with(&canonical_root) {
                warn!(requested = ?joined, resolved = ?canonical, "path escapes its root");
                return Err(StorageError::InvalidPath);
            }
            canonical
        }
        Err(err) => {
            debug!(path = ?joined, error = %err, "target not canonicalized");
            joined
        }
    };
    Ok(ResolvedPath {
        root,
        root_path: root_path.to_path_buf(),
        path,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("path is outside of its root")]
    InvalidPath,
    #[error(transparent)]
    Io(#[from] io::Error),
}
