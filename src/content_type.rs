//! 根据扩展名解析 Content-Type。

use std::path::Path;

/// 未知扩展名时使用的类型。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fallback {
    /// 目录索引页。
    Html,
    /// 普通文件。
    Binary,
}

impl Fallback {
    fn mime(self) -> &'static str {
        match self {
            Fallback::Html => "text/html",
            Fallback::Binary => "application/octet-stream",
        }
    }
}

pub fn resolve(path: &Path, fallback: Fallback) -> String {
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| fallback.mime().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions_resolve() {
        assert_eq!(resolve(Path::new("a/b.txt"), Fallback::Binary), "text/plain");
        assert_eq!(resolve(Path::new("photo.PNG"), Fallback::Binary), "image/png");
        assert_eq!(resolve(Path::new("doc.pdf"), Fallback::Binary), "application/pdf");
        assert_eq!(resolve(Path::new("index.html"), Fallback::Html), "text/html");
    }

    #[test]
    fn unknown_extension_uses_fallback() {
        assert_eq!(
            resolve(Path::new("blob.zzzunknown"), Fallback::Binary),
            "application/octet-stream"
        );
        assert_eq!(resolve(Path::new("README"), Fallback::Binary), "application/octet-stream");
        assert_eq!(resolve(Path::new("index"), Fallback::Html), "text/html");
    }
}
