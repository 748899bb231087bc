//! multipart/form-data 单文件上传解码。
//!
//! 请求体整体缓冲后由 [`PartReader`] 逐段切分，只取第一个带
//! `filename` 的 `Content-Disposition` 分段；扩展名不在允许列表中时
//! 立即拒绝整个请求。

mod header;
mod reader;

use axum::body::Bytes;
use std::path::Path;
use tracing::debug;

use crate::config::AllowedExtensions;

use header::ParameterizedValue;
use reader::PartReader;

const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// 解码出的上传文件。
#[derive(Debug, Clone)]
pub struct DecodedUpload {
    /// 仅文件名，不含目录部分。
    pub filename: String,
    pub bytes: Bytes,
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("missing boundary")]
    MissingBoundary,
    #[error("invalid file type: {0}")]
    InvalidFileType(String),
    #[error("no file uploaded")]
    NoFileUploaded,
}

pub struct UploadDecoder<'a> {
    allowed: &'a AllowedExtensions,
}

impl<'a> UploadDecoder<'a> {
    pub fn new(allowed: &'a AllowedExtensions) -> Self {
        Self { allowed }
    }

    pub fn decode(
        &self,
        content_type: Option<&str>,
        body: Bytes,
    ) -> Result<DecodedUpload, DecodeError> {
        let boundary = content_type
            .and_then(boundary_from_content_type)
            .ok_or(DecodeError::MissingBoundary)?;

        for part in PartReader::new(body, &boundary) {
            let Some(disposition) = part.headers.get("content-disposition") else {
                continue;
            };
            let disposition = ParameterizedValue::parse(disposition);
            let Some(filename) = disposition.param("filename").and_then(basename) else {
                continue;
            };
            if !self.is_allowed(&filename) {
                return Err(DecodeError::InvalidFileType(filename));
            }
            return Ok(DecodedUpload {
                filename,
                bytes: part.body,
            });
        }
        Err(DecodeError::NoFileUploaded)
    }

    fn is_allowed(&self, filename: &str) -> bool {
        Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.allowed.contains(ext))
    }
}

/// 从 Content-Type 头中取出非空的 boundary 参数。
///
/// 媒体类型不是 `multipart/form-data` 时只记录日志，仍按 boundary 解码。
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    let parsed = ParameterizedValue::parse(content_type);
    if parsed.value != MULTIPART_FORM_DATA {
        debug!(media_type = %parsed.value, "upload is not multipart/form-data");
    }
    parsed
        .param("boundary")
        .filter(|boundary| !boundary.is_empty())
        .map(str::to_string)
}

/// 去掉客户端提供的目录部分（`/` 与 `\` 均视为分隔符）。
fn basename(raw: &str) -> Option<String> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    if name.is_empty() || name.chars().any(char::is_control) {
        return None;
    }
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT_TYPE: &str = "multipart/form-data; boundary=----WebKitFormBoundary7MA4YWxk";

    fn file_part(filename: &str, payload: &[u8]) -> Vec<u8> {
        let mut part = format!(
            "------WebKitFormBoundary7MA4YWxk\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        part.extend_from_slice(payload);
        part.extend_from_slice(b"\r\n");
        part
    }

    fn field_part(name: &str, value: &str) -> Vec<u8> {
        format!(
            "------WebKitFormBoundary7MA4YWxk\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        )
        .into_bytes()
    }

    fn body(parts: &[Vec<u8>]) -> Bytes {
        let mut body = parts.concat();
        body.extend_from_slice(b"------WebKitFormBoundary7MA4YWxk--\r\n");
        Bytes::from(body)
    }

    fn decode(content_type: Option<&str>, body: Bytes) -> Result<DecodedUpload, DecodeError> {
        let allowed = AllowedExtensions::default();
        UploadDecoder::new(&allowed).decode(content_type, body)
    }

    #[test]
    fn extracts_first_file_part() {
        let payload = b"\x89PNG\r\n\x1a\n\x00\x00binary\xff";
        let upload = decode(
            Some(CONTENT_TYPE),
            body(&[field_part("title", "holiday"), file_part("a.png", payload)]),
        )
        .expect("decode");
        assert_eq!(upload.filename, "a.png");
        assert_eq!(&upload.bytes[..], payload);
    }

    #[test]
    fn missing_boundary_is_rejected() {
        let parts = body(&[file_part("a.png", b"x")]);
        assert!(matches!(
            decode(Some("multipart/form-data"), parts.clone()),
            Err(DecodeError::MissingBoundary)
        ));
        assert!(matches!(
            decode(Some("multipart/form-data; boundary="), parts.clone()),
            Err(DecodeError::MissingBoundary)
        ));
        assert!(matches!(
            decode(None, parts),
            Err(DecodeError::MissingBoundary)
        ));
    }

    #[test]
    fn disallowed_extension_short_circuits() {
        let result = decode(
            Some(CONTENT_TYPE),
            body(&[file_part("a.exe", b"MZ"), file_part("b.png", b"ok")]),
        );
        assert!(matches!(result, Err(DecodeError::InvalidFileType(name)) if name == "a.exe"));
    }

    #[test]
    fn extension_check_ignores_case_and_dotfiles_have_none() {
        let upload = decode(Some(CONTENT_TYPE), body(&[file_part("SCAN.PDF", b"%PDF")]))
            .expect("decode");
        assert_eq!(upload.filename, "SCAN.PDF");

        assert!(matches!(
            decode(Some(CONTENT_TYPE), body(&[file_part(".png", b"x")])),
            Err(DecodeError::InvalidFileType(_))
        ));
        assert!(matches!(
            decode(Some(CONTENT_TYPE), body(&[file_part("noext", b"x")])),
            Err(DecodeError::InvalidFileType(_))
        ));
    }

    #[test]
    fn parts_without_filename_are_skipped() {
        assert!(matches!(
            decode(Some(CONTENT_TYPE), body(&[field_part("file", "not a file")])),
            Err(DecodeError::NoFileUploaded)
        ));

        let upload = decode(
            Some(CONTENT_TYPE),
            body(&[field_part("file", "not a file"), file_part("f.txt", b"hello")]),
        )
        .expect("decode");
        assert_eq!(upload.filename, "f.txt");
        assert_eq!(&upload.bytes[..], b"hello");
    }

    #[test]
    fn empty_filename_is_treated_as_missing() {
        assert!(matches!(
            decode(Some(CONTENT_TYPE), body(&[file_part("", b"")])),
            Err(DecodeError::NoFileUploaded)
        ));
    }

    #[test]
    fn client_directories_are_stripped() {
        for (raw, expected) in [
            ("../../etc/cron.txt", "cron.txt"),
            (r"C:\Users\me\Pictures\cat.jpg", "cat.jpg"),
            ("/abs/path/doc.pdf", "doc.pdf"),
        ] {
            let upload = decode(Some(CONTENT_TYPE), body(&[file_part(raw, b"data")]))
                .expect("decode");
            assert_eq!(upload.filename, expected);
        }
    }

    #[test]
    fn no_parts_means_no_file() {
        assert!(matches!(
            decode(Some(CONTENT_TYPE), Bytes::from_static(b"garbage")),
            Err(DecodeError::NoFileUploaded)
        ));
    }

    #[test]
    fn empty_file_payload_is_allowed() {
        let upload = decode(Some(CONTENT_TYPE), body(&[file_part("empty.txt", b"")]))
            .expect("decode");
        assert!(upload.bytes.is_empty());
    }

    #[test]
    fn quoted_boundary_is_supported() {
        let content_type = "multipart/form-data; boundary=\"----WebKitFormBoundary7MA4YWxk\"";
        let upload = decode(Some(content_type), body(&[file_part("a.gif", b"GIF89a")]))
            .expect("decode");
        assert_eq!(&upload.bytes[..], b"GIF89a");
    }

    #[test]
    fn boundary_is_read_from_any_media_type() {
        assert_eq!(
            boundary_from_content_type("Multipart/Form-Data; boundary=abc").as_deref(),
            Some("abc")
        );
        assert_eq!(
            boundary_from_content_type("multipart/mixed; boundary=xyz").as_deref(),
            Some("xyz")
        );
        assert_eq!(boundary_from_content_type("text/plain"), None);
    }
}
