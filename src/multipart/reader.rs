//! 基于游标的 multipart 分段读取器，直接在请求体字节上切片。

use axum::body::Bytes;
use memchr::memmem;

use super::header::HeaderBlock;

const CRLF: &[u8] = b"\r\n";
const HEADER_END: &[u8] = b"\r\n\r\n";

/// 一个分段：头部与原始负载（与请求体共享内存）。
#[derive(Debug)]
pub struct Part {
    pub headers: HeaderBlock,
    pub body: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Preamble,
    Delimiter,
    Done,
}

/// 依次产出请求体中的各个分段。
///
/// 第一个 `--boundary` 之前的前导内容被忽略；每个分段止于下一个
/// `CRLF--boundary`，遇到结束分隔符 `--boundary--` 或找不到下一个分隔符
/// （请求体被截断）时停止。
pub struct PartReader {
    body: Bytes,
    delimiter: Vec<u8>,
    cursor: usize,
    state: State,
}

impl PartReader {
    pub fn new(body: Bytes, boundary: &str) -> Self {
        let mut delimiter = Vec::with_capacity(boundary.len() + 2);
        delimiter.extend_from_slice(b"--");
        delimiter.extend_from_slice(boundary.as_bytes());
        Self {
            body,
            delimiter,
            cursor: 0,
            state: State::Preamble,
        }
    }

    /// 跳过分隔符后的行尾；遇到结束分隔符返回 false。
    fn skip_delimiter_line(&mut self) -> bool {
        let rest = &self.body[self.cursor..];
        if rest.starts_with(b"--") {
            return false;
        }
        let padding = rest
            .iter()
            .take_while(|byte| matches!(byte, b' ' | b'\t'))
            .count();
        let rest = &rest[padding..];
        if rest.starts_with(CRLF) {
            self.cursor += padding + CRLF.len();
        } else if rest.starts_with(b"\n") {
            self.cursor += padding + 1;
        } else {
            // 分隔符后紧跟其他内容，不是合法的分隔行。
            return false;
        }
        true
    }

    fn split_part(&self, start: usize, end: usize) -> Part {
        let raw = &self.body[start..end];
        if raw.starts_with(CRLF) {
            return Part {
                headers: HeaderBlock::default(),
                body: self.body.slice(start + CRLF.len()..end),
            };
        }
        match memmem::find(raw, HEADER_END) {
            Some(index) => Part {
                headers: HeaderBlock::parse(&raw[..index]),
                body: self.body.slice(start + index + HEADER_END.len()..end),
            },
            None => Part {
                headers: HeaderBlock::default(),
                body: Bytes::new(),
            },
        }
    }
}

impl Iterator for PartReader {
    type Item = Part;

    fn next(&mut self) -> Option<Part> {
        if self.state == State::Preamble {
            let Some(index) = memmem::find(&self.body, &self.delimiter) else {
                self.state = State::Done;
                return None;
            };
            self.cursor = index + self.delimiter.len();
            self.state = State::Delimiter;
        }
        if self.state == State::Done || !self.skip_delimiter_line() {
            self.state = State::Done;
            return None;
        }

        let start = self.cursor;
        let mut next_delimiter = Vec::with_capacity(CRLF.len() + self.delimiter.len());
        next_delimiter.extend_from_slice(CRLF);
        next_delimiter.extend_from_slice(&self.delimiter);
        let Some(offset) = memmem::find(&self.body[start..], &next_delimiter) else {
            self.state = State::Done;
            return None;
        };
        let end = start + offset;
        self.cursor = end + next_delimiter.len();
        Some(self.split_part(start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(body: &'static [u8]) -> Vec<Part> {
        PartReader::new(Bytes::from_static(body), "XyZ").collect()
    }

    #[test]
    fn yields_parts_in_order_and_stops_at_close_delimiter() {
        let parts = parts(
            b"preamble\r\n--XyZ\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\none\r\n--XyZ\r\nContent-Disposition: form-data; name=\"b\"\r\n\r\ntwo\r\n--XyZ--\r\nepilogue",
        );
        assert_eq!(parts.len(), 2);
        assert_eq!(&parts[0].body[..], b"one");
        assert_eq!(&parts[1].body[..], b"two");
        assert!(parts[1].headers.get("content-disposition").is_some());
    }

    #[test]
    fn payload_keeps_binary_bytes_and_inner_crlf() {
        let parts = parts(
            b"--XyZ\r\nContent-Type: application/octet-stream\r\n\r\n\x00\xff\r\n\r\nline\r\n\r\n--XyZ--\r\n",
        );
        assert_eq!(parts.len(), 1);
        assert_eq!(&parts[0].body[..], b"\x00\xff\r\n\r\nline\r\n");
    }

    #[test]
    fn boundary_text_inside_payload_without_crlf_is_data() {
        let parts = parts(b"--XyZ\r\nA: b\r\n\r\nvalue--XyZ tail\r\n--XyZ--");
        assert_eq!(parts.len(), 1);
        assert_eq!(&parts[0].body[..], b"value--XyZ tail");
    }

    #[test]
    fn part_without_headers_has_empty_header_block() {
        let parts = parts(b"--XyZ\r\n\r\nraw\r\n--XyZ--");
        assert_eq!(parts.len(), 1);
        assert!(parts[0].headers.get("content-disposition").is_none());
        assert_eq!(&parts[0].body[..], b"raw");
    }

    #[test]
    fn truncated_body_drops_unterminated_part() {
        let parts = parts(b"--XyZ\r\nA: b\r\n\r\ncomplete\r\n--XyZ\r\nA: c\r\n\r\ncut off");
        assert_eq!(parts.len(), 1);
        assert_eq!(&parts[0].body[..], b"complete");
    }

    #[test]
    fn body_without_delimiter_has_no_parts() {
        assert!(parts(b"just some bytes").is_empty());
        assert!(parts(b"").is_empty());
    }

    #[test]
    fn tolerates_padding_and_bare_lf_after_delimiter() {
        let parts = parts(b"--XyZ  \nA: b\r\n\r\nok\r\n--XyZ--");
        assert_eq!(parts.len(), 1);
        assert_eq!(&parts[0].body[..], b"ok");
    }
}
