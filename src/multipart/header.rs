//! 头部行与带参数头部值的解析。

/// 一个分段的头部字段（保持原始顺序）。
#[derive(Debug, Default, Clone)]
pub struct HeaderBlock {
    fields: Vec<(String, String)>,
}

impl HeaderBlock {
    /// 按 CRLF（容忍裸 LF）拆行，续行并入上一个字段，无冒号的行被忽略。
    pub fn parse(raw: &[u8]) -> Self {
        let text = String::from_utf8_lossy(raw);
        let mut fields: Vec<(String, String)> = Vec::new();
        for line in text.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.starts_with([' ', '\t']) {
                if let Some((_, value)) = fields.last_mut() {
                    let continuation = line.trim();
                    if !continuation.is_empty() {
                        if !value.is_empty() {
                            value.push(' ');
                        }
                        value.push_str(continuation);
                    }
                }
                continue;
            }
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            fields.push((name.to_string(), value.trim().to_string()));
        }
        Self { fields }
    }

    /// 第一个同名字段（名称不区分大小写）。
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// `value *( ";" name "=" param )` 形式的头部值。
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParameterizedValue {
    pub value: String,
    params: Vec<(String, String)>,
}

impl ParameterizedValue {
    pub fn parse(raw: &str) -> Self {
        let mut segments = split_unquoted(raw).into_iter();
        let value = segments
            .next()
            .map(|head| head.trim().to_ascii_lowercase())
            .unwrap_or_default();
        let params = segments
            .filter_map(|segment| {
                let (name, param) = segment.split_once('=')?;
                let name = name.trim().to_ascii_lowercase();
                if name.is_empty() {
                    return None;
                }
                Some((name, unquote(param.trim())))
            })
            .collect();
        Self { value, params }
    }

    /// 参数值，名称不区分大小写；重复出现时取第一个。
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(param, _)| param.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// 按 `;` 切分，引号内的分号不切分。
fn split_unquoted(raw: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    for (index, ch) in raw.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                segments.push(&raw[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    segments.push(&raw[start..]);
    segments
}

/// 去掉外层引号；只有 `\"` 被视为转义，其他反斜杠原样保留。
fn unquote(raw: &str) -> String {
    let Some(inner) = raw.strip_prefix('"') else {
        return raw.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' if chars.peek() == Some(&'"') => {
                out.push('"');
                chars.next();
            }
            '"' => break,
            other => out.push(other),
        }
    }
    out
}
