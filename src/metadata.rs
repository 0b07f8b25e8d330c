use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::types::Metadata;

static HEADING_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#+[ \t]+(.+)$").expect("valid heading regex"));
static LINK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(.*?)\]\(.*?\)").expect("valid link regex"));
static INTEGER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?[0-9]+$").expect("valid integer regex"));
static FLOAT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-+]?(\.[0-9]+|[0-9]+(\.[0-9]*)?)([eE][-+]?[0-9]+)?$").expect("valid float regex")
});

const DELIMITER: &str = "---";

/// Result of splitting a file into metadata and body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extracted {
    /// Everything after the front matter block
    pub body: String,
    /// Typed `order` value, removed from `metadata`
    pub order: Option<i64>,
    pub metadata: Metadata,
}

/// One way of turning a metadata block into key/value pairs
///
/// Strategies run in [`ParseStrategy::PIPELINE`] order; the first one that
/// accepts the block wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// Full YAML via `serde_yaml`; only accepts a string-keyed mapping whose
    /// inline values read the same under the line grammar
    Structured,
    /// `key: value` lines; accepts anything
    LineBased,
}

impl ParseStrategy {
    pub const PIPELINE: [ParseStrategy; 2] = [ParseStrategy::Structured, ParseStrategy::LineBased];

    /// Parse `block`, or `None` to let the next strategy try
    pub fn parse(self, block: &str) -> Option<Metadata> {
        match self {
            ParseStrategy::Structured => parse_structured(block),
            ParseStrategy::LineBased => Some(parse_lines(block)),
        }
    }
}

/// Split `raw` into front matter and body and parse the front matter
///
/// Never fails: input without a well-formed `---` block is all body.
pub fn extract(raw: &str) -> Extracted {
    match split_front_matter(raw) {
        Some((block, body)) => {
            let (order, metadata) = finish(parse_block(block));
            Extracted {
                body: body.to_string(),
                order,
                metadata,
            }
        }
        None => Extracted {
            body: raw.to_string(),
            ..Extracted::default()
        },
    }
}

/// Parse a directory sidecar file; the whole text is the metadata block
pub fn extract_directory(sidecar: &str) -> Extracted {
    let (order, metadata) = finish(parse_block(sidecar));
    Extracted {
        body: String::new(),
        order,
        metadata,
    }
}

/// Run the parser pipeline over a metadata block
pub fn parse_block(block: &str) -> Metadata {
    ParseStrategy::PIPELINE
        .iter()
        .find_map(|strategy| strategy.parse(block))
        .unwrap_or_default()
}

/// Locate a `---` delimited block at the very start of `raw`
///
/// Returns the block text and the body that follows the closing delimiter.
pub fn split_front_matter(raw: &str) -> Option<(&str, &str)> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let mut lines = raw.split_inclusive('\n');

    let first = lines.next()?;
    if trim_line_end(first) != DELIMITER {
        return None;
    }

    let block_start = first.len();
    let mut offset = block_start;
    for line in lines {
        let next = offset + line.len();
        if trim_line_end(line) == DELIMITER {
            return Some((&raw[block_start..offset], &raw[next..]));
        }
        offset = next;
    }

    None
}

fn trim_line_end(line: &str) -> &str {
    line.trim_end_matches(|c: char| c == '\n' || c == '\r')
}

fn parse_structured(block: &str) -> Option<Metadata> {
    match serde_yaml::from_str::<serde_yaml::Value>(block) {
        Ok(serde_yaml::Value::Null) => Some(Metadata::new()),
        Ok(serde_yaml::Value::Mapping(mapping)) => {
            let mut metadata = Metadata::new();
            for (key, value) in mapping {
                let serde_yaml::Value::String(key) = key else {
                    return None;
                };
                let value = conform_structured(serde_json::to_value(&value).ok()?)?;
                metadata.insert(key, value);
            }
            Some(metadata)
        }
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("structured metadata parse failed, using line parser: {}", e);
            None
        }
    }
}

/// Bring a YAML value in line with the line grammar, or `None` when only the
/// raw text can decide it
///
/// Lists become string lists. Non-string list elements and keyword strings
/// such as `tRuE` depend on spelling or quoting that YAML does not keep.
fn conform_structured(value: Value) -> Option<Value> {
    match value {
        Value::String(s) if is_keyword(&s) => None,
        Value::Array(items) => {
            let mut list = Vec::with_capacity(items.len());
            for item in items {
                let Value::String(s) = item else {
                    return None;
                };
                let s = s.trim();
                if !s.is_empty() {
                    list.push(Value::String(s.to_string()));
                }
            }
            Some(Value::Array(list))
        }
        other => Some(other),
    }
}

fn is_keyword(s: &str) -> bool {
    ["true", "false", "null"]
        .iter()
        .any(|keyword| s.eq_ignore_ascii_case(keyword))
}

fn parse_lines(block: &str) -> Metadata {
    let mut metadata = Metadata::new();

    for line in block.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        metadata.insert(key.to_string(), coerce_scalar(value.trim()));
    }

    metadata
}

/// Coerce a raw `key: value` right-hand side into a typed value
///
/// Quoted values stay strings, matching what a YAML parser does with them.
pub fn coerce_scalar(raw: &str) -> Value {
    let raw = raw.trim();

    if let Some(inner) = strip_quotes(raw) {
        return Value::String(inner.to_string());
    }

    if let Some(list) = raw.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
        return Value::Array(split_list(list).into_iter().map(Value::String).collect());
    }

    if raw.is_empty() || raw == "~" || raw.eq_ignore_ascii_case("null") {
        return Value::Null;
    }
    if raw.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }

    if INTEGER_REGEX.is_match(raw) {
        if let Ok(n) = raw.parse::<i64>() {
            return Value::from(n);
        }
    }
    if FLOAT_REGEX.is_match(raw) {
        if let Some(n) = raw.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
            return Value::Number(n);
        }
    }

    Value::String(raw.to_string())
}

/// Strip one layer of matching single or double quotes
fn strip_quotes(value: &str) -> Option<&str> {
    if value.len() < 2 {
        return None;
    }
    ['"', '\'']
        .into_iter()
        .find_map(|q| value.strip_prefix(q).and_then(|v| v.strip_suffix(q)))
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|item| {
            let item = item.trim();
            strip_quotes(item).unwrap_or(item).trim().to_string()
        })
        .filter(|item| !item.is_empty())
        .collect()
}

/// Pull `order` out of the map and normalize `tags` in place
fn finish(mut metadata: Metadata) -> (Option<i64>, Metadata) {
    let order = metadata.remove("order").and_then(|v| coerce_order(&v));

    if let Some(tags) = metadata.remove("tags") {
        if let Some(tags) = normalize_tags(tags) {
            metadata.insert("tags".to_string(), tags);
        }
    }

    (order, metadata)
}

/// Interpret a metadata value as a display order
///
/// Finite floats are truncated toward zero; anything non-numeric is `None`.
pub fn coerce_order(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().and_then(|u| i64::try_from(u).ok()))
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite())
                    .map(f64::trunc)
                    .filter(|f| *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                    .map(|f| f as i64)
            }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Normalize a `tags` value to a list of trimmed, non-empty strings
pub fn normalize_tags(value: Value) -> Option<Value> {
    let tags: Vec<String> = match value {
        Value::Null | Value::Object(_) => return None,
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            })
            .filter(|tag| !tag.is_empty())
            .collect(),
        Value::String(s) => {
            let s = s.trim();
            let s = s
                .strip_prefix('[')
                .and_then(|r| r.strip_suffix(']'))
                .unwrap_or(s);
            split_list(s)
        }
        Value::Number(n) => vec![n.to_string()],
        Value::Bool(b) => vec![b.to_string()],
    };

    Some(Value::Array(tags.into_iter().map(Value::String).collect()))
}

/// Every heading in `body`, with inline links collapsed to their text
pub fn headings(body: &str) -> Vec<String> {
    HEADING_REGEX
        .captures_iter(body)
        .filter_map(|caps| caps.get(1))
        .map(|m| clean_heading(m.as_str()))
        .filter(|h| !h.is_empty())
        .collect()
}

/// The first heading in `body`
pub fn first_heading(body: &str) -> Option<String> {
    headings(body).into_iter().next()
}

fn clean_heading(heading: &str) -> String {
    LINK_REGEX.replace_all(heading.trim(), "$1").trim().to_string()
}

/// Title for a document: metadata `title`, else first heading, else file stem
pub fn derive_title(metadata: &Metadata, body: &str, file_name: &str) -> String {
    metadata
        .get("title")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .or_else(|| first_heading(body))
        .unwrap_or_else(|| file_stem(file_name).to_string())
}

/// File name without its final extension
pub fn file_stem(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    }
}

/// Turn `getting-started_guide.md` into `Getting Started Guide`
pub fn humanize_file_name(file_name: &str) -> String {
    file_stem(file_name)
        .replace(|c: char| c == '-' || c == '_', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
