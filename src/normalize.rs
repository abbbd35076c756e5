use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::literal;

/// Characters of context reported on each side of a parse failure.
const CONTEXT_RADIUS: usize = 50;

static POSSESSIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(\w)\\"s(\s)"#).expect("possessive pattern is valid"));

/// A per-player blob as handed over by the data-acquisition side: either an
/// already structured value or text that should deserialize to one.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    Structured(Value),
    Text(String),
}

impl From<Value> for RawRecord {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => RawRecord::Text(text),
            other => RawRecord::Structured(other),
        }
    }
}

impl From<&str> for RawRecord {
    fn from(text: &str) -> Self {
        RawRecord::Text(text.to_string())
    }
}

impl<'de> Deserialize<'de> for RawRecord {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(RawRecord::from)
    }
}

/// Column name -> parallel row values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnRecord {
    columns: BTreeMap<String, Vec<Value>>,
}

impl ColumnRecord {
    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Vec<Value>) {
        self.columns.insert(name.into(), values);
    }
}

pub fn normalize_record(raw: &RawRecord) -> Result<ColumnRecord> {
    let value = match raw {
        RawRecord::Structured(value) => value.clone(),
        RawRecord::Text(text) => parse_blob(text)?,
    };
    column_record_from_value(value)
}

/// Recover a structured value from a blob, trying the literal dialect first and
/// falling back to the textual rewrite + strict JSON.
pub fn parse_blob(text: &str) -> Result<Value> {
    let trimmed = text.trim();
    let literal_err = match literal::parse_literal(trimmed) {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };
    debug!(error = %literal_err, "literal parse failed, rewriting blob");

    let rewritten = rewrite_blob(trimmed);
    serde_json::from_str::<Value>(&rewritten).map_err(|err| {
        let offset = byte_offset(&rewritten, err.line(), err.column());
        PipelineError::MalformedRecord {
            offset,
            context: context_window(&rewritten, offset, CONTEXT_RADIUS),
            message: err.to_string(),
        }
    })
}

pub fn rewrite_blob(text: &str) -> String {
    let text = unescape_redundant(text);
    let text = normalize_delimiters(&text);
    let text = repair_possessives(&text);
    let text = normalize_literals(&text);
    strip_trailing_commas(&text)
}

pub fn unescape_redundant(text: &str) -> String {
    text.replace("\\\"", "\"").replace("\\'", "'")
}

/// Rewrite every string delimiter to `"`. A quote only closes a string when the
/// next non-blank character is structural; any other quote is text.
pub fn normalize_delimiters(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);
    let mut in_string = false;
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        if !in_string {
            if ch == '\'' || ch == '"' {
                in_string = true;
                out.push('"');
            } else {
                out.push(ch);
            }
            i += 1;
            continue;
        }
        match ch {
            '\\' => {
                out.push('\\');
                if let Some(next) = chars.get(i + 1) {
                    out.push(*next);
                    i += 1;
                }
            }
            '\'' | '"' if closes_string(&chars[i + 1..]) => {
                in_string = false;
                out.push('"');
            }
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
        i += 1;
    }
    out
}

fn closes_string(rest: &[char]) -> bool {
    rest.iter()
        .find(|c| !c.is_whitespace())
        .is_none_or(|c| matches!(c, ',' | ':' | '}' | ']' | ')'))
}

/// `Discraft"s Am Worlds` (a possessive that was turned into a delimiter)
/// becomes `Discraft's Am Worlds` again.
pub fn repair_possessives(text: &str) -> String {
    POSSESSIVE.replace_all(text, "${1}'s${2}").into_owned()
}

/// Map literal spellings outside of strings to their JSON form.
pub fn normalize_literals(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word = String::new();
    let mut in_string = false;
    let mut escaped = false;

    for ch in text.chars() {
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        if ch.is_ascii_alphabetic() || ch == '_' {
            word.push(ch);
            continue;
        }
        flush_word(&mut word, &mut out);
        if ch == '"' {
            in_string = true;
        }
        out.push(ch);
    }
    flush_word(&mut word, &mut out);
    out
}

fn flush_word(word: &mut String, out: &mut String) {
    if word.is_empty() {
        return;
    }
    let mapped = match word.as_str() {
        "True" => "true",
        "False" => "false",
        "None" | "nan" | "NaN" => "null",
        other => other,
    };
    out.push_str(mapped);
    word.clear();
}

pub fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &ch) in chars.iter().enumerate() {
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        if ch == ',' {
            let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
            if matches!(next, Some('}' | ']')) {
                continue;
            }
        }
        if ch == '"' {
            in_string = true;
        }
        out.push(ch);
    }
    out
}

fn column_record_from_value(value: Value) -> Result<ColumnRecord> {
    let value = match value {
        Value::Array(mut items) => {
            if items.is_empty() {
                return Ok(ColumnRecord::default());
            }
            items.swap_remove(0)
        }
        other => other,
    };
    let Value::Object(map) = value else {
        return Err(malformed_shape(&value, "expected a column mapping"));
    };

    let mut record = ColumnRecord::default();
    for (name, column) in map {
        let values = match column {
            Value::Array(values) => values,
            Value::Object(index_map) => {
                let mut entries: Vec<(String, Value)> = index_map.into_iter().collect();
                entries.sort_by_key(|(key, _)| (key.parse::<i64>().ok(), key.clone()));
                entries.into_iter().map(|(_, v)| v).collect()
            }
            other => {
                return Err(malformed_shape(
                    &other,
                    &format!("column '{name}' is not a sequence"),
                ));
            }
        };
        record.insert(name, values);
    }
    Ok(record)
}

fn malformed_shape(value: &Value, message: &str) -> PipelineError {
    let text = value.to_string();
    PipelineError::MalformedRecord {
        offset: 0,
        context: context_window(&text, 0, CONTEXT_RADIUS),
        message: message.to_string(),
    }
}

/// serde_json reports 1-based line/column; turn that into a byte offset.
fn byte_offset(text: &str, line: usize, column: usize) -> usize {
    if line == 0 {
        return text.len();
    }
    let mut offset = 0;
    for (idx, segment) in text.split_inclusive('\n').enumerate() {
        if idx + 1 == line {
            return (offset + column.saturating_sub(1)).min(text.len());
        }
        offset += segment.len();
    }
    text.len()
}

pub fn context_window(text: &str, offset: usize, radius: usize) -> String {
    let mut start = offset.saturating_sub(radius).min(text.len());
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = offset.saturating_add(radius).min(text.len());
    while !text.is_char_boundary(end) {
        end += 1;
    }
    text[start..end].to_string()
}
