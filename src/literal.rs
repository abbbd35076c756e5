//! Parser for the data-literal dialect the scraper's exports are written in:
//! dicts, lists, tuples, single- or double-quoted strings, numbers and the
//! capitalised `True` / `False` / `None` constants. The output is a plain
//! `serde_json::Value` so the rest of the pipeline only deals with one shape.

use serde_json::{Map, Number, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct LiteralError {
    pub offset: usize,
    pub message: String,
}

impl std::fmt::Display for LiteralError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at byte {}", self.message, self.offset)
    }
}

type ParseResult<T> = std::result::Result<T, LiteralError>;

/// Constructor names whose single string argument is kept as a plain string.
const TIMESTAMP_CTORS: &[&str] = &["Timestamp", "pd.Timestamp", "pandas.Timestamp"];

pub fn parse_literal(raw: &str) -> ParseResult<Value> {
    let mut parser = Parser { src: raw, pos: 0 };
    parser.skip_ws();
    let value = parser.parse_value()?;
    parser.skip_ws();
    if parser.pos != raw.len() {
        return Err(parser.error("unexpected trailing characters"));
    }
    Ok(value)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn error(&self, message: &str) -> LiteralError {
        LiteralError {
            offset: self.pos,
            message: message.to_string(),
        }
    }

    fn skip_ws(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek() {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8) -> ParseResult<()> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", byte as char)))
        }
    }

    fn parse_value(&mut self) -> ParseResult<Value> {
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some(b'{') => self.parse_dict(),
            Some(b'[') => self.parse_seq(b'[', b']'),
            Some(b'(') => self.parse_tuple(),
            Some(b'\'' | b'"') => self.parse_string().map(Value::String),
            Some(b'-' | b'+' | b'.' | b'0'..=b'9') => self.parse_number(),
            Some(c) if c.is_ascii_alphabetic() || c == b'_' => self.parse_name(),
            Some(_) => Err(self.error("unexpected character")),
        }
    }

    fn parse_dict(&mut self) -> ParseResult<Value> {
        self.expect(b'{')?;
        let mut map = Map::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(b'}') {
                self.pos += 1;
                return Ok(Value::Object(map));
            }
            let key = key_string(self.parse_value()?);
            self.skip_ws();
            self.expect(b':')?;
            self.skip_ws();
            let value = self.parse_value()?;
            map.insert(key, value);
            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(Value::Object(map));
                }
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }
    }

    fn parse_seq(&mut self, open: u8, close: u8) -> ParseResult<Value> {
        self.expect(open)?;
        let (items, _) = self.parse_items(close)?;
        Ok(Value::Array(items))
    }

    // `(x)` is a parenthesised value, `(x,)` and `(x, y)` are tuples.
    fn parse_tuple(&mut self) -> ParseResult<Value> {
        self.expect(b'(')?;
        let (mut items, trailing_comma) = self.parse_items(b')')?;
        if items.len() == 1 && !trailing_comma {
            return Ok(items.remove(0));
        }
        Ok(Value::Array(items))
    }

    fn parse_items(&mut self, close: u8) -> ParseResult<(Vec<Value>, bool)> {
        let mut items = Vec::new();
        let mut trailing_comma = false;
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok((items, trailing_comma));
            }
            items.push(self.parse_value()?);
            trailing_comma = false;
            self.skip_ws();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                    trailing_comma = true;
                }
                Some(c) if c == close => {
                    self.pos += 1;
                    return Ok((items, trailing_comma));
                }
                _ => return Err(self.error(&format!("expected ',' or '{}'", close as char))),
            }
        }
    }

    fn parse_string(&mut self) -> ParseResult<String> {
        let start = self.pos;
        let Some(quote) = self.peek() else {
            return Err(self.error("expected string"));
        };
        self.pos += 1;
        let mut out = String::new();
        let mut chars = self.src[self.pos..].char_indices();
        while let Some((idx, ch)) = chars.next() {
            match ch {
                c if c as u32 == quote as u32 => {
                    self.pos += idx + 1;
                    return Ok(out);
                }
                '\n' => {
                    self.pos += idx;
                    return Err(self.error("newline inside string"));
                }
                '\\' => {
                    let Some((esc_idx, esc)) = chars.next() else {
                        break;
                    };
                    match esc {
                        '\\' => out.push('\\'),
                        '\'' => out.push('\''),
                        '"' => out.push('"'),
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '0' => out.push('\0'),
                        '\n' => {}
                        '/' => out.push('/'),
                        'b' => out.push('\u{8}'),
                        'f' => out.push('\u{c}'),
                        'x' | 'u' => {
                            let width = if esc == 'x' { 2 } else { 4 };
                            let hex_start = self.pos + esc_idx + 1;
                            let Some((decoded, consumed)) = self.decode_hex_escape(hex_start, width)
                            else {
                                self.pos += esc_idx;
                                return Err(self.error("invalid escape sequence"));
                            };
                            out.push(decoded);
                            for _ in 0..consumed {
                                chars.next();
                            }
                        }
                        other => {
                            out.push('\\');
                            out.push(other);
                        }
                    }
                }
                other => out.push(other),
            }
        }
        self.pos = start;
        Err(self.error("unterminated string"))
    }

    /// Decode the hex digits of a `\x`/`\u` escape starting at `start`. A high
    /// surrogate must be followed by a `\u` low surrogate; the pair is joined.
    /// Returns the char and how many source chars were consumed.
    fn decode_hex_escape(&self, start: usize, width: usize) -> Option<(char, usize)> {
        let unit = hex_value(self.src.get(start..start + width)?)?;
        if width == 4 && (0xD800..0xDC00).contains(&unit) {
            let low_start = start + width;
            if self.src.get(low_start..low_start + 2)? != "\\u" {
                return None;
            }
            let low = hex_value(self.src.get(low_start + 2..low_start + 6)?)?;
            if !(0xDC00..0xE000).contains(&low) {
                return None;
            }
            let joined = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
            return char::from_u32(joined).map(|c| (c, width + 6));
        }
        char::from_u32(unit).map(|c| (c, width))
    }

    fn parse_number(&mut self) -> ParseResult<Value> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || matches!(c, b'+' | b'-' | b'.' | b'e' | b'E' | b'_') {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text: String = self.src[start..self.pos]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        let text = text.strip_prefix('+').unwrap_or(&text);
        let is_float = text.contains(['.', 'e', 'E']);
        let number = if is_float {
            text.parse::<f64>().ok().and_then(Number::from_f64)
        } else {
            text.parse::<i64>().ok().map(Number::from)
        };
        match number {
            Some(n) => Ok(Value::Number(n)),
            None => {
                self.pos = start;
                Err(self.error("invalid number"))
            }
        }
    }

    fn parse_name(&mut self) -> ParseResult<Value> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == b'_' || c == b'.' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let name = &self.src[start..self.pos];
        match name {
            "True" => Ok(Value::Bool(true)),
            "False" => Ok(Value::Bool(false)),
            "None" => Ok(Value::Null),
            ctor if TIMESTAMP_CTORS.contains(&ctor) => self.parse_timestamp_call(),
            _ => {
                self.pos = start;
                Err(self.error("unsupported name"))
            }
        }
    }

    fn parse_timestamp_call(&mut self) -> ParseResult<Value> {
        self.skip_ws();
        self.expect(b'(')?;
        self.skip_ws();
        let text = self.parse_string()?;
        self.skip_ws();
        if self.peek() == Some(b',') {
            self.pos += 1;
            self.skip_ws();
        }
        self.expect(b')')?;
        Ok(Value::String(text))
    }
}

fn key_string(key: Value) -> String {
    match key {
        Value::String(s) => s,
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Null => "None".to_string(),
        other => other.to_string(),
    }
}

fn hex_value(digits: &str) -> Option<u32> {
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}
