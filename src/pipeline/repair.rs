//! Lenient JSON repair for model output.
//!
//! Small instruction-tuned models produce JSON that is *almost* valid:
//! trailing commas, unquoted keys, single quotes, Python `None`/`True`,
//! a truncated tail when `max_gen_len` is hit. [`repair_json`] first tries a
//! strict `serde_json` parse and only falls back to a tolerant
//! recursive-descent parser when that fails.
//!
//! ## What the lenient parser accepts
//!
//! | Input                         | Becomes                |
//! |-------------------------------|------------------------|
//! | `{a: 1}`                      | `{"a": 1}`             |
//! | `{'a': 'x'}` / `{“a”: “x”}`   | `{"a": "x"}`           |
//! | `[1, 2,]` / `{"a": 1,}`       | `[1, 2]` / `{"a": 1}`  |
//! | `{"a": 1 "b": 2}`             | `{"a": 1, "b": 2}`     |
//! | `{"a": None, "b": True}`      | `{"a": null, "b": true}` |
//! | `{"a": }`                     | `{"a": null}`          |
//! | `{"a": [1, {"b": "x`          | `{"a": [1, {"b": "x"}]}` |
//! | `{"a": high}`                 | `{"a": "high"}`        |
//! | `{"a": "say "hi" now"}`       | `{"a": "say \"hi\" now"}` |
//! | `// …` and `/* … */`          | ignored                |
//!
//! Only the first complete top-level value is kept; anything after it is
//! ignored. The top-level value must be an object or an array.

use crate::error::RecoveryFailure;
use serde_json::{Map, Number, Value};
use tracing::debug;

/// Deepest nesting the lenient parser will follow.
pub const MAX_DEPTH: usize = 128;

/// Parse `input` as JSON, repairing common syntax deviations.
pub fn repair_json(input: &str) -> Result<Value, RecoveryFailure> {
    let cleaned = normalise_line_endings(&remove_invisible_chars(input));
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        return Err(RecoveryFailure::Empty);
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }
    debug!("Strict JSON parse failed; falling back to lenient repair");

    let mut parser = Parser::new(trimmed);
    parser.skip_insignificant();
    match parser.peek() {
        None => Err(RecoveryFailure::Empty),
        Some('{') | Some('[') => parser.parse_value(0),
        Some(_) => Err(RecoveryFailure::Unrecoverable {
            reason: "expected an object or an array".into(),
            offset: parser.pos,
        }),
    }
}

// ── Pre-clean rules ──────────────────────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Lenient parser ───────────────────────────────────────────────────────────

struct Parser {
    chars: Vec<char>,
    /// Index into `chars`.
    pos: usize,
    /// Open containers, innermost last: `true` for an array.
    in_array: Vec<bool>,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            in_array: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    /// Skip whitespace and `//` / `/* */` comments.
    fn skip_insignificant(&mut self) {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() => self.pos += 1,
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                (Some('/'), Some('*')) => {
                    self.pos += 2;
                    while self.peek().is_some() {
                        if self.peek() == Some('*') && self.peek_at(1) == Some('/') {
                            self.pos += 2;
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    fn parse_value(&mut self, depth: usize) -> Result<Value, RecoveryFailure> {
        if depth > MAX_DEPTH {
            return Err(RecoveryFailure::TooDeep { limit: MAX_DEPTH });
        }
        self.skip_insignificant();
        match self.peek() {
            None => Ok(Value::Null),
            Some('{') => self.parse_object(depth),
            Some('[') => self.parse_array(depth),
            Some(c) if closing_quote(c).is_some() => Ok(Value::String(self.parse_string())),
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => {
                Ok(self.parse_number())
            }
            Some(_) => Ok(self.parse_bare()),
        }
    }

    fn parse_object(&mut self, depth: usize) -> Result<Value, RecoveryFailure> {
        self.pos += 1; // '{'
        self.in_array.push(false);
        let mut map = Map::new();

        loop {
            self.skip_insignificant();
            match self.peek() {
                None => break,
                Some('}') | Some(']') => {
                    self.pos += 1;
                    break;
                }
                Some(',') => {
                    self.pos += 1;
                    continue;
                }
                Some(_) => {}
            }

            let key = self.parse_key();
            self.skip_insignificant();
            if self.peek() == Some(':') {
                self.pos += 1;
                self.skip_insignificant();
            }

            let value = match self.peek() {
                None | Some(',') | Some('}') => Value::Null,
                Some(_) => self.parse_value(depth + 1)?,
            };
            map.insert(key, value);
        }

        self.in_array.pop();
        Ok(Value::Object(map))
    }

    fn parse_array(&mut self, depth: usize) -> Result<Value, RecoveryFailure> {
        self.pos += 1; // '['
        self.in_array.push(true);
        let mut items = Vec::new();

        loop {
            self.skip_insignificant();
            match self.peek() {
                None => break,
                Some(']') | Some('}') => {
                    self.pos += 1;
                    break;
                }
                Some(',') => {
                    self.pos += 1;
                }
                Some(_) => items.push(self.parse_value(depth + 1)?),
            }
        }

        self.in_array.pop();
        Ok(Value::Array(items))
    }

    fn parse_key(&mut self) -> String {
        match self.peek() {
            Some(c) if closing_quote(c).is_some() => self.parse_string(),
            _ => {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if matches!(c, ':' | ',' | '}') {
                        break;
                    }
                    self.pos += 1;
                }
                self.chars[start..self.pos]
                    .iter()
                    .collect::<String>()
                    .trim()
                    .to_string()
            }
        }
    }

    /// Parse a quoted string. An unterminated string runs to end of input.
    ///
    /// A matching quote only ends the string when structure follows it;
    /// otherwise it is an unescaped quote inside the text.
    fn parse_string(&mut self) -> String {
        let open = self.bump().unwrap_or('"');
        let close = closing_quote(open).unwrap_or('"');
        let mut out = String::new();

        while let Some(c) = self.bump() {
            let is_quote = c == close || (c == '"' && open != '\'' && open != '‘');
            if is_quote && self.quote_ends_string() {
                return out;
            }
            if c != '\\' {
                out.push(c);
                continue;
            }
            match self.bump() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('b') => out.push('\u{0008}'),
                Some('f') => out.push('\u{000C}'),
                Some('u') => match self.parse_unicode_escape() {
                    Some(ch) => out.push(ch),
                    None => out.push_str("\\u"),
                },
                Some(other) => out.push(other),
                None => break,
            }
        }
        out
    }

    /// Whether the quote just consumed closes the current string: it is
    /// followed by a delimiter, a comment, end of input, or the next key.
    fn quote_ends_string(&self) -> bool {
        let mut i = self.pos;
        let mut crossed_newline = false;
        while let Some(c) = self.chars.get(i).copied().filter(|c| c.is_whitespace()) {
            crossed_newline |= c == '\n';
            i += 1;
        }
        match self.chars.get(i).copied() {
            None | Some(',' | ':' | '}' | ']') => true,
            Some('/') => matches!(self.chars.get(i + 1).copied(), Some('/' | '*')),
            // A missing comma before the next member or item.
            Some(c) if closing_quote(c).is_some() => {
                self.in_array.last() == Some(&true) || self.key_starts_at(i)
            }
            Some(c) if crossed_newline && is_word_char(c) => self.key_starts_at(i),
            Some(_) => false,
        }
    }

    /// Whether a quoted or bare key starting at `i` is followed by `:`.
    fn key_starts_at(&self, mut i: usize) -> bool {
        match closing_quote(self.chars[i]) {
            Some(close) => {
                i += 1;
                while let Some(&c) = self.chars.get(i) {
                    i += 1;
                    if c == '\\' {
                        i += 1;
                    } else if c == close {
                        break;
                    }
                }
            }
            None => {
                while self.chars.get(i).is_some_and(|&c| is_word_char(c)) {
                    i += 1;
                }
            }
        }
        while self.chars.get(i).is_some_and(|c| c.is_whitespace()) {
            i += 1;
        }
        self.chars.get(i) == Some(&':')
    }

    /// Four hex digits after `\u`, including surrogate pairs.
    fn parse_unicode_escape(&mut self) -> Option<char> {
        let high = self.read_hex4()?;
        if (0xD800..0xDC00).contains(&high) {
            if self.peek() == Some('\\') && self.peek_at(1) == Some('u') {
                let save = self.pos;
                self.pos += 2;
                if let Some(low) = self.read_hex4() {
                    if (0xDC00..0xE000).contains(&low) {
                        let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                        return char::from_u32(code);
                    }
                }
                self.pos = save;
            }
            return Some('\u{FFFD}');
        }
        char::from_u32(high)
    }

    fn read_hex4(&mut self) -> Option<u32> {
        let digits: String = self.chars.get(self.pos..self.pos + 4)?.iter().collect();
        let v = u32::from_str_radix(&digits, 16).ok()?;
        self.pos += 4;
        Some(v)
    }

    /// Parse a number; falls back to a bare word for things like `8/10`.
    fn parse_number(&mut self) -> Value {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E') {
                self.pos += 1;
            } else {
                break;
            }
        }
        if !self.peek().is_none_or(is_delimiter) {
            self.pos = start;
            return self.parse_bare();
        }

        let raw: String = self.chars[start..self.pos].iter().collect();
        number_from_str(raw.trim_start_matches('+')).unwrap_or(Value::String(raw))
    }

    /// Unquoted text up to the next `,`, `}`, `]` or newline.
    fn parse_bare(&mut self) -> Value {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, ',' | '}' | ']' | '\n') {
                break;
            }
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        let word = word.trim();

        match word {
            "" | "null" | "None" | "none" | "NULL" | "undefined" => Value::Null,
            "true" | "True" | "TRUE" => Value::Bool(true),
            "false" | "False" | "FALSE" => Value::Bool(false),
            _ => number_from_str(word).unwrap_or_else(|| Value::String(word.to_string())),
        }
    }
}

fn closing_quote(open: char) -> Option<char> {
    match open {
        '"' => Some('"'),
        '\'' => Some('\''),
        '“' => Some('”'),
        '‘' => Some('’'),
        _ => None,
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | '}' | ']')
}

fn number_from_str(s: &str) -> Option<Value> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    if let Ok(u) = s.parse::<u64>() {
        return Some(Value::Number(u.into()));
    }
    // Rust accepts "inf"/"nan"; JSON does not.
    if !s.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)
}
