//! Decoding of sub-structures serialized inside single CSV cells.
//!
//! Columns such as `genres`, `cast` or `crew` hold a list rendered either as
//! JSON (`[{"name": "Drama"}]`) or as a Python literal
//! (`[{'name': 'Drama', 'id': None}]`). [`decode`] tries each
//! [`DecodeStrategy`] in [`DECODE_ORDER`] and returns the first success; when
//! all fail the cell is treated as absent. A bad cell never rejects its row.

use serde_json::{Map, Number, Value};

/// Cell contents that mean "no value".
const ABSENT_SENTINELS: &[&str] = &["", "[]", "{}", "nan", "NaN", "None", "null"];

/// One way of turning a cell into a JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStrategy {
    /// Strict JSON.
    Json,
    /// JSON after swapping single quotes for double quotes.
    QuoteSwappedJson,
    /// Python literal syntax: quoted strings, `None`/`True`/`False`, tuples.
    PythonLiteral,
}

/// Strategies in the order they are attempted.
pub const DECODE_ORDER: &[DecodeStrategy] = &[
    DecodeStrategy::Json,
    DecodeStrategy::QuoteSwappedJson,
    DecodeStrategy::PythonLiteral,
];

impl DecodeStrategy {
    pub fn decode(self, raw: &str) -> Option<Value> {
        match self {
            DecodeStrategy::Json => serde_json::from_str(raw).ok(),
            DecodeStrategy::QuoteSwappedJson => {
                if !raw.contains('\'') {
                    return None;
                }
                serde_json::from_str(&raw.replace('\'', "\"")).ok()
            }
            DecodeStrategy::PythonLiteral => LiteralParser::new(raw).parse_document(),
        }
    }
}

/// Decode a serialized cell; `None` if it is empty or nothing understands it.
pub fn decode(raw: &str) -> Option<Value> {
    let raw = raw.trim();
    if ABSENT_SENTINELS.contains(&raw) {
        return None;
    }
    DECODE_ORDER.iter().find_map(|s| s.decode(raw))
}

/// Names from a decoded list, using the first non-empty of `keys` for objects.
///
/// Bare strings in the list are taken as names. Anything that is not a list
/// yields nothing. At most `cap` names are produced.
pub fn names(value: Option<&Value>, keys: &[&str], cap: usize) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::Object(obj) => keys
                .iter()
                .filter_map(|k| obj.get(*k).and_then(Value::as_str))
                .map(str::trim)
                .find(|s| !s.is_empty())
                .map(str::to_string),
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        })
        .take(cap)
        .collect()
}

/// Directors and writers pulled out of a crew list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrewNames {
    pub directors: Vec<String>,
    pub writers: Vec<String>,
}

const WRITER_JOBS: &[&str] = &["writer", "screenplay", "story"];

/// Split a decoded crew list by job, keeping at most `max_directors` and
/// `max_writers` names respectively.
pub fn crew(value: Option<&Value>, max_directors: usize, max_writers: usize) -> CrewNames {
    let mut out = CrewNames::default();
    let Some(Value::Array(items)) = value else {
        return out;
    };
    for item in items {
        let Value::Object(obj) = item else { continue };
        let job = obj
            .get("job")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase();
        let Some(name) = obj
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|n| !n.is_empty())
        else {
            continue;
        };
        if job == "director" {
            if out.directors.len() < max_directors {
                out.directors.push(name.to_string());
            }
        } else if WRITER_JOBS.contains(&job.as_str()) && out.writers.len() < max_writers {
            out.writers.push(name.to_string());
        }
    }
    out
}

/// Recursive-descent parser for the subset of Python literal syntax that
/// dataset exporters emit.
struct LiteralParser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> LiteralParser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn parse_document(mut self) -> Option<Value> {
        let v = self.value()?;
        self.skip_ws();
        (self.pos == self.src.len()).then_some(v)
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn value(&mut self) -> Option<Value> {
        self.skip_ws();
        match self.peek()? {
            '[' => self.sequence('[', ']'),
            '(' => self.sequence('(', ')'),
            '{' => self.dict(),
            '\'' | '"' => self.string().map(Value::String),
            c if c == '-' || c == '+' || c.is_ascii_digit() => self.number(),
            c if c.is_alphabetic() => self.keyword(),
            _ => None,
        }
    }

    fn sequence(&mut self, open: char, close: char) -> Option<Value> {
        self.eat(open);
        let mut items = Vec::new();
        loop {
            if self.eat(close) {
                return Some(Value::Array(items));
            }
            items.push(self.value()?);
            if !self.eat(',') {
                return self.eat(close).then_some(Value::Array(items));
            }
        }
    }

    fn dict(&mut self) -> Option<Value> {
        self.eat('{');
        let mut map = Map::new();
        loop {
            if self.eat('}') {
                return Some(Value::Object(map));
            }
            let key = match self.value()? {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            if !self.eat(':') {
                return None;
            }
            let v = self.value()?;
            map.insert(key, v);
            if !self.eat(',') {
                return self.eat('}').then_some(Value::Object(map));
            }
        }
    }

    fn string(&mut self) -> Option<String> {
        let quote = self.bump()?;
        let mut out = String::new();
        loop {
            match self.bump()? {
                c if c == quote => return Some(out),
                '\\' => match self.bump()? {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    '0' => out.push('\0'),
                    'x' => out.push(self.hex_escape(2)?),
                    'u' => out.push(self.hex_escape(4)?),
                    'U' => out.push(self.hex_escape(8)?),
                    other => out.push(other),
                },
                c => out.push(c),
            }
        }
    }

    fn hex_escape(&mut self, digits: usize) -> Option<char> {
        let end = self.pos.checked_add(digits)?;
        let hex = self.src.get(self.pos..end)?;
        let code = u32::from_str_radix(hex, 16).ok()?;
        self.pos = end;
        char::from_u32(code)
    }

    fn number(&mut self) -> Option<Value> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E' | '_'))
        {
            self.bump();
        }
        let text = self.src[start..self.pos].replace('_', "");
        if let Ok(i) = text.parse::<i64>() {
            return Some(Value::Number(i.into()));
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
    }

    fn keyword(&mut self) -> Option<Value> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.bump();
        }
        match &self.src[start..self.pos] {
            "None" => Some(Value::Null),
            "True" => Some(Value::Bool(true)),
            "False" => Some(Value::Bool(false)),
            _ => None,
        }
    }
}
