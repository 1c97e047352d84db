//! Recovery of a flat `path -> content` mapping from free-form generative text.
//!
//! The search is a heuristic: it takes the first fenced block holding a
//! brace-delimited object (or the whole trimmed text when there is none),
//! parses it as JSON and, when that fails, retries exactly once after
//! escaping stray backslashes. Anything it cannot recover is reported as an
//! [`ExtractionError`]; no further repair is attempted.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

pub const SNIPPET_MAX_CHARS: usize = 500;

const FENCED_OBJECT_PATTERN: &str = r"(?i)```(json)?\s*(\{[\s\S]*?\})\s*```";

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("no file mapping found in generated output ({context})")]
    Empty { context: String },
    #[error("failed to parse file mapping ({context}): {reason}. snippet: {snippet}")]
    Unparseable {
        context: String,
        reason: String,
        snippet: String,
    },
    #[error("generated output is not a flat string-to-string mapping ({context}): {reason}")]
    NotFlatMapping { context: String, reason: String },
}

impl ExtractionError {
    pub fn context(&self) -> &str {
        match self {
            Self::Empty { context }
            | Self::Unparseable { context, .. }
            | Self::NotFlatMapping { context, .. } => context,
        }
    }
}

/// Which parse attempt produced the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsePath {
    Strict,
    Repaired,
}

impl ParsePath {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Repaired => "repaired",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFiles {
    /// Entries in the order they appear in the source object.
    pub entries: Vec<(String, String)>,
    pub parse_path: ParsePath,
}

impl ExtractedFiles {
    /// Shape expected by [`crate::files::merge_into`].
    pub fn into_batch(self) -> impl Iterator<Item = (String, Option<String>)> {
        self.entries
            .into_iter()
            .map(|(path, content)| (path, Some(content)))
    }
}

fn fence_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(FENCED_OBJECT_PATTERN).ok())
        .as_ref()
}

fn candidate_text(raw_text: &str) -> &str {
    fence_pattern()
        .and_then(|pattern| pattern.captures(raw_text))
        .and_then(|captures| captures.get(2))
        .map(|object| object.as_str())
        .unwrap_or_else(|| raw_text.trim())
}

fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_MAX_CHARS).collect()
}

fn is_hex4(chars: &[char]) -> bool {
    chars.len() == 4 && chars.iter().all(char::is_ascii_hexdigit)
}

/// Escapes every backslash that does not start a valid JSON escape sequence.
pub fn escape_stray_backslashes(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        if ch != '\\' {
            out.push(ch);
            i += 1;
            continue;
        }
        let valid_len = match chars.get(i + 1).copied() {
            Some('"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't') => 2,
            Some('u') if chars.get(i + 2..i + 6).is_some_and(is_hex4) => 6,
            _ => 0,
        };
        if valid_len == 0 {
            out.push_str("\\\\");
            i += 1;
        } else {
            out.extend(&chars[i..i + valid_len]);
            i += valid_len;
        }
    }
    out
}

fn flatten(value: Value, context: &str) -> Result<Vec<(String, String)>, ExtractionError> {
    let Value::Object(object) = value else {
        return Err(ExtractionError::NotFlatMapping {
            context: context.to_string(),
            reason: format!("expected a JSON object, found {}", json_kind(&value)),
        });
    };

    let mut entries = Vec::with_capacity(object.len());
    for (path, content) in object {
        match content {
            Value::String(text) => entries.push((path, text)),
            other => {
                return Err(ExtractionError::NotFlatMapping {
                    context: context.to_string(),
                    reason: format!("value for `{path}` is {}, not a string", json_kind(&other)),
                })
            }
        }
    }
    Ok(entries)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Extracts a flat file mapping from generated text.
///
/// `context` is echoed back in any error so callers can tell which stage's
/// output failed.
pub fn extract_file_map(raw_text: &str, context: &str) -> Result<ExtractedFiles, ExtractionError> {
    let candidate = candidate_text(raw_text);
    if candidate.is_empty() {
        return Err(ExtractionError::Empty {
            context: context.to_string(),
        });
    }

    let (value, parse_path) = match serde_json::from_str::<Value>(candidate) {
        Ok(value) => (value, ParsePath::Strict),
        Err(_) => {
            let repaired = escape_stray_backslashes(candidate);
            let value = serde_json::from_str::<Value>(&repaired).map_err(|err| {
                ExtractionError::Unparseable {
                    context: context.to_string(),
                    reason: err.to_string(),
                    snippet: snippet(candidate),
                }
            })?;
            (value, ParsePath::Repaired)
        }
    };

    Ok(ExtractedFiles {
        entries: flatten(value, context)?,
        parse_path,
    })
}
