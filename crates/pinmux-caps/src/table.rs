//! Lexical scanning of Arduino-core `PeripheralPins.c` tables.
//!
//! Handles the subset of C those files use: `//` and `/* */` comments,
//! preprocessor lines, and `PinMap_<NAME>[] = { {..}, {..}, {NC, ..} };`
//! array initializers. Does NOT evaluate macros or conditional compilation;
//! every section is read regardless of the `#ifdef` it sits under.

use std::fmt;

use serde::Serialize;

/// A problem found while reading a capability table. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableIssue {
    /// 1-based line in the table file.
    pub line: usize,
    pub message: String,
}

impl fmt::Display for TableIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// One `PinMap_<name>[]` array.
#[derive(Debug, Clone)]
pub(crate) struct RawSection {
    /// Name without the `PinMap_` prefix (`TIM`, `SPI_MOSI`).
    pub name: String,
    pub rows: Vec<RawRow>,
}

/// One brace-delimited row, split into its top-level fields.
#[derive(Debug, Clone)]
pub(crate) struct RawRow {
    pub line: usize,
    pub fields: Vec<String>,
}

/// Byte offsets of line starts, for mapping positions back to line numbers.
struct LineIndex(Vec<usize>);

impl LineIndex {
    fn new(text: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        LineIndex(starts)
    }

    fn line(&self, pos: usize) -> usize {
        self.0.partition_point(|&start| start <= pos)
    }
}

/// Remove comments and preprocessor lines. Newlines are kept so that line
/// numbers in the result match the input.
pub(crate) fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut line_start = true;

    while let Some(c) = chars.next() {
        match c {
            '/' if chars.peek() == Some(&'/') => {
                while chars.peek().is_some_and(|&n| n != '\n') {
                    chars.next();
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for n in chars.by_ref() {
                    if n == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
            }
            '#' if line_start => {
                while chars.peek().is_some_and(|&n| n != '\n') {
                    chars.next();
                }
            }
            '\n' => {
                line_start = true;
                out.push(c);
            }
            _ => {
                if !c.is_whitespace() {
                    line_start = false;
                }
                out.push(c);
            }
        }
    }
    out
}

/// Find every `PinMap_*` array initializer and split it into rows.
pub(crate) fn scan(text: &str) -> (Vec<RawSection>, Vec<TableIssue>) {
    let clean = strip_comments(text);
    let lines = LineIndex::new(&clean);
    let mut sections = Vec::new();
    let mut issues = Vec::new();
    let mut cursor = 0;

    while let Some(found) = clean[cursor..].find("PinMap_") {
        let name_start = cursor + found + "PinMap_".len();
        let name_len = clean[name_start..]
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(clean.len() - name_start);
        let name_end = name_start + name_len;
        let name = &clean[name_start..name_end];

        // Declarations and references (`extern const PinMap PinMap_TIM[];`)
        // have no initializer.
        let Some(open) = initializer_offset(&clean[name_end..]) else {
            cursor = name_end;
            continue;
        };
        let body_start = name_end + open;

        match matching_brace(&clean, body_start) {
            Some(body_end) => {
                let rows = split_rows(&clean, body_start, body_end, &lines, &mut issues);
                sections.push(RawSection {
                    name: name.to_string(),
                    rows,
                });
                cursor = body_end + 1;
            }
            None => {
                issues.push(TableIssue {
                    line: lines.line(name_start),
                    message: format!("PinMap_{name} is never closed"),
                });
                break;
            }
        }
    }

    (sections, issues)
}

/// Offset just past the opening brace of `[...] = {`, if `after` starts with one.
fn initializer_offset(after: &str) -> Option<usize> {
    let rest = after.trim_start().strip_prefix('[')?;
    let rest = &rest[rest.find(']')? + 1..];
    let rest = rest.trim_start().strip_prefix('=')?;
    let rest = rest.trim_start().strip_prefix('{')?;
    Some(after.len() - rest.len())
}

/// Index of the `}` closing a block whose body starts at `from`.
fn matching_brace(text: &str, from: usize) -> Option<usize> {
    let mut depth = 1usize;
    for (i, b) in text.bytes().enumerate().skip(from) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_rows(
    text: &str,
    start: usize,
    end: usize,
    lines: &LineIndex,
    issues: &mut Vec<TableIssue>,
) -> Vec<RawRow> {
    let mut rows = Vec::new();
    let mut pos = start;

    while pos < end {
        let Some(rel) = text[pos..end].find('{') else {
            break;
        };
        let open = pos + rel;
        let stray = text[pos..open].trim_matches(|c: char| c.is_whitespace() || c == ',');
        if !stray.is_empty() {
            issues.push(TableIssue {
                line: lines.line(pos),
                message: format!("unexpected text between rows: '{stray}'"),
            });
        }
        let Some(close) = matching_brace(text, open + 1).filter(|&c| c < end) else {
            issues.push(TableIssue {
                line: lines.line(open),
                message: "row is never closed".to_string(),
            });
            break;
        };
        rows.push(RawRow {
            line: lines.line(open),
            fields: split_fields(&text[open + 1..close]),
        });
        pos = close + 1;
    }
    rows
}

/// Split on commas that are not nested inside parentheses or braces.
pub(crate) fn split_fields(s: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in s.chars() {
        match c {
            '(' | '{' => {
                depth += 1;
                current.push(c);
            }
            ')' | '}' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    let last = current.trim();
    if !last.is_empty() {
        fields.push(last.to_string());
    }
    fields
}

/// Split a macro invocation `NAME(a, b, c)` into its name and arguments.
pub(crate) fn parse_call(field: &str) -> Option<(&str, Vec<String>)> {
    let open = field.find('(')?;
    let inner = field[open + 1..].trim_end().strip_suffix(')')?;
    Some((field[..open].trim(), split_fields(inner)))
}

/// Alternate-function number from a `GPIO_AF<n>_<INSTANCE>` token.
pub(crate) fn parse_af(token: &str) -> Option<u8> {
    let rest = token.strip_prefix("GPIO_AF")?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}
