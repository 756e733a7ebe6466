//! Line classification: comment stripping, preceders, and the span scans the
//! evaluator relies on.
//!
//! A script line looks like `<preceder>: <text>`. Statements (`declare:` and
//! `execute:`) end with `;`. Every scan here skips characters that fall inside
//! a string literal.

use std::fmt;
use std::str::FromStr;

use crate::error::ScriptError;

pub const LINE_END: char = ';';
pub const ASSIGN: char = '=';
pub const OPEN_CALL: char = '(';
pub const ARG_SEPARATOR: char = ',';

/// Byte indices of an opening and closing delimiter, both inclusive.
pub type Span = (usize, usize);

/// The leading keyword of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preceder {
    Declare,
    Execute,
    While,
    Break,
}

impl Preceder {
    pub const ALL: [Preceder; 4] = [
        Preceder::Declare,
        Preceder::Execute,
        Preceder::While,
        Preceder::Break,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            Preceder::Declare => "declare",
            Preceder::Execute => "execute",
            Preceder::While => "while",
            Preceder::Break => "break",
        }
    }
}

impl FromStr for Preceder {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.keyword().eq_ignore_ascii_case(token))
            .ok_or_else(|| ScriptError::UnsupportedPreceder(token.to_string()))
    }
}

impl fmt::Display for Preceder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// The meaningful text of a raw line: trimmed, de-tabbed, without a `//`
/// comment. A comment-only line comes back empty.
pub fn clean_line(raw: &str) -> &str {
    let line = raw.trim();
    let bytes = line.as_bytes();
    let mut in_string = false;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'"' => in_string = !in_string,
            b'/' if !in_string && bytes.get(i + 1) == Some(&b'/') => return line[..i].trim(),
            _ => {}
        }
    }
    line
}

/// Classifies a line by the keyword before its first `:`. A line without a
/// colon is classified by its whole text, so a bare `break` still works.
pub fn preceder(line: &str) -> Result<Preceder, ScriptError> {
    let line = clean_line(line);
    let token = match line.find(':') {
        Some(colon) => &line[..colon],
        None => line,
    };
    token.parse()
}

/// Everything after the preceder's `:`, trimmed.
pub fn post_preceder(line: &str) -> &str {
    let line = clean_line(line);
    match line.find(':') {
        Some(colon) => line[colon + 1..].trim(),
        None => "",
    }
}

/// Pairs `"` characters by parity: 1st with 2nd, 3rd with 4th, and so on.
pub fn find_string_spans(text: &str) -> Result<Vec<Span>, ScriptError> {
    let mut spans = Vec::new();
    let mut open: Option<usize> = None;
    for (i, b) in text.bytes().enumerate() {
        if b == b'"' {
            match open.take() {
                Some(start) => spans.push((start, i)),
                None => open = Some(i),
            }
        }
    }
    match open {
        Some(start) => Err(ScriptError::UnterminatedString { column: start + 1 }),
        None => Ok(spans),
    }
}

/// True when `index` lies strictly between a span's quotes.
pub fn in_string(index: usize, spans: &[Span]) -> bool {
    spans.iter().any(|&(open, close)| index > open && index < close)
}

/// True when `index` lies on or between a span's quotes.
fn in_literal(index: usize, spans: &[Span]) -> bool {
    spans.iter().any(|&(open, close)| index >= open && index <= close)
}

/// Matches `(` with `)` outside string literals. Spans come back ordered by
/// their opening index.
pub fn find_paren_spans(text: &str, strings: &[Span]) -> Result<Vec<Span>, ScriptError> {
    let mut stack = Vec::new();
    let mut spans = Vec::new();
    for (i, b) in text.bytes().enumerate() {
        if in_literal(i, strings) {
            continue;
        }
        match b {
            b'(' => stack.push(i),
            b')' => match stack.pop() {
                Some(open) => spans.push((open, i)),
                None => return Err(unmatched(text)),
            },
            _ => {}
        }
    }
    if !stack.is_empty() {
        return Err(unmatched(text));
    }
    spans.sort_unstable();
    Ok(spans)
}

fn unmatched(text: &str) -> ScriptError {
    ScriptError::UnmatchedParens {
        text: text.to_string(),
    }
}

/// Indices of `needle` at parenthesis depth zero and outside strings.
fn top_level_positions(text: &str, needle: u8) -> Result<Vec<usize>, ScriptError> {
    let strings = find_string_spans(text)?;
    let mut depth = 0usize;
    let mut positions = Vec::new();
    for (i, b) in text.bytes().enumerate() {
        if in_literal(i, &strings) {
            continue;
        }
        match b {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            _ if b == needle && depth == 0 => positions.push(i),
            _ => {}
        }
    }
    Ok(positions)
}

/// Statement text with its trailing `;` removed.
pub fn statement_body(text: &str) -> Result<&str, ScriptError> {
    text.trim()
        .strip_suffix(LINE_END)
        .map(str::trim)
        .ok_or(ScriptError::MissingTerminator)
}

/// Splits a statement body on its assignment `=`, ignoring `==`, `!=`, `<=`
/// and `>=`, and anything inside strings or parentheses.
pub fn split_assignment(body: &str) -> Result<Option<(&str, &str)>, ScriptError> {
    let bytes = body.as_bytes();
    for i in top_level_positions(body, ASSIGN as u8)? {
        let prev = i.checked_sub(1).map(|p| bytes[p]);
        let next = bytes.get(i + 1).copied();
        let comparison = matches!(prev, Some(b'=' | b'!' | b'<' | b'>')) || next == Some(b'=');
        if !comparison {
            return Ok(Some((body[..i].trim(), body[i + 1..].trim())));
        }
    }
    Ok(None)
}

/// The `<Type> <name>` words on the left of an assignment.
fn target_words(lhs: &str) -> Result<(Option<&str>, &str), ScriptError> {
    let words: Vec<&str> = lhs.split_whitespace().collect();
    match words.as_slice() {
        [name] => Ok((None, name)),
        [ty, name] => Ok((Some(ty), name)),
        _ => Err(ScriptError::malformed("assignment target", lhs)),
    }
}

fn declaration_target(text: &str) -> Result<(Option<&str>, &str), ScriptError> {
    let body = statement_body(text)?;
    let (lhs, _) = split_assignment(body)?
        .ok_or_else(|| ScriptError::malformed("declaration, no '=' found", body))?;
    target_words(lhs)
}

/// Type written before the variable name, if any: `Int` in `Int x = 5;`.
pub fn declared_type(text: &str) -> Result<Option<&str>, ScriptError> {
    declaration_target(text).map(|(ty, _)| ty)
}

/// Variable name being declared or assigned: `x` in `Int x = 5;`.
pub fn declared_name(text: &str) -> Result<&str, ScriptError> {
    declaration_target(text).map(|(_, name)| name)
}

/// Expression on the right of the declaration's `=`.
pub fn declared_expr(text: &str) -> Result<&str, ScriptError> {
    let body = statement_body(text)?;
    let (_, rhs) = split_assignment(body)?
        .ok_or_else(|| ScriptError::malformed("declaration, no '=' found", body))?;
    if rhs.is_empty() {
        return Err(ScriptError::malformed("declaration, nothing after '='", body));
    }
    Ok(rhs)
}

/// Optional `[Type] name` receiving an `execute:` call's result.
pub fn call_target(text: &str) -> Result<Option<(Option<&str>, &str)>, ScriptError> {
    let body = statement_body(text)?;
    match split_assignment(body)? {
        Some((lhs, _)) => target_words(lhs).map(Some),
        None => Ok(None),
    }
}

/// The `Name(args)` part of an `execute:` statement.
fn call_expr(text: &str) -> Result<&str, ScriptError> {
    let body = statement_body(text)?;
    let call = match split_assignment(body)? {
        Some((_, rhs)) => rhs,
        None => body,
    };
    let strings = find_string_spans(call)?;
    let parens = find_paren_spans(call, &strings)?;
    match parens.first() {
        Some(&(_, close)) if close == call.len() - 1 => Ok(call),
        Some(_) => Err(ScriptError::malformed("method call, text after ')'", call)),
        None => Err(ScriptError::malformed("method call, no '(' found", call)),
    }
}

pub fn method_name(text: &str) -> Result<&str, ScriptError> {
    let call = call_expr(text)?;
    let name = call
        .find(OPEN_CALL)
        .map(|open| call[..open].trim())
        .unwrap_or_default();
    if name.is_empty() {
        return Err(ScriptError::malformed("method call, no method name", call));
    }
    Ok(name)
}

/// Raw argument expressions, split on the call's top-level commas.
pub fn method_args(text: &str) -> Result<Vec<&str>, ScriptError> {
    let call = call_expr(text)?;
    let open = call.find(OPEN_CALL).unwrap_or_default();
    let inner = &call[open + 1..call.len() - 1];
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut args = Vec::new();
    let mut start = 0;
    for comma in top_level_positions(inner, ARG_SEPARATOR as u8)? {
        args.push(inner[start..comma].trim());
        start = comma + 1;
    }
    args.push(inner[start..].trim());
    if args.iter().any(|a| a.is_empty()) {
        return Err(ScriptError::malformed("method call, empty argument", call));
    }
    Ok(args)
}

/// Variable names are ASCII letters, digits and `_`.
pub fn validate_name(name: &str) -> Result<(), ScriptError> {
    let valid = !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(ScriptError::InvalidVariableName(name.to_string()))
    }
}
