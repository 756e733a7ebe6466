//! Expression evaluation against a target kind.
//!
//! Evaluation works on text in three passes: variable names are replaced by
//! their literal rendering, parenthesised groups are evaluated innermost first
//! and replaced by their result, and the flat remainder is folded according to
//! the target kind.

use tracing::trace;

use crate::error::ScriptError;
use crate::lexer::{lex_arithmetic, lex_condition, ArithToken, CondToken};
use crate::line::{find_paren_spans, find_string_spans, in_string};
use crate::runtime::Env;
use crate::value::{parse_bool, Value, ValueKind};

pub fn evaluate(kind: ValueKind, raw: &str, env: &Env) -> Result<Value, ScriptError> {
    let text = raw.trim();
    find_string_spans(text)?;
    let substituted = substitute(text, env)?;
    trace!(%kind, expr = text, substituted = %substituted, "evaluate");
    let value = evaluate_text(kind, &substituted)?;
    trace!(%kind, result = %value.render_literal(), "evaluated");
    Ok(value)
}

/// Evaluates text that contains no variable names.
pub fn evaluate_text(kind: ValueKind, text: &str) -> Result<Value, ScriptError> {
    let flat = resolve_groups(kind, text.trim())?;
    match kind {
        ValueKind::Int => arithmetic(&flat, parse_int, int_op).map(Value::Int),
        ValueKind::Double => arithmetic(&flat, parse_double, double_op).map(Value::Double),
        ValueKind::String => concatenate(&flat).map(Value::String),
        ValueKind::Bool => condition(&flat).map(Value::Bool),
    }
}

/// Replaces every case-insensitive occurrence of each variable name outside
/// string literals. Matching is by raw substring, not identifier boundary.
fn substitute(text: &str, env: &Env) -> Result<String, ScriptError> {
    let mut out = text.to_string();
    for (name, value) in env.substitution_order() {
        out = replace_outside_strings(&out, name, &value.render_literal())?;
    }
    Ok(out)
}

fn replace_outside_strings(
    text: &str,
    name: &str,
    replacement: &str,
) -> Result<String, ScriptError> {
    if name.is_empty() {
        return Ok(text.to_string());
    }
    let spans = find_string_spans(text)?;
    let lower = text.to_ascii_lowercase();
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut from = 0;
    while let Some(found) = lower[from..].find(name) {
        let at = from + found;
        if in_string(at, &spans) {
            from = at + 1;
            continue;
        }
        out.push_str(&text[copied..at]);
        out.push_str(replacement);
        copied = at + name.len();
        from = copied;
    }
    out.push_str(&text[copied..]);
    Ok(out)
}

/// Evaluates the innermost `( … )` group until none remain.
fn resolve_groups(kind: ValueKind, text: &str) -> Result<String, ScriptError> {
    let mut text = text.to_string();
    loop {
        let strings = find_string_spans(&text)?;
        let groups = find_paren_spans(&text, &strings)?;
        // the last-opened group cannot contain another one
        let Some(&(open, close)) = groups.iter().max_by_key(|span| span.0) else {
            return Ok(text);
        };
        let inner = &text[open + 1..close];
        let value = evaluate_text(group_kind(kind, inner)?, inner)?;
        trace!(group = inner, result = %value.render_literal(), "group");
        text = format!("{}{}{}", &text[..open], value.render_literal(), &text[close + 1..]);
    }
}

/// Numeric targets evaluate groups as themselves. Bool and String targets
/// infer the group's kind from what it contains.
fn group_kind(target: ValueKind, inner: &str) -> Result<ValueKind, ScriptError> {
    if target.is_numeric() {
        return Ok(target);
    }
    let strings = find_string_spans(inner)?;
    let bytes = inner.as_bytes();
    let has_condition = bytes.iter().enumerate().any(|(i, &b)| {
        !in_string(i, &strings)
            && match b {
                b'<' | b'>' => true,
                b'=' | b'!' => bytes.get(i + 1) == Some(&b'='),
                b'&' | b'|' => bytes.get(i + 1) == Some(&b),
                _ => false,
            }
    });
    let literal_bool = parse_bool(inner.trim()).is_some();
    Ok(if has_condition || literal_bool {
        ValueKind::Bool
    } else if !strings.is_empty() {
        ValueKind::String
    } else if inner.contains('.') {
        ValueKind::Double
    } else {
        ValueKind::Int
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Replaces quoted literals with the number they read as, so `"5" + 1` works
/// in a numeric context.
fn unquote_numbers<T: ToString>(text: &str, parse: fn(&str) -> T) -> Result<String, ScriptError> {
    let spans = find_string_spans(text)?;
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    for (open, close) in spans {
        out.push_str(&text[copied..open]);
        out.push_str(&parse(&text[open + 1..close]).to_string());
        copied = close + 1;
    }
    out.push_str(&text[copied..]);
    Ok(out)
}

/// Folds `*`/`/` left to right, then `+`/`-` left to right. Operands that do
/// not read as numbers count as zero.
fn arithmetic<T>(
    text: &str,
    parse: fn(&str) -> T,
    apply: fn(ArithOp, T, T) -> Result<T, ScriptError>,
) -> Result<T, ScriptError>
where
    T: Copy + ToString,
{
    let text = unquote_numbers(text, parse)?;
    let tokens = lex_arithmetic(&text)?;
    let operator_count = tokens.iter().filter(|t| t.kind != ArithToken::Operand).count();
    let operand_count = tokens.len() - operator_count;
    let count_error = move || ScriptError::OperandCount {
        operators: operator_count,
        operands: operand_count,
    };

    let mut operands: Vec<T> = Vec::new();
    let mut ops: Vec<ArithOp> = Vec::new();
    let mut negate = false;
    let mut want_operand = true;
    for token in &tokens {
        if want_operand {
            match token.kind {
                ArithToken::Operand => {
                    let value = if negate {
                        parse(&format!("-{}", token.text))
                    } else {
                        parse(token.text)
                    };
                    operands.push(value);
                    negate = false;
                    want_operand = false;
                }
                // unary minus
                ArithToken::Minus => negate = !negate,
                _ => return Err(count_error()),
            }
            continue;
        }
        let op = match token.kind {
            ArithToken::Plus => ArithOp::Add,
            ArithToken::Minus => ArithOp::Sub,
            ArithToken::Star => ArithOp::Mul,
            ArithToken::Slash => ArithOp::Div,
            _ => return Err(count_error()),
        };
        ops.push(op);
        want_operand = true;
    }
    if want_operand {
        return Err(count_error());
    }

    for pass in [[ArithOp::Mul, ArithOp::Div], [ArithOp::Add, ArithOp::Sub]] {
        let mut i = 0;
        while i < ops.len() {
            if pass.contains(&ops[i]) {
                operands[i] = apply(ops[i], operands[i], operands[i + 1])?;
                operands.remove(i + 1);
                ops.remove(i);
            } else {
                i += 1;
            }
        }
    }
    operands.first().copied().ok_or_else(count_error)
}

fn parse_int(text: &str) -> i64 {
    let text = text.trim();
    text.parse::<i64>()
        .ok()
        .or_else(|| text.parse::<f64>().ok().map(|x| x.trunc() as i64))
        .unwrap_or(0)
}

fn parse_double(text: &str) -> f64 {
    text.trim().parse().unwrap_or(0.0)
}

fn int_op(op: ArithOp, a: i64, b: i64) -> Result<i64, ScriptError> {
    Ok(match op {
        ArithOp::Add => a.wrapping_add(b),
        ArithOp::Sub => a.wrapping_sub(b),
        ArithOp::Mul => a.wrapping_mul(b),
        ArithOp::Div if b == 0 => return Err(ScriptError::DivisionByZero),
        ArithOp::Div => a.wrapping_div(b),
    })
}

fn double_op(op: ArithOp, a: f64, b: f64) -> Result<f64, ScriptError> {
    Ok(match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div => a / b,
    })
}

/// Joins quoted literals separated by `+`.
fn concatenate(text: &str) -> Result<String, ScriptError> {
    let spans = find_string_spans(text)?;
    let (Some(first), Some(last)) = (spans.first(), spans.last()) else {
        return Err(ScriptError::ExpectedString(text.to_string()));
    };
    if !text[..first.0].trim().is_empty() || !text[last.1 + 1..].trim().is_empty() {
        return Err(ScriptError::ExpectedString(text.to_string()));
    }
    let mut out = String::new();
    for (i, &(open, close)) in spans.iter().enumerate() {
        if i > 0 {
            let gap = text[spans[i - 1].1 + 1..open].trim();
            if gap != "+" {
                return Err(ScriptError::UnsupportedStringOperator(gap.to_string()));
            }
        }
        out.push_str(&text[open + 1..close]);
    }
    Ok(out)
}

/// An operand of a condition, or the operator that follows one.
#[derive(Debug)]
enum Piece {
    Operand(Value),
    Operator(CondToken, String),
}

/// Evaluates a condition. Comparisons fold pairwise left to right, `&&`
/// binds tighter than `||`.
fn condition(text: &str) -> Result<bool, ScriptError> {
    let pieces = condition_pieces(text)?;

    let operators = pieces.iter().filter(|p| matches!(p, Piece::Operator(..))).count();
    let operands = pieces.len() - operators;
    let alternates = pieces.iter().enumerate().all(|(i, p)| match p {
        Piece::Operand(_) => i % 2 == 0,
        Piece::Operator(..) => i % 2 == 1,
    });
    if !alternates || operands != operators + 1 {
        return Err(ScriptError::OperandCount { operators, operands });
    }

    let mut any = false;
    for clause in pieces.split(|p| matches!(p, Piece::Operator(CondToken::Or, _))) {
        let mut all = true;
        for term in clause.split(|p| matches!(p, Piece::Operator(CondToken::And, _))) {
            all &= comparison_chain(term)?;
        }
        any |= all;
    }
    Ok(any)
}

/// Lexes a condition, merging each run of adjacent operand tokens (such as
/// `x + 1` or `"a" + "b"`) into one operand.
fn condition_pieces(text: &str) -> Result<Vec<Piece>, ScriptError> {
    let tokens = lex_condition(text)?;
    let mut pieces = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i];
        match token.kind {
            kind if kind.is_operand() => {
                let start = token.start;
                let mut end = token.start + token.text.len();
                i += 1;
                while i < tokens.len() && tokens[i].kind.is_operand() {
                    end = tokens[i].start + tokens[i].text.len();
                    i += 1;
                }
                pieces.push(Piece::Operand(condition_operand(&text[start..end])?));
            }
            kind if kind.is_logical() || kind.is_comparison() => {
                pieces.push(Piece::Operator(kind, token.text.to_string()));
                i += 1;
            }
            _ => return Err(ScriptError::UnsupportedOperator(token.text.to_string())),
        }
    }
    Ok(pieces)
}

/// Reads one merged operand. Quoted text is a string expression; otherwise a
/// literal, or arithmetic typed by whether it carries a decimal point.
fn condition_operand(text: &str) -> Result<Value, ScriptError> {
    let text = text.trim();
    if text.contains('"') {
        return evaluate_text(ValueKind::String, text);
    }
    if let Some(b) = parse_bool(text) {
        return Ok(Value::Bool(b));
    }
    if let Ok(n) = text.parse::<i64>() {
        return Ok(Value::Int(n));
    }
    if let Ok(x) = text.parse::<f64>() {
        return Ok(Value::Double(x));
    }
    if text.bytes().any(|b| matches!(b, b'+' | b'-' | b'*' | b'/')) {
        let kind = if text.contains('.') {
            ValueKind::Double
        } else {
            ValueKind::Int
        };
        return evaluate_text(kind, text);
    }
    Err(ScriptError::UnrecognizedOperand(text.to_string()))
}

/// `a op b op c` folded as `(a op b) op c`; a lone operand must be a Bool.
fn comparison_chain(term: &[Piece]) -> Result<bool, ScriptError> {
    let mut pieces = term.iter();
    let mut acc = match pieces.next() {
        Some(Piece::Operand(v)) => v.clone(),
        _ => return Err(ScriptError::malformed("condition", "")),
    };
    while let (Some(Piece::Operator(op, symbol)), Some(Piece::Operand(rhs))) =
        (pieces.next(), pieces.next())
    {
        acc = Value::Bool(compare(*op, symbol, &acc, rhs)?);
    }
    match acc {
        Value::Bool(b) => Ok(b),
        other => Err(ScriptError::OperandType {
            expected: ValueKind::Bool,
            found: other.kind(),
        }),
    }
}

fn compare(op: CondToken, symbol: &str, left: &Value, right: &Value) -> Result<bool, ScriptError> {
    match op {
        CondToken::Eq => Ok(equal(left, right)),
        CondToken::Ne => Ok(!equal(left, right)),
        _ => {
            let (Some(a), Some(b)) = (left.as_number(), right.as_number()) else {
                return Err(ScriptError::ComparisonType {
                    op: symbol.to_string(),
                    left: left.kind(),
                    right: right.kind(),
                });
            };
            Ok(match op {
                CondToken::Lt => a < b,
                CondToken::Gt => a > b,
                CondToken::Le => a <= b,
                CondToken::Ge => a >= b,
                _ => return Err(ScriptError::UnsupportedOperator(symbol.to_string())),
            })
        }
    }
}

/// Int and Double compare numerically; other mixed kinds are never equal.
fn equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a == b,
        _ if left.kind().is_numeric() && right.kind().is_numeric() => {
            left.as_number() == right.as_number()
        }
        _ => left == right,
    }
}
