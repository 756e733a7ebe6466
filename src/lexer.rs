use logos::Logos;

use crate::error::ScriptError;

/// Tokens of an `Int` or `Double` expression after variables and groups have
/// been substituted away.
#[derive(Logos, Debug, PartialEq, Eq, Clone, Copy)]
pub enum ArithToken {
    #[regex(r"[ \t\r\n]+", logos::skip)]
    Whitespace,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,

    // Numbers, and anything else that is not an operator; the evaluator
    // decides what a malformed operand is worth.
    #[regex(r"[^ \t\r\n+\-*/]+")]
    Operand,

    #[error]
    Error,
}

/// Tokens of a `Bool` expression.
#[derive(Logos, Debug, PartialEq, Eq, Clone, Copy)]
pub enum CondToken {
    #[regex(r"[ \t\r\n]+", logos::skip)]
    Whitespace,

    #[token("&&")]
    And,
    #[token("||")]
    Or,
    #[token("==")]
    Eq,
    #[token("!=")]
    Ne,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,

    #[regex(r#""[^"]*""#)]
    Quoted,
    #[regex(r#"[^ \t\r\n"&|=!<>]+"#)]
    Word,

    #[error]
    Error,
}

impl CondToken {
    pub fn is_logical(self) -> bool {
        matches!(self, CondToken::And | CondToken::Or)
    }

    pub fn is_comparison(self) -> bool {
        use CondToken::*;
        matches!(self, Eq | Ne | Le | Ge | Lt | Gt)
    }

    pub fn is_operand(self) -> bool {
        matches!(self, CondToken::Quoted | CondToken::Word)
    }
}

/// A token together with the slice of input it was lexed from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lexeme<'a, K> {
    pub kind: K,
    pub text: &'a str,
    pub start: usize,
}

fn lexemes<'a, K>(input: &'a str) -> Vec<Lexeme<'a, K>>
where
    K: Logos<'a, Source = str>,
    K::Extras: Default,
{
    K::lexer(input)
        .spanned()
        .map(|(kind, span)| Lexeme {
            kind,
            text: &input[span.start..span.end],
            start: span.start,
        })
        .collect()
}

pub fn lex_arithmetic(input: &str) -> Result<Vec<Lexeme<'_, ArithToken>>, ScriptError> {
    let tokens = lexemes::<ArithToken>(input);
    if let Some(bad) = tokens.iter().find(|t| t.kind == ArithToken::Error) {
        return Err(ScriptError::UnrecognizedOperand(bad.text.to_string()));
    }
    Ok(tokens)
}

/// Lexes a condition. A stray `&`, `|`, `=` or `!` is reported as an
/// unsupported operator.
pub fn lex_condition(input: &str) -> Result<Vec<Lexeme<'_, CondToken>>, ScriptError> {
    let tokens = lexemes::<CondToken>(input);
    if let Some(bad) = tokens.iter().find(|t| t.kind == CondToken::Error) {
        return Err(if bad.text.starts_with('"') {
            ScriptError::UnterminatedString {
                column: bad.start + 1,
            }
        } else {
            ScriptError::UnsupportedOperator(bad.text.to_string())
        });
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arith_kinds(input: &str) -> Vec<ArithToken> {
        lex_arithmetic(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    fn cond_kinds(input: &str) -> Vec<CondToken> {
        lex_condition(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn arithmetic_operators_and_operands() {
        use ArithToken::*;
        assert_eq!(arith_kinds("2+3 * 4"), vec![Operand, Plus, Operand, Star, Operand]);
        assert_eq!(arith_kinds("-5"), vec![Minus, Operand]);
        assert_eq!(arith_kinds("1.5/ 0.5"), vec![Operand, Slash, Operand]);
        let tokens = lex_arithmetic("10 - x1").unwrap();
        assert_eq!(tokens[2].text, "x1");
        assert_eq!(tokens[2].start, 5);
    }

    #[test]
    fn condition_prefers_two_character_operators() {
        use CondToken::*;
        assert_eq!(cond_kinds("1<=2"), vec![Word, Le, Word]);
        assert_eq!(cond_kinds("1 < 2"), vec![Word, Lt, Word]);
        assert_eq!(
            cond_kinds("a == b && c != d || e >= f"),
            vec![Word, Eq, Word, And, Word, Ne, Word, Or, Word, Ge, Word]
        );
    }

    #[test]
    fn token_classes() {
        let kinds = cond_kinds("\"s\" + x < 2 && y || z");
        let operands: Vec<bool> = kinds.iter().map(|k| k.is_operand()).collect();
        assert_eq!(operands, [true, true, true, false, true, false, true, false, true]);
        assert!(kinds[3].is_comparison() && !kinds[3].is_logical());
        assert!(kinds[5].is_logical() && kinds[7].is_logical());
    }

    #[test]
    fn quoted_operands_keep_their_spaces() {
        let tokens = lex_condition("\"a b\" == \"a b\"").unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].kind, CondToken::Quoted);
        assert_eq!(tokens[0].text, "\"a b\"");
    }

    #[test]
    fn stray_symbols_are_unsupported_operators() {
        assert_eq!(
            lex_condition("true & false"),
            Err(ScriptError::UnsupportedOperator("&".into()))
        );
        assert_eq!(
            lex_condition("x = 1"),
            Err(ScriptError::UnsupportedOperator("=".into()))
        );
    }
}
