use thiserror::Error;

use crate::value::ValueKind;

/// Every way a script line, an expression, or library setup can fail.
///
/// Errors carry the offending text or kinds; the line number is attached by
/// the parser when the error leaves [`ScriptParser::step`](crate::ScriptParser::step).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    #[error("string literal opened at column {column} is not closed with another '\"'")]
    UnterminatedString { column: usize },
    #[error("'{text}' does not have matching '(' and ')'")]
    UnmatchedParens { text: String },
    #[error("statement must end with ';'")]
    MissingTerminator,

    #[error("line preceder '{0}' is not supported")]
    UnsupportedPreceder(String),
    #[error("method '{0}' is not supported")]
    UnsupportedMethod(String),
    #[error("type '{0}' is not supported")]
    UnsupportedType(String),
    #[error("operator '{0}' is not supported between strings; only '+' is")]
    UnsupportedStringOperator(String),
    #[error("operator '{0}' is not supported")]
    UnsupportedOperator(String),

    #[error("{method}: too few arguments passed (expected at least {required}, got {given})")]
    TooFewArguments {
        method: String,
        required: usize,
        given: usize,
    },
    #[error("{method}: too many arguments passed (expected at most {allowed}, got {given})")]
    TooManyArguments {
        method: String,
        allowed: usize,
        given: usize,
    },

    #[error("{method}: argument {index} must be {expected}, got {found}")]
    ArgumentType {
        method: String,
        index: usize,
        expected: ValueKind,
        found: ValueKind,
    },
    #[error("operator '{op}' compares Int or Double values, got {left} and {right}")]
    ComparisonType {
        op: String,
        left: ValueKind,
        right: ValueKind,
    },
    #[error("expected a {expected} operand, found {found}")]
    OperandType { expected: ValueKind, found: ValueKind },
    #[error("variable '{name}' is {declared} and cannot be redeclared as {requested}")]
    TypeRedeclaration {
        name: String,
        declared: ValueKind,
        requested: ValueKind,
    },
    #[error("variable '{name}' is {declared} but {method} returns {returned}")]
    ReturnTypeMismatch {
        name: String,
        method: String,
        declared: ValueKind,
        returned: ValueKind,
    },
    #[error("{0} does not return a value")]
    NoReturnValue(String),

    #[error("variable name '{0}' is unknown")]
    UnknownVariable(String),
    #[error("variable '{0}' is already registered")]
    DuplicateVariable(String),
    #[error("variable name '{0}' can only contain the characters a-z, A-Z, 0-9 and '_'")]
    InvalidVariableName(String),
    #[error("new variable '{0}' must be declared with a type")]
    MissingType(String),

    #[error("only one unnested while loop may be active at a time")]
    NestedLoop,
    #[error("while loop must be followed by '{{'")]
    MissingOpenBrace,
    #[error("while loop must be closed by '}}'")]
    UnmatchedBraces,

    #[error("{operators} operator(s) need {} operands, found {operands}", .operators + 1)]
    OperandCount { operators: usize, operands: usize },
    #[error("value not supported or recognized: {0}")]
    UnrecognizedOperand(String),
    #[error("strings must be declared with '\"': {0}")]
    ExpectedString(String),
    #[error("cannot read '{text}' as {kind}")]
    InvalidLiteral { kind: ValueKind, text: String },
    #[error("malformed {what}: {text}")]
    Malformed { what: &'static str, text: String },

    #[error("division by zero")]
    DivisionByZero,
    #[error("{method}: {message}")]
    InvalidArgument { method: String, message: String },

    #[error("'{0}' is already registered")]
    DuplicateRegistration(String),
    #[error("language name cannot be blank")]
    BlankName,
}

/// Coarse grouping of [`ScriptError`] used by hosts that report error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Lexical,
    UnsupportedPreceder,
    UnsupportedMethod,
    UnsupportedType,
    Arity,
    TypeMismatch,
    UnknownVariable,
    NestedLoop,
    MissingOpenBrace,
    UnmatchedBraces,
    Syntax,
    Runtime,
    Setup,
}

impl ErrorCategory {
    pub fn code(self) -> &'static str {
        match self {
            ErrorCategory::Lexical => "E001",
            ErrorCategory::UnsupportedPreceder => "E002",
            ErrorCategory::UnsupportedMethod => "E003",
            ErrorCategory::UnsupportedType => "E004",
            ErrorCategory::Arity => "E005",
            ErrorCategory::TypeMismatch => "E006",
            ErrorCategory::UnknownVariable => "E007",
            ErrorCategory::NestedLoop => "E008",
            ErrorCategory::MissingOpenBrace => "E009",
            ErrorCategory::UnmatchedBraces => "E010",
            ErrorCategory::Syntax => "E011",
            ErrorCategory::Runtime => "E012",
            ErrorCategory::Setup => "E013",
        }
    }
}

impl ScriptError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ScriptError::UnterminatedString { .. }
            | ScriptError::UnmatchedParens { .. }
            | ScriptError::MissingTerminator => ErrorCategory::Lexical,
            ScriptError::UnsupportedPreceder(_) => ErrorCategory::UnsupportedPreceder,
            ScriptError::UnsupportedMethod(_) => ErrorCategory::UnsupportedMethod,
            ScriptError::UnsupportedType(_) => ErrorCategory::UnsupportedType,
            ScriptError::TooFewArguments { .. } | ScriptError::TooManyArguments { .. } => {
                ErrorCategory::Arity
            }
            ScriptError::ArgumentType { .. }
            | ScriptError::ComparisonType { .. }
            | ScriptError::OperandType { .. }
            | ScriptError::TypeRedeclaration { .. }
            | ScriptError::ReturnTypeMismatch { .. }
            | ScriptError::NoReturnValue(_) => ErrorCategory::TypeMismatch,
            ScriptError::UnknownVariable(_) => ErrorCategory::UnknownVariable,
            ScriptError::NestedLoop => ErrorCategory::NestedLoop,
            ScriptError::MissingOpenBrace => ErrorCategory::MissingOpenBrace,
            ScriptError::UnmatchedBraces => ErrorCategory::UnmatchedBraces,
            ScriptError::UnsupportedStringOperator(_)
            | ScriptError::UnsupportedOperator(_)
            | ScriptError::InvalidVariableName(_)
            | ScriptError::MissingType(_)
            | ScriptError::OperandCount { .. }
            | ScriptError::UnrecognizedOperand(_)
            | ScriptError::ExpectedString(_)
            | ScriptError::InvalidLiteral { .. }
            | ScriptError::Malformed { .. } => ErrorCategory::Syntax,
            ScriptError::DivisionByZero | ScriptError::InvalidArgument { .. } => {
                ErrorCategory::Runtime
            }
            ScriptError::DuplicateVariable(_)
            | ScriptError::DuplicateRegistration(_)
            | ScriptError::BlankName => ErrorCategory::Setup,
        }
    }

    pub(crate) fn malformed(what: &'static str, text: &str) -> Self {
        ScriptError::Malformed {
            what,
            text: text.to_string(),
        }
    }
}

/// A [`ScriptError`] tagged with the 1-based source line it was raised on.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: {error}")]
pub struct StepError {
    pub line: usize,
    #[source]
    pub error: ScriptError,
}

impl StepError {
    pub fn new(line: usize, error: ScriptError) -> Self {
        Self { line, error }
    }

    pub fn category(&self) -> ErrorCategory {
        self.error.category()
    }
}
