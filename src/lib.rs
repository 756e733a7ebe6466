//! gcode SL: a small line-oriented scripting language and a step-driven
//! interpreter for embedding in hosts that want to run scripts one line at a
//! time.
//!
//! ```no_run
//! use std::sync::Arc;
//! use gcode_sl::{Language, ScriptParser, Value};
//!
//! let language = Arc::new(Language::new()?);
//! let mut script = ScriptParser::from_source(language, "declare: Int x = 2 + 3 * 4;");
//! script.add_interactive_variable("speed", Value::Int(10))?;
//! while !script.is_done() {
//!     script.step()?;
//! }
//! assert_eq!(script.variable("x"), Some(&Value::Int(14)));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod builtins;
pub mod error;
pub mod eval;
pub mod language;
pub mod lexer;
pub mod library;
pub mod line;
pub mod parser;
pub mod runtime;
pub mod value;

pub use builtins::{Message, MessageLog, MessageSink, StdoutSink};
pub use error::{ErrorCategory, ScriptError, StepError};
pub use language::{Language, LanguageManifest};
pub use library::{Method, MethodLibrary, NativeMethod, ValueLibrary, ValueType};
pub use line::Preceder;
pub use parser::{ScriptParser, ScriptState};
pub use runtime::Env;
pub use value::{Value, ValueKind};
