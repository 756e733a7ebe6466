//! Built-in value types and methods every [`Language`](crate::Language) starts with.
//!
//! - `Generic.RandomInt(Int max)` / `Generic.RandomDouble(Double max)`
//! - `Generic.MessageBox(String text [, String title])`
//! - `Convert.<From>To<To>` for every ordered pair of distinct kinds

use std::sync::{Arc, Mutex};

use rand::Rng;
use tracing::debug;

use crate::error::ScriptError;
use crate::library::{Method, MethodLibrary, ValueLibrary};
use crate::value::{parse_bool, Value, ValueKind};

/// Where `Generic.MessageBox` delivers its text.
pub trait MessageSink: Send + Sync {
    fn show(&self, text: &str, title: Option<&str>);
}

/// Prints messages to stdout, prefixed by `[title]` when one is given.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl MessageSink for StdoutSink {
    fn show(&self, text: &str, title: Option<&str>) {
        match title {
            Some(title) => println!("[{title}] {text}"),
            None => println!("{text}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub title: Option<String>,
}

/// Collects messages in memory so a host can read them back.
#[derive(Debug, Default, Clone)]
pub struct MessageLog {
    messages: Arc<Mutex<Vec<Message>>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<Message> {
        match self.messages.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl MessageSink for MessageLog {
    fn show(&self, text: &str, title: Option<&str>) {
        let message = Message {
            text: text.to_string(),
            title: title.map(str::to_string),
        };
        match self.messages.lock() {
            Ok(mut guard) => guard.push(message),
            Err(poisoned) => poisoned.into_inner().push(message),
        }
    }
}

pub fn type_description(kind: ValueKind) -> String {
    match kind {
        ValueKind::Bool => {
            "A boolean represents a true or false piece of information.".to_string()
        }
        ValueKind::Int => format!(
            "An int represents an integer between {} and {}.",
            i64::MIN,
            i64::MAX
        ),
        ValueKind::Double => format!(
            "A double represents a number between {:e} and {:e}.",
            f64::MIN,
            f64::MAX
        ),
        ValueKind::String => concat!(
            "A string is used to represent letters, numbers, and so on. ",
            "Begin with a \" and end it with a \"."
        )
        .to_string(),
    }
}

/// Populates both libraries with the built-in set.
pub fn register_builtins(
    values: &mut ValueLibrary,
    methods: &mut MethodLibrary,
    sink: Arc<dyn MessageSink>,
) -> Result<(), ScriptError> {
    for kind in ValueKind::ALL {
        values.register(Value::default_for(kind), type_description(kind))?;
    }

    methods.register(Box::new(Random::new("Generic.RandomInt", ValueKind::Int)))?;
    methods.register(Box::new(Random::new("Generic.RandomDouble", ValueKind::Double)))?;
    methods.register(Box::new(MessageBox { sink }))?;

    for from in ValueKind::ALL {
        for to in ValueKind::ALL {
            if from != to {
                methods.register(Box::new(Conversion::new(from, to)))?;
            }
        }
    }
    Ok(())
}

/// Uniform random value in `[0, max)`.
struct Random {
    name: &'static str,
    kind: [ValueKind; 1],
}

impl Random {
    fn new(name: &'static str, kind: ValueKind) -> Self {
        Self { name, kind: [kind] }
    }

    fn non_positive(&self) -> ScriptError {
        ScriptError::InvalidArgument {
            method: self.name.to_string(),
            message: "max must be greater than zero".to_string(),
        }
    }
}

impl Method for Random {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "Returns a random number from zero up to, but not including, max."
    }

    fn required(&self) -> &[ValueKind] {
        &self.kind
    }

    fn returns(&self) -> Option<ValueKind> {
        Some(self.kind[0])
    }

    fn invoke(&self, args: &[Value]) -> Result<Option<Value>, ScriptError> {
        let mut rng = rand::thread_rng();
        let value = match args.first() {
            Some(Value::Int(max)) if *max > 0 => Value::Int(rng.gen_range(0..*max)),
            Some(Value::Double(max)) if *max > 0.0 => Value::Double(rng.gen_range(0.0..*max)),
            _ => return Err(self.non_positive()),
        };
        Ok(Some(value))
    }
}

struct MessageBox {
    sink: Arc<dyn MessageSink>,
}

impl Method for MessageBox {
    fn name(&self) -> &str {
        "Generic.MessageBox"
    }

    fn description(&self) -> &str {
        "Shows text to the user, with an optional title."
    }

    fn required(&self) -> &[ValueKind] {
        &[ValueKind::String]
    }

    fn optional(&self) -> &[ValueKind] {
        &[ValueKind::String]
    }

    fn returns(&self) -> Option<ValueKind> {
        None
    }

    fn invoke(&self, args: &[Value]) -> Result<Option<Value>, ScriptError> {
        let text = args.first().map(Value::to_string).unwrap_or_default();
        let title = args.get(1).map(Value::to_string);
        debug!(%text, ?title, "message");
        self.sink.show(&text, title.as_deref());
        Ok(None)
    }
}

/// `Convert.<From>To<To>`: one instance per ordered pair of kinds.
struct Conversion {
    name: String,
    description: String,
    from: [ValueKind; 1],
    to: ValueKind,
}

impl Conversion {
    fn new(from: ValueKind, to: ValueKind) -> Self {
        Self {
            name: format!("Convert.{}To{}", from.name(), to.name()),
            description: format!("Converts a {} into a {}.", from.name(), to.name()),
            from: [from],
            to,
        }
    }
}

impl Method for Conversion {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn required(&self) -> &[ValueKind] {
        &self.from
    }

    fn returns(&self) -> Option<ValueKind> {
        Some(self.to)
    }

    fn invoke(&self, args: &[Value]) -> Result<Option<Value>, ScriptError> {
        Ok(args.first().map(|v| convert(v, self.to)))
    }
}

/// Converts between kinds. Numbers become `false` below 1; unreadable
/// strings become zero (or `false`).
pub fn convert(value: &Value, to: ValueKind) -> Value {
    match (value, to) {
        (v, to) if v.kind() == to => v.clone(),
        (v, ValueKind::String) => Value::String(v.to_string()),

        (Value::Bool(b), ValueKind::Int) => Value::Int(i64::from(*b)),
        (Value::Bool(b), ValueKind::Double) => Value::Double(if *b { 1.0 } else { 0.0 }),

        (Value::Int(n), ValueKind::Bool) => Value::Bool(Value::truthiness(*n as f64)),
        (Value::Int(n), ValueKind::Double) => Value::Double(*n as f64),

        (Value::Double(x), ValueKind::Bool) => Value::Bool(Value::truthiness(*x)),
        (Value::Double(x), ValueKind::Int) => Value::Int(x.trunc() as i64),

        (Value::String(s), ValueKind::Bool) => {
            let s = s.trim();
            let b = parse_bool(s)
                .or_else(|| s.parse::<f64>().ok().map(Value::truthiness))
                .unwrap_or(false);
            Value::Bool(b)
        }
        (Value::String(s), ValueKind::Int) => {
            let s = s.trim();
            let n = s
                .parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|x| x.trunc() as i64))
                .unwrap_or(0);
            Value::Int(n)
        }
        (Value::String(s), ValueKind::Double) => Value::Double(s.trim().parse().unwrap_or(0.0)),

        // same-kind pairs are handled by the first arm
        (_, to) => Value::default_for(to),
    }
}
