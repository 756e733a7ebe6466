//! Registries of value types and callable methods.
//!
//! Both registries key entries by lowercased name, so lookups are
//! case-insensitive. Registering a name twice is a setup error.

use std::collections::HashMap;
use std::fmt;

use crate::error::ScriptError;
use crate::value::{Value, ValueKind};

/// A callable exposed to `execute:` lines.
///
/// Implementors describe their parameter kinds and do the real work in
/// [`invoke`](Method::invoke); callers go through [`call`](Method::call), which
/// checks arity and argument kinds first.
pub trait Method: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    fn required(&self) -> &[ValueKind];

    fn optional(&self) -> &[ValueKind] {
        &[]
    }

    /// Kind of the returned value, `None` for methods that return nothing.
    fn returns(&self) -> Option<ValueKind>;

    fn invoke(&self, args: &[Value]) -> Result<Option<Value>, ScriptError>;

    fn call(&self, args: &[Value]) -> Result<Option<Value>, ScriptError> {
        check_arity(self.name(), self.required(), self.optional(), args.len())?;
        for (index, arg) in args.iter().enumerate() {
            if let Some(expected) = self.param_kind(index) {
                if arg.kind() != expected {
                    return Err(ScriptError::ArgumentType {
                        method: self.name().to_string(),
                        index,
                        expected,
                        found: arg.kind(),
                    });
                }
            }
        }
        self.invoke(args)
    }

    /// Declared kind of argument `index`: required slots first, then optional.
    fn param_kind(&self, index: usize) -> Option<ValueKind> {
        let required = self.required();
        match required.get(index) {
            Some(kind) => Some(*kind),
            None => self.optional().get(index - required.len()).copied(),
        }
    }
}

/// Fails unless `given` falls within `[required, required + optional]`.
pub fn check_arity(
    method: &str,
    required: &[ValueKind],
    optional: &[ValueKind],
    given: usize,
) -> Result<(), ScriptError> {
    let allowed = required.len() + optional.len();
    if given < required.len() {
        return Err(ScriptError::TooFewArguments {
            method: method.to_string(),
            required: required.len(),
            given,
        });
    }
    if given > allowed {
        return Err(ScriptError::TooManyArguments {
            method: method.to_string(),
            allowed,
            given,
        });
    }
    Ok(())
}

type NativeFn = dyn Fn(&[Value]) -> Result<Option<Value>, ScriptError> + Send + Sync;

/// A host-defined method backed by a closure.
pub struct NativeMethod {
    name: String,
    description: String,
    required: Vec<ValueKind>,
    optional: Vec<ValueKind>,
    returns: Option<ValueKind>,
    func: Box<NativeFn>,
}

impl NativeMethod {
    pub fn new<F>(
        name: impl Into<String>,
        required: Vec<ValueKind>,
        returns: Option<ValueKind>,
        func: F,
    ) -> Self
    where
        F: Fn(&[Value]) -> Result<Option<Value>, ScriptError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: String::new(),
            required,
            optional: Vec::new(),
            returns,
            func: Box::new(func),
        }
    }

    pub fn with_optional(mut self, optional: Vec<ValueKind>) -> Self {
        self.optional = optional;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl Method for NativeMethod {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn required(&self) -> &[ValueKind] {
        &self.required
    }

    fn optional(&self) -> &[ValueKind] {
        &self.optional
    }

    fn returns(&self) -> Option<ValueKind> {
        self.returns
    }

    fn invoke(&self, args: &[Value]) -> Result<Option<Value>, ScriptError> {
        (self.func)(args)
    }
}

impl fmt::Debug for NativeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeMethod")
            .field("name", &self.name)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .finish()
    }
}

/// A registered value type: its prototype value and a human description.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueType {
    pub prototype: Value,
    pub description: String,
}

impl ValueType {
    pub fn kind(&self) -> ValueKind {
        self.prototype.kind()
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValueLibrary {
    types: HashMap<String, ValueType>,
}

impl ValueLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the prototype under its kind's name.
    pub fn register(
        &mut self,
        prototype: Value,
        description: impl Into<String>,
    ) -> Result<(), ScriptError> {
        let key = prototype.kind().name().to_ascii_lowercase();
        if self.types.contains_key(&key) {
            return Err(ScriptError::DuplicateRegistration(prototype.kind().name().to_string()));
        }
        self.types.insert(
            key,
            ValueType {
                prototype,
                description: description.into(),
            },
        );
        Ok(())
    }

    pub fn supports(&self, name: &str) -> bool {
        self.types.contains_key(&name.trim().to_ascii_lowercase())
    }

    pub fn get(&self, name: &str) -> Result<&ValueType, ScriptError> {
        self.types
            .get(&name.trim().to_ascii_lowercase())
            .ok_or_else(|| ScriptError::UnsupportedType(name.trim().to_string()))
    }

    /// A fresh copy of the prototype registered under `name`.
    pub fn create(&self, name: &str) -> Result<Value, ScriptError> {
        self.get(name).map(|t| t.prototype.clone())
    }

    /// Registered types ordered by kind.
    pub fn types(&self) -> Vec<&ValueType> {
        let mut types: Vec<&ValueType> = self.types.values().collect();
        types.sort_by_key(|t| t.kind());
        types
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[derive(Default)]
pub struct MethodLibrary {
    methods: HashMap<String, Box<dyn Method>>,
}

impl MethodLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, method: Box<dyn Method>) -> Result<(), ScriptError> {
        let key = method.name().to_ascii_lowercase();
        if self.methods.contains_key(&key) {
            return Err(ScriptError::DuplicateRegistration(method.name().to_string()));
        }
        self.methods.insert(key, method);
        Ok(())
    }

    pub fn supports(&self, name: &str) -> bool {
        self.methods.contains_key(&name.trim().to_ascii_lowercase())
    }

    pub fn get(&self, name: &str) -> Result<&dyn Method, ScriptError> {
        self.methods
            .get(&name.trim().to_ascii_lowercase())
            .map(|m| m.as_ref())
            .ok_or_else(|| ScriptError::UnsupportedMethod(name.trim().to_string()))
    }

    /// Registered methods sorted by name.
    pub fn methods(&self) -> Vec<&dyn Method> {
        let mut methods: Vec<&dyn Method> = self.methods.values().map(|m| m.as_ref()).collect();
        methods.sort_by(|a, b| a.name().cmp(b.name()));
        methods
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl fmt::Debug for MethodLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.methods().iter().map(|m| m.name()))
            .finish()
    }
}
