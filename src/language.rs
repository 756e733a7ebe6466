use std::sync::Arc;

use serde::Serialize;

use crate::builtins::{register_builtins, MessageSink, StdoutSink};
use crate::error::ScriptError;
use crate::library::{Method, MethodLibrary, ValueLibrary};
use crate::line::Preceder;
use crate::value::Value;

pub const DEFAULT_NAME: &str = "Scripting Language";

/// The value types and methods scripts can use, plus a display name.
///
/// A `Language` is built once, optionally extended by the host, then shared
/// (behind an `Arc`) by every parser that runs against it.
#[derive(Debug)]
pub struct Language {
    name: String,
    values: ValueLibrary,
    methods: MethodLibrary,
}

impl Language {
    /// The built-in language; `Generic.MessageBox` prints to stdout.
    pub fn new() -> Result<Self, ScriptError> {
        Self::with_message_sink(Arc::new(StdoutSink))
    }

    pub fn with_message_sink(sink: Arc<dyn MessageSink>) -> Result<Self, ScriptError> {
        let mut language = Self::empty(DEFAULT_NAME)?;
        register_builtins(&mut language.values, &mut language.methods, sink)?;
        Ok(language)
    }

    /// A language with no types or methods registered.
    pub fn empty(name: &str) -> Result<Self, ScriptError> {
        let mut language = Self {
            name: String::new(),
            values: ValueLibrary::new(),
            methods: MethodLibrary::new(),
        };
        language.set_name(name)?;
        Ok(language)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), ScriptError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ScriptError::BlankName);
        }
        self.name = name.to_string();
        Ok(())
    }

    pub fn register_method(&mut self, method: impl Method + 'static) -> Result<(), ScriptError> {
        self.methods.register(Box::new(method))
    }

    pub fn register_value(
        &mut self,
        prototype: Value,
        description: &str,
    ) -> Result<(), ScriptError> {
        self.values.register(prototype, description)
    }

    pub fn values(&self) -> &ValueLibrary {
        &self.values
    }

    pub fn methods(&self) -> &MethodLibrary {
        &self.methods
    }

    pub fn manifest(&self) -> LanguageManifest {
        LanguageManifest {
            name: self.name.clone(),
            preceders: Preceder::ALL.iter().map(|p| p.keyword()).collect(),
            types: self
                .values
                .types()
                .into_iter()
                .map(|t| TypeEntry {
                    name: t.name(),
                    description: t.description.clone(),
                })
                .collect(),
            methods: self
                .methods
                .methods()
                .into_iter()
                .map(|m| MethodEntry {
                    name: m.name().to_string(),
                    description: m.description().to_string(),
                    required: m.required().iter().map(|k| k.name()).collect(),
                    optional: m.optional().iter().map(|k| k.name()).collect(),
                    returns: m.returns().map(|k| k.name()),
                })
                .collect(),
        }
    }
}

/// Everything an editor or exporter needs to describe a [`Language`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageManifest {
    pub name: String,
    pub preceders: Vec<&'static str>,
    pub types: Vec<TypeEntry>,
    pub methods: Vec<MethodEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeEntry {
    pub name: &'static str,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodEntry {
    pub name: String,
    pub description: String,
    pub required: Vec<&'static str>,
    pub optional: Vec<&'static str>,
    pub returns: Option<&'static str>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::NativeMethod;
    use crate::value::ValueKind;

    #[test]
    fn default_language_has_builtins() {
        let lang = Language::new().unwrap();
        assert_eq!(lang.name(), DEFAULT_NAME);
        assert_eq!(lang.values().len(), 4);
        assert!(lang.methods().supports("Generic.RandomInt"));
    }

    #[test]
    fn blank_names_are_rejected() {
        let mut lang = Language::empty("Mini").unwrap();
        assert_eq!(lang.set_name("   "), Err(ScriptError::BlankName));
        assert_eq!(lang.name(), "Mini");
        assert!(Language::empty("").is_err());
    }

    #[test]
    fn manifest_lists_types_and_methods() {
        let mut lang = Language::new().unwrap();
        lang.register_method(
            NativeMethod::new("Robot.Move", vec![ValueKind::Int], None, |_| Ok(None))
                .with_optional(vec![ValueKind::Double])
                .with_description("Moves the robot."),
        )
        .unwrap();
        let manifest = lang.manifest();
        assert_eq!(manifest.preceders, vec!["declare", "execute", "while", "break"]);
        assert_eq!(
            manifest.types.iter().map(|t| t.name).collect::<Vec<_>>(),
            vec!["Bool", "Int", "Double", "String"]
        );
        let entry = manifest
            .methods
            .iter()
            .find(|m| m.name == "Robot.Move")
            .unwrap();
        assert_eq!(entry.required, vec!["Int"]);
        assert_eq!(entry.optional, vec!["Double"]);
        assert_eq!(entry.returns, None);
        assert_eq!(manifest.methods.len(), 16);

        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["name"], "Scripting Language");
    }
}
