//! Variable tables shared by a parser and its loop body.

use std::collections::BTreeMap;

use crate::error::ScriptError;
use crate::line::validate_name;
use crate::value::Value;

/// Local and interactive variables, keyed by lowercased name.
///
/// Interactive variables are seeded by the host and survive
/// [`reset_locals`](Env::reset_locals); locals belong to one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Env {
    locals: BTreeMap<String, Value>,
    interactive: BTreeMap<String, Value>,
}

fn key(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interactive variables shadow locals of the same name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let key = key(name);
        self.interactive.get(&key).or_else(|| self.locals.get(&key))
    }

    /// Overwrites an existing variable in whichever table holds it.
    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), ScriptError> {
        let key = key(name);
        let slot = match self.interactive.get_mut(&key) {
            Some(slot) => slot,
            None => self
                .locals
                .get_mut(&key)
                .ok_or_else(|| ScriptError::UnknownVariable(name.trim().to_string()))?,
        };
        if slot.kind() != value.kind() {
            return Err(ScriptError::TypeRedeclaration {
                name: key,
                declared: slot.kind(),
                requested: value.kind(),
            });
        }
        *slot = value;
        Ok(())
    }

    pub fn declare_local(&mut self, name: &str, value: Value) -> Result<(), ScriptError> {
        validate_name(name.trim())?;
        self.locals.insert(key(name), value);
        Ok(())
    }

    pub fn add_interactive(&mut self, name: &str, value: Value) -> Result<(), ScriptError> {
        validate_name(name.trim())?;
        let key = key(name);
        if self.interactive.contains_key(&key) {
            return Err(ScriptError::DuplicateVariable(name.trim().to_string()));
        }
        self.interactive.insert(key, value);
        Ok(())
    }

    pub fn get_interactive(&self, name: &str) -> Result<&Value, ScriptError> {
        self.interactive
            .get(&key(name))
            .ok_or_else(|| ScriptError::UnknownVariable(name.trim().to_string()))
    }

    /// Replaces an interactive variable's value; the kind cannot change.
    pub fn set_interactive(&mut self, name: &str, value: Value) -> Result<(), ScriptError> {
        let slot = self
            .interactive
            .get_mut(&key(name))
            .ok_or_else(|| ScriptError::UnknownVariable(name.trim().to_string()))?;
        if slot.kind() != value.kind() {
            return Err(ScriptError::TypeRedeclaration {
                name: key(name),
                declared: slot.kind(),
                requested: value.kind(),
            });
        }
        *slot = value;
        Ok(())
    }

    pub fn reset_locals(&mut self) {
        self.locals.clear();
    }

    pub fn locals(&self) -> &BTreeMap<String, Value> {
        &self.locals
    }

    pub fn interactive(&self) -> &BTreeMap<String, Value> {
        &self.interactive
    }

    /// Copies back values of every variable this env already knows from a
    /// loop body's env. Variables the body declared itself stay behind.
    pub fn absorb(&mut self, body: &Env) {
        for (name, value) in self.locals.iter_mut() {
            if let Some(updated) = body.locals.get(name) {
                value.clone_from(updated);
            }
        }
        for (name, value) in self.interactive.iter_mut() {
            if let Some(updated) = body.interactive.get(name) {
                value.clone_from(updated);
            }
        }
    }

    /// Variables in the order expressions substitute them: locals, then
    /// interactive, each table longest name first so that `count` is
    /// replaced before `c`.
    pub fn substitution_order(&self) -> Vec<(&str, &Value)> {
        let mut order = Vec::with_capacity(self.locals.len() + self.interactive.len());
        for table in [&self.locals, &self.interactive] {
            let mut entries: Vec<(&str, &Value)> =
                table.iter().map(|(k, v)| (k.as_str(), v)).collect();
            entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.0.cmp(b.0)));
            order.extend(entries);
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueKind;

    #[test]
    fn interactive_shadows_locals() {
        let mut env = Env::new();
        env.declare_local("speed", Value::Int(1)).unwrap();
        env.add_interactive("Speed", Value::Int(2)).unwrap();
        assert_eq!(env.get("SPEED"), Some(&Value::Int(2)));
        assert_eq!(env.locals().get("speed"), Some(&Value::Int(1)));
    }

    #[test]
    fn assign_keeps_kind() {
        let mut env = Env::new();
        env.declare_local("x", Value::Int(1)).unwrap();
        env.assign("X", Value::Int(5)).unwrap();
        assert_eq!(env.get("x"), Some(&Value::Int(5)));
        assert_eq!(
            env.assign("x", Value::from("five")),
            Err(ScriptError::TypeRedeclaration {
                name: "x".into(),
                declared: ValueKind::Int,
                requested: ValueKind::String,
            })
        );
        assert_eq!(
            env.assign("y", Value::Int(1)),
            Err(ScriptError::UnknownVariable("y".into()))
        );
    }

    #[test]
    fn interactive_registration_rules() {
        let mut env = Env::new();
        env.add_interactive("limit", Value::Int(3)).unwrap();
        assert_eq!(
            env.add_interactive("LIMIT", Value::Int(4)),
            Err(ScriptError::DuplicateVariable("LIMIT".into()))
        );
        assert!(matches!(
            env.add_interactive("not ok", Value::Int(1)),
            Err(ScriptError::InvalidVariableName(_))
        ));
        assert_eq!(
            env.get_interactive("missing"),
            Err(ScriptError::UnknownVariable("missing".into()))
        );
        env.set_interactive("limit", Value::Int(9)).unwrap();
        assert_eq!(env.get_interactive("limit"), Ok(&Value::Int(9)));
    }

    #[test]
    fn reset_keeps_interactive() {
        let mut env = Env::new();
        env.declare_local("a", Value::Bool(true)).unwrap();
        env.add_interactive("b", Value::Bool(false)).unwrap();
        env.reset_locals();
        assert!(env.locals().is_empty());
        assert_eq!(env.interactive().len(), 1);
    }

    #[test]
    fn absorb_copies_known_names_only() {
        let mut parent = Env::new();
        parent.declare_local("count", Value::Int(0)).unwrap();
        parent.add_interactive("total", Value::Int(0)).unwrap();

        let mut body = parent.clone();
        body.assign("count", Value::Int(1)).unwrap();
        body.assign("total", Value::Int(10)).unwrap();
        body.declare_local("scratch", Value::Int(7)).unwrap();

        parent.absorb(&body);
        assert_eq!(parent.get("count"), Some(&Value::Int(1)));
        assert_eq!(parent.get("total"), Some(&Value::Int(10)));
        assert_eq!(parent.get("scratch"), None);
    }

    #[test]
    fn substitution_order_is_locals_then_interactive_longest_first() {
        let mut env = Env::new();
        env.declare_local("c", Value::Int(1)).unwrap();
        env.declare_local("count", Value::Int(2)).unwrap();
        env.add_interactive("ab", Value::Int(3)).unwrap();
        let names: Vec<&str> = env.substitution_order().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["count", "c", "ab"]);
    }
}
