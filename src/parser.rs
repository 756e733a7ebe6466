//! The single-step script interpreter.
//!
//! [`ScriptParser`] executes one meaningful line per [`step`](ScriptParser::step).
//! A `while:` line hands its `{ … }` block to an owned body parser; while that
//! body is active each parent step advances the body by one line, then copies
//! the body's variable values back and decides whether to run another pass.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{ScriptError, StepError};
use crate::eval::evaluate;
use crate::language::Language;
use crate::library::check_arity;
use crate::line::{self, clean_line, Preceder};
use crate::runtime::Env;
use crate::value::{Value, ValueKind};

/// Coarse lifecycle of a parser, for hosts that display progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptState {
    /// Nothing executed since construction or the last restart.
    Ready,
    Running,
    /// Ran past the last line.
    Completed,
    /// Stopped by a top-level `break:`.
    Broken,
    /// Stopped by an error.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Halt {
    Break,
    Failed,
}

/// A running `while` block.
#[derive(Debug)]
struct LoopFrame {
    /// Index of the `while:` line.
    entry: usize,
    /// Index of the first line after `{`.
    body_start: usize,
    /// Index of the first line after the matching `}`.
    resume: usize,
    body: ScriptParser,
}

#[derive(Debug)]
pub struct ScriptParser {
    language: Arc<Language>,
    lines: Vec<String>,
    /// Index of the next line to read.
    next: usize,
    /// Index of the line executed by the latest step.
    current: Option<usize>,
    env: Env,
    halt: Option<Halt>,
    nested: bool,
    active_loop: Option<Box<LoopFrame>>,
    loop_conditions: BTreeMap<usize, (Preceder, String)>,
}

/// Blank, comment-only and bare brace lines are never executed.
fn is_skippable(raw: &str) -> bool {
    matches!(clean_line(raw), "" | "{" | "}")
}

impl ScriptParser {
    pub fn new(language: Arc<Language>, lines: Vec<String>) -> Self {
        Self::with_env(language, lines, Env::new(), false)
    }

    pub fn from_source(language: Arc<Language>, source: &str) -> Self {
        Self::new(language, source.lines().map(str::to_string).collect())
    }

    fn with_env(language: Arc<Language>, lines: Vec<String>, env: Env, nested: bool) -> Self {
        let mut parser = Self {
            language,
            lines,
            next: 0,
            current: None,
            env,
            halt: None,
            nested,
            active_loop: None,
            loop_conditions: BTreeMap::new(),
        };
        parser.next = parser.next_meaningful(0);
        parser
    }

    fn next_meaningful(&self, from: usize) -> usize {
        (from..self.lines.len())
            .find(|&i| !is_skippable(&self.lines[i]))
            .unwrap_or(self.lines.len())
    }

    pub fn language(&self) -> &Arc<Language> {
        &self.language
    }

    pub fn is_done(&self) -> bool {
        self.halt.is_some() || (self.active_loop.is_none() && self.next >= self.lines.len())
    }

    pub fn state(&self) -> ScriptState {
        match self.halt {
            Some(Halt::Failed) => ScriptState::Failed,
            Some(Halt::Break) => ScriptState::Broken,
            None if self.is_done() => ScriptState::Completed,
            None if self.current.is_none() => ScriptState::Ready,
            None => ScriptState::Running,
        }
    }

    /// 1-based number of the line the latest step executed, looking through
    /// an active loop into its body.
    pub fn current_line(&self) -> Option<usize> {
        self.current.map(|i| i + 1)
    }

    pub fn total_lines(&self) -> usize {
        self.lines.len()
    }

    /// Back to the first line. Locals are dropped; interactive variables keep
    /// their current values.
    pub fn restart(&mut self) {
        self.current = None;
        self.halt = None;
        self.active_loop = None;
        self.loop_conditions.clear();
        self.env.reset_locals();
        self.next = self.next_meaningful(0);
    }

    /// Executes one line. Does nothing once the script is done.
    pub fn step(&mut self) -> Result<(), StepError> {
        if self.is_done() {
            return Ok(());
        }
        let result = if self.active_loop.is_some() {
            self.step_loop()
        } else {
            self.step_line()
        };
        if let Err(err) = &result {
            self.halt = Some(Halt::Failed);
            if !self.nested {
                warn!(line = err.line, code = err.category().code(), "{}", err.error);
            }
        }
        result
    }

    /// Up to `count` steps, stopping early when done.
    pub fn step_n(&mut self, count: usize) -> Result<(), StepError> {
        for _ in 0..count {
            if self.is_done() {
                break;
            }
            self.step()?;
        }
        Ok(())
    }

    /// Steps until done or `limit` steps have run; returns the steps taken.
    pub fn run(&mut self, limit: usize) -> Result<usize, StepError> {
        let mut steps = 0;
        while steps < limit && !self.is_done() {
            self.step()?;
            steps += 1;
        }
        Ok(steps)
    }

    fn step_line(&mut self) -> Result<(), StepError> {
        let index = self.next_meaningful(self.next);
        if index >= self.lines.len() {
            self.next = index;
            return Ok(());
        }
        self.current = Some(index);
        self.next = index + 1;
        let raw = self.lines[index].clone();
        self.execute_line(index, &raw)
            .map_err(|e| StepError::new(index + 1, e))?;
        if self.active_loop.is_none() {
            self.next = self.next_meaningful(self.next);
        }
        Ok(())
    }

    fn execute_line(&mut self, index: usize, raw: &str) -> Result<(), ScriptError> {
        let preceder = line::preceder(raw)?;
        let text = line::post_preceder(raw);
        debug!(line = index + 1, %preceder, nested = self.nested, "step");
        match preceder {
            Preceder::Declare => self.declare(text),
            Preceder::Execute => self.execute(text),
            Preceder::While => self.enter_loop(index, text),
            Preceder::Break => {
                self.halt = Some(Halt::Break);
                Ok(())
            }
        }
    }

    fn requested_kind(&self, ty: Option<&str>) -> Result<Option<ValueKind>, ScriptError> {
        ty.map(|t| self.language.values().get(t).map(|vt| vt.kind()))
            .transpose()
    }

    fn declare(&mut self, text: &str) -> Result<(), ScriptError> {
        let name = line::declared_name(text)?;
        let requested = self.requested_kind(line::declared_type(text)?)?;
        let expr = line::declared_expr(text)?;

        match self.env.get(name).map(Value::kind) {
            Some(existing) => {
                if let Some(requested) = requested.filter(|r| *r != existing) {
                    return Err(ScriptError::TypeRedeclaration {
                        name: name.to_string(),
                        declared: existing,
                        requested,
                    });
                }
                let value = evaluate(existing, expr, &self.env)?;
                self.env.assign(name, value)
            }
            None => {
                let kind = requested.ok_or_else(|| ScriptError::MissingType(name.to_string()))?;
                line::validate_name(name)?;
                let value = evaluate(kind, expr, &self.env)?;
                self.env.declare_local(name, value)
            }
        }
    }

    fn execute(&mut self, text: &str) -> Result<(), ScriptError> {
        let language = Arc::clone(&self.language);
        let method = language.methods().get(line::method_name(text)?)?;
        let raw_args = line::method_args(text)?;
        check_arity(method.name(), method.required(), method.optional(), raw_args.len())?;

        let mut args = Vec::with_capacity(raw_args.len());
        for (index, raw) in raw_args.iter().enumerate() {
            let kind = method.param_kind(index).unwrap_or(ValueKind::String);
            args.push(evaluate(kind, raw, &self.env)?);
        }
        let returned = method.call(&args)?;

        let Some((ty, target)) = line::call_target(text)? else {
            return Ok(());
        };
        let value = returned.ok_or_else(|| ScriptError::NoReturnValue(method.name().to_string()))?;
        let requested = self.requested_kind(ty)?;
        let mismatch = |declared: ValueKind| ScriptError::ReturnTypeMismatch {
            name: target.to_string(),
            method: method.name().to_string(),
            declared,
            returned: value.kind(),
        };

        match self.env.get(target).map(Value::kind) {
            Some(existing) => {
                if let Some(requested) = requested.filter(|r| *r != existing) {
                    return Err(ScriptError::TypeRedeclaration {
                        name: target.to_string(),
                        declared: existing,
                        requested,
                    });
                }
                if value.kind() != existing {
                    return Err(mismatch(existing));
                }
                self.env.assign(target, value)
            }
            None => {
                if let Some(requested) = requested.filter(|r| *r != value.kind()) {
                    return Err(mismatch(requested));
                }
                self.env.declare_local(target, value)
            }
        }
    }

    fn enter_loop(&mut self, index: usize, text: &str) -> Result<(), ScriptError> {
        if self.nested || self.active_loop.is_some() {
            return Err(ScriptError::NestedLoop);
        }
        let condition = text.strip_suffix(line::LINE_END).unwrap_or(text).trim();
        let (open, close) = self.scan_block(index)?;

        if !self.condition_holds(condition)? {
            debug!(line = index + 1, "loop skipped");
            self.next = close + 1;
            return Ok(());
        }

        debug!(line = index + 1, body = close - open - 1, "loop entered");
        self.loop_conditions
            .insert(index, (Preceder::While, condition.to_string()));
        let body = Self::with_env(
            Arc::clone(&self.language),
            self.lines[open + 1..close].to_vec(),
            self.env.clone(),
            true,
        );
        self.active_loop = Some(Box::new(LoopFrame {
            entry: index,
            body_start: open + 1,
            resume: close + 1,
            body,
        }));
        self.next = close + 1;
        Ok(())
    }

    /// Finds the `{` following a `while:` line and its matching `}`.
    fn scan_block(&self, entry: usize) -> Result<(usize, usize), ScriptError> {
        let open = (entry + 1..self.lines.len())
            .find(|&i| !clean_line(&self.lines[i]).is_empty())
            .filter(|&i| clean_line(&self.lines[i]) == "{")
            .ok_or(ScriptError::MissingOpenBrace)?;

        let mut depth = 0usize;
        for (i, raw) in self.lines.iter().enumerate().skip(open) {
            match clean_line(raw) {
                "{" => depth += 1,
                "}" => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok((open, i));
                    }
                }
                _ => {}
            }
        }
        Err(ScriptError::UnmatchedBraces)
    }

    fn condition_holds(&self, condition: &str) -> Result<bool, ScriptError> {
        match evaluate(ValueKind::Bool, condition, &self.env)? {
            Value::Bool(b) => Ok(b),
            other => Err(ScriptError::OperandType {
                expected: ValueKind::Bool,
                found: other.kind(),
            }),
        }
    }

    fn step_loop(&mut self) -> Result<(), StepError> {
        let Some(mut frame) = self.active_loop.take() else {
            return Ok(());
        };
        let stepped = frame.body.step();
        self.env.absorb(&frame.body.env);
        if let Some(current) = frame.body.current {
            self.current = Some(frame.body_start + current);
        }
        if let Err(err) = stepped {
            return Err(StepError::new(err.line + frame.body_start, err.error));
        }
        if !frame.body.is_done() {
            self.active_loop = Some(frame);
            return Ok(());
        }

        if frame.body.halt == Some(Halt::Break) {
            debug!(line = frame.entry + 1, "loop broken");
            self.exit_loop(&frame);
            return Ok(());
        }

        let condition = self
            .loop_conditions
            .get(&frame.entry)
            .map(|(_, text)| text.clone())
            .unwrap_or_default();
        let again = self
            .condition_holds(&condition)
            .map_err(|e| StepError::new(frame.entry + 1, e))?;
        if again {
            debug!(line = frame.entry + 1, "loop restarted");
            frame.body.restart();
            frame.body.env = self.env.clone();
            self.active_loop = Some(frame);
        } else {
            debug!(line = frame.entry + 1, "loop finished");
            self.exit_loop(&frame);
        }
        Ok(())
    }

    fn exit_loop(&mut self, frame: &LoopFrame) {
        self.next = self.next_meaningful(frame.resume);
    }

    /// Registers a host variable the script can read and write. Fails if the
    /// name is taken or not a valid variable name.
    pub fn add_interactive_variable(
        &mut self,
        name: &str,
        value: Value,
    ) -> Result<(), ScriptError> {
        self.env.add_interactive(name, value.clone())?;
        if let Some(frame) = self.active_loop.as_mut() {
            frame.body.add_interactive_variable(name, value)?;
        }
        Ok(())
    }

    pub fn get_interactive_variable(&self, name: &str) -> Result<&Value, ScriptError> {
        self.env.get_interactive(name)
    }

    pub fn set_interactive_variable(
        &mut self,
        name: &str,
        value: Value,
    ) -> Result<(), ScriptError> {
        self.env.set_interactive(name, value.clone())?;
        if let Some(frame) = self.active_loop.as_mut() {
            frame.body.set_interactive_variable(name, value)?;
        }
        Ok(())
    }

    /// Any visible variable, interactive first.
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.env.get(name)
    }

    pub fn locals(&self) -> &BTreeMap<String, Value> {
        self.env.locals()
    }

    pub fn interactive(&self) -> &BTreeMap<String, Value> {
        self.env.interactive()
    }
}
