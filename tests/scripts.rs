//! Scripts driven through the public library API, the way a host embeds them.
use std::sync::Arc;

use gcode_sl::eval::evaluate;
use gcode_sl::{
    ErrorCategory, Env, Language, MessageLog, NativeMethod, ScriptError, ScriptParser, ScriptState,
    Value, ValueKind,
};

fn language() -> Arc<Language> {
    Arc::new(Language::with_message_sink(Arc::new(MessageLog::new())).unwrap())
}

fn finish(parser: &mut ScriptParser) -> usize {
    let mut steps = 0;
    while !parser.is_done() {
        parser.step().unwrap();
        steps += 1;
        assert!(steps < 10_000, "script did not finish");
    }
    steps
}

#[test]
fn expression_properties() {
    let env = Env::new();
    assert_eq!(evaluate(ValueKind::Int, "2 + 3 * 4", &env), Ok(Value::Int(14)));
    assert_eq!(evaluate(ValueKind::Int, "-5", &env), Ok(Value::Int(-5)));
    assert_eq!(
        evaluate(ValueKind::String, "\"a\" + \"b\"", &env),
        Ok(Value::from("ab"))
    );
    assert!(matches!(
        evaluate(ValueKind::String, "\"a\" - \"b\"", &env),
        Err(ScriptError::UnsupportedStringOperator(_))
    ));
    assert_eq!(
        evaluate(ValueKind::Bool, "1 < 2 && 3 > 2", &env),
        Ok(Value::Bool(true))
    );
    assert_eq!(
        evaluate(ValueKind::Bool, "1 == 1 || 0 == 1", &env),
        Ok(Value::Bool(true))
    );
}

#[test]
fn conversion_result_lands_in_new_local() {
    let mut p = ScriptParser::from_source(
        language(),
        "declare: Int x = 5;\nexecute: y = Convert.IntToString(x);",
    );
    finish(&mut p);
    assert_eq!(p.variable("y"), Some(&Value::from("5")));
    assert_eq!(p.locals().get("y"), Some(&Value::from("5")));
}

#[test]
fn counting_loop_terminates_at_three() {
    let src = "\
declare: Int count = 0;
while: count < 3;
{
    declare: count = count + 1;
}
";
    let mut p = ScriptParser::from_source(language(), src);
    let steps = finish(&mut p);
    assert!(steps <= 10);
    assert_eq!(p.variable("count"), Some(&Value::Int(3)));
    assert_eq!(p.state(), ScriptState::Completed);
}

#[test]
fn break_is_not_undone_by_a_true_condition() {
    let src = "\
declare: Int passes = 0;
while: passes < 100;
{
    declare: passes = passes + 1;
    break:
}
";
    let mut p = ScriptParser::from_source(language(), src);
    finish(&mut p);
    assert_eq!(p.variable("passes"), Some(&Value::Int(1)));
}

#[test]
fn restart_is_idempotent() {
    let src = "\
declare: Int a = 1;
declare: Double b = 0.5;
while: a < 20;
{
    declare: a = a * 2 + 1;
    declare: b = b * 2;
}
execute: String c = Convert.DoubleToString(b);
";
    let mut p = ScriptParser::from_source(language(), src);
    p.add_interactive_variable("seed", Value::Int(7)).unwrap();
    finish(&mut p);
    let locals = p.locals().clone();
    let interactive = p.interactive().clone();
    assert_eq!(locals.get("a"), Some(&Value::Int(31)));
    assert_eq!(locals.get("c"), Some(&Value::from("8")));

    p.restart();
    finish(&mut p);
    assert_eq!(p.locals(), &locals);
    assert_eq!(p.interactive(), &interactive);
}

#[test]
fn missing_semicolon_names_its_line() {
    let src = "declare: Int a = 1;\n\n// note\nexecute: Generic.MessageBox(\"x\")\n";
    let mut p = ScriptParser::from_source(language(), src);
    p.step().unwrap();
    let err = p.step().unwrap_err();
    assert_eq!(err.line, 4);
    assert_eq!(err.category(), ErrorCategory::Lexical);
    assert_eq!(p.state(), ScriptState::Failed);
}

#[test]
fn loop_errors_are_terminal_and_line_tagged() {
    let src = "\
declare: Int n = 0;
while: n < 5;
{
    declare: n = n + 1;
    execute: Int shown = Convert.IntToString(n);
}
";
    let mut p = ScriptParser::from_source(language(), src);
    let err = loop {
        if let Err(err) = p.step() {
            break err;
        }
        assert!(!p.is_done(), "expected an error before finishing");
    };
    assert_eq!(err.line, 5);
    assert_eq!(err.category(), ErrorCategory::TypeMismatch);
    assert!(p.is_done());
    // the increment before the failure already reached the parent
    assert_eq!(p.variable("n"), Some(&Value::Int(1)));
}

#[test]
fn host_variables_are_read_and_written_between_steps() {
    let src = "declare: speed = speed * 2;\ndeclare: speed = speed + 1;";
    let mut p = ScriptParser::from_source(language(), src);
    p.add_interactive_variable("Speed", Value::Int(10)).unwrap();
    p.step().unwrap();
    assert_eq!(p.get_interactive_variable("speed"), Ok(&Value::Int(20)));
    p.set_interactive_variable("speed", Value::Int(100)).unwrap();
    p.step().unwrap();
    assert_eq!(p.get_interactive_variable("SPEED"), Ok(&Value::Int(101)));

    assert_eq!(
        p.add_interactive_variable("speed", Value::Int(1)),
        Err(ScriptError::DuplicateVariable("speed".into()))
    );
    assert_eq!(
        p.set_interactive_variable("missing", Value::Int(1)),
        Err(ScriptError::UnknownVariable("missing".into()))
    );
}

#[test]
fn host_registered_methods_are_callable() {
    let log = MessageLog::new();
    let mut lang = Language::with_message_sink(Arc::new(log.clone())).unwrap();
    lang.register_method(
        NativeMethod::new(
            "Math.Max",
            vec![ValueKind::Int, ValueKind::Int],
            Some(ValueKind::Int),
            |args| match args {
                [Value::Int(a), Value::Int(b)] => Ok(Some(Value::Int(*a.max(b)))),
                _ => Ok(None),
            },
        )
        .with_description("Larger of two integers."),
    )
    .unwrap();

    let src = "\
execute: Int best = Math.Max(3 * 3, 2 + 5);
execute: String shown = Convert.IntToString(best);
execute: Generic.MessageBox(\"best \" + shown, \"max\");
";
    let mut p = ScriptParser::from_source(Arc::new(lang), src);
    finish(&mut p);
    assert_eq!(p.variable("best"), Some(&Value::Int(9)));
    let messages = log.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].text, "best 9");
    assert_eq!(messages[0].title.as_deref(), Some("max"));
}

#[test]
fn unknown_method_and_type_are_reported() {
    let mut p = ScriptParser::from_source(language(), "execute: Robot.Fly(1);");
    assert_eq!(
        p.step().unwrap_err().error,
        ScriptError::UnsupportedMethod("Robot.Fly".into())
    );
    let mut p = ScriptParser::from_source(language(), "declare: Float f = 1.5;");
    assert_eq!(
        p.step().unwrap_err().error,
        ScriptError::UnsupportedType("Float".into())
    );
}

#[test]
fn host_reads_typed_results_and_seeds_defaults() {
    let src = "\
declare: Int laps = laps + 3;
declare: Double pace = 7.5 / 2;
declare: Bool fast = pace < 4;
execute: String label = Convert.IntToString(laps);
";
    let mut p = ScriptParser::from_source(language(), src);
    let seed = p.language().values().create("INT").unwrap();
    assert_eq!(seed, Value::Int(0));
    p.add_interactive_variable("laps", seed).unwrap();
    assert_eq!(
        p.language().values().create("Float"),
        Err(ScriptError::UnsupportedType("Float".into()))
    );
    finish(&mut p);

    assert_eq!(p.variable("laps").and_then(Value::as_int), Some(3));
    assert_eq!(p.variable("pace").and_then(Value::as_double), Some(3.75));
    assert_eq!(p.variable("fast").and_then(Value::as_bool), Some(true));
    assert_eq!(p.variable("label").and_then(Value::as_str), Some("3"));
    assert_eq!(p.variable("label").and_then(Value::as_int), None);
}
