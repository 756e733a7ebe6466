use std::process::{Command, Stdio};

fn run_script(src: &str, args: &[&str]) -> (bool, String, String) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prog.gcs");
    std::fs::write(&path, src).unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_gcode"))
        .arg(&path)
        .args(args)
        .env_remove("GCODE_LOG")
        .stderr(Stdio::piped())
        .output()
        .expect("run");
    (
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    )
}

#[test]
fn seeded_variables_are_printed_after_the_run() {
    let program = "\
while: fuel > 0;
{
	declare: fuel = fuel - 1;
	declare: distance = distance + 2.5;
}
";
    let (ok, out, err) = run_script(
        program,
        &["--var", "fuel=Int:2", "--var", "distance=Double:0"],
    );
    assert!(ok, "run failed: {err}");
    assert_eq!(out, "distance = 5.0\nfuel = 0\n");
}

#[test]
fn printed_variables_use_literal_syntax() {
    let program = "declare: callsign = callsign + \"-1\";\ndeclare: armed = armed == false;\n";
    let (ok, out, err) = run_script(
        program,
        &["--var", "callsign=String:Eagle", "--var", "armed=Bool:true"],
    );
    assert!(ok, "run failed: {err}");
    assert_eq!(out, "armed = false\ncallsign = \"Eagle-1\"\n");
}

#[test]
fn message_box_prints_to_stdout() {
    let program = "\
declare: String who = \"world\";
execute: Generic.MessageBox(\"hello \" + who, \"greeting\");
";
    let (ok, out, err) = run_script(program, &[]);
    assert!(ok, "run failed: {err}");
    assert_eq!(out, "[greeting] hello world\n");
}

#[test]
fn errors_exit_nonzero_with_line_number() {
    let program = "declare: Int a = 1;\ndeclare: Int b = a + 1\n";
    let (ok, _out, err) = run_script(program, &[]);
    assert!(!ok, "expected failure");
    assert!(err.contains("line 2: statement must end with ';'"), "stderr: {err}");
}

#[test]
fn step_limit_stops_endless_loops() {
    let program = "while: true;\n{\n\tdeclare: Int spin = 0;\n}\n";
    let (ok, _out, err) = run_script(program, &["--max-steps", "50"]);
    assert!(!ok, "expected the step limit to trip");
    assert!(err.contains("stopped after 50 steps"), "stderr: {err}");
}

#[test]
fn trace_lines_reports_each_step() {
    let program = "declare: Int a = 1;\n\ndeclare: a = a + 1;\n";
    let (ok, _out, err) = run_script(program, &["--trace-lines"]);
    assert!(ok, "run failed: {err}");
    assert_eq!(err.lines().collect::<Vec<_>>(), vec!["line 1", "line 3"]);
}

#[test]
fn bad_var_argument_is_rejected() {
    let (ok, _out, err) = run_script("declare: Int a = 1;\n", &["--var", "speed=Float:1"]);
    assert!(!ok);
    assert!(err.contains("unknown type 'Float'"), "stderr: {err}");
}

#[test]
fn describe_prints_manifest_json() {
    let output = Command::new(env!("CARGO_BIN_EXE_gcode"))
        .args(["--describe", "--name", "Robot Script"])
        .output()
        .expect("run");
    assert!(output.status.success());
    let manifest: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("manifest is JSON");
    assert_eq!(manifest["name"], "Robot Script");
    assert_eq!(manifest["preceders"][2], "while");
    assert_eq!(manifest["types"].as_array().map(Vec::len), Some(4));
    let methods = manifest["methods"].as_array().expect("methods array");
    assert_eq!(methods.len(), 15);
    let convert = methods
        .iter()
        .find(|m| m["name"] == "Convert.IntToString")
        .expect("conversion listed");
    assert_eq!(convert["required"][0], "Int");
    assert_eq!(convert["returns"], "String");
}
