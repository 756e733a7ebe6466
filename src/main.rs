use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use gcode_sl::{Language, ScriptParser, Value, ValueKind};

#[derive(Parser)]
#[command(name = "gcode")]
#[command(version)]
#[command(about = "gcode SL - run a line-oriented script one step at a time")]
struct Cli {
    /// Path to a .gcs script to run
    file: Option<PathBuf>,

    /// Seed an interactive variable, e.g. `--var speed=Int:10`
    #[arg(long = "var", value_name = "NAME=TYPE:VALUE", value_parser = parse_var)]
    vars: Vec<(String, Value)>,

    /// Give up after this many steps
    #[arg(long, default_value_t = 100_000)]
    max_steps: usize,

    /// Print each executed line number to stderr
    #[arg(long)]
    trace_lines: bool,

    /// Print the language manifest as JSON and exit
    #[arg(long)]
    describe: bool,

    /// Language name reported by --describe
    #[arg(long)]
    name: Option<String>,

    /// Log at debug level unless GCODE_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

fn parse_var(arg: &str) -> Result<(String, Value), String> {
    let (name, typed) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=TYPE:VALUE, got '{arg}'"))?;
    let (ty, raw) = typed
        .split_once(':')
        .ok_or_else(|| format!("expected TYPE:VALUE after '=', got '{typed}'"))?;
    let kind = ValueKind::from_name(ty).ok_or_else(|| format!("unknown type '{ty}'"))?;
    let value = Value::create(kind, raw).map_err(|e| e.to_string())?;
    Ok((name.trim().to_string(), value))
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("GCODE_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut language = Language::new()?;
    if let Some(name) = &cli.name {
        language.set_name(name)?;
    }

    if cli.describe {
        println!("{}", serde_json::to_string_pretty(&language.manifest())?);
        return Ok(());
    }

    let Some(file) = cli.file else {
        println!("gcode - run a script, e.g.: gcode demos/countdown.gcs --var start=Int:3");
        return Ok(());
    };
    let source = fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;

    let mut script = ScriptParser::from_source(Arc::new(language), &source);
    for (name, value) in cli.vars {
        script
            .add_interactive_variable(&name, value)
            .with_context(|| format!("seeding --var {name}"))?;
    }

    let mut steps = 0;
    while !script.is_done() {
        if steps >= cli.max_steps {
            bail!(
                "{}: stopped after {} steps (line {})",
                file.display(),
                steps,
                script.current_line().unwrap_or_default()
            );
        }
        script
            .step()
            .with_context(|| format!("running {}", file.display()))?;
        steps += 1;
        if cli.trace_lines {
            if let Some(line) = script.current_line() {
                eprintln!("line {line}");
            }
        }
    }
    tracing::debug!(steps, state = ?script.state(), "script finished");

    for (name, value) in script.interactive() {
        println!("{name} = {}", value.render_literal());
    }
    Ok(())
}
