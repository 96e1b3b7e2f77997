//! jp - command-line JMESPath processor
//!
//! Evaluates an expression against JSON read from a file or stdin and
//! prints the result as JSON.

use anyhow::{Context, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};
use jmespath::{Rcvar, Variable};
use std::io::{self, Read};
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() {
    let matches = command().get_matches();
    init_tracing(matches.get_flag("verbose"));

    match run(&matches) {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("{e:#}");
            process::exit(1);
        }
    }
}

fn command() -> Command {
    Command::new("jp")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Command-line JMESPath processor")
        .arg(
            Arg::new("expression")
                .value_name("EXPRESSION")
                .help("JMESPath expression to evaluate")
                .index(1),
        )
        .arg(
            Arg::new("expr-file")
                .short('e')
                .long("expr-file")
                .value_name("FILE")
                .help("Read the expression from a file")
                .conflicts_with("expression")
                .num_args(1),
        )
        .arg(
            Arg::new("filename")
                .short('f')
                .long("filename")
                .value_name("FILE")
                .help("Read JSON input from a file instead of stdin")
                .num_args(1),
        )
        .arg(
            Arg::new("unquoted")
                .short('u')
                .long("unquoted")
                .help("Print string results without quotes")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("ast")
                .short('a')
                .long("ast")
                .help("Print the parsed AST instead of evaluating")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("compact")
                .short('c')
                .long("compact")
                .help("Print compact JSON")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log debug output to stderr")
                .action(ArgAction::SetTrue),
        )
}

/// `RUST_LOG` wins over the verbose flag
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(matches: &ArgMatches) -> anyhow::Result<String> {
    let expression = read_expression(
        matches.get_one::<String>("expression").map(String::as_str),
        matches.get_one::<String>("expr-file").map(String::as_str),
    )?;

    if matches.get_flag("ast") {
        let ast = jmespath::parse(&expression)?;
        return Ok(ast.to_string());
    }

    let input = match matches.get_one::<String>("filename") {
        Some(path) => read_file(path)?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read JSON from stdin")?;
            buffer
        }
    };

    let result = evaluate(&expression, &input)?;
    render(
        &result,
        matches.get_flag("unquoted"),
        matches.get_flag("compact"),
    )
}

fn read_expression(inline: Option<&str>, file: Option<&str>) -> anyhow::Result<String> {
    match (inline, file) {
        (_, Some(path)) => Ok(read_file(path)?.trim_end().to_string()),
        (Some(expression), None) => Ok(expression.to_string()),
        (None, None) => bail!("No expression provided: pass EXPRESSION or --expr-file"),
    }
}

fn read_file(path: &str) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))
}

fn evaluate(expression: &str, input: &str) -> anyhow::Result<Rcvar> {
    let expr = jmespath::compile(expression)?;
    let data = Variable::from_json(input)
        .map_err(|reason| anyhow::anyhow!("Invalid JSON input: {reason}"))?;
    debug!(expression, "Evaluating");
    Ok(expr.search(data)?)
}

fn render(result: &Rcvar, unquoted: bool, compact: bool) -> anyhow::Result<String> {
    if unquoted {
        if let Variable::String(s) = &**result {
            return Ok(s.clone());
        }
    }
    let json = if compact {
        serde_json::to_string(&**result)
    } else {
        serde_json::to_string_pretty(&**result)
    };
    json.context("Failed to serialize result")
}
