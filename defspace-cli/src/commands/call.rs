//! Call a definition from the command line.

use super::{open_space_with, SpaceOptions};
use anyhow::{bail, Result};
use defspace_core::{Binding, Diagnostic, DiagnosticSink};
use defspace_lang::{Args, Value};
use serde::Serialize;

#[derive(Serialize)]
struct CallReport {
    name: String,
    result: Option<String>,
    diagnostics: Vec<Diagnostic>,
}

pub fn call_definition(
    options: &SpaceOptions,
    name: &str,
    raw_args: &[String],
    json: bool,
) -> Result<()> {
    let sink = if json {
        DiagnosticSink::collecting()
    } else {
        DiagnosticSink::Stderr
    };
    let session = open_space_with(options, sink.clone())?;
    let args = parse_args(raw_args)?;

    let dotted = session.qualify(name).to_string();
    let Some(binding) = session.registry.binding(&dotted) else {
        bail!("Unknown definition: {}", dotted);
    };

    tracing::debug!("Calling {} with {} arguments", dotted, args.len());
    let result = match binding.definition()? {
        // Constants are printed as they are
        Some(value) if args.is_empty() && !value.is_callable() => value,
        Some(value) => value.call(args)?,
        None => {
            if let Binding::Deferred(deferred) = &binding {
                deferred.report_absent();
            }
            Value::None
        }
    };

    if json {
        let report = CallReport {
            name: dotted,
            result: if result.is_none() {
                None
            } else {
                Some(result.display()?)
            },
            diagnostics: sink.collected(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !result.is_none() {
        println!("{}", result.display()?);
    }
    Ok(())
}

/// Split command-line words into positional and keyword arguments.
///
/// `--key=value` is a keyword argument and a bare `--flag` passes `true`.
/// Everything after `--` is positional.
pub fn parse_args(raw: &[String]) -> Result<Args> {
    let mut args = Args::new();
    let mut rest_positional = false;

    for word in raw {
        if rest_positional {
            args.positional.push(parse_literal(word));
            continue;
        }
        if word == "--" {
            rest_positional = true;
            continue;
        }
        match word.strip_prefix("--") {
            Some(keyword) => {
                let (key, value) = match keyword.split_once('=') {
                    Some((key, value)) => (key, parse_literal(value)),
                    None => (keyword, Value::Bool(true)),
                };
                if key.is_empty() {
                    bail!("Invalid keyword argument: {}", word);
                }
                args.keywords.push((key.replace('-', "_"), value));
            }
            None => args.positional.push(parse_literal(word)),
        }
    }

    Ok(args)
}

/// Interpret one command-line word as a literal value
pub fn parse_literal(word: &str) -> Value {
    match word {
        "none" => return Value::None,
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(int) = word.parse::<i64>() {
        return Value::Int(int);
    }
    match word.parse::<f64>() {
        Ok(float) if float.is_finite() => Value::Float(float),
        _ => Value::str(word),
    }
}
