// Copyright 2018-2025 the Deno authors. MIT license.

use anyhow::Context;
use anyhow::Error;
use clap::ArgAction;
use clap::ArgGroup;
use clap::ArgMatches;
use clap::builder::Arg;
use clap::builder::Command;
use script_bridge::BridgeOptions;
use script_bridge::Exposable;
use script_bridge::Method;
use script_bridge::ScriptBridge;
use script_bridge::ScriptError;
use script_bridge::Value;
use serde::Serialize;
use std::path::PathBuf;
use std::rc::Rc;

fn main() {
  env_logger::init();

  let matches = build_cli().get_matches();
  let invocation = Invocation::from_matches(matches);

  match run(&invocation) {
    Ok(value) => {
      #[allow(clippy::print_stdout)]
      {
        println!("{}", to_pretty_json(&value));
      }
    }
    Err(err) => {
      let report = match err.downcast_ref::<ScriptError>() {
        Some(script_error) => to_pretty_json(&script_error.to_json()),
        None => format!("error: {err:?}"),
      };
      #[allow(clippy::print_stderr)]
      {
        eprintln!("{report}");
      }
      std::process::exit(1);
    }
  }
}

fn build_cli() -> Command {
  Command::new("jsb")
    .about("Evaluate JavaScript through a script bridge and print the result as JSON")
    .arg(
      Arg::new("eval")
        .short('e')
        .long("eval")
        .value_name("SOURCE")
        .help("Evaluate SOURCE instead of reading a file")
        .value_parser(clap::value_parser!(String)),
    )
    .arg(
      Arg::new("call")
        .long("call")
        .value_name("NAME")
        .help("After evaluating, call the global function NAME and print its result")
        .value_parser(clap::value_parser!(String)),
    )
    .arg(
      Arg::new("arg")
        .long("arg")
        .value_name("JSON")
        .help("A JSON argument for --call; may be repeated")
        .requires("call")
        .action(ArgAction::Append)
        .value_parser(parse_json_arg),
    )
    .arg(
      Arg::new("script-name")
        .long("script-name")
        .value_name("NAME")
        .help("Resource name used in stack traces (default: the file path)")
        .value_parser(clap::value_parser!(String)),
    )
    .arg(
      Arg::new("v8-flags")
        .long("v8-flags")
        .value_name("FLAGS")
        .help("Extra V8 flags, separated by commas")
        .value_delimiter(',')
        .allow_hyphen_values(true)
        .action(ArgAction::Append)
        .value_parser(clap::value_parser!(String)),
    )
    .arg(
      Arg::new("file_path")
        .help("A relative or absolute path to a script to evaluate")
        .value_hint(clap::ValueHint::FilePath)
        .value_parser(clap::value_parser!(PathBuf)),
    )
    .group(
      ArgGroup::new("source")
        .args(["eval", "file_path"])
        .required(true),
    )
}

fn parse_json_arg(arg: &str) -> Result<serde_json::Value, serde_json::Error> {
  serde_json::from_str(arg)
}

#[derive(Debug, PartialEq)]
enum Source {
  File(PathBuf),
  Inline(String),
}

#[derive(Debug, PartialEq)]
struct Invocation {
  source: Source,
  script_name: Option<String>,
  call: Option<(String, Vec<Value>)>,
  v8_flags: Vec<String>,
}

impl Invocation {
  fn from_matches(mut matches: ArgMatches) -> Self {
    let source = match matches.remove_one::<String>("eval") {
      Some(source) => Source::Inline(source),
      // The "source" group guarantees one of the two is present.
      None => Source::File(
        matches
          .remove_one::<PathBuf>("file_path")
          .unwrap_or_default(),
      ),
    };
    let call = matches.remove_one::<String>("call").map(|name| {
      let args = matches
        .remove_many::<serde_json::Value>("arg")
        .map(|args| args.map(Value::from).collect())
        .unwrap_or_default();
      (name, args)
    });
    Self {
      source,
      script_name: matches.remove_one::<String>("script-name"),
      call,
      v8_flags: matches
        .remove_many::<String>("v8-flags")
        .map(|flags| flags.collect())
        .unwrap_or_default(),
    }
  }
}

/// Exposed to scripts as `host`.
struct Host;

impl Exposable for Host {
  fn methods() -> Vec<Method<Self>> {
    vec![
      Method::new("js_log", 1, |_, args| {
        let message = match &args[0] {
          Value::String(s) => s.clone(),
          other => serde_json::to_string(other).unwrap_or_default(),
        };
        log::info!(target: "jsb::script", "{message}");
        Ok(Value::Undefined)
      }),
      Method::new("js_env", 1, |_, args| {
        let name = String::try_from(args[0].clone())?;
        Ok(std::env::var(name).ok().into())
      }),
    ]
  }
}

fn run(invocation: &Invocation) -> Result<Value, Error> {
  let (code, default_name) = match &invocation.source {
    Source::File(path) => (
      std::fs::read_to_string(path)
        .with_context(|| format!("Unable to read {}", path.display()))?,
      path.display().to_string(),
    ),
    Source::Inline(source) => (source.clone(), "<eval>".to_string()),
  };
  let script_name = invocation.script_name.clone().unwrap_or(default_name);

  let mut bridge = ScriptBridge::with_options(BridgeOptions {
    script_name,
    v8_flags: invocation.v8_flags.clone(),
    ..Default::default()
  });
  let host = Rc::new(Host);
  bridge.install(&host, "host")?;

  let value = bridge.evaluate(&code)?;
  match &invocation.call {
    Some((name, args)) => Ok(bridge.call(name, args)?),
    None => Ok(value),
  }
}

fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> String {
  serde_json::to_string_pretty(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn parse(args: &[&str]) -> Invocation {
    let matches = build_cli()
      .try_get_matches_from(std::iter::once("jsb").chain(args.iter().copied()))
      .unwrap();
    Invocation::from_matches(matches)
  }

  #[test]
  fn parses_call_with_json_arguments() {
    let invocation = parse(&[
      "-e",
      "function f(a, b) { return a.x + b }",
      "--call",
      "f",
      "--arg",
      r#"{"x": 1}"#,
      "--arg",
      "2",
    ]);
    assert_eq!(
      invocation,
      Invocation {
        source: Source::Inline("function f(a, b) { return a.x + b }".into()),
        script_name: None,
        call: Some((
          "f".into(),
          vec![
            vec![("x", Value::from(1))].into_iter().collect(),
            Value::from(2)
          ]
        )),
        v8_flags: vec![],
      }
    );
  }

  #[test]
  fn source_is_required_and_exclusive() {
    assert!(
      build_cli()
        .try_get_matches_from(["jsb", "--call", "f"])
        .is_err()
    );
    assert!(
      build_cli()
        .try_get_matches_from(["jsb", "main.js", "-e", "1"])
        .is_err()
    );
    assert!(
      build_cli()
        .try_get_matches_from(["jsb", "-e", "1", "--arg", "1"])
        .is_err()
    );
  }

  #[test]
  fn parses_file_and_flags() {
    let invocation = parse(&[
      "main.js",
      "--script-name",
      "app.js",
      "--v8-flags",
      "--stack-size=2000,--max-lazy",
    ]);
    assert_eq!(invocation.source, Source::File("main.js".into()));
    assert_eq!(invocation.script_name.as_deref(), Some("app.js"));
    assert_eq!(invocation.v8_flags, vec!["--stack-size=2000", "--max-lazy"]);
  }

  #[test]
  fn runs_inline_script_with_host() {
    let invocation = parse(&[
      "-e",
      "host.log('hi'); host.log({ a: 1 }); function f(a, b) { return [a, b, host.env('JSB_TEST_UNSET_VARIABLE')] }",
      "--call",
      "f",
      "--arg",
      "1",
      "--arg",
      r#""two""#,
    ]);
    let value = run(&invocation).unwrap();
    assert_eq!(
      value,
      Value::from(vec![Value::from(1), Value::from("two"), Value::Null])
    );
  }

  #[test]
  fn script_errors_are_reported_as_json() {
    let invocation = parse(&["-e", "throw new Error('boom')"]);
    let err = run(&invocation).unwrap_err();
    let script_error = err.downcast_ref::<ScriptError>().unwrap();
    let json = script_error.to_json();
    assert_eq!(json["kind"], "ExecutionError");
    assert_eq!(
      json[script_bridge::EXCEPTION_KEY]["resourceName"],
      "<eval>"
    );
  }

  #[test]
  fn missing_file_is_an_error() {
    let invocation = parse(&["/definitely/not/here.js"]);
    let err = run(&invocation).unwrap_err();
    assert!(err.to_string().contains("Unable to read"));
  }
}
