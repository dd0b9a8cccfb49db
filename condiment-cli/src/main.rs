//! Command-line interface for condiment
//! This binary resolves guarded blocks in a source file against the environment.
//!
//! Usage:
//!   condiment `<source>`                       - Rewrite to stdout
//!   condiment `<source>` -o `<output>`         - Rewrite to a file
//!   condiment `<source>` --exec [interpreter]  - Rewrite to a side file, run it, delete it
//!   condiment `<source>` --flags json|shell    - Print the resolved flags only

use clap::{Arg, ArgAction, ArgMatches, Command};
use condiment::condiment::{
    install, rewrite, BindingsFormat, BindingsHost, Destination, InstallOptions, InstallOutcome,
    Preprocessor, ProcessEnvironment, ProcessHost,
};
use condiment_config::{CondimentConfig, Loader, PROJECT_CONFIG};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let matches = build_command().get_matches();
    match run(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("Error: {}", message);
            ExitCode::FAILURE
        }
    }
}

fn build_command() -> Command {
    Command::new("condiment")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Include or remove guarded source blocks according to the environment")
        .arg_required_else_help(true)
        .arg(
            Arg::new("source")
                .help("Path to the source file")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .help("Write the rewritten source to this file instead of stdout"),
        )
        .arg(
            Arg::new("prefix")
                .long("prefix")
                .short('p')
                .help("Identifier prefix that marks a flag (default: WITH_)"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Configuration file layered over ./condiment.toml"),
        )
        .arg(
            Arg::new("strict-exclude")
                .long("strict-exclude")
                .help("Fail on #exclude without a matching #endexclude")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-trailer")
                .long("no-trailer")
                .help("Do not append the flag trailer")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("exec")
                .long("exec")
                .short('x')
                .help("Run the rewritten source with an interpreter (default from config)")
                .num_args(0..=1)
                .default_missing_value("")
                .value_name("INTERPRETER")
                .conflicts_with("flags"),
        )
        .arg(
            Arg::new("flags")
                .long("flags")
                .help("Only resolve flags and print them")
                .value_parser(["json", "shell"]),
        )
}

/// Layer config files and command-line overrides.
fn load_config(matches: &ArgMatches) -> Result<CondimentConfig, String> {
    let mut loader = Loader::new().with_optional_file(PROJECT_CONFIG);
    if let Some(path) = matches.get_one::<String>("config") {
        loader = loader.with_file(path);
    }
    if let Some(prefix) = matches.get_one::<String>("prefix") {
        loader = loader
            .set_override("flags.prefix", prefix.as_str())
            .map_err(|e| e.to_string())?;
    }
    if matches.get_flag("strict-exclude") {
        loader = loader
            .set_override("parsing.strict_exclude", true)
            .map_err(|e| e.to_string())?;
    }
    if matches.get_flag("no-trailer") {
        loader = loader
            .set_override("rewrite.trailer", false)
            .map_err(|e| e.to_string())?;
    }
    loader
        .build()
        .map_err(|e| format!("Invalid configuration: {}", e))
}

fn run(matches: &ArgMatches) -> Result<(), String> {
    let config = load_config(matches)?;
    let source = matches
        .get_one::<String>("source")
        .map(PathBuf::from)
        .ok_or("source is required")?;
    let output = matches.get_one::<String>("output").map(PathBuf::from);

    if let Some(format) = matches.get_one::<String>("flags") {
        return handle_flags_command(&config, source, format);
    }
    if let Some(interpreter) = matches.get_one::<String>("exec") {
        let interpreter = if interpreter.is_empty() {
            config.exec.interpreter.as_str()
        } else {
            interpreter.as_str()
        };
        return handle_exec_command(&config, source, output, interpreter);
    }
    handle_rewrite_command(&config, source, output)
}

/// Rewrite to stdout or to `--output`
fn handle_rewrite_command(
    config: &CondimentConfig,
    source: PathBuf,
    output: Option<PathBuf>,
) -> Result<(), String> {
    let preprocessor = Preprocessor::new(config.parse_options());
    let destination = output.map_or(Destination::Stdout, Destination::File);
    rewrite(
        &preprocessor,
        &source,
        &destination,
        &config.rewrite_options(),
    )
    .map(|_| ())
    .map_err(|e| e.to_string())
}

/// Install-style run through an external interpreter
fn handle_exec_command(
    config: &CondimentConfig,
    source: PathBuf,
    output: Option<PathBuf>,
    interpreter: &str,
) -> Result<(), String> {
    let options = InstallOptions {
        parse: config.parse_options(),
        rewrite: config.rewrite_options(),
        input: None,
        output: output.map(Destination::File),
    };
    let mut host = ProcessHost::new(interpreter)
        .map_err(|e| e.to_string())?
        .with_caller(source);
    let installation =
        install(&options, ProcessEnvironment, &mut host).map_err(|e| e.to_string())?;
    tracing::debug!(outcome = ?installation.outcome, flags = installation.flags.len(), "install finished");
    match installation.outcome {
        InstallOutcome::Exit | InstallOutcome::Executed | InstallOutcome::Written => Ok(()),
        InstallOutcome::Injected => Err("interpreter host unexpectedly injected flags".to_string()),
    }
}

/// Inject mode: print the resolved flags
fn handle_flags_command(
    config: &CondimentConfig,
    source: PathBuf,
    format: &str,
) -> Result<(), String> {
    let format = match format {
        "json" => BindingsFormat::Json,
        "shell" => BindingsFormat::Shell,
        other => return Err(format!("Unknown flags format '{}'", other)),
    };
    let options = InstallOptions {
        parse: config.parse_options(),
        rewrite: config.rewrite_options(),
        input: Some(source),
        output: None,
    };
    let stdout = std::io::stdout();
    let mut host = BindingsHost::new(stdout.lock(), format);
    install(&options, ProcessEnvironment, &mut host)
        .map(|_| ())
        .map_err(|e| e.to_string())
}
