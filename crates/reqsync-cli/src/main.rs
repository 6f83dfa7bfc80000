//! `reqsync` command-line tool

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;

fn cli() -> Command {
    let file = Arg::new("file")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Requirements document");
    let json = Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Output as JSON");

    Command::new("reqsync")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Validate requirements documents and synchronize them into tasks")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Debug logging (RUST_LOG takes precedence)"),
        )
        .subcommand(
            Command::new("validate")
                .about("Extract and validate a document")
                .arg(file.clone())
                .arg(json.clone()),
        )
        .subcommand(
            Command::new("plan")
                .about("Show the tasks a sync would create")
                .arg(file.clone())
                .arg(json.clone()),
        )
        .subcommand(
            Command::new("sync")
                .about("Synchronize a validated document against the simulated task service")
                .arg(file)
                .arg(json)
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML configuration file"),
                )
                .arg(
                    Arg::new("fail-every")
                        .long("fail-every")
                        .default_value("0")
                        .value_parser(value_parser!(u64))
                        .help("Make every Nth remote call fail (0 disables)"),
                )
                .arg(
                    Arg::new("fail-status")
                        .long("fail-status")
                        .default_value("503")
                        .value_parser(value_parser!(u16))
                        .help("Status returned by injected failures"),
                ),
        )
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(matches: &ArgMatches) -> anyhow::Result<ExitCode> {
    match matches.subcommand() {
        Some(("validate", args)) => commands::validate(&file_arg(args)?, args.get_flag("json")),
        Some(("plan", args)) => commands::plan(&file_arg(args)?, args.get_flag("json")),
        Some(("sync", args)) => {
            let options = commands::SyncArgs {
                file: file_arg(args)?,
                config: args.get_one::<PathBuf>("config").cloned(),
                fail_every: args.get_one::<u64>("fail-every").copied().unwrap_or(0),
                fail_status: args.get_one::<u16>("fail-status").copied().unwrap_or(503),
                json: args.get_flag("json"),
            };
            commands::sync(&options).await
        }
        _ => Ok(ExitCode::SUCCESS),
    }
}

fn file_arg(args: &ArgMatches) -> anyhow::Result<PathBuf> {
    args.get_one::<PathBuf>("file")
        .cloned()
        .context("missing document path")
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("verbose"));

    match run(&matches).await {
        Ok(code) => code,
        Err(err) => {
            let input = matches
                .subcommand()
                .and_then(|(_, args)| args.get_one::<PathBuf>("file"));
            eprintln!("{}", commands::failure_report(&err, input.map(PathBuf::as_path)));
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn parses_sync_options() {
        let matches = cli()
            .try_get_matches_from([
                "reqsync", "--verbose", "sync", "doc.md", "--config", "sync.toml", "--fail-every", "3",
            ])
            .unwrap();
        assert!(matches.get_flag("verbose"));
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "sync");
        assert_eq!(args.get_one::<u64>("fail-every"), Some(&3));
        assert_eq!(args.get_one::<u16>("fail-status"), Some(&503));
        assert_eq!(
            args.get_one::<PathBuf>("config"),
            Some(&PathBuf::from("sync.toml"))
        );
    }

    #[test]
    fn subcommand_is_required() {
        assert!(cli().try_get_matches_from(["reqsync"]).is_err());
    }
}
