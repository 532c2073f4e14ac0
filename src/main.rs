use std::future::Future;

use clap::{App, AppSettings, Arg};
use log::debug;

use cloud_deploy::{
    bail,
    commands::{commands, Command},
    term::print_error,
    Error, ErrorKind, Result,
};

const EXIT_FAILURE: i32 = 1;
const EXIT_INTERRUPTED: i32 = 130;

fn main() {
    let commands = commands();

    let matches = App::new("cloud-deploy")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Deploy container services and edge functions to AWS")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .setting(AppSettings::VersionlessSubcommands)
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .global(true)
                .help("Print debug information verbosely"),
        )
        .subcommands(commands.iter().map(|command| command.subcommand()))
        .get_matches();

    let default_filter = if matches.is_present("verbose") {
        "warn,cloud_deploy=debug"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(err) = run(&commands, &matches) {
        print_error(&err);

        std::process::exit(exit_code(&err));
    }
}

fn exit_code(err: &Error) -> i32 {
    match err.kind() {
        ErrorKind::Interrupted => EXIT_INTERRUPTED,
        _ => EXIT_FAILURE,
    }
}

/// Runs `command` until it completes or `shutdown` resolves, whichever comes
/// first. The command is dropped when interrupted.
async fn supervise<C, S>(name: &str, command: C, shutdown: S) -> Result<()>
where
    C: Future<Output = Result<()>>,
    S: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        result = command => result,
        signal = shutdown => match signal {
            Ok(()) => Err(Error::new(format!("`{}` was interrupted", name))
                .with_kind(ErrorKind::Interrupted)
                .with_explanation(
                    "The deployment was stopped part-way: the steps already performed are not reverted.",
                )),
            Err(err) => Err(Error::new("failed to listen for Ctrl-C")
                .with_kind(ErrorKind::Io)
                .with_source(err)),
        },
    }
}

fn run(commands: &[Box<dyn Command>], matches: &clap::ArgMatches) -> Result<()> {
    let (name, command_matches) = match matches.subcommand() {
        (name, Some(command_matches)) => (name, command_matches),
        _ => bail!("no command specified"),
    };

    let command = match commands.iter().find(|command| command.name() == name) {
        Some(command) => command,
        None => bail!("unknown command `{}`", name),
    };

    let raw = command.raw_options(command_matches)?;

    debug!("Running `{}`", name);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| {
            Error::new("failed to start the async runtime")
                .with_kind(ErrorKind::Io)
                .with_source(err)
        })?;

    runtime.block_on(supervise(name, command.run(raw), tokio::signal::ctrl_c()))
}
