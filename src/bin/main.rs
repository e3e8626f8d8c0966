//! jail command-line entry point

use console::style;
use jail::{Cli, InvocationRequest, JailError, Stage, controller, logging};
use std::ffi::OsString;

fn main() {
    let argv: Vec<OsString> = std::env::args_os().collect();
    std::process::exit(run(argv));
}

fn run(argv: Vec<OsString>) -> i32 {
    let cli = match Cli::parse_args(argv.clone()) {
        Ok(Some(cli)) => cli,
        Ok(None) => return 0,
        Err(e) => {
            report(&e);
            return 1;
        }
    };

    let stage = Stage::current();
    logging::init_logger(cli.verbose, stage);

    let cwd = match std::env::current_dir() {
        Ok(cwd) => cwd,
        Err(e) => {
            report(&JailError::Io(e));
            return 1;
        }
    };

    let request = match InvocationRequest::from_cli(&cli, &cwd) {
        Ok(request) => request,
        Err(e) => {
            report(&e);
            return 1;
        }
    };

    match controller::run(stage, &request, argv) {
        Ok(code) => code,
        Err(e) => {
            report(&e);
            1
        }
    }
}

fn report(err: &JailError) {
    match err {
        JailError::Usage(rendered) => {
            eprint!("{}", rendered);
            if !rendered.contains("Usage:") {
                eprintln!("\n{}", Cli::usage());
            }
        }
        JailError::NoCommand => {
            eprintln!("{} {}", style("error:").red().bold(), err);
            eprintln!("\n{}", Cli::usage());
        }
        _ => eprintln!("{} {}", style("error:").red().bold(), err),
    }
}
