use log::{LevelFilter, error};
use soc::{Soc, ahb::DevMem, logging};
use std::{env, io, process::ExitCode};

const DEFAULT_MEM: &str = "/dev/mem";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    List,
    Probe(Option<String>),
    Help,
}

#[derive(Debug)]
struct Options {
    level: LevelFilter,
    mem: String,
    command: Command,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Options, String> {
    let mut verbosity = 0;
    let mut quiet = false;
    let mut mem = String::from(DEFAULT_MEM);
    let mut positional = vec![];
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-v" => verbosity += 1,
            "-vv" => verbosity += 2,
            "-q" => quiet = true,
            "-h" | "--help" => positional.insert(0, String::from("help")),
            "--mem" => mem = args.next().ok_or("--mem needs a path")?,
            flag if flag.starts_with('-') => return Err(format!("unknown option '{}'", flag)),
            _ => positional.push(arg),
        }
    }
    let level = match (quiet, verbosity) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Warn,
        (false, 1) => LevelFilter::Info,
        (false, 2) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    };
    let mut positional = positional.into_iter();
    let command = match positional.next().as_deref() {
        None | Some("help") => Command::Help,
        Some("list") => Command::List,
        Some("probe") => Command::Probe(positional.next()),
        Some(other) => return Err(format!("unknown command '{}'", other)),
    };
    if let Some(extra) = positional.next() {
        return Err(format!("unexpected argument '{}'", extra));
    }
    Ok(Options {
        level,
        mem,
        command,
    })
}

fn print_help() {
    println!(
        "bridge-audit usage:\n  bridge-audit [-v|-vv|-q] [--mem PATH] list\n  bridge-audit [-v|-vv|-q] [--mem PATH] probe [NAME]"
    );
}

fn main() -> ExitCode {
    let options = match parse_args(env::args().skip(1)) {
        Ok(options) => options,
        Err(msg) => {
            eprintln!("bridge-audit: {}", msg);
            print_help();
            return ExitCode::from(2);
        }
    };
    if options.command == Command::Help {
        print_help();
        return ExitCode::SUCCESS;
    }
    if let Err(err) = logging::init(options.level) {
        eprintln!("bridge-audit: failed to initialise logging: {}", err);
    }

    let mut ahb = match DevMem::open(&options.mem) {
        Ok(ahb) => ahb,
        Err(err) => {
            error!("Failed to open {}: {}", options.mem, err);
            return ExitCode::FAILURE;
        }
    };
    let mut soc = match Soc::probe(&mut ahb) {
        Ok(soc) => soc,
        Err(err) => {
            error!("Failed to initialise SoC: {}", err);
            return ExitCode::FAILURE;
        }
    };

    match options.command {
        Command::List => match soc.list_bridge_controllers() {
            Ok(names) => {
                for name in names {
                    println!("{}", name);
                }
                ExitCode::SUCCESS
            }
            Err(err) => {
                error!("Failed to list bridge controllers: {}", err);
                ExitCode::FAILURE
            }
        },
        Command::Probe(name) => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            match soc.probe_bridge_controllers(name.as_deref(), &mut out) {
                Ok(audit) => {
                    if name.is_some() && audit.reported == 0 && audit.error.is_none() {
                        error!("No bridge controller named '{}'", name.unwrap_or_default());
                        return ExitCode::FAILURE;
                    }
                    println!("Aggregate bridge mode: {}", audit.mode);
                    match audit.error {
                        Some(_) => ExitCode::FAILURE,
                        None => ExitCode::SUCCESS,
                    }
                }
                Err(err) => {
                    error!("Failed to probe bridge controllers: {}", err);
                    ExitCode::FAILURE
                }
            }
        }
        Command::Help => ExitCode::SUCCESS,
    }
}
