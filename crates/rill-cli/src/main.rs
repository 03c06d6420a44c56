use std::{env, fs, process::ExitCode};

use rill::{Runner, StdPrint, StdinSource};

const USAGE: &str = "usage: rill <script> [--heap-stats] [--dump-objects]

options:
  --heap-stats     print heap statistics to stderr after the run
  --dump-objects   write the live-object listing to object.dsv after the run";

fn main() -> ExitCode {
    let mut script = None;
    let mut heap_stats = false;
    let mut dump_objects = false;

    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--heap-stats" => heap_stats = true,
            "--dump-objects" => dump_objects = true,
            "--help" | "-h" => {
                println!("{USAGE}");
                return ExitCode::SUCCESS;
            }
            _ if script.is_none() => script = Some(arg),
            _ => {
                eprintln!("unexpected argument: {arg}\n{USAGE}");
                return ExitCode::FAILURE;
            }
        }
    }

    let Some(path) = script else {
        eprintln!("{USAGE}");
        return ExitCode::FAILURE;
    };

    let mut runner = match Runner::from_file(&path) {
        Ok(runner) => runner,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let result = runner.run(&mut StdPrint, &mut StdinSource);

    // Debug side-channels run after execution: a clean program leaves the
    // heap empty, so anything listed here is a leak.
    if dump_objects
        && let Err(err) = fs::write("object.dsv", runner.dump_objects())
    {
        eprintln!("cannot write object.dsv: {err}");
    }
    if heap_stats {
        eprintln!("{}", runner.heap_stats());
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
