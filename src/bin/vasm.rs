//! Command-line front end for the virtual assembler.
//!
//! Runs an assembly program and prints the register table, a hex dump of the
//! leading memory cells and the execution trace.
//!
//! # Usage
//! ```text
//! vasm <program.asm> [OPTIONS]
//! ```
//!
//! # Options
//! - `-r, --remote <addr>`: Execute on a running server instead of locally
//! - `-w, --memory-window <cells>`: Number of memory cells to print (default 64)
//!
//! # Examples
//! ```text
//! vasm program.asm
//! vasm program.asm --memory-window 16
//! vasm program.asm --remote 127.0.0.1:4000
//! ```

use std::env;
use std::net::SocketAddr;
use std::process;
use virtual_assembler::config::MachineConfig;
use virtual_assembler::network::client::Client;
use virtual_assembler::network::protocol::WireSnapshot;
use virtual_assembler::utils::log;
use virtual_assembler::virtual_machine::runner::{Runner, read_source};
use virtual_assembler::{error, info};

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    if let Err(e) = log::init_from_env() {
        eprintln!("{e}");
        process::exit(1);
    }

    let input_path = &args[1];
    let mut remote: Option<SocketAddr> = None;
    let mut machine = MachineConfig::default();

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            k @ ("--remote" | "-r") => {
                i += 1;
                if i >= args.len() {
                    error!("{k} requires an argument");
                    process::exit(1);
                }
                remote = Some(args[i].parse().unwrap_or_else(|_| {
                    error!("Invalid server address: {}", args[i]);
                    process::exit(1);
                }));
                i += 1;
            }
            k @ ("--memory-window" | "-w") => {
                i += 1;
                if i >= args.len() {
                    error!("{k} requires an argument");
                    process::exit(1);
                }
                machine.window_len = args[i].parse::<usize>().unwrap_or_else(|_| {
                    error!("Invalid window size: '{}' is not a valid number", args[i]);
                    process::exit(1);
                });
                i += 1;
            }
            other => {
                error!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    let snapshot = match remote {
        Some(addr) => {
            let source = read_source(input_path).unwrap_or_else(|e| {
                error!("{e}");
                process::exit(1);
            });
            run_remote(addr, &source, machine.window_len).await
        }
        None => match Runner::new(machine).run_file(input_path) {
            Ok(snapshot) => WireSnapshot::from(&snapshot),
            Err(e) => {
                error!("{e}");
                process::exit(1);
            }
        },
    };

    print!("{snapshot}");

    let faults = snapshot
        .log
        .iter()
        .filter(|line| line.starts_with("Error:"))
        .count();
    if faults > 0 {
        info!("{} finished with {} errors", input_path, faults);
    }
}

/// Executes `source` on the server at `addr`, trimming memory to `window`.
async fn run_remote(addr: SocketAddr, source: &str, window: usize) -> WireSnapshot {
    let mut client = Client::connect(addr).await.unwrap_or_else(|e| {
        error!("Cannot connect to {}: {}", addr, e);
        process::exit(1);
    });

    let mut snapshot = client.execute(source).await.unwrap_or_else(|e| {
        error!("{e}");
        process::exit(1);
    });
    snapshot.memory.truncate(window);
    snapshot
}

const USAGE: &str = "\
Virtual Assembler

USAGE:
    {program} <program.asm> [OPTIONS]

ARGS:
    <program.asm>    Assembly source file to execute

OPTIONS:
    -r, --remote <addr>            Execute on a server (e.g., 127.0.0.1:4000)
    -w, --memory-window <cells>    Memory cells to print (default 64)
    -h, --help                     Print this help message
";

/// Prints usage information to stderr.
fn print_usage(program: &str) {
    eprintln!("{}", USAGE.replace("{program}", program));
}
