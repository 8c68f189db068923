//! Virtual assembler execution server.
//!
//! Runs assembly programs submitted over TCP and answers each with the
//! resulting machine snapshot.
//!
//! # Usage
//! ```text
//! virtual-assembler <listen_addr> [OPTIONS]
//! ```
//!
//! # Arguments
//! - `listen_addr`: Local address to bind (e.g., `127.0.0.1:4000`)
//!
//! # Options
//! - `--max-program-len <bytes>`: Reject larger programs unexecuted
//! - `--log <level>`: Minimum log level (`debug`, `info`, `warn`, `error`)

use std::env;
use std::process;
use tokio::sync::oneshot;
use virtual_assembler::config::ServerConfig;
use virtual_assembler::network::server::Server;
use virtual_assembler::utils::log;
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

    let config = match ServerConfig::from_args(&args[1..]) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}\n");
            print_usage(&args[0]);
            process::exit(1);
        }
    };

    if let Some(level) = config.log_level {
        log::set_level(level);
    }

    let max_program_len = config.max_program_len;
    let server = match Server::bind(config).await {
        Ok(server) => server,
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    };

    match server.local_addr() {
        Ok(addr) => info!(
            "Server listening on {} (max program {} bytes)",
            addr, max_program_len
        ),
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    }

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let server_handle = tokio::spawn(server.run(shutdown_rx));

    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("Failed to setup Ctrl+C handler: {}", e);
        return;
    }
    info!("Ctrl+C received, shutting down...");
    let _ = shutdown_tx.send(());
    if let Err(e) = server_handle.await {
        eprintln!("Server task error: {:?}", e);
    }
}

const USAGE: &str = "\
Virtual Assembler Server

USAGE:
    {program} <listen_addr> [OPTIONS]

ARGS:
    <listen_addr>    Local address to bind (e.g., 127.0.0.1:4000)

OPTIONS:
    --max-program-len <bytes>    Reject programs larger than this (default 1048576)
    --log <level>                Minimum log level: debug, info, warn, error
    -h, --help                   Print this help message

ENVIRONMENT:
    VASM_LOG                Minimum log level (overridden by --log)
    VASM_MAX_PROGRAM_LEN    Program size limit (overridden by --max-program-len)

EXAMPLES:
    # Start a server
    {program} 127.0.0.1:4000

    # Run a program against it
    vasm program.asm --remote 127.0.0.1:4000
";

/// Prints usage information to stderr.
fn print_usage(program: &str) {
    eprintln!("{}", USAGE.replace("{program}", program));
}
