//! Machine and server configuration.
//!
//! Command-line flags take precedence over environment variables, which take
//! precedence over the defaults below.

use crate::utils::log::Level;
use std::net::SocketAddr;
use virtual_assembler_derive::Error;

/// Number of memory cells in a fresh machine.
pub const MEMORY_LEN: usize = 1024;

/// Number of leading memory cells returned in a snapshot.
pub const MEMORY_WINDOW: usize = 64;

/// Default upper bound on the size of a program accepted by the server.
pub const DEFAULT_MAX_PROGRAM_LEN: usize = 1024 * 1024;

/// Environment variable overriding [`ServerConfig::max_program_len`].
pub const MAX_PROGRAM_LEN_ENV: &str = "VASM_MAX_PROGRAM_LEN";

/// Shape of the machine a run executes on.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MachineConfig {
    /// Memory cells available during execution.
    pub memory_len: usize,
    /// Leading cells copied into the snapshot.
    pub window_len: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            memory_len: MEMORY_LEN,
            window_len: MEMORY_WINDOW,
        }
    }
}

/// Errors produced while reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing listen address")]
    MissingListenAddr,
    #[error("invalid listen address: {0}")]
    InvalidListenAddr(String),
    #[error("{flag} requires an argument")]
    MissingValue { flag: String },
    #[error("invalid value '{value}' for {flag}")]
    InvalidValue { flag: String, value: String },
    #[error("unexpected argument: {0}")]
    UnexpectedArgument(String),
}

/// Settings of the request server.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// Programs longer than this many bytes are rejected unexecuted.
    pub max_program_len: usize,
    /// Process log level, if overridden on the command line.
    pub log_level: Option<Level>,
    pub machine: MachineConfig,
}

impl ServerConfig {
    /// Default configuration listening on `listen_addr`.
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            max_program_len: DEFAULT_MAX_PROGRAM_LEN,
            log_level: None,
            machine: MachineConfig::default(),
        }
    }

    /// Parses `<listen_addr> [--max-program-len N] [--log LEVEL]`, falling
    /// back to the process environment.
    pub fn from_args(args: &[String]) -> Result<Self, ConfigError> {
        Self::from_args_with_env(args, |key| std::env::var(key).ok())
    }

    /// Like [`ServerConfig::from_args`] with an explicit environment lookup.
    pub fn from_args_with_env<F>(args: &[String], env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let listen_arg = args.first().ok_or(ConfigError::MissingListenAddr)?;
        let listen_addr = listen_arg
            .parse()
            .map_err(|_| ConfigError::InvalidListenAddr(listen_arg.clone()))?;
        let mut config = Self::new(listen_addr);

        if let Some(raw) = env(MAX_PROGRAM_LEN_ENV) {
            config.max_program_len = parse_flag(MAX_PROGRAM_LEN_ENV, &raw)?;
        }

        let mut i = 1;
        while i < args.len() {
            let flag = args[i].as_str();
            match flag {
                "--max-program-len" => {
                    config.max_program_len = parse_flag(flag, flag_value(args, i)?)?;
                    i += 2;
                }
                "--log" => {
                    config.log_level = Some(parse_flag(flag, flag_value(args, i)?)?);
                    i += 2;
                }
                other => return Err(ConfigError::UnexpectedArgument(other.to_string())),
            }
        }

        Ok(config)
    }
}

/// Returns the argument following the flag at `i`.
pub(crate) fn flag_value(args: &[String], i: usize) -> Result<&str, ConfigError> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| ConfigError::MissingValue {
            flag: args[i].clone(),
        })
}

/// Parses a flag value, naming the flag on failure.
pub(crate) fn parse_flag<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        flag: flag.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn machine_defaults() {
        let config = MachineConfig::default();
        assert_eq!(config.memory_len, 1024);
        assert_eq!(config.window_len, 64);
    }

    #[test]
    fn listen_address_only() {
        let config = ServerConfig::from_args_with_env(&args(&["127.0.0.1:4000"]), no_env).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:4000".parse().unwrap());
        assert_eq!(config.max_program_len, DEFAULT_MAX_PROGRAM_LEN);
        assert_eq!(config.log_level, None);
    }

    #[test]
    fn flags_override_environment() {
        let env = |key: &str| (key == MAX_PROGRAM_LEN_ENV).then(|| "100".to_string());

        let from_env = ServerConfig::from_args_with_env(&args(&["127.0.0.1:0"]), env).unwrap();
        assert_eq!(from_env.max_program_len, 100);

        let from_flag = ServerConfig::from_args_with_env(
            &args(&["127.0.0.1:0", "--max-program-len", "50", "--log", "debug"]),
            env,
        )
        .unwrap();
        assert_eq!(from_flag.max_program_len, 50);
        assert_eq!(from_flag.log_level, Some(Level::Debug));
    }

    #[test]
    fn argument_errors() {
        assert_eq!(
            ServerConfig::from_args_with_env(&[], no_env),
            Err(ConfigError::MissingListenAddr)
        );
        assert_eq!(
            ServerConfig::from_args_with_env(&args(&["localhost"]), no_env),
            Err(ConfigError::InvalidListenAddr("localhost".into()))
        );
        assert_eq!(
            ServerConfig::from_args_with_env(&args(&["127.0.0.1:0", "--log"]), no_env),
            Err(ConfigError::MissingValue {
                flag: "--log".into()
            })
        );
        assert_eq!(
            ServerConfig::from_args_with_env(
                &args(&["127.0.0.1:0", "--max-program-len", "lots"]),
                no_env
            ),
            Err(ConfigError::InvalidValue {
                flag: "--max-program-len".into(),
                value: "lots".into()
            })
        );
        assert_eq!(
            ServerConfig::from_args_with_env(&args(&["127.0.0.1:0", "--peer"]), no_env)
                .unwrap_err()
                .to_string(),
            "unexpected argument: --peer"
        );
    }
}
