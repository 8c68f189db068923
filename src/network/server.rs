//! TCP server executing programs for remote clients.
//!
//! Each accepted connection is served on its own task. A connection carries
//! any number of request frames, each answered by exactly one response frame.
//! Requests never share machine state: every one runs on a fresh
//! [`Runner`](crate::virtual_machine::runner::Runner).

use crate::config::ServerConfig;
use crate::network::protocol::{
    MAX_FRAME_LEN, Request, Response, WireSnapshot, read_frame, write_frame,
};
use crate::types::encoding::{Decode, Encode};
use crate::virtual_machine::runner::Runner;
use crate::{debug, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use virtual_assembler_derive::Error;

/// Errors raised by the server outside of request handling.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {message}")]
    Bind { addr: SocketAddr, message: String },
    #[error("connection error: {0}")]
    Io(String),
}

impl From<io::Error> for ServerError {
    fn from(e: io::Error) -> Self {
        ServerError::Io(e.to_string())
    }
}

/// Listening request server.
pub struct Server {
    listener: TcpListener,
    config: Arc<ServerConfig>,
}

impl Server {
    /// Binds the listener described by `config`.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let listener =
            TcpListener::bind(config.listen_addr)
                .await
                .map_err(|e| ServerError::Bind {
                    addr: config.listen_addr,
                    message: e.to_string(),
                })?;

        Ok(Self {
            listener,
            config: Arc::new(config),
        })
    }

    /// Address actually bound (resolves port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections until `shutdown` fires or its sender is dropped.
    ///
    /// Connections already being served run to completion on their own tasks.
    pub async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!("accepted connection from {peer}");
                        let config = self.config.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, config).await {
                                warn!("{peer}: {e}");
                            }
                        });
                    }
                    Err(e) => warn!("accept failed: {e}"),
                },
            }
        }

        info!("Server shut down");
    }
}

/// Serves request frames on `stream` until the peer disconnects.
///
/// Each request is decoded, executed and encoded on the blocking pool.
async fn handle_connection(
    stream: TcpStream,
    config: Arc<ServerConfig>,
) -> Result<(), ServerError> {
    let (mut reader, mut writer) = stream.into_split();

    while let Some(frame) = read_frame(&mut reader).await? {
        let config = config.clone();
        let reply = tokio::task::spawn_blocking(move || respond(&config, &frame))
            .await
            .map_err(|e| ServerError::Io(e.to_string()))?;
        write_frame(&mut writer, &reply).await?;
    }

    Ok(())
}

/// Decodes one request frame and returns the encoded response frame.
///
/// A response that would not fit in a frame is replaced by a rejection.
pub fn respond(config: &ServerConfig, frame: &[u8]) -> Vec<u8> {
    let response = match Request::from_bytes(frame) {
        Ok(request) => handle_request(config, request),
        Err(e) => {
            warn!("malformed request: {e}");
            Response::Rejected {
                reason: format!("malformed request: {e}"),
            }
        }
    };

    let bytes = response.to_bytes();
    if bytes.len() <= MAX_FRAME_LEN {
        return bytes;
    }

    warn!("dropping response of {} bytes (limit {MAX_FRAME_LEN})", bytes.len());
    Response::Rejected {
        reason: format!("response of {} bytes exceeds frame limit", bytes.len()),
    }
    .to_bytes()
}

/// Answers a single decoded request.
pub fn handle_request(config: &ServerConfig, request: Request) -> Response {
    let mut runner = Runner::new(config.machine);

    match request {
        Request::Execute { program } if program.len() > config.max_program_len => {
            warn!(
                "rejected program of {} bytes (limit {})",
                program.len(),
                config.max_program_len
            );
            Response::Rejected {
                reason: format!(
                    "program of {} bytes exceeds limit of {} bytes",
                    program.len(),
                    config.max_program_len
                ),
            }
        }
        Request::Execute { program } => {
            let snapshot = runner.run(&program);
            debug!(
                "executed {} lines, {} trace entries",
                program.lines().count(),
                snapshot.log.len()
            );
            Response::Snapshot(WireSnapshot::from(&snapshot))
        }
        Request::Reset => Response::Snapshot(WireSnapshot::from(&runner.reset())),
    }
}
