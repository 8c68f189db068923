//! Client for the request server.

use crate::network::protocol::{Request, Response, WireSnapshot, read_frame, write_frame};
use crate::types::encoding::{Decode, DecodeError, Encode};
use std::net::SocketAddr;
use tokio::io;
use tokio::net::TcpStream;
use virtual_assembler_derive::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection error: {0}")]
    Io(String),
    #[error("invalid response: {0}")]
    Decode(DecodeError),
    #[error("server closed the connection")]
    Closed,
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl From<io::Error> for ClientError {
    fn from(e: io::Error) -> Self {
        ClientError::Io(e.to_string())
    }
}

impl From<DecodeError> for ClientError {
    fn from(e: DecodeError) -> Self {
        ClientError::Decode(e)
    }
}

/// A single connection to a server. Requests are answered in order.
pub struct Client {
    stream: TcpStream,
}

impl Client {
    pub async fn connect(addr: SocketAddr) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }

    /// Runs `program` remotely.
    pub async fn execute(&mut self, program: &str) -> Result<WireSnapshot, ClientError> {
        self.snapshot(&Request::Execute {
            program: program.to_string(),
        })
        .await
    }

    /// State of a freshly reset remote machine.
    pub async fn reset(&mut self) -> Result<WireSnapshot, ClientError> {
        self.snapshot(&Request::Reset).await
    }

    /// Sends one request and waits for its response.
    pub async fn request(&mut self, request: &Request) -> Result<Response, ClientError> {
        write_frame(&mut self.stream, &request.to_bytes()).await?;
        let frame = read_frame(&mut self.stream)
            .await?
            .ok_or(ClientError::Closed)?;
        Ok(Response::from_bytes(&frame)?)
    }

    async fn snapshot(&mut self, request: &Request) -> Result<WireSnapshot, ClientError> {
        match self.request(request).await? {
            Response::Snapshot(snapshot) => Ok(snapshot),
            Response::Rejected { reason } => Err(ClientError::Rejected(reason)),
        }
    }
}
