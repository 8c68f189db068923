//! Request/response messages and their framing.
//!
//! # Wire format
//!
//! ```text
//! frame    = [len: u32 LE][payload: len bytes]
//! request  = 0x00 program:string | 0x01
//! response = 0x00 snapshot       | 0x01 reason:string
//! snapshot = registers:vec<(string, i64)> memory:vec<i64> log:vec<string>
//! ```
//!
//! Strings and vectors carry a `u64` little-endian length prefix
//! (see [`crate::types::encoding`]).

use crate::types::encoding::{Decode, DecodeError, Encode};
use crate::virtual_machine::runner::Snapshot;
use std::fmt::{self, Display};
use tokio::io::{self, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest accepted frame payload.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Cells printed per row of the memory dump.
const DUMP_ROW: usize = 8;

const TAG_EXECUTE: u8 = 0;
const TAG_RESET: u8 = 1;
const TAG_SNAPSHOT: u8 = 0;
const TAG_REJECTED: u8 = 1;

/// A client request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Request {
    /// Run `program` on a fresh machine.
    Execute { program: String },
    /// Return the state of a freshly reset machine.
    Reset,
}

/// A server response.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Response {
    Snapshot(WireSnapshot),
    /// The request was not executed.
    Rejected { reason: String },
}

/// Machine state as sent over the wire, with the trace already rendered.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct WireSnapshot {
    pub registers: Vec<(String, i64)>,
    pub memory: Vec<i64>,
    pub log: Vec<String>,
}

impl WireSnapshot {
    /// Value of the register called `name`, if present.
    pub fn register(&self, name: &str) -> Option<i64> {
        self.registers
            .iter()
            .find(|(reg, _)| reg == name)
            .map(|(_, value)| *value)
    }
}

impl From<&Snapshot> for WireSnapshot {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            registers: snapshot
                .registers
                .iter()
                .map(|(reg, value)| (reg.name().to_string(), *value))
                .collect(),
            memory: snapshot.memory.clone(),
            log: snapshot.log_lines(),
        }
    }
}

impl Display for WireSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Registers:")?;
        for (name, value) in &self.registers {
            writeln!(f, "  {name:<4} {value:#018x}  {value}")?;
        }

        writeln!(f, "Memory [0..{}]:", self.memory.len())?;
        for (row, cells) in self.memory.chunks(DUMP_ROW).enumerate() {
            write!(f, "  {:04}", row * DUMP_ROW)?;
            for cell in cells {
                write!(f, " {cell:016x}")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "Log:")?;
        if self.log.is_empty() {
            writeln!(f, "  (empty)")?;
        }
        for line in &self.log {
            writeln!(f, "  {line}")?;
        }
        Ok(())
    }
}

impl Encode for WireSnapshot {
    fn encode(&self, out: &mut Vec<u8>) {
        self.registers.encode(out);
        self.memory.encode(out);
        self.log.encode(out);
    }
}

impl Decode for WireSnapshot {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            registers: Vec::decode(input)?,
            memory: Vec::decode(input)?,
            log: Vec::decode(input)?,
        })
    }
}

impl Encode for Request {
    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Request::Execute { program } => {
                TAG_EXECUTE.encode(out);
                program.encode(out);
            }
            Request::Reset => TAG_RESET.encode(out),
        }
    }
}

impl Decode for Request {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        match u8::decode(input)? {
            TAG_EXECUTE => Ok(Request::Execute {
                program: String::decode(input)?,
            }),
            TAG_RESET => Ok(Request::Reset),
            tag => Err(DecodeError::UnknownTag(tag)),
        }
    }
}

impl Encode for Response {
    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Response::Snapshot(snapshot) => {
                TAG_SNAPSHOT.encode(out);
                snapshot.encode(out);
            }
            Response::Rejected { reason } => {
                TAG_REJECTED.encode(out);
                reason.encode(out);
            }
        }
    }
}

impl Decode for Response {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        match u8::decode(input)? {
            TAG_SNAPSHOT => Ok(Response::Snapshot(WireSnapshot::decode(input)?)),
            TAG_REJECTED => Ok(Response::Rejected {
                reason: String::decode(input)?,
            }),
            tag => Err(DecodeError::UnknownTag(tag)),
        }
    }
}

/// Reads one length-prefixed frame.
///
/// Returns `Ok(None)` when the peer closed the stream between frames.
/// Truncated headers, empty frames and oversized frames are `InvalidData`
/// errors.
pub async fn read_frame<R>(reader: &mut R) -> io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf[..1]).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    match reader.read_exact(&mut len_buf[1..]).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "truncated frame header",
            ));
        }
        Err(e) => return Err(e),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len == 0 || len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid frame length {len}"),
        ));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

/// Writes `payload` as one length-prefixed frame and flushes.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|&len| len as usize <= MAX_FRAME_LEN)
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("frame of {} bytes exceeds limit", payload.len()),
            )
        })?;

    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await
}
