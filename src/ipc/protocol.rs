//! IPC protocol message types
//!
//! A request is a JSON command envelope `{"name": ..., "arguments": [...]}`.
//! A response is a 2-byte little-endian status followed by the raw body, so
//! clipboard contents travel byte-for-byte. Both ride in one length-prefixed
//! message (see [`super::transport`]).

use serde::{Deserialize, Deserializer, Serialize};

use crate::common::{Error, Result};

/// Body returned by the `status` command
pub const STATUS_RUNNING: &[u8] = br#"{"status": "running"}"#;

/// Command envelope sent from client to server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Command name
    pub name: String,
    /// Ordered command arguments
    #[serde(default, deserialize_with = "null_as_empty")]
    pub arguments: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Envelope {
    pub fn new<I, S>(name: impl Into<String>, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            arguments: arguments.into_iter().map(Into::into).collect(),
        }
    }

    /// Serialize to wire bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse wire bytes; structural failures are [`Error::MalformedEnvelope`]
    pub fn decode(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data).map_err(|e| Error::MalformedEnvelope(e.to_string()))
    }
}

/// Commands the server understands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Report that the server is alive
    Status,
    /// Put text on the host clipboard
    Copy(String),
    /// Read the host clipboard
    Paste,
    /// Open a URL or file on the host
    Open(String),
    /// Shut the server down
    Stop,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Status => "status",
            Command::Copy(_) => "copy",
            Command::Paste => "paste",
            Command::Open(_) => "open",
            Command::Stop => "stop",
        }
    }
}

impl TryFrom<Envelope> for Command {
    type Error = Error;

    /// Unknown names are protocol errors; copy and open need one argument
    fn try_from(envelope: Envelope) -> Result<Self> {
        let mut arguments = envelope.arguments.into_iter();
        match envelope.name.as_str() {
            "status" => Ok(Command::Status),
            "paste" => Ok(Command::Paste),
            "stop" => Ok(Command::Stop),
            "copy" => arguments
                .next()
                .map(Command::Copy)
                .ok_or(Error::MissingArgument("copy")),
            "open" => arguments
                .next()
                .map(Command::Open)
                .ok_or(Error::MissingArgument("open")),
            _ => Err(Error::UnknownCommand(envelope.name)),
        }
    }
}

/// Response status, modelled on the HTTP codes of the same meaning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
    Internal,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::BadRequest => 400,
            Status::Internal => 500,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            200 => Some(Status::Ok),
            400 => Some(Status::BadRequest),
            500 => Some(Status::Internal),
            _ => None,
        }
    }
}

/// Response from server to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    /// Success payload, or the error message on failure
    pub body: Vec<u8>,
}

impl Response {
    /// Create a success response carrying `body`
    pub fn success(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: Status::Ok,
            body: body.into(),
        }
    }

    /// Create a success response with no data
    pub fn ok() -> Self {
        Self::success(Vec::new())
    }

    /// Create an error response from an error
    pub fn error(error: &Error) -> Self {
        Self {
            status: error.status(),
            body: error.to_string().into_bytes(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Ok
    }

    /// Serialize to wire bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(2 + self.body.len());
        data.extend_from_slice(&self.status.code().to_le_bytes());
        data.extend_from_slice(&self.body);
        data
    }

    /// Parse wire bytes
    pub fn decode(data: &[u8]) -> Result<Self> {
        let (code, body) = match data {
            [lo, hi, body @ ..] => (u16::from_le_bytes([*lo, *hi]), body),
            _ => {
                return Err(Error::ServerCommunication(
                    "Response shorter than status header".to_string(),
                ))
            }
        };

        let status = Status::from_code(code).ok_or_else(|| {
            Error::ServerCommunication(format!("Unknown response status: {}", code))
        })?;

        Ok(Self {
            status,
            body: body.to_vec(),
        })
    }

    /// Take the body of a successful response, or turn a failed one into an error
    pub fn into_body(self) -> Result<Vec<u8>> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(Error::CommandFailed {
                status: self.status.code(),
                message: String::from_utf8_lossy(&self.body).trim_end().to_string(),
            })
        }
    }
}
