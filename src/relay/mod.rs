//! Line protocol shared by the relay server and client.
//!
//! Every message is one newline-terminated ASCII line. Clients speak
//! `id#TYPE[#payload]`; the server's first line to a fresh client is its bare
//! id, and its replies are `TYPE#payload` or plain notice text without a
//! separator.

pub mod client;
pub mod server;

pub use client::RelayClient;
pub use server::RelayServer;

/// Separates the id, type code, and payload within a protocol line.
pub const PROTOCOL_SEPARATOR: char = '#';

/// Client asks to end its session; the server also broadcasts it on shutdown.
pub const PROTOCOL_END: &str = "P0";
/// Client uploads its fleet configuration.
pub const PROTOCOL_SEND_FLEET: &str = "P1";
/// Client requests a stored fleet; the server delivers with the same code.
pub const PROTOCOL_RECEIVE_FLEET: &str = "P2";
/// Reserved for future session data exchange; parsed and ignored.
pub const PROTOCOL_DATA: &str = "P3";

/// Notice sent in place of a `P2` reply when nothing has been uploaded yet.
pub const EMPTY_STORE_NOTICE: &str =
    "The server currently has no configurations stored on it. Please try again later";

/// A parsed client-to-server line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Id the client stamped on the line. Informational; handlers trust the
    /// id they assigned at accept time.
    pub client_id: String,
    pub kind: RequestKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    /// `P0`: end the session.
    End,
    /// `P1`: store the payload verbatim.
    UploadFleet(String),
    /// `P2`: reply with a randomly chosen stored configuration.
    RequestFleet,
    /// `P3`: reserved.
    Data(String),
}

/// A line the protocol grammar rejects. Handlers log these and keep reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Line carries no separator at all.
    MissingSeparator,
    /// Fewer than two characters follow the separator.
    TruncatedType,
    /// Type code is not one of the known `P*` codes.
    UnknownType(String),
    /// Type requires a payload but none was present.
    MissingPayload,
}

impl core::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ProtocolError::MissingSeparator => write!(f, "line has no separator"),
            ProtocolError::TruncatedType => write!(f, "type code is truncated"),
            ProtocolError::UnknownType(code) => write!(f, "unknown type code {code:?}"),
            ProtocolError::MissingPayload => write!(f, "type code requires a payload"),
        }
    }
}

impl std::error::Error for ProtocolError {}

impl Request {
    /// Parses one `id#TYPE[#payload]` line. Type codes are exactly two
    /// characters.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let (client_id, rest) = line
            .split_once(PROTOCOL_SEPARATOR)
            .ok_or(ProtocolError::MissingSeparator)?;
        if rest.len() < 2 || !rest.is_char_boundary(2) {
            return Err(ProtocolError::TruncatedType);
        }
        let (code, remainder) = rest.split_at(2);
        let payload = remainder.strip_prefix(PROTOCOL_SEPARATOR);

        let kind = match code {
            PROTOCOL_END => RequestKind::End,
            PROTOCOL_SEND_FLEET => RequestKind::UploadFleet(
                payload.ok_or(ProtocolError::MissingPayload)?.to_string(),
            ),
            PROTOCOL_RECEIVE_FLEET => RequestKind::RequestFleet,
            PROTOCOL_DATA => {
                RequestKind::Data(payload.unwrap_or_default().to_string())
            }
            other => return Err(ProtocolError::UnknownType(other.to_string())),
        };
        Ok(Request {
            client_id: client_id.to_string(),
            kind,
        })
    }
}
