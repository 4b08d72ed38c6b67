//! Strict parser for the fixed 128-byte request header
//!
//! A header is ASCII, comma-separated and space-padded:
//! `COMMAND,arg1,arg2,...` padded with spaces to [`HEADER_SIZE`]. The whole
//! header must pass the byte whitelist before any field is interpreted;
//! signature and name fields turn into path segments downstream, so nothing
//! outside the whitelist may get that far.

use crate::ProtocolError;
use crate::protocol::command::{Command, HEADER_SIZE, MIN_SIGNATURE_LENGTH, is_allowed_byte};

/// Parse one request header.
///
/// Callers hand in exactly [`HEADER_SIZE`] bytes read off the wire. Any
/// violation terminates the connection; there is no error recovery inside a
/// header.
pub fn parse_header(header: &[u8]) -> Result<Command, ProtocolError> {
    debug_assert_eq!(header.len(), HEADER_SIZE);

    if let Some(&b) = header.iter().find(|&&b| !is_allowed_byte(b)) {
        return Err(ProtocolError::DisallowedByte(b));
    }

    // The whitelist admits only ASCII, so this cannot fail in practice.
    let text = std::str::from_utf8(header).map_err(|_| ProtocolError::NotAscii)?;
    let text = text.trim_matches(' ');

    let mut fields = text.split(',');
    let verb = fields.next().unwrap_or("");

    match verb {
        "GET" => {
            let signature = take_signature(fields.next())?;
            let name = take_name(fields.next())?;
            Ok(Command::Get { signature, name })
        }
        "PUT" => {
            let signature = take_signature(fields.next())?;
            let name = take_name(fields.next())?;
            let size = fields
                .next()
                .and_then(|s| s.trim_matches(' ').parse::<u64>().ok())
                .ok_or(ProtocolError::InvalidSize)?;
            Ok(Command::Put {
                signature,
                name,
                size,
            })
        }
        "LST" => Ok(Command::List),
        "CLN" => Ok(Command::Clean),
        "RST" => Ok(Command::Reset),
        "BYE" => Ok(Command::Bye),
        other => Err(ProtocolError::UnknownCommand(other.to_string())),
    }
}

fn take_signature(field: Option<&str>) -> Result<String, ProtocolError> {
    let signature = match field {
        Some(s) if !s.is_empty() => s,
        _ => return Err(ProtocolError::MissingArgument("signature")),
    };
    if signature.len() < MIN_SIGNATURE_LENGTH {
        return Err(ProtocolError::SignatureTooShort(signature.to_string()));
    }
    Ok(signature.to_string())
}

fn take_name(field: Option<&str>) -> Result<String, ProtocolError> {
    match field {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(ProtocolError::MissingArgument("name")),
    }
}
