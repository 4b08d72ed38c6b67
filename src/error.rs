//! Error types for Sharcache

use thiserror::Error;

/// Main error type for Sharcache
#[derive(Error, Debug)]
pub enum SharcacheError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Protocol errors
///
/// Any of these terminates the offending connection. A cache miss is not a
/// protocol error and is wire-encoded as size -1 instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("disallowed byte {0:#04x} in request header")]
    DisallowedByte(u8),

    #[error("request header is not valid ASCII")]
    NotAscii,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("signature too short: {0:?}")]
    SignatureTooShort(String),

    #[error("invalid payload size")]
    InvalidSize,

    #[error("{0} is forbidden by the access policy")]
    Forbidden(&'static str),
}

/// Blob store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Signature or blob name contains bytes that may not become a path
    /// segment.
    #[error("invalid signature or blob name: {0:?}")]
    InvalidQuery(String),

    #[error("payload ended early: got {got} of {expected} bytes")]
    ShortPayload { got: u64, expected: u64 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SharcacheError>;
