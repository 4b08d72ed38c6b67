//! Wire protocol command types

/// Fixed size of every request and response header, in bytes
pub const HEADER_SIZE: usize = 128;

/// Minimum signature length; the first two characters name the shard
pub const MIN_SIGNATURE_LENGTH: usize = 2;

/// Parsed request
///
/// Produced only by the strict header parser, so every `signature` and `name`
/// carried here has already passed the path-segment whitelist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// GET,\<signature\>,\<name\>
    Get { signature: String, name: String },

    /// PUT,\<signature\>,\<name\>,\<size\> followed by `size` raw bytes
    Put {
        signature: String,
        name: String,
        size: u64,
    },

    /// LST
    List,

    /// CLN
    Clean,

    /// RST
    Reset,

    /// BYE
    Bye,
}

impl Command {
    /// Short wire name, used for logging
    pub fn verb(&self) -> &'static str {
        match self {
            Command::Get { .. } => "GET",
            Command::Put { .. } => "PUT",
            Command::List => "LST",
            Command::Clean => "CLN",
            Command::Reset => "RST",
            Command::Bye => "BYE",
        }
    }
}

/// Whitelist for every byte of a request header.
///
/// Signatures and blob names become filesystem path segments verbatim, so
/// this check is the sole defense against path traversal. Space doubles as
/// the header padding byte.
#[inline]
pub fn is_allowed_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b',' || b == b' '
}

/// Check a signature or blob name for use as a path segment
pub fn is_valid_token(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(is_allowed_byte_no_comma)
}

#[inline]
fn is_allowed_byte_no_comma(b: u8) -> bool {
    is_allowed_byte(b) && b != b','
}
