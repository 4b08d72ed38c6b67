//! Fixed-header wire protocol implementation

pub mod command;
pub mod parser;
pub mod response;

pub use command::{Command, HEADER_SIZE, MIN_SIGNATURE_LENGTH, is_valid_token};
pub use parser::parse_header;
pub use response::ResponseWriter;
