//! Error handling for the table builder and reader.

use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::io;
use std::result;

/// Describes the failure mode of a table operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatusCode {
    NotFound,
    Corruption,
    IOError,
    InvalidArgument,
    NotSupported,
}

/// A `StatusCode` paired with a human-readable message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Status {
    pub code: StatusCode,
    pub err: String,
}

impl Status {
    pub fn new(code: StatusCode, msg: &str) -> Status {
        let err = if msg.is_empty() {
            format!("{:?}", code)
        } else {
            format!("{:?}: {}", code, msg)
        };
        Status { code, err }
    }

    pub fn corruption(msg: &str) -> Status {
        Status::new(StatusCode::Corruption, msg)
    }
}

impl Display for Status {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        fmt.write_str(&self.err)
    }
}

impl Error for Status {}

/// This crate's result type.
pub type Result<T> = result::Result<T, Status>;

impl From<io::Error> for Status {
    fn from(e: io::Error) -> Status {
        let code = match e.kind() {
            io::ErrorKind::NotFound => StatusCode::NotFound,
            io::ErrorKind::InvalidData => StatusCode::Corruption,
            io::ErrorKind::InvalidInput => StatusCode::InvalidArgument,
            _ => StatusCode::IOError,
        };
        Status::new(code, &e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display_includes_message() {
        let s = Status::new(StatusCode::Corruption, "bad magic number");
        assert_eq!(s.code, StatusCode::Corruption);
        assert!(s.to_string().contains("bad magic number"));
    }

    #[test]
    fn test_io_error_conversion() {
        let ioe = io::Error::new(io::ErrorKind::NotFound, "nope");
        let status: Status = ioe.into();
        assert_eq!(status.code, StatusCode::NotFound);
    }
}
