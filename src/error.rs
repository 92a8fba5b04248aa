//! Error types
//!
//! Three levels of errors are used by this crate:
//!
//! - [`PcapError`] is returned by the block parsers and streaming readers. It implements
//!   `nom::error::ParseError` so that it can be used directly by the parsing combinators.
//! - [`FrameError`] describes why a single frame could not be dissected. It never leaves the
//!   dissector: the frame is dropped and the import continues.
//! - [`ImportError`] ends an import (bad magic, corrupt block structure, I/O failure).

use nom::error::{ErrorKind, ParseError};
use std::fmt;
use thiserror::Error;

/// Errors that can happen while parsing a capture file
#[derive(Debug, PartialEq)]
pub enum PcapError<I: Sized> {
    /// No more data available
    Eof,
    /// Buffer capacity is too small, and some full frame cannot be stored
    BufferTooSmall,
    /// Expected more data but got EOF
    UnexpectedEof,
    /// An error happened during a `read()` operation
    ReadError,
    /// Last block is incomplete, and no more data available
    Incomplete(usize),

    /// File could not be recognized as Pcap nor PcapNG
    HeaderNotRecognized,

    /// An error encountered during a nom operation
    NomError(I, ErrorKind),
    /// An error encountered during a nom operation, with the input copied
    OwnedNomError(Vec<u8>, ErrorKind),
}

impl<I> PcapError<I> {
    /// Creates a `PcapError` from input and error kind.
    pub fn from_data(input: I, errorkind: ErrorKind) -> Self {
        Self::NomError(input, errorkind)
    }
}

impl<I> PcapError<I>
where
    I: AsRef<[u8]> + Sized,
{
    /// Creates an owned `PcapError` object from borrowed data, cloning object.
    /// Owned object has `'static` lifetime.
    pub fn to_owned_vec(&self) -> PcapError<&'static [u8]> {
        match self {
            PcapError::Eof => PcapError::Eof,
            PcapError::BufferTooSmall => PcapError::BufferTooSmall,
            PcapError::UnexpectedEof => PcapError::UnexpectedEof,
            PcapError::ReadError => PcapError::ReadError,
            PcapError::Incomplete(n) => PcapError::Incomplete(*n),
            PcapError::HeaderNotRecognized => PcapError::HeaderNotRecognized,
            PcapError::NomError(i, e) => PcapError::OwnedNomError(i.as_ref().to_vec(), *e),
            PcapError::OwnedNomError(v, e) => PcapError::OwnedNomError(v.clone(), *e),
        }
    }
}

impl<I> ParseError<I> for PcapError<I> {
    fn from_error_kind(input: I, kind: ErrorKind) -> Self {
        PcapError::NomError(input, kind)
    }
    fn append(input: I, kind: ErrorKind, _other: Self) -> Self {
        PcapError::NomError(input, kind)
    }
}

impl<I> fmt::Display for PcapError<I>
where
    I: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PcapError::Eof => write!(f, "End of file"),
            PcapError::BufferTooSmall => write!(f, "Buffer is too small"),
            PcapError::UnexpectedEof => write!(f, "Unexpected end of file"),
            PcapError::ReadError => write!(f, "Read error"),
            PcapError::Incomplete(n) => write!(f, "Incomplete read: {}", n),
            PcapError::HeaderNotRecognized => write!(f, "Header not recognized as PCAP or PCAPNG"),
            PcapError::NomError(i, e) => write!(f, "Internal parser error {:?}, input {:?}", e, i),
            PcapError::OwnedNomError(i, e) => {
                write!(f, "Internal parser error {:?}, input {:?}", e, &i)
            }
        }
    }
}

impl<I> std::error::Error for PcapError<I> where I: fmt::Debug {}

/// A frame could not be dissected
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameError {
    /// A field extends past the end of the buffer
    #[error("field {field} out of bounds (offset {offset}, len {len}, available {available})")]
    OutOfBounds {
        field: &'static str,
        offset: usize,
        len: usize,
        available: usize,
    },

    /// A length or offset field holds an impossible value
    #[error("malformed {what}")]
    Malformed { what: &'static str },
}

/// Fatal errors, ending the import of a file
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Corrupt file structure (bad magic, invalid block size, unknown block type)
    #[error("invalid {format} format: {reason}")]
    FormatInvalid {
        format: &'static str,
        reason: String,
    },

    /// The file is valid, but of another format than the one requested
    #[error("expected {expected} file, found {found}")]
    FormatMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// The input is too short to hold a magic number and is not a log
    #[error("unsupported file format")]
    UnsupportedFormat,

    /// Bro/Zeek log structure error (missing `#fields`, missing column)
    #[error("Bro log line {line}: {reason}")]
    Bro { line: usize, reason: String },

    /// The import thread panicked
    #[error("import worker panicked")]
    WorkerPanicked,
}

impl ImportError {
    pub(crate) fn pcap_invalid<S: Into<String>>(reason: S) -> Self {
        ImportError::FormatInvalid {
            format: "pcap",
            reason: reason.into(),
        }
    }

    pub(crate) fn pcapng_invalid<S: Into<String>>(reason: S) -> Self {
        ImportError::FormatInvalid {
            format: "pcapng",
            reason: reason.into(),
        }
    }
}
