//! EMObs read/parse errors.

use std::fmt;

/// Errors raised while reading or parsing an EMObs file.
///
/// All variants except [`EMObsError::SuspiciousValue`] are fatal for the
/// file being processed: the driver stops walking the current file but may
/// continue with the next one. `SuspiciousValue` never appears here — it is
/// reported through a [`crate::diagnostics::Diagnostics`] sink instead, since
/// the parser keeps going after it.
#[derive(Debug)]
pub enum EMObsError {
    /// File open/read failure.
    Io(std::io::Error),
    /// Converted `binrw` decode error.
    BinReadError(binrw::Error),
    /// Attempt to read, scan, or seek past the end of the buffer.
    OutOfBounds{pos: usize, len: usize},
    /// Parser expected one TLC but found another.
    UnexpectedTag{expected: &'static str, found: String},
    /// Record type+version combination is not recognized.
    UnsupportedVersion{tag: &'static str, version: u8},
    /// Structurally invalid field (bad MAT prefix, out-of-range wstring
    /// length, ...).
    Malformed{context: String},
    /// Buffer ran out mid-record.
    Truncated{context: String, pos: usize},
    /// TLC scan reached the end of the buffer without finding a candidate.
    /// Natural terminator for the top-level record loop.
    NoMoreRecords,
}

impl std::error::Error for EMObsError {}

impl fmt::Display for EMObsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EMObsError::Io(err) => write!(f, "IO error: {err}"),
            EMObsError::BinReadError(err) => write!(f, "{err}"),
            EMObsError::OutOfBounds{pos, len} => write!(f, "tried to read at {pos}, buffer is {len} bytes"),
            EMObsError::UnexpectedTag{expected, found} => write!(f, "expected TLC '{expected}', found '{found}'"),
            EMObsError::UnsupportedVersion{tag, version} => write!(f, "unsupported version {version} for TLC '{tag}'"),
            EMObsError::Malformed{context} => write!(f, "malformed record: {context}"),
            EMObsError::Truncated{context, pos} => write!(f, "truncated at byte {pos}: {context}"),
            EMObsError::NoMoreRecords => write!(f, "no more records in buffer"),
        }
    }
}

impl From<std::io::Error> for EMObsError {
    fn from(err: std::io::Error) -> Self {
        EMObsError::Io(err)
    }
}

impl From<binrw::Error> for EMObsError {
    fn from(err: binrw::Error) -> Self {
        match err {
            binrw::Error::Io(io) => EMObsError::Io(io),
            other => EMObsError::BinReadError(other),
        }
    }
}

impl From<EMObsError> for std::io::Error {
    fn from(err: EMObsError) -> Self {
        std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
    }
}
