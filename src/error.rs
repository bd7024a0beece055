//! Module `error` implements the domain-tagged error taxonomy shared by
//! every other module in this crate.
//!
//! Every fallible operation in the crate returns `crate::Result<T>`, an
//! alias over `std::result::Result<T, Error>`. `Error` carries the Core
//! error kinds only: backend-specific status codes (POSIX errno, the
//! log-structured backend's own codes, SQLite's codes) are mapped into
//! one of these variants at the point they cross into this crate.

use std::fmt;

/// The Core error taxonomy. One variant per error kind; backend-specific
/// detail is preserved as a `String` payload where it helps diagnosis.
#[derive(Debug)]
pub enum Error {
    /// Operation attempted on a `DataFile` that has been closed.
    NotOpen,
    /// Lookup of a key/sequence where a result is required (unlike
    /// `KeyStore::get`, which returns a non-existent `Record` instead).
    NotFound,
    /// A write violated rev-tree or version-vector preconditions.
    Conflict,
    /// A `RevID` could not be parsed.
    BadRevisionID(String),
    /// A `VersionVector` could not be parsed, or violates an invariant.
    BadVersionVector(String),
    /// An encoded rev-tree failed an internal invariant on decode.
    CorruptRevisionData(String),
    /// A collatable reader hit end-of-data or an unexpected tag.
    CorruptIndexData(String),
    /// The file could not be opened (see the wrapped POSIX error, if any).
    CantOpenFile(String),
    /// First-page header mismatch, or decryption failure on first read.
    NotADatabaseFile,
    /// The backend's commit call returned an error; the transaction was
    /// rolled back.
    CommitFailed(String),
    /// A write was attempted on a read-only `DataFile`.
    NotWriteable,
    /// `rekey`/`open` requested an encryption algorithm we don't support.
    UnsupportedEncryption(String),
    /// A sequence-based operation was attempted on a `KeyStore` opened
    /// without the `sequences` capability.
    NoSequences,
    /// A write was attempted with no open `Transaction`.
    NoTransaction,
    /// Preconditions unmet: oversize key/meta/body, null/empty argument.
    InvalidParameter(String),
    /// Backend I/O failure (wraps `std::io::Error`).
    IOError(String),
    /// Allocation failure.
    MemoryError,
    /// Contention where non-blocking semantics were required (e.g. a
    /// compaction already in progress).
    Busy,
    /// A debug-only assertion failed; fatal.
    Assertion {
        msg: String,
        file: &'static str,
        line: u32,
    },
    /// Catch-all for unclassified internal failures.
    UnexpectedError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotOpen => write!(f, "data file is not open"),
            Error::NotFound => write!(f, "key or sequence not found"),
            Error::Conflict => write!(f, "revision conflict"),
            Error::BadRevisionID(s) => write!(f, "bad revision id: {}", s),
            Error::BadVersionVector(s) => write!(f, "bad version vector: {}", s),
            Error::CorruptRevisionData(s) => write!(f, "corrupt revision data: {}", s),
            Error::CorruptIndexData(s) => write!(f, "corrupt index data: {}", s),
            Error::CantOpenFile(s) => write!(f, "can't open file: {}", s),
            Error::NotADatabaseFile => write!(f, "not a database file"),
            Error::CommitFailed(s) => write!(f, "commit failed: {}", s),
            Error::NotWriteable => write!(f, "data file is not writeable"),
            Error::UnsupportedEncryption(s) => write!(f, "unsupported encryption: {}", s),
            Error::NoSequences => write!(f, "key store has no sequences capability"),
            Error::NoTransaction => write!(f, "write attempted outside a transaction"),
            Error::InvalidParameter(s) => write!(f, "invalid parameter: {}", s),
            Error::IOError(s) => write!(f, "i/o error: {}", s),
            Error::MemoryError => write!(f, "memory allocation failure"),
            Error::Busy => write!(f, "resource busy"),
            Error::Assertion { msg, file, line } => {
                write!(f, "assertion failed at {}:{}: {}", file, line, msg)
            }
            Error::UnexpectedError(s) => write!(f, "unexpected error: {}", s),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        use std::io::ErrorKind::*;
        match e.kind() {
            NotFound => Error::CantOpenFile(e.to_string()),
            _ => Error::IOError(e.to_string()),
        }
    }
}

impl From<std::num::TryFromIntError> for Error {
    fn from(e: std::num::TryFromIntError) -> Error {
        Error::InvalidParameter(e.to_string())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Error {
        Error::IOError(format!("sqlite: {}", e))
    }
}

/// Raise a fatal assertion error: logs at `Error` level with source
/// location, then returns an `Error::Assertion` for the caller to
/// propagate. Debug-only assertions (`debug_assert!`) compile out of
/// release builds as usual; this macro is for invariants that must hold
/// even in release builds.
#[macro_export]
macro_rules! bail_assert {
    ($cond:expr, $($arg:tt)*) => {
        if !($cond) {
            let msg = format!($($arg)*);
            $crate::log::error(&format!("assertion failed: {}", msg));
            return Err($crate::error::Error::Assertion {
                msg,
                file: file!(),
                line: line!(),
            });
        }
    };
}
