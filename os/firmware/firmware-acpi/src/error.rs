//! # Errors

use std::io;
use std::path::PathBuf;

/// Convenience alias for results carrying [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Errors produced while discovering, decoding or re-encoding ACPI tables.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A buffer is smaller than a fixed minimum size.
    #[error("buffer too short: need at least {need} bytes, got {got}")]
    TooShort { need: usize, got: usize },

    /// A table declares more bytes than are available.
    #[error("table truncated: declares {declared} bytes, only {available} available")]
    Truncated { declared: usize, available: usize },

    /// A serialized table does not fit the 32-bit length field.
    #[error("table of {0} bytes does not fit a 32-bit length field")]
    TooLong(usize),

    /// A table was handed to a decoder for a different signature.
    #[error("expected a {expected} table, found {found:?}")]
    WrongSignature {
        expected: &'static str,
        found: String,
    },

    /// A structure was found but is not structurally valid.
    #[error("invalid {what}: {reason}")]
    Invalid { what: &'static str, reason: String },

    /// One strategy of a fallback chain failed.
    #[error("{name}: {source}")]
    StrategyFailed {
        name: String,
        #[source]
        source: Box<Error>,
    },

    /// Every RSDP discovery strategy failed.
    #[error("RSDP not found ({})", summarize(.attempts))]
    RsdpNotFound { attempts: Vec<Error> },

    /// Every table source failed or produced no tables.
    #[error("no ACPI tables available ({})", summarize(.attempts))]
    NoTablesAvailable { attempts: Vec<Error> },

    /// A source completed but produced an empty table set.
    #[error("source produced no tables")]
    Empty,

    /// A MADT sub-record length disagrees with its type.
    #[error("MADT {name} (type {kind}): expected length {expected}, got {actual}")]
    SizeMismatch {
        kind: u8,
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A MADT sub-record runs past the end of the table.
    #[error("MADT {name} (type {kind}): declares {declared} bytes, only {remaining} remain")]
    BufferUnderrun {
        kind: u8,
        name: &'static str,
        declared: usize,
        remaining: usize,
    },

    /// A MADT sub-record prefix is incomplete or its length cannot make progress.
    #[error("MADT sub-record truncated at body offset {offset}")]
    SubtableTruncated { offset: usize },

    /// No code generator is registered for a signature.
    #[error("no coreboot generator for signature {0:?}")]
    NoCorebooter(String),

    /// An error annotated with the physical address it occurred at.
    #[error("at physical address {addr:#x}: {source}")]
    At {
        addr: u64,
        #[source]
        source: Box<Error>,
    },

    /// An error annotated with the stream offset it occurred at.
    #[error("at offset {offset:#x}: {source}")]
    AtOffset {
        offset: usize,
        #[source]
        source: Box<Error>,
    },

    /// An error annotated with the file it was read from.
    #[error("{}: {source}", .path.display())]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Annotate with the physical address the failure happened at.
    #[must_use]
    pub fn at(self, addr: u64) -> Self {
        Self::At {
            addr,
            source: Box::new(self),
        }
    }

    /// Annotate with the byte offset in a captured stream.
    #[must_use]
    pub fn at_offset(self, offset: usize) -> Self {
        Self::AtOffset {
            offset,
            source: Box::new(self),
        }
    }

    /// Annotate with the file the data came from.
    #[must_use]
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        Self::InFile {
            path: path.into(),
            source: Box::new(self),
        }
    }

    /// Strip address/offset/file annotations and return the underlying error.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::At { source, .. }
            | Self::AtOffset { source, .. }
            | Self::InFile { source, .. } => source.root(),
            other => other,
        }
    }
}

fn summarize(attempts: &[Error]) -> String {
    if attempts.is_empty() {
        return "no strategies registered".into();
    }
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_unwraps_annotations() {
        let e = Error::TooShort { need: 36, got: 4 }.at(0x1000).at_offset(8);
        assert!(matches!(e.root(), Error::TooShort { need: 36, got: 4 }));
    }

    #[test]
    fn aggregate_lists_attempts() {
        let e = Error::RsdpNotFound {
            attempts: vec![
                Error::StrategyFailed {
                    name: "ebda".into(),
                    source: Box::new(Error::Empty),
                },
                Error::StrategyFailed {
                    name: "efi".into(),
                    source: Box::new(Error::Empty),
                },
            ],
        };
        let s = e.to_string();
        assert!(s.contains("ebda"), "{s}");
        assert!(s.contains("efi"), "{s}");
    }

    #[test]
    fn address_is_hex() {
        let e = Error::Empty.at(0xe_0000);
        assert_eq!(e.to_string(), "at physical address 0xe0000: source produced no tables");
    }
}
