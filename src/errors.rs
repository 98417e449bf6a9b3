use std::io;
use thiserror::Error;

use crate::string_table::StringSource;
use crate::versions::VersionKey;

/// Malformed dump payloads, dump framing or packaged artifacts.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Truncated input: {0}")]
    Truncated(#[from] io::Error),

    #[error("Invalid {table} string offset: {offset} (table size: {size})")]
    InvalidStringOffset {
        table: StringSource,
        offset: u32,
        size: usize,
    },

    #[error("Unterminated {table} string at offset {offset}")]
    UnterminatedString { table: StringSource, offset: u32 },

    #[error("Invalid UTF-8 string")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("Invalid node level {level} at record {record} (current depth: {depth})")]
    InvalidLevel {
        record: usize,
        level: u8,
        depth: usize,
    },

    #[error("Type tree has no root record")]
    MissingRoot,

    #[error("Second root record at index {record}")]
    MultipleRoots { record: usize },

    #[error("Duplicate field {name:?} under {parent:?}")]
    DuplicateField { parent: String, name: String },

    #[error("Invalid record count: {0}")]
    InvalidRecordCount(u32),

    #[error("Unknown mutation event kind: {0}")]
    UnknownEventKind(u8),

    #[error("Event log of {field:?} goes back in time")]
    EventOutOfOrder { field: String },
}

/// A version label that does not follow `<major>.<minor>.<patch>[<stage><build>]`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid version label: {0:?}")]
    InvalidLabel(String),

    #[error("Version component {component} = {value} out of range in {label:?}")]
    ComponentOutOfRange {
        label: String,
        component: &'static str,
        value: u64,
    },
}

#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error(
        "Identifier {identifier:?} is {len} bytes (max 255) in class {class:?}, field {field:?}"
    )]
    IdentifierTooLong {
        class: String,
        field: String,
        identifier: String,
        len: usize,
    },

    #[error("Position {index} of field {field:?} in class {class:?} does not fit in u16")]
    IndexOutOfRange {
        class: String,
        field: String,
        index: usize,
    },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to decode dump {label}: {source}")]
    Decode {
        label: String,
        #[source]
        source: DecodeError,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),

    #[error("Versions ingested out of order: {next} is not newer than {previous}")]
    OutOfOrder {
        previous: VersionKey,
        next: VersionKey,
    },

    #[error("No dump files found in {0}")]
    EmptyCorpus(String),
}

pub type Result<T> = std::result::Result<T, Error>;
