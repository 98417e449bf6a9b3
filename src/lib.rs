//! Unified historical TypeTree schemas.
//!
//! Folds a corpus of per-version Unity type tree dumps into one union tree per
//! class, recording for every field the versions in which it was added,
//! removed or changed alignment, and packages the result as a binary artifact.

pub mod config;
pub mod corpus;
pub mod decoder;
pub mod differ;
pub mod dump_file;
pub mod errors;
pub mod events;
pub mod logging;
pub mod node;
pub mod packager;
pub mod reader;
pub mod string_table;
pub mod union;
pub mod versions;

pub use config::BuildConfig;
pub use errors::{DecodeError, Error, ParseError, Result, SerializationError};
pub use events::{EventKind, EventLog, FieldState, Mutation, MutationEvent};
pub use node::{ALIGN_FLAG, ChildScope, SchemaNode};
pub use union::{IngestStats, UnionTree};
pub use versions::{ReleaseStage, UnityVersion, VersionKey, version_key};
